//! Verification Token Entity
//!
//! Short-lived code proving control of an email or phone number, or
//! authorizing a password reset. At most one live token per
//! `(token_type, user_id)`; issuing a new one replaces the old.

use chrono::{DateTime, Duration, Utc};
use platform::crypto::constant_time_eq;

use crate::domain::value_object::{UserId, token_type::TokenType};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationToken {
    pub user_id: UserId,
    pub token_type: TokenType,
    /// What the user must present: a numeric code or the long token
    pub code: String,
    /// Long-form token paired with a numeric code
    pub long_token: Option<String>,
    /// Failed attempts so far
    pub number_of_tries: u8,
    pub expires_at: DateTime<Utc>,
    /// New email or phone number for change flows
    pub extra_data: Option<String>,
}

impl VerificationToken {
    pub fn cache_key(&self) -> String {
        self.token_type.cache_key(&self.user_id)
    }

    /// `expires_at < now`
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }

    pub fn is_exhausted(&self, max_tries: u8) -> bool {
        self.number_of_tries >= max_tries
    }

    /// Still usable: not expired and tries left
    pub fn is_live(&self, now: DateTime<Utc>, max_tries: u8) -> bool {
        !self.is_expired(now) && !self.is_exhausted(max_tries)
    }

    /// Issued less than `reset_period` ago
    ///
    /// The issue time is not stored; it is `expires_at - expiration_period`.
    pub fn issued_within(
        &self,
        now: DateTime<Utc>,
        reset_period: Duration,
        expiration_period: Duration,
    ) -> bool {
        self.expires_at + (reset_period - expiration_period) > now
    }

    pub fn matches(&self, code: &str) -> bool {
        constant_time_eq(self.code.as_bytes(), code.as_bytes())
    }
}
