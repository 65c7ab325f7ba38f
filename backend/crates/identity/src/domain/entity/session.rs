//! Session Entity
//!
//! One row per user holding the current login token pair and the bound
//! device. A session without a token is logged out. `token` and
//! `refresh_token` are always set and cleared together.

use chrono::{DateTime, Duration, Utc};
use platform::crypto::{constant_time_eq, random_hex_token, random_token};

use crate::domain::value_object::{UserId, mac_address::MacAddress};

/// Refresh token size in random bytes (before base64)
pub const REFRESH_TOKEN_BYTES: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: UserId,
    /// Current session token (32 hex chars)
    pub token: Option<String>,
    pub refresh_token: Option<String>,
    /// Bound device
    pub mac_address: Option<MacAddress>,
    /// Creation time, then the time of the last rotation
    pub last_login: DateTime<Utc>,
}

impl Session {
    /// Logged-out session bound to `mac_address`
    pub fn new(user_id: UserId, mac_address: Option<MacAddress>, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            token: None,
            refresh_token: None,
            mac_address,
            last_login: now,
        }
    }

    pub fn is_logged_in(&self) -> bool {
        self.token.is_some()
    }

    /// `last_login + period < now`
    pub fn is_expired(&self, now: DateTime<Utc>, period: Duration) -> bool {
        self.last_login + period < now
    }

    /// Issue a fresh token pair, replacing the previous one
    pub fn rotate(&mut self, now: DateTime<Utc>) -> (String, String) {
        let token = random_hex_token();
        let refresh_token = random_token(REFRESH_TOKEN_BYTES);

        self.token = Some(token.clone());
        self.refresh_token = Some(refresh_token.clone());
        self.last_login = now;

        (token, refresh_token)
    }

    /// Log out; `forced` also forgets the bound device
    pub fn reset(&mut self, forced: bool) {
        self.token = None;
        self.refresh_token = None;
        if forced {
            self.mac_address = None;
        }
    }

    pub fn bind_device(&mut self, mac_address: MacAddress) {
        self.mac_address = Some(mac_address);
    }

    /// Stored token equals `presented`; two `None`s are equal
    pub fn token_matches(&self, presented: Option<&str>) -> bool {
        match (self.token.as_deref(), presented) {
            (None, None) => true,
            (Some(stored), Some(presented)) => {
                constant_time_eq(stored.as_bytes(), presented.as_bytes())
            }
            _ => false,
        }
    }

    pub fn refresh_token_matches(&self, presented: &str) -> bool {
        self.refresh_token
            .as_deref()
            .is_some_and(|stored| constant_time_eq(stored.as_bytes(), presented.as_bytes()))
    }

    /// Device check for requests made with a token
    pub fn is_bound_to(&self, mac_address: &MacAddress) -> bool {
        self.mac_address.as_ref() == Some(mac_address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mac() -> MacAddress {
        MacAddress::parse("00:1A:2B:3C:4D:5E").unwrap()
    }

    #[test]
    fn test_new_session_is_logged_out() {
        let now = Utc::now();
        let session = Session::new(UserId::new(), Some(mac()), now);
        assert!(!session.is_logged_in());
        assert!(session.refresh_token.is_none());
        assert_eq!(session.last_login, now);
        assert!(session.is_bound_to(&mac()));
    }

    #[test]
    fn test_rotate_overwrites_previous_pair() {
        let start = Utc::now();
        let mut session = Session::new(UserId::new(), None, start);

        let (t1, r1) = session.rotate(start);
        assert_eq!(t1.len(), 32);
        assert!(session.token_matches(Some(&t1)));
        assert!(session.refresh_token_matches(&r1));

        let later = start + Duration::minutes(1);
        let (t2, r2) = session.rotate(later);
        assert_ne!(t1, t2);
        assert_ne!(r1, r2);
        assert!(!session.token_matches(Some(&t1)));
        assert!(!session.refresh_token_matches(&r1));
        assert_eq!(session.last_login, later);
    }

    #[test]
    fn test_reset_keeps_device_unless_forced() {
        let now = Utc::now();
        let mut session = Session::new(UserId::new(), Some(mac()), now);
        session.rotate(now);

        session.reset(false);
        assert!(!session.is_logged_in());
        assert!(session.refresh_token.is_none());
        assert!(session.mac_address.is_some());

        session.reset(true);
        assert!(session.mac_address.is_none());
    }

    #[test]
    fn test_token_matches_none_with_none() {
        let session = Session::new(UserId::new(), None, Utc::now());
        assert!(session.token_matches(None));
        assert!(!session.token_matches(Some("abc")));
    }

    #[test]
    fn test_is_expired() {
        let start = Utc::now();
        let session = Session::new(UserId::new(), None, start);
        let period = Duration::hours(24);

        assert!(!session.is_expired(start + Duration::hours(24), period));
        assert!(session.is_expired(start + Duration::hours(24) + Duration::seconds(1), period));
    }
}
