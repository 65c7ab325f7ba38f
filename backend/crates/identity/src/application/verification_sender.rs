//! Verification message delivery port
//!
//! Use cases hand every issued code to a [`VerificationSender`]. Delivery is
//! fire-and-forget: a sender enqueues or logs, it never fails the request.

use derive_more::Display;

use crate::domain::entity::verification_token::VerificationToken;
use crate::domain::value_object::{UserId, token_type::TokenType};

/// Delivery channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Channel {
    #[display("email")]
    Email,
    #[display("sms")]
    Sms,
}

impl Channel {
    pub fn for_token_type(token_type: TokenType) -> Self {
        if token_type.is_phone() {
            Channel::Sms
        } else {
            Channel::Email
        }
    }
}

/// A code on its way to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationMessage {
    pub user_id: UserId,
    pub token_type: TokenType,
    pub channel: Channel,
    /// Email address or phone number
    pub recipient: String,
    pub code: String,
}

impl VerificationMessage {
    /// Message carrying `token`'s code to `recipient`
    pub fn for_token(token: &VerificationToken, recipient: impl Into<String>) -> Self {
        Self {
            user_id: token.user_id,
            token_type: token.token_type,
            channel: Channel::for_token_type(token.token_type),
            recipient: recipient.into(),
            code: token.code.clone(),
        }
    }
}

pub trait VerificationSender: Send + Sync {
    fn dispatch(&self, message: VerificationMessage);
}
