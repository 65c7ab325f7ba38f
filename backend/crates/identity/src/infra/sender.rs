//! Verification message delivery
//!
//! Email and SMS providers are outside this service. `TracingSender`
//! writes each message to the log; `RecordingSender` keeps them for tests.

use std::sync::Mutex;

use crate::application::verification_sender::{VerificationMessage, VerificationSender};

/// Logs messages instead of delivering them
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSender;

impl VerificationSender for TracingSender {
    fn dispatch(&self, message: VerificationMessage) {
        tracing::info!(
            user_id = %message.user_id,
            token_type = %message.token_type,
            channel = %message.channel,
            "Verification code dispatched"
        );
        // Codes are secrets; only visible with debug logging on
        tracing::debug!(
            recipient = %message.recipient,
            code = %message.code,
            "Verification code"
        );
    }
}

/// Keeps dispatched messages in memory
#[derive(Debug, Default)]
pub struct RecordingSender {
    messages: Mutex<Vec<VerificationMessage>>,
}

impl RecordingSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// All messages dispatched so far
    pub fn messages(&self) -> Vec<VerificationMessage> {
        self.messages
            .lock()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    /// Most recent message, if any
    pub fn last(&self) -> Option<VerificationMessage> {
        self.messages.lock().ok().and_then(|m| m.last().cloned())
    }
}

impl VerificationSender for RecordingSender {
    fn dispatch(&self, message: VerificationMessage) {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(message);
        }
    }
}
