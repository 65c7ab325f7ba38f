//! Verification Token Validator
//!
//! Checks a presented code against the stored entry for `(type, user)`.
//! Every wrong attempt counts; an entry that is expired or out of tries is
//! dropped on the next access. The check runs under the store's per-key
//! lock.

use std::sync::Arc;

use platform::clock::Clock;

use crate::application::config::IdentityConfig;
use crate::domain::entity::verification_token::VerificationToken;
use crate::domain::repository::VerificationTokenStore;
use crate::domain::value_object::{UserId, token_type::TokenType};

pub struct TokenValidator<S>
where
    S: VerificationTokenStore,
{
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    config: Arc<IdentityConfig>,
}

impl<S> TokenValidator<S>
where
    S: VerificationTokenStore,
{
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>, config: Arc<IdentityConfig>) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }

    /// Check the code without consuming the entry
    pub fn verify(&self, token_type: TokenType, user_id: &UserId, code: &str) -> bool {
        self.check(token_type, user_id, code, false).is_some()
    }

    /// Check the code and consume the entry on success
    pub fn validate(
        &self,
        token_type: TokenType,
        user_id: &UserId,
        code: &str,
    ) -> Option<VerificationToken> {
        self.check(token_type, user_id, code, true)
    }

    fn check(
        &self,
        token_type: TokenType,
        user_id: &UserId,
        code: &str,
        consume: bool,
    ) -> Option<VerificationToken> {
        let now = self.clock.now();
        let max_tries = self.config.max_token_tries;

        self.store.update(token_type, user_id, |slot| {
            let mut entry = slot.take()?;

            if entry.is_expired(now) || entry.is_exhausted(max_tries) {
                tracing::debug!(
                    user_id = %user_id,
                    token_type = %token_type,
                    "Verification token discarded"
                );
                return None;
            }

            if entry.matches(code) {
                if !consume {
                    *slot = Some(entry.clone());
                }
                return Some(entry);
            }

            entry.number_of_tries += 1;
            tracing::debug!(
                user_id = %user_id,
                token_type = %token_type,
                tries = entry.number_of_tries,
                "Verification code mismatch"
            );
            *slot = Some(entry);
            None
        })
    }
}
