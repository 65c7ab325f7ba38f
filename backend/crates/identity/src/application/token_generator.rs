//! Verification Token Generator
//!
//! Issues the codes behind email confirmation, email change, password
//! reset and phone number flows. A new code for the same `(type, user)`
//! replaces the old one, but not before the reset period has passed.

use std::sync::Arc;

use platform::clock::Clock;
use platform::crypto::{numeric_code, random_url_token};

use crate::application::config::IdentityConfig;
use crate::domain::entity::{account::Account, verification_token::VerificationToken};
use crate::domain::repository::VerificationTokenStore;
use crate::domain::value_object::{
    UserId, email::Email, phone_number::PhoneNumber, token_type::TokenType,
};
use crate::error::{IdentityError, IdentityResult};

/// Long token size in random bytes (before base64)
pub const LONG_TOKEN_BYTES: usize = 64;

pub struct TokenGenerator<S>
where
    S: VerificationTokenStore,
{
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    config: Arc<IdentityConfig>,
}

impl<S> TokenGenerator<S>
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

    pub fn generate_email_confirmation_token(
        &self,
        account: &Account,
    ) -> IdentityResult<VerificationToken> {
        self.generate(account.user_id, TokenType::ConfirmEmail, None)
    }

    pub fn generate_change_email_token(
        &self,
        account: &Account,
        new_email: &Email,
    ) -> IdentityResult<VerificationToken> {
        self.generate(
            account.user_id,
            TokenType::ChangeEmail,
            Some(new_email.as_str().to_string()),
        )
    }

    pub fn generate_password_reset_token(
        &self,
        account: &Account,
    ) -> IdentityResult<VerificationToken> {
        self.generate(account.user_id, TokenType::ResetPassword, None)
    }

    pub fn generate_phone_number_confirmation_token(
        &self,
        account: &Account,
    ) -> IdentityResult<VerificationToken> {
        self.generate(account.user_id, TokenType::ConfirmPhoneNumber, None)
    }

    pub fn generate_change_phone_number_token(
        &self,
        account: &Account,
        phone_number: &PhoneNumber,
    ) -> IdentityResult<VerificationToken> {
        self.generate(
            account.user_id,
            TokenType::ChangePhoneNumber,
            Some(phone_number.as_str().to_string()),
        )
    }

    fn generate(
        &self,
        user_id: UserId,
        token_type: TokenType,
        extra_data: Option<String>,
    ) -> IdentityResult<VerificationToken> {
        let config = &self.config;
        let now = self.clock.now();

        let long_token = random_url_token(LONG_TOKEN_BYTES);
        let (code, long_token) =
            if config.numeric_verification_token || token_type.is_phone() {
                (numeric_code(config.numeric_token_length), Some(long_token))
            } else {
                (long_token, None)
            };

        let token = VerificationToken {
            user_id,
            token_type,
            code,
            long_token,
            number_of_tries: 0,
            expires_at: now + config.token_expiration_period,
            extra_data,
        };

        self.store.update(token_type, &user_id, |slot| {
            if let Some(previous) = slot.as_ref() {
                if previous.is_live(now, config.max_token_tries)
                    && previous.issued_within(
                        now,
                        config.token_reset_period,
                        config.token_expiration_period,
                    )
                {
                    return Err(IdentityError::TooSoonForNewToken);
                }
            }
            *slot = Some(token.clone());
            Ok(())
        })?;

        tracing::debug!(
            user_id = %user_id,
            token_type = %token_type,
            expires_at = %token.expires_at,
            "Verification token issued"
        );
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::token_store::MemoryTokenStore;
    use chrono::{Duration, Utc};
    use platform::clock::ManualClock;
    use platform::password::ClearTextPassword;

    use crate::domain::value_object::user_name::UserName;

    fn account() -> Account {
        let hash = ClearTextPassword::for_verification("password1".to_string())
            .hash(None)
            .unwrap();
        Account::new(
            UserName::new("jane").unwrap(),
            Email::new("jane@example.com").unwrap(),
            None,
            hash,
            Utc::now(),
        )
    }

    fn generator(
        config: IdentityConfig,
    ) -> (Arc<MemoryTokenStore>, Arc<ManualClock>, TokenGenerator<MemoryTokenStore>) {
        let store = Arc::new(MemoryTokenStore::new());
        let clock = Arc::new(ManualClock::starting_now());
        let generator = TokenGenerator::new(store.clone(), clock.clone(), Arc::new(config));
        (store, clock, generator)
    }

    #[test]
    fn test_long_token_by_default() {
        let (store, clock, generator) = generator(IdentityConfig::default());
        let account = account();

        let token = generator.generate_email_confirmation_token(&account).unwrap();
        assert!(token.code.len() > 64);
        assert!(token.long_token.is_none());
        assert_eq!(token.expires_at, clock.now() + Duration::minutes(60));
        assert_eq!(
            store.get(TokenType::ConfirmEmail, &account.user_id),
            Some(token)
        );
    }

    #[test]
    fn test_numeric_code_when_enabled() {
        let config = IdentityConfig {
            numeric_verification_token: true,
            numeric_token_length: 8,
            ..IdentityConfig::default()
        };
        let (_, _, generator) = generator(config);

        let token = generator.generate_password_reset_token(&account()).unwrap();
        assert_eq!(token.code.len(), 8);
        assert!(token.code.chars().all(|c| c.is_ascii_digit()));
        assert!(token.long_token.is_some());
    }

    #[test]
    fn test_phone_flows_always_numeric() {
        let (_, _, generator) = generator(IdentityConfig::default());
        let account = account();
        let phone = PhoneNumber::parse("+20 1012345678", &[]).unwrap();

        let confirm = generator
            .generate_phone_number_confirmation_token(&account)
            .unwrap();
        assert_eq!(confirm.code.len(), 6);
        assert!(confirm.code.chars().all(|c| c.is_ascii_digit()));

        let change = generator
            .generate_change_phone_number_token(&account, &phone)
            .unwrap();
        assert_eq!(change.extra_data.as_deref(), Some("+20 1012345678"));
        assert!(change.code.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_change_email_carries_new_address() {
        let (_, _, generator) = generator(IdentityConfig::default());
        let new_email = Email::new("new@example.com").unwrap();

        let token = generator
            .generate_change_email_token(&account(), &new_email)
            .unwrap();
        assert_eq!(token.token_type, TokenType::ChangeEmail);
        assert_eq!(token.extra_data.as_deref(), Some("new@example.com"));
    }

    #[test]
    fn test_cooldown_rejects_reissue_inside_reset_period() {
        let (store, clock, generator) = generator(IdentityConfig::default());
        let account = account();

        let first = generator.generate_email_confirmation_token(&account).unwrap();

        clock.advance(Duration::minutes(4));
        let err = generator
            .generate_email_confirmation_token(&account)
            .unwrap_err();
        assert!(matches!(err, IdentityError::TooSoonForNewToken));
        // The first token is untouched
        assert_eq!(store.get(TokenType::ConfirmEmail, &account.user_id), Some(first.clone()));

        clock.advance(Duration::minutes(1) + Duration::seconds(1));
        let second = generator.generate_email_confirmation_token(&account).unwrap();
        assert_ne!(first.code, second.code);
    }

    #[test]
    fn test_cooldown_is_per_token_type() {
        let (_, _, generator) = generator(IdentityConfig::default());
        let account = account();

        generator.generate_email_confirmation_token(&account).unwrap();
        generator.generate_password_reset_token(&account).unwrap();
    }

    #[test]
    fn test_exhausted_token_can_be_reissued_immediately() {
        let (store, _, generator) = generator(IdentityConfig::default());
        let account = account();

        generator.generate_password_reset_token(&account).unwrap();
        store.update(TokenType::ResetPassword, &account.user_id, |slot| {
            if let Some(token) = slot.as_mut() {
                token.number_of_tries = 5;
            }
        });

        generator.generate_password_reset_token(&account).unwrap();
        let token = store
            .get(TokenType::ResetPassword, &account.user_id)
            .unwrap();
        assert_eq!(token.number_of_tries, 0);
    }
}
