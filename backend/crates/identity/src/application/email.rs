//! Email Use Cases
//!
//! Email confirmation (anonymous, by address) and email change (signed in,
//! code sent to the new address).

use std::sync::Arc;

use platform::clock::Clock;

use crate::application::config::IdentityConfig;
use crate::application::token_generator::TokenGenerator;
use crate::application::token_validator::TokenValidator;
use crate::application::verification_sender::{VerificationMessage, VerificationSender};
use crate::domain::entity::account::Account;
use crate::domain::repository::{AccountRepository, VerificationTokenStore};
use crate::domain::value_object::{UserId, email::Email, token_type::TokenType};
use crate::error::{IdentityError, IdentityResult};

pub struct EmailUseCase<R, S>
where
    R: AccountRepository,
    S: VerificationTokenStore,
{
    repo: Arc<R>,
    store: Arc<S>,
    sender: Arc<dyn VerificationSender>,
    clock: Arc<dyn Clock>,
    config: Arc<IdentityConfig>,
}

impl<R, S> EmailUseCase<R, S>
where
    R: AccountRepository,
    S: VerificationTokenStore,
{
    pub fn new(
        repo: Arc<R>,
        store: Arc<S>,
        sender: Arc<dyn VerificationSender>,
        clock: Arc<dyn Clock>,
        config: Arc<IdentityConfig>,
    ) -> Self {
        Self {
            repo,
            store,
            sender,
            clock,
            config,
        }
    }

    fn generator(&self) -> TokenGenerator<S> {
        TokenGenerator::new(self.store.clone(), self.clock.clone(), self.config.clone())
    }

    fn validator(&self) -> TokenValidator<S> {
        TokenValidator::new(self.store.clone(), self.clock.clone(), self.config.clone())
    }

    async fn account(&self, user_id: &UserId) -> IdentityResult<Account> {
        self.repo
            .find_by_id(user_id)
            .await?
            .ok_or(IdentityError::AccountNotFound)
    }

    /// Send a confirmation code
    ///
    /// Unknown, already confirmed and cooling-down addresses all succeed
    /// without sending anything, so callers cannot tell them apart.
    pub async fn request_confirmation(&self, email: String) -> IdentityResult<()> {
        let email = Email::new(email)?;
        let Some(account) = self.repo.find_by_email(&email).await? else {
            tracing::debug!("Email confirmation requested for unknown email");
            return Ok(());
        };
        if account.email_confirmed {
            tracing::debug!(user_id = %account.user_id, "Email confirmation requested for confirmed email");
            return Ok(());
        }

        let token = match self.generator().generate_email_confirmation_token(&account) {
            Ok(token) => token,
            Err(IdentityError::TooSoonForNewToken) => {
                tracing::debug!(user_id = %account.user_id, "Email confirmation requested inside cooldown");
                return Ok(());
            }
            Err(err) => return Err(err),
        };
        self.sender
            .dispatch(VerificationMessage::for_token(&token, account.email.as_str()));
        Ok(())
    }

    pub async fn confirm(&self, email: String, code: &str) -> IdentityResult<()> {
        let email = Email::new(email)?;
        let mut account = self
            .repo
            .find_by_email(&email)
            .await?
            .ok_or(IdentityError::InvalidVerificationCode)?;
        if account.email_confirmed {
            return Err(IdentityError::EmailAlreadyConfirmed);
        }

        self.validator()
            .validate(TokenType::ConfirmEmail, &account.user_id, code)
            .ok_or(IdentityError::InvalidVerificationCode)?;

        account.confirm_email(self.clock.now());
        self.repo.update(&account).await?;

        tracing::info!(user_id = %account.user_id, "Email confirmed");
        Ok(())
    }

    /// Send a change code to `new_email`
    pub async fn request_change(&self, user_id: &UserId, new_email: String) -> IdentityResult<()> {
        let account = self.account(user_id).await?;
        let new_email = Email::parse(new_email, "newEmail")?;

        if new_email == account.email {
            return Err(IdentityError::invalid(
                "newEmail",
                "New email must differ from the current one",
            ));
        }
        if self.repo.exists_by_email(&new_email).await? {
            return Err(IdentityError::EmailTaken);
        }

        let token = self
            .generator()
            .generate_change_email_token(&account, &new_email)?;
        self.sender
            .dispatch(VerificationMessage::for_token(&token, new_email.as_str()));
        Ok(())
    }

    /// Replace the email with the one the code was sent to
    pub async fn confirm_change(&self, user_id: &UserId, code: &str) -> IdentityResult<()> {
        let mut account = self.account(user_id).await?;
        let validator = self.validator();
        if !validator.verify(TokenType::ChangeEmail, user_id, code) {
            return Err(IdentityError::InvalidVerificationCode);
        }

        // A taken address must not use up the code
        let pending = self
            .store
            .get(TokenType::ChangeEmail, user_id)
            .and_then(|token| token.extra_data)
            .map(Email::from_db)
            .ok_or(IdentityError::InvalidVerificationCode)?;
        if self.repo.exists_by_email(&pending).await? {
            return Err(IdentityError::EmailTaken);
        }

        let token = validator
            .validate(TokenType::ChangeEmail, user_id, code)
            .ok_or(IdentityError::InvalidVerificationCode)?;
        let new_email = token
            .extra_data
            .map(Email::from_db)
            .ok_or_else(|| IdentityError::Internal("change email token without address".to_string()))?;

        account.change_email(new_email, self.clock.now());
        self.repo.update(&account).await?;

        tracing::info!(user_id = %account.user_id, "Email changed");
        Ok(())
    }
}
