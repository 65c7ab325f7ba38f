//! Password Use Cases
//!
//! Forgotten password (reset by emailed code) and password change for a
//! signed-in user.

use std::sync::Arc;

use platform::clock::Clock;
use platform::password::{ClearTextPassword, HashedPassword, PasswordPolicy};

use crate::application::config::IdentityConfig;
use crate::application::token_generator::TokenGenerator;
use crate::application::token_validator::TokenValidator;
use crate::application::user_validator::UserValidator;
use crate::application::verification_sender::{VerificationMessage, VerificationSender};
use crate::domain::repository::{AccountRepository, SessionRepository, VerificationTokenStore};
use crate::domain::value_object::{UserId, email::Email, token_type::TokenType};
use crate::error::{FieldErrors, IdentityError, IdentityResult};

/// Normalize `raw` and apply `policy`, recording violations under `field`
pub(crate) fn policy_checked(
    raw: String,
    policy: &PasswordPolicy,
    field: &str,
    errors: &mut FieldErrors,
) -> Option<ClearTextPassword> {
    match ClearTextPassword::new(raw, policy) {
        Ok(password) => Some(password),
        Err(violations) => {
            for violation in violations {
                errors.add(field, violation.to_string());
            }
            None
        }
    }
}

pub(crate) fn hash_password(
    password: &ClearTextPassword,
    pepper: Option<&[u8]>,
) -> IdentityResult<HashedPassword> {
    password
        .hash(pepper)
        .map_err(|e| IdentityError::Internal(e.to_string()))
}

/// Password reset input
pub struct ResetPasswordInput {
    pub email: String,
    pub code: String,
    pub new_password: String,
}

/// Password change input
pub struct ChangePasswordInput {
    pub current_password: String,
    pub new_password: String,
}

pub struct PasswordUseCase<R, S>
where
    R: AccountRepository + SessionRepository,
    S: VerificationTokenStore,
{
    repo: Arc<R>,
    store: Arc<S>,
    sender: Arc<dyn VerificationSender>,
    clock: Arc<dyn Clock>,
    config: Arc<IdentityConfig>,
}

impl<R, S> PasswordUseCase<R, S>
where
    R: AccountRepository + SessionRepository,
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

    /// Send a reset code; unknown addresses are ignored
    pub async fn forgot(&self, email: String) -> IdentityResult<()> {
        let email = Email::new(email)?;
        let Some(account) = self.repo.find_by_email(&email).await? else {
            tracing::debug!("Password reset requested for unknown email");
            return Ok(());
        };

        let generated = TokenGenerator::new(self.store.clone(), self.clock.clone(), self.config.clone())
            .generate_password_reset_token(&account);
        let token = match generated {
            Ok(token) => token,
            // Same answer as for an unknown address
            Err(IdentityError::TooSoonForNewToken) => {
                tracing::debug!(user_id = %account.user_id, "Password reset requested inside cooldown");
                return Ok(());
            }
            Err(err) => return Err(err),
        };
        self.sender
            .dispatch(VerificationMessage::for_token(&token, account.email.as_str()));

        tracing::info!(user_id = %account.user_id, "Password reset requested");
        Ok(())
    }

    /// Replace the password using an emailed code, then log the user out
    pub async fn reset(&self, input: ResetPasswordInput) -> IdentityResult<()> {
        let mut errors = FieldErrors::new();
        let email = errors.check(Email::new(input.email));
        let password = policy_checked(
            input.new_password,
            &self.config.password_policy,
            "newPassword",
            &mut errors,
        );
        errors.into_result()?;
        let (Some(email), Some(password)) = (email, password) else {
            return Err(IdentityError::Internal(
                "validated reset fields missing".to_string(),
            ));
        };

        let mut account = self
            .repo
            .find_by_email(&email)
            .await?
            .ok_or(IdentityError::InvalidVerificationCode)?;

        TokenValidator::new(self.store.clone(), self.clock.clone(), self.config.clone())
            .validate(TokenType::ResetPassword, &account.user_id, &input.code)
            .ok_or(IdentityError::InvalidVerificationCode)?;

        let now = self.clock.now();
        account.set_password(hash_password(&password, self.config.pepper())?, now);
        account.reset_failures(now);
        self.repo.update(&account).await?;

        UserValidator::new(self.repo.clone(), self.clock.clone(), self.config.clone())
            .reset_user_session(&account.user_id, false)
            .await?;

        tracing::info!(user_id = %account.user_id, "Password reset");
        Ok(())
    }

    pub async fn change(&self, user_id: &UserId, input: ChangePasswordInput) -> IdentityResult<()> {
        let mut account = self
            .repo
            .find_by_id(user_id)
            .await?
            .ok_or(IdentityError::AccountNotFound)?;

        let current = ClearTextPassword::for_verification(input.current_password);
        if !account.password_hash.verify(&current, self.config.pepper()) {
            return Err(IdentityError::invalid(
                "currentPassword",
                "Current password is incorrect",
            ));
        }

        let mut errors = FieldErrors::new();
        let password = policy_checked(
            input.new_password,
            &self.config.password_policy,
            "newPassword",
            &mut errors,
        );
        errors.into_result()?;
        let Some(password) = password else {
            return Err(IdentityError::Internal(
                "validated password missing".to_string(),
            ));
        };

        account.set_password(hash_password(&password, self.config.pepper())?, self.clock.now());
        self.repo.update(&account).await?;

        tracing::info!(user_id = %account.user_id, "Password changed");
        Ok(())
    }
}
