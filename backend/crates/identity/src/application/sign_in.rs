//! Sign In Use Case
//!
//! Authenticates a user, applies the session rules, and issues an access
//! token with a fresh session token pair.

use std::sync::Arc;

use platform::clock::Clock;
use platform::password::ClearTextPassword;

use crate::application::auth_token_issuer::{AuthResponse, AuthTokenIssuer};
use crate::application::config::IdentityConfig;
use crate::domain::entity::account::Account;
use crate::domain::repository::{AccountRepository, SessionRepository};
use crate::domain::value_object::{email::Email, user_name::UserName};
use crate::error::{IdentityError, IdentityResult};

/// Sign in input
pub struct SignInInput {
    /// User name or email
    pub identifier: String,
    pub password: String,
}

/// Sign in use case
pub struct SignInUseCase<R>
where
    R: AccountRepository + SessionRepository,
{
    repo: Arc<R>,
    clock: Arc<dyn Clock>,
    config: Arc<IdentityConfig>,
}

impl<R> SignInUseCase<R>
where
    R: AccountRepository + SessionRepository,
{
    pub fn new(repo: Arc<R>, clock: Arc<dyn Clock>, config: Arc<IdentityConfig>) -> Self {
        Self {
            repo,
            clock,
            config,
        }
    }

    /// `device` is the raw `Mac-Address` header value
    pub async fn execute(
        &self,
        input: SignInInput,
        device: Option<&str>,
    ) -> IdentityResult<AuthResponse> {
        let mut account = self
            .find_account(&input.identifier)
            .await?
            .ok_or(IdentityError::InvalidCredentials)?;

        let now = self.clock.now();
        if self.config.lockout_on_failure && account.is_locked_out(now) {
            return Err(IdentityError::AccountLocked);
        }

        let password = ClearTextPassword::for_verification(input.password);
        if !account.password_hash.verify(&password, self.config.pepper()) {
            if self.config.lockout_on_failure {
                let locked = account.record_failure(now);
                self.repo.update(&account).await?;
                if locked {
                    tracing::warn!(user_id = %account.user_id, "Account locked after repeated failures");
                }
            }
            return Err(IdentityError::InvalidCredentials);
        }

        if account.access_failed_count != 0 || account.lockout_end.is_some() {
            account.reset_failures(now);
            self.repo.update(&account).await?;
        }

        if self.config.require_confirmed_email && !account.email_confirmed {
            return Err(IdentityError::EmailNotConfirmed);
        }
        if self.config.require_confirmed_phone_number && !account.phone_number_confirmed {
            return Err(IdentityError::PhoneNumberNotConfirmed);
        }

        let response = AuthTokenIssuer::new(self.repo.clone(), self.clock.clone(), self.config.clone())
            .issue(&account, device)
            .await?;

        tracing::info!(user_id = %account.user_id, "User signed in");
        Ok(response)
    }

    /// Look up by email when the identifier contains `@`, by user name otherwise
    ///
    /// Malformed identifiers simply find nothing.
    async fn find_account(&self, identifier: &str) -> IdentityResult<Option<Account>> {
        let identifier = identifier.trim();
        if identifier.contains('@') {
            match Email::new(identifier) {
                Ok(email) => self.repo.find_by_email(&email).await,
                Err(_) => Ok(None),
            }
        } else {
            match UserName::new(identifier) {
                Ok(user_name) => self.repo.find_by_user_name(&user_name).await,
                Err(_) => Ok(None),
            }
        }
    }
}
