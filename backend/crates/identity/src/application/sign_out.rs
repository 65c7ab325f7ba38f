//! Sign Out Use Case
//!
//! Clears the user's session token pair.

use std::sync::Arc;

use platform::clock::Clock;

use crate::application::config::IdentityConfig;
use crate::application::user_validator::UserValidator;
use crate::domain::repository::SessionRepository;
use crate::domain::value_object::UserId;
use crate::error::IdentityResult;

/// Sign out use case
pub struct SignOutUseCase<R>
where
    R: SessionRepository,
{
    validator: UserValidator<R>,
}

impl<R> SignOutUseCase<R>
where
    R: SessionRepository,
{
    pub fn new(repo: Arc<R>, clock: Arc<dyn Clock>, config: Arc<IdentityConfig>) -> Self {
        Self {
            validator: UserValidator::new(repo, clock, config),
        }
    }

    /// `forget_device` also unbinds the device from the session
    pub async fn execute(&self, user_id: &UserId, forget_device: bool) -> IdentityResult<()> {
        self.validator
            .reset_user_session(user_id, forget_device)
            .await?;

        tracing::info!(user_id = %user_id, forget_device, "User signed out");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::Harness;

    #[tokio::test]
    async fn test_sign_out_then_token_rejected() {
        let config = IdentityConfig {
            restrict_single_login: true,
            ..IdentityConfig::with_random_secret()
        };
        let h = Harness::new(config);
        let user_id = h.confirmed_user("jane", "jane@example.com", "password1").await;
        h.sign_in("jane", "password1", None).await.unwrap();
        let token = h.repo.find_session(&user_id).await.unwrap().unwrap().token.unwrap();

        SignOutUseCase::new(h.repo.clone(), h.clock.clone(), h.config.clone())
            .execute(&user_id, false)
            .await
            .unwrap();

        let validator = UserValidator::new(h.repo.clone(), h.clock.clone(), h.config.clone());
        assert!(!validator.verify_user_identity(&user_id, Some(&token), None).await);

        // Signed out, so a new login is allowed
        h.sign_in("jane", "password1", None).await.unwrap();
    }
}
