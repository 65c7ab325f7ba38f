//! Refresh Use Case
//!
//! Exchanges a refresh token for a new access token and token pair.

use std::sync::Arc;

use platform::clock::Clock;

use crate::application::auth_token_issuer::{AuthResponse, AuthTokenIssuer};
use crate::application::config::IdentityConfig;
use crate::domain::repository::{AccountRepository, SessionRepository};
use crate::domain::value_object::UserId;
use crate::error::{IdentityError, IdentityResult};

/// Refresh input
pub struct RefreshInput {
    pub user_id: UserId,
    pub refresh_token: String,
}

pub struct RefreshUseCase<R>
where
    R: AccountRepository + SessionRepository,
{
    repo: Arc<R>,
    clock: Arc<dyn Clock>,
    config: Arc<IdentityConfig>,
}

impl<R> RefreshUseCase<R>
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

    pub async fn execute(
        &self,
        input: RefreshInput,
        device: Option<&str>,
    ) -> IdentityResult<AuthResponse> {
        let account = self
            .repo
            .find_by_id(&input.user_id)
            .await?
            .ok_or(IdentityError::InvalidRefreshToken)?;

        let response = AuthTokenIssuer::new(self.repo.clone(), self.clock.clone(), self.config.clone())
            .refresh(&account, &input.refresh_token, device)
            .await?;

        tracing::debug!(user_id = %account.user_id, "Access token refreshed");
        Ok(response)
    }
}
