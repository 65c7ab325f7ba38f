//! Identity Middleware
//!
//! Bearer authentication for protected routes.

use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;
use platform::client::{extract_bearer, extract_mac_address};

use crate::application::{AuthTokenIssuer, UserValidator};
use crate::domain::repository::{AccountRepository, SessionRepository};
use crate::domain::value_object::{UserId, user_role::UserRole};
use crate::error::{IdentityError, IdentityResult};
use crate::presentation::handlers::IdentityAppState;

/// Authenticated caller, stored in request extensions
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user_id: UserId,
    pub roles: Vec<UserRole>,
}

impl CurrentUser {
    pub fn has_role(&self, role: UserRole) -> bool {
        self.roles.contains(&role)
    }

    /// Guard for handlers restricted to `role`
    pub fn require_role(&self, role: UserRole) -> IdentityResult<()> {
        if self.has_role(role) {
            Ok(())
        } else {
            Err(IdentityError::Forbidden)
        }
    }
}

/// Middleware that requires a valid access token
///
/// Decodes the bearer JWT, then checks its session token and the
/// `Mac-Address` header against the stored session.
pub async fn require_bearer<R>(
    State(state): State<IdentityAppState<R>>,
    mut req: Request<Body>,
    next: Next,
) -> IdentityResult<Response>
where
    R: AccountRepository + SessionRepository + Clone + Send + Sync + 'static,
{
    let headers = req.headers();
    let jwt = extract_bearer(headers).ok_or(IdentityError::InvalidAccessToken)?;
    let device = extract_mac_address(headers).map(str::to_string);

    let claims = AuthTokenIssuer::new(state.repo.clone(), state.clock.clone(), state.config.clone())
        .decode(jwt)?;
    let user_id = claims.user_id()?;

    UserValidator::new(state.repo.clone(), state.clock.clone(), state.config.clone())
        .validate_user_identity(&user_id, Some(&claims.token), device.as_deref())
        .await?;

    req.extensions_mut().insert(CurrentUser {
        user_id,
        roles: claims.user_roles(),
    });

    Ok(next.run(req).await)
}
