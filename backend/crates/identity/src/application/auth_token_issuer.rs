//! Auth Token Issuer
//!
//! Rotates the user's session and wraps the new session token in a signed
//! HS512 access token (JWT). The session token travels in the `token`
//! claim so every request can be checked against the stored session.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use platform::clock::Clock;
use serde::{Deserialize, Serialize};

use crate::application::config::IdentityConfig;
use crate::application::user_validator::UserValidator;
use crate::domain::entity::account::Account;
use crate::domain::repository::SessionRepository;
use crate::domain::value_object::{UserId, user_role::UserRole};
use crate::error::{IdentityError, IdentityResult};

/// Access token claims
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    /// User name
    pub name: String,
    pub email: String,
    /// Session token
    pub token: String,
    pub created: DateTime<Utc>,
    pub roles: Vec<String>,
    pub iss: String,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn user_id(&self) -> IdentityResult<UserId> {
        self.sub
            .parse()
            .map_err(|_| IdentityError::InvalidAccessToken)
    }

    /// Known roles; unknown codes are skipped
    pub fn user_roles(&self) -> Vec<UserRole> {
        self.roles
            .iter()
            .filter_map(|code| UserRole::from_code(code))
            .collect()
    }
}

/// Issued credentials
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    /// Signed access token
    pub token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

pub struct AuthTokenIssuer<R>
where
    R: SessionRepository,
{
    validator: UserValidator<R>,
    clock: Arc<dyn Clock>,
    config: Arc<IdentityConfig>,
}

impl<R> AuthTokenIssuer<R>
where
    R: SessionRepository,
{
    pub fn new(repo: Arc<R>, clock: Arc<dyn Clock>, config: Arc<IdentityConfig>) -> Self {
        Self {
            validator: UserValidator::new(repo, clock.clone(), config.clone()),
            clock,
            config,
        }
    }

    /// Start a new session for `account` and sign it
    ///
    /// Fails when the session rules refuse the login.
    pub async fn issue(&self, account: &Account, device: Option<&str>) -> IdentityResult<AuthResponse> {
        let (token, refresh_token) = self
            .validator
            .login_user_session(&account.user_id, device)
            .await?;
        self.sign(account, token, refresh_token)
    }

    /// Exchange a refresh token for new credentials
    pub async fn refresh(
        &self,
        account: &Account,
        refresh_token: &str,
        device: Option<&str>,
    ) -> IdentityResult<AuthResponse> {
        let (token, refresh_token) = self
            .validator
            .refresh_user_session(&account.user_id, refresh_token, device)
            .await?;
        self.sign(account, token, refresh_token)
    }

    /// Verify signature, issuer and expiry
    pub fn decode(&self, jwt: &str) -> IdentityResult<Claims> {
        let mut validation = Validation::new(Algorithm::HS512);
        validation.set_issuer(&[self.config.jwt.issuer.as_str()]);
        // Expiry is checked against the injected clock below
        validation.validate_exp = false;

        let claims = decode::<Claims>(jwt, &DecodingKey::from_secret(&self.config.jwt.key), &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "Access token rejected");
                IdentityError::InvalidAccessToken
            })?;

        if claims.exp < self.clock.now().timestamp() {
            return Err(IdentityError::InvalidAccessToken);
        }
        Ok(claims)
    }

    fn sign(
        &self,
        account: &Account,
        token: String,
        refresh_token: String,
    ) -> IdentityResult<AuthResponse> {
        let now = self.clock.now();
        let expires_at = now + self.config.jwt.expiration_period;

        let claims = Claims {
            sub: account.user_id.to_string(),
            name: account.user_name.as_str().to_string(),
            email: account.email.as_str().to_string(),
            token,
            created: now,
            roles: vec![account.role.code().to_string()],
            iss: self.config.jwt.issuer.clone(),
            exp: expires_at.timestamp(),
            iat: now.timestamp(),
        };

        let jwt = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(&self.config.jwt.key),
        )?;

        Ok(AuthResponse {
            token: jwt,
            refresh_token,
            expires_at,
        })
    }
}
