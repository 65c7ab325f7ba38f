//! Identity Error Types
//!
//! Identity-specific error variants that integrate with the unified
//! `kernel::error::AppError` system.

use std::collections::BTreeMap;

use axum::response::{IntoResponse, Response};
use kernel::error::{
    app_error::{AppError, AppResult},
    conversions::classify_sqlx,
    kind::ErrorKind,
};
use thiserror::Error;

/// Identity-specific result type alias
pub type IdentityResult<T> = Result<T, IdentityError>;

/// Identity-specific error variants
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Account not found")]
    AccountNotFound,

    #[error("User name is already taken")]
    UserNameTaken,

    #[error("Email is already taken")]
    EmailTaken,

    /// Wrong identifier or password
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Too many failed sign-in attempts
    #[error("Account is temporarily locked")]
    AccountLocked,

    #[error("Email address is not confirmed")]
    EmailNotConfirmed,

    #[error("Phone number is not confirmed")]
    PhoneNumberNotConfirmed,

    #[error("Email address is already confirmed")]
    EmailAlreadyConfirmed,

    #[error("Phone number is already confirmed")]
    PhoneNumberAlreadyConfirmed,

    #[error("Account has no phone number")]
    PhoneNumberRequired,

    #[error("This country's phone numbers aren't supported")]
    UnsupportedPhoneNumber,

    /// A live session exists and new logins are not allowed to replace it
    #[error("User is already logged in")]
    AlreadyLoggedIn,

    /// Missing or malformed MAC address, or a different device than the session's
    #[error("Unauthorized device")]
    UnauthorizedDevice,

    /// Presented session token does not match the stored one
    #[error("Unauthorized")]
    Unauthorized,

    /// Missing, malformed, or expired bearer token
    #[error("Invalid or expired access token")]
    InvalidAccessToken,

    #[error("Invalid refresh token")]
    InvalidRefreshToken,

    #[error("Session has expired")]
    SessionExpired,

    #[error("Invalid or expired verification code")]
    InvalidVerificationCode,

    /// A code of the same type was issued too recently
    #[error("Too soon to request a new code")]
    TooSoonForNewToken,

    #[error("Insufficient role")]
    Forbidden,

    /// Field-level input validation failures
    #[error("Validation failed")]
    Validation(BTreeMap<String, Vec<String>>),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IdentityError {
    /// Single-field validation error
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = BTreeMap::new();
        errors.insert(field.into(), vec![message.into()]);
        IdentityError::Validation(errors)
    }

    /// Get the ErrorKind for this error
    pub fn kind(&self) -> ErrorKind {
        use IdentityError::*;
        match self {
            AccountNotFound => ErrorKind::NotFound,
            UserNameTaken | EmailTaken => ErrorKind::Conflict,
            InvalidCredentials
            | Unauthorized
            | InvalidAccessToken
            | InvalidRefreshToken
            | SessionExpired => ErrorKind::Unauthorized,
            AccountLocked => ErrorKind::Locked,
            EmailNotConfirmed | PhoneNumberNotConfirmed | Forbidden => ErrorKind::Forbidden,
            EmailAlreadyConfirmed
            | PhoneNumberAlreadyConfirmed
            | PhoneNumberRequired
            | UnsupportedPhoneNumber
            | AlreadyLoggedIn
            | UnauthorizedDevice
            | InvalidVerificationCode => ErrorKind::BadRequest,
            TooSoonForNewToken => ErrorKind::TooManyRequests,
            Validation(_) => ErrorKind::UnprocessableEntity,
            Database(e) => classify_sqlx(e).0,
            Internal(_) => ErrorKind::InternalServerError,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        self.kind().status_code()
    }

    /// Convert to AppError
    pub fn to_app_error(&self) -> AppError {
        match self {
            IdentityError::Validation(errors) => errors.iter().fold(
                AppError::new(ErrorKind::UnprocessableEntity, self.to_string()),
                |acc, (field, messages)| {
                    messages
                        .iter()
                        .fold(acc, |acc, m| acc.with_field_error(field.clone(), m.clone()))
                },
            ),
            IdentityError::AccountLocked => {
                AppError::new(self.kind(), self.to_string()).with_action("Try again later")
            }
            IdentityError::AlreadyLoggedIn => AppError::new(self.kind(), self.to_string())
                .with_action("Sign out from the other session first"),
            IdentityError::Database(e) => {
                let (kind, message) = classify_sqlx(e);
                AppError::new(kind, message)
            }
            _ => AppError::new(self.kind(), self.to_string()),
        }
    }

    /// Log the error with appropriate level
    fn log(&self) {
        match self {
            IdentityError::Database(e) => {
                tracing::error!(error = %e, "Identity database error");
            }
            IdentityError::Internal(msg) => {
                tracing::error!(message = %msg, "Identity internal error");
            }
            IdentityError::InvalidCredentials => {
                tracing::warn!("Invalid login attempt");
            }
            IdentityError::AccountLocked => {
                tracing::warn!("Login attempt on locked account");
            }
            IdentityError::UnauthorizedDevice => {
                tracing::warn!("Request from unauthorized device");
            }
            IdentityError::Unauthorized | IdentityError::InvalidRefreshToken => {
                tracing::warn!(error = %self, "Session token rejected");
            }
            _ => {
                tracing::debug!(error = %self, "Identity error");
            }
        }
    }
}

// ============================================================================
// Field error collection
// ============================================================================

/// Collects field errors across several input checks
///
/// Lets a use case report every invalid field at once instead of stopping
/// at the first one.
#[derive(Debug, Default)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    /// Keep the value, or record the error's field messages
    pub fn check<T>(&mut self, result: AppResult<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                if err.field_errors().is_empty() {
                    self.add("", err.message());
                }
                for (field, messages) in err.field_errors() {
                    for message in messages {
                        self.add(field.clone(), message.clone());
                    }
                }
                None
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `Validation` error when anything was recorded
    pub fn into_result(self) -> IdentityResult<()> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(IdentityError::Validation(self.0))
        }
    }
}

impl IntoResponse for IdentityError {
    fn into_response(self) -> Response {
        self.log();
        self.to_app_error().into_response()
    }
}

impl From<AppError> for IdentityError {
    fn from(err: AppError) -> Self {
        if err.kind() == ErrorKind::UnprocessableEntity {
            return IdentityError::Validation(err.field_errors().clone());
        }
        IdentityError::Internal(err.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for IdentityError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        IdentityError::Internal(format!("JWT error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(IdentityError::AlreadyLoggedIn.status_code(), 400);
        assert_eq!(IdentityError::UnauthorizedDevice.status_code(), 400);
        assert_eq!(IdentityError::Unauthorized.status_code(), 401);
        assert_eq!(IdentityError::AccountLocked.status_code(), 423);
        assert_eq!(IdentityError::TooSoonForNewToken.status_code(), 429);
        assert_eq!(IdentityError::UserNameTaken.status_code(), 409);
        assert_eq!(
            IdentityError::Internal("boom".into()).status_code(),
            500
        );
        assert_eq!(
            IdentityError::Database(sqlx::Error::PoolTimedOut).status_code(),
            503
        );
    }

    #[test]
    fn test_validation_carries_field_errors() {
        let err = IdentityError::invalid("email", "Invalid email format");
        let app = err.to_app_error();
        assert_eq!(app.status_code(), 422);
        assert_eq!(app.field_errors()["email"], vec!["Invalid email format"]);
    }

    #[test]
    fn test_field_errors_collects_across_checks() {
        let mut errors = FieldErrors::new();
        let ok: AppResult<u8> = Ok(1);
        assert_eq!(errors.check(ok), Some(1));
        assert!(errors.is_empty());

        let bad: AppResult<u8> = Err(AppError::validation("userName", "too short"));
        assert_eq!(errors.check(bad), None);
        errors.add("password", "Password must contain a digit");

        match errors.into_result() {
            Err(IdentityError::Validation(map)) => {
                assert_eq!(map["userName"], vec!["too short"]);
                assert_eq!(map["password"].len(), 1);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_from_app_validation_error() {
        let app = AppError::validation("userName", "too short");
        let err = IdentityError::from(app);
        assert!(matches!(err, IdentityError::Validation(ref m) if m.contains_key("userName")));
    }
}
