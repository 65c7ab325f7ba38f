//! Application Layer
//!
//! Use cases and application services.

pub mod auth_token_issuer;
pub mod config;
pub mod current_user;
pub mod email;
pub mod password;
pub mod phone;
pub mod refresh;
pub mod sign_in;
pub mod sign_out;
pub mod sign_up;
pub mod token_generator;
pub mod token_validator;
pub mod user_validator;
pub mod verification_sender;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports
pub use auth_token_issuer::{AuthResponse, AuthTokenIssuer, Claims};
pub use config::{ConfigError, IdentityConfig, JwtConfig};
pub use current_user::CurrentUserUseCase;
pub use email::EmailUseCase;
pub use password::{ChangePasswordInput, PasswordUseCase, ResetPasswordInput};
pub use phone::PhoneUseCase;
pub use refresh::{RefreshInput, RefreshUseCase};
pub use sign_in::{SignInInput, SignInUseCase};
pub use sign_out::SignOutUseCase;
pub use sign_up::{SignUpInput, SignUpOutput, SignUpUseCase};
pub use token_generator::TokenGenerator;
pub use token_validator::TokenValidator;
pub use user_validator::UserValidator;
pub use verification_sender::{Channel, VerificationMessage, VerificationSender};
