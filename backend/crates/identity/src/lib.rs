//! Identity Backend Module
//!
//! Clean Architecture structure:
//! - `domain/` - Entities, value objects, repository traits
//! - `application/` - Use cases, token and session services, configuration
//! - `infra/` - PostgreSQL and in-memory stores, message senders
//! - `presentation/` - HTTP handlers, DTOs, router, bearer middleware
//!
//! ## Features
//! - Sign up with user name, email, password and optional phone number
//! - Sign in by user name or email, JWT access tokens plus refresh tokens
//! - Email and phone confirmation, email/phone change, password reset
//! - Short-lived verification codes with cooldown and try limits
//!
//! ## Session Model
//! - One server-side session per user, rotated on every sign in
//! - Optional single-login and single-device (`Mac-Address`) restrictions
//! - Lockout after repeated failed sign-in attempts

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;

// Re-exports for convenience
pub use application::config::IdentityConfig;
pub use error::{IdentityError, IdentityResult};
pub use infra::postgres::PgIdentityRepository;
pub use presentation::handlers::IdentityAppState;
pub use presentation::router::identity_router;

// Re-export kernel error types for unified error handling
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};

// Convenience re-exports
pub mod config {
    pub use crate::application::config::*;
}

pub mod models {
    pub use crate::domain::entity::*;
    pub use crate::domain::value_object::*;
    pub use crate::presentation::dto::*;
}

pub mod handlers {
    pub use crate::presentation::handlers::*;
}

pub mod store {
    pub use crate::infra::postgres::PgIdentityRepository as IdentityStore;
    pub use crate::infra::token_store::MemoryTokenStore;
}

pub mod router {
    pub use crate::presentation::router::*;
}

pub mod middleware {
    pub use crate::presentation::middleware::*;
}
