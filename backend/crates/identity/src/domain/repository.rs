//! Repository Traits
//!
//! Interfaces for data persistence. Implementation is in infrastructure layer.

use chrono::{DateTime, Utc};

use crate::domain::entity::{account::Account, session::Session, verification_token::VerificationToken};
use crate::domain::value_object::{
    UserId, email::Email, token_type::TokenType, user_name::UserName,
};
use crate::error::IdentityResult;

/// Account repository trait
#[trait_variant::make(AccountRepository: Send)]
pub trait LocalAccountRepository {
    /// Create a new account
    ///
    /// Fails with `UserNameTaken` / `EmailTaken` when either is already used.
    async fn create(&self, account: &Account) -> IdentityResult<()>;

    async fn find_by_id(&self, user_id: &UserId) -> IdentityResult<Option<Account>>;

    /// Case-insensitive lookup
    async fn find_by_user_name(&self, user_name: &UserName) -> IdentityResult<Option<Account>>;

    async fn find_by_email(&self, email: &Email) -> IdentityResult<Option<Account>>;

    async fn exists_by_user_name(&self, user_name: &UserName) -> IdentityResult<bool>;

    async fn exists_by_email(&self, email: &Email) -> IdentityResult<bool>;

    async fn update(&self, account: &Account) -> IdentityResult<()>;
}

/// Session repository trait (one session per user)
#[trait_variant::make(SessionRepository: Send)]
pub trait LocalSessionRepository {
    async fn find_session(&self, user_id: &UserId) -> IdentityResult<Option<Session>>;

    /// Insert or replace the user's session
    async fn save_session(&self, session: &Session) -> IdentityResult<()>;

    /// Store `session` only if the stored token still equals `expected`
    ///
    /// A missing row counts as `expected == None`. Returns `false` and
    /// writes nothing when another writer changed the token first.
    async fn replace_session_if(
        &self,
        session: &Session,
        expected: Option<&str>,
    ) -> IdentityResult<bool>;
}

/// Process-local verification token store
///
/// Keyed by [`TokenType::cache_key`]. `update` runs its closure under the
/// entry's lock, so check-and-modify sequences are atomic per key.
pub trait VerificationTokenStore: Send + Sync {
    /// Insert, replacing any token of the same type for the same user
    fn insert(&self, token: VerificationToken);

    fn get(&self, token_type: TokenType, user_id: &UserId) -> Option<VerificationToken>;

    fn remove(&self, token_type: TokenType, user_id: &UserId);

    /// Atomically inspect and modify the slot for `(token_type, user_id)`
    ///
    /// Leaving `None` in the slot removes the entry.
    fn update<T>(
        &self,
        token_type: TokenType,
        user_id: &UserId,
        f: impl FnOnce(&mut Option<VerificationToken>) -> T,
    ) -> T;

    /// Drop expired entries; returns how many were removed
    fn purge_expired(&self, now: DateTime<Utc>) -> usize;
}
