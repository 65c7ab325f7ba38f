//! In-memory repository
//!
//! Implements the account and session repositories over process memory.
//! Used by tests and by local runs without a database.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::domain::entity::{account::Account, session::Session};
use crate::domain::repository::{AccountRepository, SessionRepository};
use crate::domain::value_object::{UserId, email::Email, user_name::UserName};
use crate::error::{IdentityError, IdentityResult};

#[derive(Default)]
struct State {
    accounts: HashMap<UserId, Account>,
    sessions: HashMap<UserId, Session>,
}

/// In-memory identity repository (cheap to clone, clones share state)
#[derive(Clone, Default)]
pub struct InMemoryIdentityRepository {
    state: Arc<Mutex<State>>,
}

impl InMemoryIdentityRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> IdentityResult<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| IdentityError::Internal("in-memory repository lock poisoned".to_string()))
    }
}

impl AccountRepository for InMemoryIdentityRepository {
    async fn create(&self, account: &Account) -> IdentityResult<()> {
        let mut state = self.lock()?;
        let canonical = account.user_name.canonical();

        if state.accounts.values().any(|a| a.user_name.canonical() == canonical) {
            return Err(IdentityError::UserNameTaken);
        }
        if state.accounts.values().any(|a| a.email == account.email) {
            return Err(IdentityError::EmailTaken);
        }

        state.accounts.insert(account.user_id, account.clone());
        Ok(())
    }

    async fn find_by_id(&self, user_id: &UserId) -> IdentityResult<Option<Account>> {
        Ok(self.lock()?.accounts.get(user_id).cloned())
    }

    async fn find_by_user_name(&self, user_name: &UserName) -> IdentityResult<Option<Account>> {
        let canonical = user_name.canonical();
        Ok(self
            .lock()?
            .accounts
            .values()
            .find(|a| a.user_name.canonical() == canonical)
            .cloned())
    }

    async fn find_by_email(&self, email: &Email) -> IdentityResult<Option<Account>> {
        Ok(self
            .lock()?
            .accounts
            .values()
            .find(|a| &a.email == email)
            .cloned())
    }

    async fn exists_by_user_name(&self, user_name: &UserName) -> IdentityResult<bool> {
        let canonical = user_name.canonical();
        Ok(self
            .lock()?
            .accounts
            .values()
            .any(|a| a.user_name.canonical() == canonical))
    }

    async fn exists_by_email(&self, email: &Email) -> IdentityResult<bool> {
        Ok(self.lock()?.accounts.values().any(|a| &a.email == email))
    }

    async fn update(&self, account: &Account) -> IdentityResult<()> {
        let mut state = self.lock()?;
        match state.accounts.get_mut(&account.user_id) {
            Some(existing) => {
                *existing = account.clone();
                Ok(())
            }
            None => Err(IdentityError::AccountNotFound),
        }
    }
}

impl SessionRepository for InMemoryIdentityRepository {
    async fn find_session(&self, user_id: &UserId) -> IdentityResult<Option<Session>> {
        Ok(self.lock()?.sessions.get(user_id).cloned())
    }

    async fn save_session(&self, session: &Session) -> IdentityResult<()> {
        self.lock()?
            .sessions
            .insert(session.user_id, session.clone());
        Ok(())
    }

    async fn replace_session_if(
        &self,
        session: &Session,
        expected: Option<&str>,
    ) -> IdentityResult<bool> {
        let mut state = self.lock()?;
        let current = state
            .sessions
            .get(&session.user_id)
            .and_then(|stored| stored.token.as_deref());
        if current != expected {
            return Ok(false);
        }

        state.sessions.insert(session.user_id, session.clone());
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn test_replace_session_if_inserts_missing_row() {
        let repo = InMemoryIdentityRepository::new();
        let mut session = Session::new(UserId::new(), None, Utc::now());
        session.rotate(Utc::now());

        assert!(repo.replace_session_if(&session, None).await.unwrap());
        let stored = repo.find_session(&session.user_id).await.unwrap().unwrap();
        assert_eq!(stored.token, session.token);
    }

    #[tokio::test]
    async fn test_replace_session_if_rejects_stale_token() {
        let repo = InMemoryIdentityRepository::new();
        let user_id = UserId::new();
        let seen = Session::new(user_id, None, Utc::now());
        repo.save_session(&seen).await.unwrap();

        // Two logins both saw the empty session; only the first write lands
        let mut first = seen.clone();
        first.rotate(Utc::now());
        let mut second = seen.clone();
        second.rotate(Utc::now());

        assert!(repo.replace_session_if(&first, None).await.unwrap());
        assert!(!repo.replace_session_if(&second, None).await.unwrap());

        let stored = repo.find_session(&user_id).await.unwrap().unwrap();
        assert_eq!(stored.token, first.token);
        assert!(
            repo.replace_session_if(&second, first.token.as_deref())
                .await
                .unwrap()
        );
    }
}
