//! In-memory verification token store
//!
//! Backed by a sharded `DashMap`; entry-level locking makes the
//! check-then-update in `update` atomic per key. Not shared across
//! processes and not durable.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::domain::entity::verification_token::VerificationToken;
use crate::domain::repository::VerificationTokenStore;
use crate::domain::value_object::{UserId, token_type::TokenType};

#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    entries: DashMap<String, VerificationToken>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl VerificationTokenStore for MemoryTokenStore {
    fn insert(&self, token: VerificationToken) {
        self.entries.insert(token.cache_key(), token);
    }

    fn get(&self, token_type: TokenType, user_id: &UserId) -> Option<VerificationToken> {
        self.entries
            .get(&token_type.cache_key(user_id))
            .map(|entry| entry.value().clone())
    }

    fn remove(&self, token_type: TokenType, user_id: &UserId) {
        self.entries.remove(&token_type.cache_key(user_id));
    }

    fn update<T>(
        &self,
        token_type: TokenType,
        user_id: &UserId,
        f: impl FnOnce(&mut Option<VerificationToken>) -> T,
    ) -> T {
        match self.entries.entry(token_type.cache_key(user_id)) {
            Entry::Occupied(mut occupied) => {
                let mut slot = Some(occupied.get().clone());
                let result = f(&mut slot);
                match slot {
                    Some(token) => {
                        occupied.insert(token);
                    }
                    None => {
                        occupied.remove();
                    }
                }
                result
            }
            Entry::Vacant(vacant) => {
                let mut slot = None;
                let result = f(&mut slot);
                if let Some(token) = slot {
                    vacant.insert(token);
                }
                result
            }
        }
    }

    fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, token| !token.is_expired(now));
        let purged = before.saturating_sub(self.entries.len());
        if purged > 0 {
            tracing::debug!(purged, "Purged expired verification tokens");
        }
        purged
    }
}
