//! Current User Use Case

use std::sync::Arc;

use crate::domain::entity::account::Account;
use crate::domain::repository::AccountRepository;
use crate::domain::value_object::UserId;
use crate::error::{IdentityError, IdentityResult};

pub struct CurrentUserUseCase<R>
where
    R: AccountRepository,
{
    repo: Arc<R>,
}

impl<R> CurrentUserUseCase<R>
where
    R: AccountRepository,
{
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    pub async fn execute(&self, user_id: &UserId) -> IdentityResult<Account> {
        self.repo
            .find_by_id(user_id)
            .await?
            .ok_or(IdentityError::AccountNotFound)
    }
}
