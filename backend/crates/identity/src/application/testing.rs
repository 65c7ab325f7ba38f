//! Shared fixtures for application tests

use std::sync::Arc;

use platform::clock::ManualClock;

use crate::application::config::IdentityConfig;
use crate::application::email::EmailUseCase;
use crate::application::password::PasswordUseCase;
use crate::application::phone::PhoneUseCase;
use crate::application::sign_in::{SignInInput, SignInUseCase};
use crate::application::sign_up::{SignUpInput, SignUpUseCase};
use crate::domain::entity::account::Account;
use crate::domain::repository::AccountRepository;
use crate::domain::value_object::UserId;
use crate::infra::{InMemoryIdentityRepository, MemoryTokenStore, RecordingSender};

pub(crate) struct Harness {
    pub repo: Arc<InMemoryIdentityRepository>,
    pub store: Arc<MemoryTokenStore>,
    pub sender: Arc<RecordingSender>,
    pub clock: Arc<ManualClock>,
    pub config: Arc<IdentityConfig>,
}

impl Harness {
    pub fn new(config: IdentityConfig) -> Self {
        Self {
            repo: Arc::new(InMemoryIdentityRepository::new()),
            store: Arc::new(MemoryTokenStore::new()),
            sender: Arc::new(RecordingSender::new()),
            clock: Arc::new(ManualClock::starting_now()),
            config: Arc::new(config),
        }
    }

    pub fn sign_up_use_case(&self) -> SignUpUseCase<InMemoryIdentityRepository, MemoryTokenStore> {
        SignUpUseCase::new(
            self.repo.clone(),
            self.store.clone(),
            self.sender.clone(),
            self.clock.clone(),
            self.config.clone(),
        )
    }

    pub fn sign_in_use_case(&self) -> SignInUseCase<InMemoryIdentityRepository> {
        SignInUseCase::new(self.repo.clone(), self.clock.clone(), self.config.clone())
    }

    pub fn email_use_case(&self) -> EmailUseCase<InMemoryIdentityRepository, MemoryTokenStore> {
        EmailUseCase::new(
            self.repo.clone(),
            self.store.clone(),
            self.sender.clone(),
            self.clock.clone(),
            self.config.clone(),
        )
    }

    pub fn password_use_case(
        &self,
    ) -> PasswordUseCase<InMemoryIdentityRepository, MemoryTokenStore> {
        PasswordUseCase::new(
            self.repo.clone(),
            self.store.clone(),
            self.sender.clone(),
            self.clock.clone(),
            self.config.clone(),
        )
    }

    pub fn phone_use_case(&self) -> PhoneUseCase<InMemoryIdentityRepository, MemoryTokenStore> {
        PhoneUseCase::new(
            self.repo.clone(),
            self.store.clone(),
            self.sender.clone(),
            self.clock.clone(),
            self.config.clone(),
        )
    }

    pub async fn sign_up(&self, user_name: &str, email: &str, password: &str) -> UserId {
        self.sign_up_use_case()
            .execute(SignUpInput {
                user_name: user_name.to_string(),
                email: email.to_string(),
                password: password.to_string(),
                phone_number: None,
            })
            .await
            .map(|output| output.user_id)
            .unwrap()
    }

    /// Sign up with a confirmed email
    pub async fn confirmed_user(&self, user_name: &str, email: &str, password: &str) -> UserId {
        let user_id = self.sign_up(user_name, email, password).await;
        let mut account = self.account(&user_id).await;
        account.email_confirmed = true;
        self.repo.update(&account).await.unwrap();
        user_id
    }

    pub async fn sign_in(
        &self,
        identifier: &str,
        password: &str,
        device: Option<&str>,
    ) -> crate::error::IdentityResult<crate::application::AuthResponse> {
        self.sign_in_use_case()
            .execute(
                SignInInput {
                    identifier: identifier.to_string(),
                    password: password.to_string(),
                },
                device,
            )
            .await
    }

    pub async fn account(&self, user_id: &UserId) -> Account {
        self.repo.find_by_id(user_id).await.unwrap().unwrap()
    }

    /// Code carried by the most recent message
    pub fn last_code(&self) -> String {
        self.sender.last().map(|m| m.code).unwrap()
    }
}
