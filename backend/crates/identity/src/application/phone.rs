//! Phone Number Use Cases
//!
//! Confirmation of the phone number on file and change to a new number.
//! Codes go out by SMS and are always numeric.

use std::sync::Arc;

use platform::clock::Clock;

use crate::application::config::IdentityConfig;
use crate::application::token_generator::TokenGenerator;
use crate::application::token_validator::TokenValidator;
use crate::application::verification_sender::{VerificationMessage, VerificationSender};
use crate::domain::entity::account::Account;
use crate::domain::repository::{AccountRepository, VerificationTokenStore};
use crate::domain::value_object::{UserId, phone_number::PhoneNumber, token_type::TokenType};
use crate::error::{IdentityError, IdentityResult};

pub struct PhoneUseCase<R, S>
where
    R: AccountRepository,
    S: VerificationTokenStore,
{
    repo: Arc<R>,
    store: Arc<S>,
    sender: Arc<dyn VerificationSender>,
    clock: Arc<dyn Clock>,
    config: Arc<IdentityConfig>,
}

impl<R, S> PhoneUseCase<R, S>
where
    R: AccountRepository,
    S: VerificationTokenStore,
{
    pub fn new(
        repo: Arc<R>,
        store: Arc<S>,
        sender: Arc<dyn VerificationSender>,
        clock: Arc<dyn Clock>,
        config: Arc<IdentityConfig>,
    ) -> Self {
        Self {
            repo,
            store,
            sender,
            clock,
            config,
        }
    }

    fn generator(&self) -> TokenGenerator<S> {
        TokenGenerator::new(self.store.clone(), self.clock.clone(), self.config.clone())
    }

    fn validator(&self) -> TokenValidator<S> {
        TokenValidator::new(self.store.clone(), self.clock.clone(), self.config.clone())
    }

    /// Account with an unconfirmed phone number on file
    async fn unconfirmed_account(&self, user_id: &UserId) -> IdentityResult<(Account, PhoneNumber)> {
        let account = self
            .repo
            .find_by_id(user_id)
            .await?
            .ok_or(IdentityError::AccountNotFound)?;

        let Some(phone_number) = account.phone_number.clone() else {
            return Err(IdentityError::PhoneNumberRequired);
        };
        if account.phone_number_confirmed {
            return Err(IdentityError::PhoneNumberAlreadyConfirmed);
        }
        Ok((account, phone_number))
    }

    pub async fn request_confirmation(&self, user_id: &UserId) -> IdentityResult<()> {
        let (account, phone_number) = self.unconfirmed_account(user_id).await?;
        let token = self
            .generator()
            .generate_phone_number_confirmation_token(&account)?;
        self.sender
            .dispatch(VerificationMessage::for_token(&token, phone_number.as_str()));
        Ok(())
    }

    pub async fn confirm(&self, user_id: &UserId, code: &str) -> IdentityResult<()> {
        let (mut account, _) = self.unconfirmed_account(user_id).await?;
        self.validator()
            .validate(TokenType::ConfirmPhoneNumber, user_id, code)
            .ok_or(IdentityError::InvalidVerificationCode)?;

        account.confirm_phone_number(self.clock.now());
        self.repo.update(&account).await?;

        tracing::info!(user_id = %user_id, "Phone number confirmed");
        Ok(())
    }

    /// Send a change code to `phone_number` after applying the accepted-codes policy
    pub async fn request_change(&self, user_id: &UserId, phone_number: &str) -> IdentityResult<()> {
        let account = self
            .repo
            .find_by_id(user_id)
            .await?
            .ok_or(IdentityError::AccountNotFound)?;
        let phone_number = PhoneNumber::parse(phone_number, &self.config.accepted_codes)?;

        let token = self
            .generator()
            .generate_change_phone_number_token(&account, &phone_number)?;
        self.sender
            .dispatch(VerificationMessage::for_token(&token, phone_number.as_str()));
        Ok(())
    }

    pub async fn confirm_change(&self, user_id: &UserId, code: &str) -> IdentityResult<()> {
        let mut account = self
            .repo
            .find_by_id(user_id)
            .await?
            .ok_or(IdentityError::AccountNotFound)?;
        let token = self
            .validator()
            .validate(TokenType::ChangePhoneNumber, user_id, code)
            .ok_or(IdentityError::InvalidVerificationCode)?;

        let phone_number = token
            .extra_data
            .map(PhoneNumber::from_db)
            .ok_or_else(|| IdentityError::Internal("change phone token without number".to_string()))?;

        account.change_phone_number(phone_number, self.clock.now());
        self.repo.update(&account).await?;

        tracing::info!(user_id = %user_id, "Phone number changed");
        Ok(())
    }
}
