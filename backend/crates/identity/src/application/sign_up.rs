//! Sign Up Use Case
//!
//! Creates a new account and sends the email confirmation code.

use std::sync::Arc;

use platform::clock::Clock;

use crate::application::config::IdentityConfig;
use crate::application::password::{hash_password, policy_checked};
use crate::application::token_generator::TokenGenerator;
use crate::application::verification_sender::{VerificationMessage, VerificationSender};
use crate::domain::entity::account::Account;
use crate::domain::repository::{AccountRepository, VerificationTokenStore};
use crate::domain::value_object::{
    UserId, email::Email, phone_number::PhoneNumber, user_name::UserName,
};
use crate::error::{FieldErrors, IdentityError, IdentityResult};

/// Sign up input
pub struct SignUpInput {
    pub user_name: String,
    pub email: String,
    pub password: String,
    pub phone_number: Option<String>,
}

/// Sign up output
pub struct SignUpOutput {
    pub user_id: UserId,
}

/// Sign up use case
pub struct SignUpUseCase<R, S>
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

impl<R, S> SignUpUseCase<R, S>
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

    pub async fn execute(&self, input: SignUpInput) -> IdentityResult<SignUpOutput> {
        // Validate every field before touching the database
        let mut errors = FieldErrors::new();
        let user_name = errors.check(UserName::new(input.user_name));
        let email = errors.check(Email::new(input.email));
        let password = policy_checked(
            input.password,
            &self.config.password_policy,
            "password",
            &mut errors,
        );
        errors.into_result()?;

        let (Some(user_name), Some(email), Some(password)) = (user_name, email, password) else {
            return Err(IdentityError::Internal(
                "validated sign up fields missing".to_string(),
            ));
        };

        let phone_number = input
            .phone_number
            .filter(|raw| !raw.trim().is_empty())
            .map(|raw| PhoneNumber::parse(&raw, &self.config.accepted_codes))
            .transpose()?;

        if self.repo.exists_by_user_name(&user_name).await? {
            return Err(IdentityError::UserNameTaken);
        }
        if self.repo.exists_by_email(&email).await? {
            return Err(IdentityError::EmailTaken);
        }

        let password_hash = hash_password(&password, self.config.pepper())?;
        let account = Account::new(user_name, email, phone_number, password_hash, self.clock.now());

        self.repo.create(&account).await?;

        let generator =
            TokenGenerator::new(self.store.clone(), self.clock.clone(), self.config.clone());
        let token = generator.generate_email_confirmation_token(&account)?;
        self.sender
            .dispatch(VerificationMessage::for_token(&token, account.email.as_str()));

        tracing::info!(user_id = %account.user_id, "User signed up");

        Ok(SignUpOutput {
            user_id: account.user_id,
        })
    }
}
