//! HTTP Handlers

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Extension, State};
use axum::http::{HeaderMap, StatusCode};
use std::sync::Arc;

use platform::client::extract_mac_address;
use platform::clock::{Clock, SystemClock};

use crate::application::config::IdentityConfig;
use crate::application::verification_sender::VerificationSender;
use crate::application::{
    ChangePasswordInput, CurrentUserUseCase, EmailUseCase, PasswordUseCase, PhoneUseCase,
    RefreshInput, RefreshUseCase, ResetPasswordInput, SignInInput, SignInUseCase, SignOutUseCase,
    SignUpInput, SignUpUseCase, TokenValidator,
};
use crate::domain::repository::{AccountRepository, SessionRepository};
use crate::error::{IdentityError, IdentityResult};
use crate::infra::sender::TracingSender;
use crate::infra::token_store::MemoryTokenStore;
use crate::presentation::dto::{
    AuthResponse, ChangeEmailRequest, ChangePasswordRequest, ChangePhoneNumberRequest, CodeRequest,
    ConfirmEmailRequest, CurrentUserResponse, EmailRequest, RefreshRequest, ResetPasswordRequest,
    SignInRequest, SignOutRequest, SignUpRequest, SignUpResponse, VerifyTokenRequest,
    VerifyTokenResponse,
};
use crate::presentation::middleware::CurrentUser;

/// Shared state for identity handlers
#[derive(Clone)]
pub struct IdentityAppState<R>
where
    R: AccountRepository + SessionRepository + Clone + Send + Sync + 'static,
{
    pub repo: Arc<R>,
    pub tokens: Arc<MemoryTokenStore>,
    pub sender: Arc<dyn VerificationSender>,
    pub clock: Arc<dyn Clock>,
    pub config: Arc<IdentityConfig>,
}

impl<R> IdentityAppState<R>
where
    R: AccountRepository + SessionRepository + Clone + Send + Sync + 'static,
{
    /// Wall clock, fresh token store, codes written to the log
    pub fn new(repo: R, config: IdentityConfig) -> Self {
        Self {
            repo: Arc::new(repo),
            tokens: Arc::new(MemoryTokenStore::new()),
            sender: Arc::new(TracingSender),
            clock: Arc::new(SystemClock),
            config: Arc::new(config),
        }
    }

    pub fn with_sender(mut self, sender: Arc<dyn VerificationSender>) -> Self {
        self.sender = sender;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_tokens(mut self, tokens: Arc<MemoryTokenStore>) -> Self {
        self.tokens = tokens;
        self
    }

    fn email_use_case(&self) -> EmailUseCase<R, MemoryTokenStore> {
        EmailUseCase::new(
            self.repo.clone(),
            self.tokens.clone(),
            self.sender.clone(),
            self.clock.clone(),
            self.config.clone(),
        )
    }

    fn password_use_case(&self) -> PasswordUseCase<R, MemoryTokenStore> {
        PasswordUseCase::new(
            self.repo.clone(),
            self.tokens.clone(),
            self.sender.clone(),
            self.clock.clone(),
            self.config.clone(),
        )
    }

    fn phone_use_case(&self) -> PhoneUseCase<R, MemoryTokenStore> {
        PhoneUseCase::new(
            self.repo.clone(),
            self.tokens.clone(),
            self.sender.clone(),
            self.clock.clone(),
            self.config.clone(),
        )
    }
}

// ============================================================================
// Sign Up / Sign In / Refresh
// ============================================================================

/// POST /api/identity/signup
pub async fn sign_up<R>(
    State(state): State<IdentityAppState<R>>,
    Json(req): Json<SignUpRequest>,
) -> IdentityResult<(StatusCode, Json<SignUpResponse>)>
where
    R: AccountRepository + SessionRepository + Clone + Send + Sync + 'static,
{
    let use_case = SignUpUseCase::new(
        state.repo.clone(),
        state.tokens.clone(),
        state.sender.clone(),
        state.clock.clone(),
        state.config.clone(),
    );

    let input = SignUpInput {
        user_name: req.user_name,
        email: req.email,
        password: req.password,
        phone_number: req.phone_number,
    };

    let output = use_case.execute(input).await?;

    Ok((
        StatusCode::CREATED,
        Json(SignUpResponse {
            user_id: output.user_id,
        }),
    ))
}

/// POST /api/identity/signin
pub async fn sign_in<R>(
    State(state): State<IdentityAppState<R>>,
    headers: HeaderMap,
    Json(req): Json<SignInRequest>,
) -> IdentityResult<Json<AuthResponse>>
where
    R: AccountRepository + SessionRepository + Clone + Send + Sync + 'static,
{
    let use_case = SignInUseCase::new(state.repo.clone(), state.clock.clone(), state.config.clone());

    let input = SignInInput {
        identifier: req.identifier,
        password: req.password,
    };

    let response = use_case
        .execute(input, extract_mac_address(&headers))
        .await?;
    Ok(Json(response))
}

/// POST /api/identity/refresh
pub async fn refresh<R>(
    State(state): State<IdentityAppState<R>>,
    headers: HeaderMap,
    Json(req): Json<RefreshRequest>,
) -> IdentityResult<Json<AuthResponse>>
where
    R: AccountRepository + SessionRepository + Clone + Send + Sync + 'static,
{
    let use_case =
        RefreshUseCase::new(state.repo.clone(), state.clock.clone(), state.config.clone());

    let input = RefreshInput {
        user_id: req.user_id,
        refresh_token: req.refresh_token,
    };

    let response = use_case
        .execute(input, extract_mac_address(&headers))
        .await?;
    Ok(Json(response))
}

// ============================================================================
// Session (requires authentication)
// ============================================================================

/// POST /api/identity/signout
///
/// The body is optional.
pub async fn sign_out<R>(
    State(state): State<IdentityAppState<R>>,
    Extension(current): Extension<CurrentUser>,
    body: Bytes,
) -> IdentityResult<StatusCode>
where
    R: AccountRepository + SessionRepository + Clone + Send + Sync + 'static,
{
    let req: SignOutRequest = if body.iter().all(u8::is_ascii_whitespace) {
        SignOutRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| IdentityError::invalid("body", e.to_string()))?
    };

    let use_case =
        SignOutUseCase::new(state.repo.clone(), state.clock.clone(), state.config.clone());
    use_case.execute(&current.user_id, req.forget_device).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/identity/me
pub async fn current_user<R>(
    State(state): State<IdentityAppState<R>>,
    Extension(current): Extension<CurrentUser>,
) -> IdentityResult<Json<CurrentUserResponse>>
where
    R: AccountRepository + SessionRepository + Clone + Send + Sync + 'static,
{
    let account = CurrentUserUseCase::new(state.repo.clone())
        .execute(&current.user_id)
        .await?;
    Ok(Json(account.into()))
}

// ============================================================================
// Email
// ============================================================================

/// POST /api/identity/email/confirmation
pub async fn request_email_confirmation<R>(
    State(state): State<IdentityAppState<R>>,
    Json(req): Json<EmailRequest>,
) -> IdentityResult<StatusCode>
where
    R: AccountRepository + SessionRepository + Clone + Send + Sync + 'static,
{
    state.email_use_case().request_confirmation(req.email).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/identity/email/confirm
pub async fn confirm_email<R>(
    State(state): State<IdentityAppState<R>>,
    Json(req): Json<ConfirmEmailRequest>,
) -> IdentityResult<StatusCode>
where
    R: AccountRepository + SessionRepository + Clone + Send + Sync + 'static,
{
    state.email_use_case().confirm(req.email, &req.code).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/identity/email/change
pub async fn request_email_change<R>(
    State(state): State<IdentityAppState<R>>,
    Extension(current): Extension<CurrentUser>,
    Json(req): Json<ChangeEmailRequest>,
) -> IdentityResult<StatusCode>
where
    R: AccountRepository + SessionRepository + Clone + Send + Sync + 'static,
{
    state
        .email_use_case()
        .request_change(&current.user_id, req.new_email)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/identity/email/change/confirm
pub async fn confirm_email_change<R>(
    State(state): State<IdentityAppState<R>>,
    Extension(current): Extension<CurrentUser>,
    Json(req): Json<CodeRequest>,
) -> IdentityResult<StatusCode>
where
    R: AccountRepository + SessionRepository + Clone + Send + Sync + 'static,
{
    state
        .email_use_case()
        .confirm_change(&current.user_id, &req.code)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Password
// ============================================================================

/// POST /api/identity/password/forgot
pub async fn forgot_password<R>(
    State(state): State<IdentityAppState<R>>,
    Json(req): Json<EmailRequest>,
) -> IdentityResult<StatusCode>
where
    R: AccountRepository + SessionRepository + Clone + Send + Sync + 'static,
{
    state.password_use_case().forgot(req.email).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/identity/password/reset
pub async fn reset_password<R>(
    State(state): State<IdentityAppState<R>>,
    Json(req): Json<ResetPasswordRequest>,
) -> IdentityResult<StatusCode>
where
    R: AccountRepository + SessionRepository + Clone + Send + Sync + 'static,
{
    let input = ResetPasswordInput {
        email: req.email,
        code: req.code,
        new_password: req.new_password,
    };
    state.password_use_case().reset(input).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/identity/password/change
pub async fn change_password<R>(
    State(state): State<IdentityAppState<R>>,
    Extension(current): Extension<CurrentUser>,
    Json(req): Json<ChangePasswordRequest>,
) -> IdentityResult<StatusCode>
where
    R: AccountRepository + SessionRepository + Clone + Send + Sync + 'static,
{
    let input = ChangePasswordInput {
        current_password: req.current_password,
        new_password: req.new_password,
    };
    state
        .password_use_case()
        .change(&current.user_id, input)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Phone
// ============================================================================

/// POST /api/identity/phone/confirmation
pub async fn request_phone_confirmation<R>(
    State(state): State<IdentityAppState<R>>,
    Extension(current): Extension<CurrentUser>,
) -> IdentityResult<StatusCode>
where
    R: AccountRepository + SessionRepository + Clone + Send + Sync + 'static,
{
    state
        .phone_use_case()
        .request_confirmation(&current.user_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/identity/phone/confirm
pub async fn confirm_phone<R>(
    State(state): State<IdentityAppState<R>>,
    Extension(current): Extension<CurrentUser>,
    Json(req): Json<CodeRequest>,
) -> IdentityResult<StatusCode>
where
    R: AccountRepository + SessionRepository + Clone + Send + Sync + 'static,
{
    state
        .phone_use_case()
        .confirm(&current.user_id, &req.code)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/identity/phone/change
pub async fn request_phone_change<R>(
    State(state): State<IdentityAppState<R>>,
    Extension(current): Extension<CurrentUser>,
    Json(req): Json<ChangePhoneNumberRequest>,
) -> IdentityResult<StatusCode>
where
    R: AccountRepository + SessionRepository + Clone + Send + Sync + 'static,
{
    state
        .phone_use_case()
        .request_change(&current.user_id, &req.phone_number)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/identity/phone/change/confirm
pub async fn confirm_phone_change<R>(
    State(state): State<IdentityAppState<R>>,
    Extension(current): Extension<CurrentUser>,
    Json(req): Json<CodeRequest>,
) -> IdentityResult<StatusCode>
where
    R: AccountRepository + SessionRepository + Clone + Send + Sync + 'static,
{
    state
        .phone_use_case()
        .confirm_change(&current.user_id, &req.code)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Verification codes
// ============================================================================

/// POST /api/identity/tokens/verify
///
/// Checks a code without consuming it. Wrong codes still count as tries.
pub async fn verify_token<R>(
    State(state): State<IdentityAppState<R>>,
    Extension(current): Extension<CurrentUser>,
    Json(req): Json<VerifyTokenRequest>,
) -> Json<VerifyTokenResponse>
where
    R: AccountRepository + SessionRepository + Clone + Send + Sync + 'static,
{
    let validator =
        TokenValidator::new(state.tokens.clone(), state.clock.clone(), state.config.clone());
    let valid = validator.verify(req.token_type, &current.user_id, &req.code);
    Json(VerifyTokenResponse { valid })
}
