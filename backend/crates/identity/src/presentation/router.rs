//! Identity Router

use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::domain::repository::{AccountRepository, SessionRepository};
use crate::infra::postgres::PgIdentityRepository;
use crate::presentation::handlers::{self, IdentityAppState};
use crate::presentation::middleware::require_bearer;

/// Create the Identity router with PostgreSQL repository
pub fn identity_router(state: IdentityAppState<PgIdentityRepository>) -> Router {
    build_router(state)
}

/// Create a generic Identity router for any repository implementation
pub fn identity_router_generic<R>(state: IdentityAppState<R>) -> Router
where
    R: AccountRepository + SessionRepository + Clone + Send + Sync + 'static,
{
    build_router(state)
}

fn build_router<R>(state: IdentityAppState<R>) -> Router
where
    R: AccountRepository + SessionRepository + Clone + Send + Sync + 'static,
{
    let public = Router::new()
        .route("/signup", post(handlers::sign_up::<R>))
        .route("/signin", post(handlers::sign_in::<R>))
        .route("/refresh", post(handlers::refresh::<R>))
        .route(
            "/email/confirmation",
            post(handlers::request_email_confirmation::<R>),
        )
        .route("/email/confirm", post(handlers::confirm_email::<R>))
        .route("/password/forgot", post(handlers::forgot_password::<R>))
        .route("/password/reset", post(handlers::reset_password::<R>));

    let protected = Router::new()
        .route("/signout", post(handlers::sign_out::<R>))
        .route("/me", get(handlers::current_user::<R>))
        .route("/email/change", post(handlers::request_email_change::<R>))
        .route(
            "/email/change/confirm",
            post(handlers::confirm_email_change::<R>),
        )
        .route("/password/change", post(handlers::change_password::<R>))
        .route(
            "/phone/confirmation",
            post(handlers::request_phone_confirmation::<R>),
        )
        .route("/phone/confirm", post(handlers::confirm_phone::<R>))
        .route("/phone/change", post(handlers::request_phone_change::<R>))
        .route(
            "/phone/change/confirm",
            post(handlers::confirm_phone_change::<R>),
        )
        .route("/tokens/verify", post(handlers::verify_token::<R>))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_bearer::<R>,
        ));

    public.merge(protected).with_state(state)
}
