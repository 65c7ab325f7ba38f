//! Client version guard
//!
//! Unhandled failures seen by an outdated client are reported as
//! `505 HTTP Version Not Supported` so the client can prompt for an update.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use kernel::error::{app_error::AppError, kind::ErrorKind};
use platform::client::extract_client_version;

/// Rewrite 500 responses when the `Version` header differs from `expected`
pub async fn version_guard(
    State(expected): State<Arc<str>>,
    req: Request,
    next: Next,
) -> Response {
    let client_version = extract_client_version(req.headers()).map(str::to_string);
    let response = next.run(req).await;

    if response.status() != StatusCode::INTERNAL_SERVER_ERROR {
        return response;
    }

    match client_version {
        Some(version) if version != *expected => {
            tracing::warn!(
                client_version = %version,
                api_version = %expected,
                "Request failed for an outdated client"
            );
            AppError::new(
                ErrorKind::HttpVersionNotSupported,
                "Client version is not supported",
            )
            .with_action("Update the application")
            .into_response()
        }
        _ => response,
    }
}
