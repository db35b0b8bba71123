use axum::extract::DefaultBodyLimit;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Router;

use crate::AppState;

mod auth;
mod error;
mod handlers;
mod routes;

pub use auth::{AuthUser, MaybeAuthUser};
pub use error::AppError;

/// Where the external authentication collaborator hosts its login form.
pub const LOGIN_PATH: &str = "/auth/login/";

// Default cap; main passes the configured value through `router_with_limit`.
const DEFAULT_UPLOAD_MAX_BYTES: usize = 10 * 1024 * 1024;

/// 302 FOUND, the redirect status the contract uses everywhere.
pub fn found(location: impl Into<String>) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.into())]).into_response()
}

pub fn router(state: AppState) -> Router {
    router_with_limit(state, DEFAULT_UPLOAD_MAX_BYTES)
}

pub fn router_with_limit(state: AppState, upload_max_bytes: usize) -> Router {
    Router::new()
        .merge(routes::feeds())
        .merge(routes::posts())
        .merge(routes::profiles())
        .fallback(handlers::page_not_found)
        .layer(DefaultBodyLimit::max(upload_max_bytes))
        .with_state(state)
}
