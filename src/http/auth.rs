use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderName;
use axum::response::{IntoResponse, Response};

use crate::app::users::UserService;
use crate::domain::user::User;
use crate::http::{found, AppError, LOGIN_PATH};
use crate::AppState;

/// Identity assertion set by the external authentication collaborator.
const AUTH_USER_HEADER: HeaderName = HeaderName::from_static("x-auth-user");

/// Extractor for auth-required handlers. Anonymous (or stale) assertions are
/// bounced to the login page with a 302, never surfaced as an API error.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: User,
}

/// Extractor for handlers that render for anonymous viewers too, but adapt
/// when a viewer is known (the profile following-indicator).
#[derive(Debug, Clone)]
pub struct MaybeAuthUser(pub Option<User>);

fn asserted_username(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(&AUTH_USER_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned)
        .filter(|name| !name.is_empty())
}

fn login_redirect(parts: &Parts) -> Response {
    found(format!("{}?next={}", LOGIN_PATH, parts.uri.path()))
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(username) = asserted_username(parts) else {
            return Err(login_redirect(parts));
        };

        let user = UserService::new(state.db.clone())
            .find_by_username(&username)
            .await
            .map_err(|err| {
                tracing::error!(error = ?err, "failed to resolve auth assertion");
                AppError::internal("failed to resolve user").into_response()
            })?;

        match user {
            Some(user) => Ok(AuthUser { user }),
            None => Err(login_redirect(parts)),
        }
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for MaybeAuthUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(username) = asserted_username(parts) else {
            return Ok(MaybeAuthUser(None));
        };

        let user = UserService::new(state.db.clone())
            .find_by_username(&username)
            .await
            .map_err(|err| {
                tracing::error!(error = ?err, "failed to resolve auth assertion");
                AppError::internal("failed to resolve user").into_response()
            })?;

        Ok(MaybeAuthUser(user))
    }
}
