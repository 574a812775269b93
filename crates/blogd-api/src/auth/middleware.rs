//! Session resolution middleware and request extractors.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts, Request, State},
    http::header::COOKIE,
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use blogd_core::AppError;

use crate::auth::session::session_id_from_cookies;
use crate::error::HttpAppError;
use crate::state::AppState;

/// The authenticated user for this request, resolved from the session.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: i64,
    pub username: String,
}

/// The session id presented by this request, whether or not it resolved to
/// a user.
#[derive(Debug, Clone)]
pub struct SessionKey(pub String);

/// Resolves the session cookie into request extensions. Runs on every
/// request; routes that require a user reject through the [`CurrentUser`]
/// extractor.
pub async fn session_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let session_id = request
        .headers()
        .get(COOKIE)
        .and_then(|h| h.to_str().ok())
        .and_then(session_id_from_cookies);

    if let Some(session_id) = session_id {
        request
            .extensions_mut()
            .insert(SessionKey(session_id.clone()));

        if let Some(session) = state.sessions.get(&session_id).await {
            match state.users.get_by_id(session.user_id).await {
                Ok(Some(user)) => {
                    request.extensions_mut().insert(CurrentUser {
                        id: user.id,
                        username: user.username,
                    });
                }
                Ok(None) => {
                    // Account deleted under a live session
                    state.sessions.clear(&session_id).await;
                }
                Err(err) => {
                    tracing::warn!(error = %err, "failed to resolve session user");
                }
            }
        }
    }

    next.run(request).await
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = HttpAppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(|| HttpAppError(AppError::Unauthorized("login required".to_string())))
    }
}

impl<S> FromRequestParts<S> for SessionKey
where
    S: Send + Sync,
{
    type Rejection = HttpAppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionKey>()
            .cloned()
            .ok_or_else(|| HttpAppError(AppError::Unauthorized("no active session".to_string())))
    }
}

impl<S> OptionalFromRequestParts<S> for SessionKey
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(parts.extensions.get::<SessionKey>().cloned())
    }
}
