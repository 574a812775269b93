//! Register, login, logout, and flash-message handlers.

use std::sync::Arc;
use std::sync::LazyLock;

use axum::{
    extract::State,
    http::{header::SET_COOKIE, StatusCode},
    response::IntoResponse,
    Json,
};
use blogd_core::{models::UserResponse, AppError};
use regex::Regex;
use serde::Deserialize;
use validator::Validate;

use crate::auth::middleware::SessionKey;
use crate::auth::password::{hash_password, verify_password};
use crate::auth::session::{
    clear_session_cookie, new_session_id, session_cookie, Flash, FlashKind, Session,
};
use crate::error::{HttpAppError, ValidatedJson};
use crate::state::AppState;

static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_]{3,20}$").expect("static pattern must compile"));

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(regex(
        path = *USERNAME_RE,
        message = "username must be 3-20 characters of letters, digits, or underscore"
    ))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 6, message = "password must be at least 6 characters"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "username is required"))]
    pub username: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

/// POST /api/v0/auth/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    ValidatedJson(payload): ValidatedJson<RegisterRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let password_hash = hash_password(&payload.password)?;
    let user = state
        .users
        .create(&payload.username, &payload.email, &password_hash)
        .await?;

    tracing::info!(user_id = user.id, username = %user.username, "user registered");

    let (cookie, _) = open_session(&state, user.id, "Welcome! Your account was created.").await;

    Ok((
        StatusCode::CREATED,
        [(SET_COOKIE, cookie)],
        Json(UserResponse::from(user)),
    ))
}

/// POST /api/v0/auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    ValidatedJson(payload): ValidatedJson<LoginRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let user = state.users.get_by_username(&payload.username).await?;

    // One failure message for unknown user and wrong password alike.
    let user = match user {
        Some(user) if verify_password(&payload.password, &user.password_hash) => user,
        _ => {
            tracing::debug!(username = %payload.username, "login failed");
            return Err(HttpAppError(AppError::Unauthorized(
                "invalid username or password".to_string(),
            )));
        }
    };

    tracing::info!(user_id = user.id, "user logged in");

    let (cookie, _) = open_session(&state, user.id, "Logged in.").await;

    Ok((
        StatusCode::OK,
        [(SET_COOKIE, cookie)],
        Json(UserResponse::from(user)),
    ))
}

/// POST /api/v0/auth/logout
pub async fn logout(
    State(state): State<Arc<AppState>>,
    SessionKey(session_id): SessionKey,
) -> impl IntoResponse {
    state.sessions.clear(&session_id).await;
    (
        StatusCode::NO_CONTENT,
        [(SET_COOKIE, clear_session_cookie())],
    )
}

/// GET /api/v0/flash — returns and drains the pending flash message.
pub async fn take_flash(
    State(state): State<Arc<AppState>>,
    SessionKey(session_id): SessionKey,
) -> Json<Option<Flash>> {
    Json(state.sessions.take_flash(&session_id).await)
}

async fn open_session(state: &AppState, user_id: i64, greeting: &str) -> (String, String) {
    let session_id = new_session_id();
    state
        .sessions
        .set(
            &session_id,
            Session {
                user_id,
                flash: Some(Flash {
                    kind: FlashKind::Success,
                    message: greeting.to_string(),
                }),
            },
        )
        .await;

    let cookie = session_cookie(&session_id, state.config.is_production());
    (cookie, session_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_payload_validation() {
        let ok = RegisterRequest {
            username: "alice_99".to_string(),
            email: "alice@example.com".to_string(),
            password: "secret1".to_string(),
        };
        assert!(ok.validate().is_ok());

        let bad_username = RegisterRequest {
            username: "a!".to_string(),
            ..register_fixture()
        };
        assert!(bad_username.validate().is_err());

        let bad_email = RegisterRequest {
            email: "not-an-email".to_string(),
            ..register_fixture()
        };
        assert!(bad_email.validate().is_err());

        let short_password = RegisterRequest {
            password: "12345".to_string(),
            ..register_fixture()
        };
        assert!(short_password.validate().is_err());
    }

    fn register_fixture() -> RegisterRequest {
        RegisterRequest {
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password: "secret1".to_string(),
        }
    }
}
