//! Post CRUD handlers.
//!
//! Posts own their attachments: uploads arrive in the same multipart
//! request that creates the post, and deleting a post removes its
//! attachment rows and stored files.

use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use blogd_core::models::PostResponse;
use blogd_core::{AppError, AttachmentClass, NewAttachment};
use serde::Deserialize;
use validator::Validate;

use crate::auth::middleware::SessionKey;
use crate::auth::session::{Flash, FlashKind};
use crate::auth::CurrentUser;
use crate::error::{HttpAppError, ValidatedJson};
use crate::services::upload::{receive_field, UploadService};
use crate::state::AppState;

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 100;
const MAX_TITLE_CHARS: usize = 200;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// GET /api/v0/posts — newest first, paginated.
pub async fn list_posts(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<PostResponse>>, HttpAppError> {
    let per_page = params
        .per_page
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    let page = params.page.unwrap_or(1).max(1);
    let offset = (page - 1) * per_page;

    let posts = state.posts.list(per_page, offset).await?;

    let mut responses = Vec::with_capacity(posts.len());
    for post in posts {
        let attachments = state.attachments.get_by_post(post.id).await?;
        responses.push(PostResponse::from_post(post, attachments));
    }
    Ok(Json(responses))
}

/// GET /api/v0/posts/{id}
pub async fn get_post(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<PostResponse>, HttpAppError> {
    let post = state
        .posts
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("post {} not found", id)))?;
    let attachments = state.attachments.get_by_post(post.id).await?;
    Ok(Json(PostResponse::from_post(post, attachments)))
}

fn validate_title_body(title: &str, body: &str) -> Result<(), AppError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(AppError::InvalidInput("title is required".to_string()));
    }
    if title.chars().count() > MAX_TITLE_CHARS {
        return Err(AppError::InvalidInput(format!(
            "title must be at most {} characters",
            MAX_TITLE_CHARS
        )));
    }
    if body.trim().is_empty() {
        return Err(AppError::InvalidInput("body is required".to_string()));
    }
    Ok(())
}

/// Best-effort removal of already-placed files when a later step fails.
async fn discard_stored(state: &AppState, attachments: &[NewAttachment]) {
    for attachment in attachments {
        if let Err(err) = state.store.delete_relative(&attachment.relative_path).await {
            tracing::warn!(
                error = %err,
                path = %attachment.relative_path,
                "failed to discard stored file after aborted post creation"
            );
        }
    }
}

/// POST /api/v0/posts — multipart with `title`, `body`, and any number of
/// `images` / `files` parts. Each file runs the full upload pipeline before
/// the post row is created; a rejected file aborts the whole request and
/// discards anything already placed.
pub async fn create_post(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    session: Option<SessionKey>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, HttpAppError> {
    let uploader = UploadService::new(
        state.config.clone(),
        state.store.clone(),
        state.disk_guard,
    );

    let mut title = String::new();
    let mut body = String::new();
    let mut uploaded: Vec<NewAttachment> = Vec::new();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(err) => {
                discard_stored(&state, &uploaded).await;
                return Err(HttpAppError(AppError::InvalidInput(format!(
                    "malformed multipart body: {}",
                    err.body_text()
                ))));
            }
        };

        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "title" | "body" => {
                let value = match field.text().await {
                    Ok(value) => value,
                    Err(err) => {
                        discard_stored(&state, &uploaded).await;
                        return Err(HttpAppError(AppError::InvalidInput(format!(
                            "unreadable {} field: {}",
                            name,
                            err.body_text()
                        ))));
                    }
                };
                if name == "title" {
                    title = value;
                } else {
                    body = value;
                }
            }
            "images" | "files" => {
                let class = if name == "images" {
                    AttachmentClass::Image
                } else {
                    AttachmentClass::File
                };
                let received = match receive_field(field).await {
                    Ok(received) => received,
                    Err(err) => {
                        discard_stored(&state, &uploaded).await;
                        return Err(err.into());
                    }
                };
                // Empty file parts appear when the form's file input was
                // left blank; skip them instead of failing the post.
                if received.original_name.is_empty() {
                    continue;
                }
                match uploader.upload(received, class).await {
                    Ok(attachment) => uploaded.push(attachment),
                    Err(err) => {
                        discard_stored(&state, &uploaded).await;
                        return Err(err.into());
                    }
                }
            }
            other => {
                tracing::debug!(field = other, "ignoring unknown multipart field");
            }
        }
    }

    if let Err(err) = validate_title_body(&title, &body) {
        discard_stored(&state, &uploaded).await;
        return Err(err.into());
    }

    let post = state.posts.create(user.id, title.trim(), &body).await?;

    let mut attachments = Vec::with_capacity(uploaded.len());
    for (index, attachment) in uploaded.iter().enumerate() {
        match state.attachments.insert(post.id, attachment).await {
            Ok(stored) => attachments.push(stored),
            Err(err) => {
                // Rows and bytes must not diverge: drop the files whose rows
                // never landed, keep what was already persisted.
                discard_stored(&state, &uploaded[index..]).await;
                return Err(err.into());
            }
        }
    }

    tracing::info!(
        post_id = post.id,
        user_id = user.id,
        attachment_count = attachments.len(),
        "post created"
    );

    if let Some(SessionKey(session_id)) = session {
        state
            .sessions
            .set_flash(
                &session_id,
                Flash {
                    kind: FlashKind::Success,
                    message: "Post created.".to_string(),
                },
            )
            .await;
    }

    Ok((
        StatusCode::CREATED,
        Json(PostResponse::from_post(post, attachments)),
    ))
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePostRequest {
    #[validate(length(min = 1, max = 200, message = "title must be 1-200 characters"))]
    pub title: String,
    #[validate(length(min = 1, message = "body is required"))]
    pub body: String,
}

/// PUT /api/v0/posts/{id} — owner-scoped; a non-owner gets the same 404 as
/// a missing post.
pub async fn update_post(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<i64>,
    ValidatedJson(payload): ValidatedJson<UpdatePostRequest>,
) -> Result<Json<PostResponse>, HttpAppError> {
    let post = state
        .posts
        .update(id, user.id, payload.title.trim(), &payload.body)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("post {} not found", id)))?;

    let attachments = state.attachments.get_by_post(post.id).await?;
    Ok(Json(PostResponse::from_post(post, attachments)))
}

/// DELETE /api/v0/posts/{id} — owner-scoped. Rows go first, then the stored
/// files; a file already missing on disk never aborts the rest.
pub async fn delete_post(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    session: Option<SessionKey>,
    Path(id): Path<i64>,
) -> Result<StatusCode, HttpAppError> {
    let post = state
        .posts
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("post {} not found", id)))?;
    if post.user_id != user.id {
        return Err(HttpAppError(AppError::NotFound(format!(
            "post {} not found",
            id
        ))));
    }

    let paths = state.attachments.delete_by_post(id).await?;
    state.posts.delete(id, user.id).await?;

    for path in &paths {
        if let Err(err) = state.store.delete_relative(path).await {
            tracing::warn!(error = %err, path = %path, "failed to remove stored file for deleted post");
        }
    }

    tracing::info!(post_id = id, user_id = user.id, files = paths.len(), "post deleted");

    if let Some(SessionKey(session_id)) = session {
        state
            .sessions
            .set_flash(
                &session_id,
                Flash {
                    kind: FlashKind::Success,
                    message: "Post deleted.".to_string(),
                },
            )
            .await;
    }

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_and_body_are_required() {
        assert!(validate_title_body("Hello", "World").is_ok());
        assert!(validate_title_body("", "World").is_err());
        assert!(validate_title_body("   ", "World").is_err());
        assert!(validate_title_body("Hello", "").is_err());
        assert!(validate_title_body(&"x".repeat(201), "World").is_err());
        assert!(validate_title_body(&"x".repeat(200), "World").is_ok());
    }

    #[test]
    fn update_payload_validation() {
        let ok = UpdatePostRequest {
            title: "Edited".to_string(),
            body: "Updated body".to_string(),
        };
        assert!(ok.validate().is_ok());

        let empty_title = UpdatePostRequest {
            title: String::new(),
            body: "Updated body".to_string(),
        };
        assert!(empty_title.validate().is_err());
    }
}
