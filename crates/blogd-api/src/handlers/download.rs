//! Attachment delivery.
//!
//! Serves stored files either directly (buffered for small files, streamed
//! for large ones) or by handing the transfer to the front-end proxy with an
//! X-Accel-Redirect header. Every miss, whether the id is absent, unknown,
//! or the bytes are gone from disk, answers with the same plain 404 so the
//! endpoint leaks nothing about what exists.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Query, State},
    http::{
        header::{
            CACHE_CONTROL, CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE, EXPIRES, PRAGMA,
            USER_AGENT,
        },
        HeaderMap, StatusCode,
    },
    response::{IntoResponse, Response},
};
use blogd_core::constants::{DELIVERY_CHUNK_SIZE, DIRECT_DELIVERY_BUFFER_LIMIT};
use blogd_core::models::StoredAttachment;
use blogd_core::{AppError, DeliveryMode};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde::Deserialize;
use tokio_util::io::ReaderStream;

use crate::error::HttpAppError;
use crate::state::AppState;

/// Characters escaped inside Content-Disposition filename values. Non-ASCII
/// bytes are always percent-encoded regardless of this set.
const FILENAME_ENCODE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'%')
    .add(b'\'')
    .add(b'\\')
    .add(b';');

#[derive(Debug, Deserialize)]
pub struct DownloadParams {
    pub id: Option<String>,
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "File not found.").into_response()
}

// Download errors render minimal plain text, never the JSON error body.
fn read_failure() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, "File unavailable.").into_response()
}

/// Content-Disposition value adapted to the requesting browser. Legacy
/// Microsoft engines only understand a percent-encoded `filename=`; everyone
/// else gets RFC 5987 `filename*=` when the name is not plain ASCII.
fn content_disposition(original_name: &str, user_agent: &str) -> String {
    let legacy_microsoft = user_agent.contains("MSIE")
        || user_agent.contains("Trident")
        || user_agent.contains("Edge");

    if legacy_microsoft {
        let encoded = utf8_percent_encode(original_name, FILENAME_ENCODE);
        format!("attachment; filename=\"{}\"", encoded)
    } else if original_name.is_ascii() {
        format!(
            "attachment; filename=\"{}\"",
            original_name.replace('"', "\\\"")
        )
    } else {
        let encoded = utf8_percent_encode(original_name, FILENAME_ENCODE);
        format!("attachment; filename*=UTF-8''{}", encoded)
    }
}

fn delivery_headers(attachment: &StoredAttachment, size: u64, user_agent: &str) -> [(
    axum::http::HeaderName,
    String,
); 6] {
    [
        (CONTENT_TYPE, attachment.mime_type.clone()),
        (CONTENT_LENGTH, size.to_string()),
        (
            CONTENT_DISPOSITION,
            content_disposition(&attachment.original_name, user_agent),
        ),
        (CACHE_CONTROL, "private, must-revalidate".to_string()),
        (PRAGMA, "public".to_string()),
        (EXPIRES, "0".to_string()),
    ]
}

/// GET /download?id={attachment_id}
pub async fn download(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DownloadParams>,
    headers: HeaderMap,
) -> Result<Response, HttpAppError> {
    let id: i64 = match params.id.as_deref().and_then(|raw| raw.parse().ok()) {
        Some(id) => id,
        None => return Ok(not_found()),
    };

    let attachment = match state.attachments.get_by_id(id).await? {
        Some(attachment) => attachment,
        None => return Ok(not_found()),
    };

    let path = match state.store.root().resolve(&attachment.relative_path) {
        Ok(path) => path,
        Err(err) => {
            tracing::error!(error = %err, attachment_id = id, "stored path failed resolution");
            return Ok(not_found());
        }
    };

    // Size comes from disk at delivery time; a row whose bytes vanished is a
    // miss, not an error.
    let size = match state.store.measure(&path).await {
        Ok(size) => size,
        Err(_) => {
            tracing::warn!(attachment_id = id, path = %attachment.relative_path, "attachment row has no bytes on disk");
            return Ok(not_found());
        }
    };

    state.attachments.increment_download_count(id).await;

    let user_agent = headers
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    let mut builder = Response::builder().status(StatusCode::OK);
    for (name, value) in delivery_headers(&attachment, size, user_agent) {
        builder = builder.header(name, value);
    }

    let response = match state.config.delivery_mode() {
        DeliveryMode::ProxyRedirect => {
            // The proxy serves the bytes; we answer with routing headers and
            // an empty body.
            let location = format!(
                "{}/{}",
                state.config.proxy_internal_prefix().trim_end_matches('/'),
                attachment.relative_path
            );
            builder
                .header("X-Accel-Redirect", location)
                .header("X-Accel-Buffering", "yes")
                .header("X-Accel-Charset", "utf-8")
                .body(Body::empty())
        }
        DeliveryMode::Direct => {
            if size <= DIRECT_DELIVERY_BUFFER_LIMIT {
                let bytes = match tokio::fs::read(&path).await {
                    Ok(bytes) => bytes,
                    Err(err) => {
                        tracing::error!(error = %err, attachment_id = id, path = %attachment.relative_path, "failed to read stored file");
                        return Ok(read_failure());
                    }
                };
                builder.body(Body::from(bytes))
            } else {
                let file = match tokio::fs::File::open(&path).await {
                    Ok(file) => file,
                    Err(err) => {
                        tracing::error!(error = %err, attachment_id = id, path = %attachment.relative_path, "failed to open stored file");
                        return Ok(read_failure());
                    }
                };
                let stream = ReaderStream::with_capacity(file, DELIVERY_CHUNK_SIZE);
                builder.body(Body::from_stream(stream))
            }
        }
    };

    response.map_err(|err| {
        HttpAppError(AppError::Internal(format!(
            "failed to build delivery response: {}",
            err
        )))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHROME: &str =
        "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 Chrome/126.0 Safari/537.36";
    const MSIE: &str = "Mozilla/5.0 (compatible; MSIE 10.0; Windows NT 6.1; Trident/6.0)";

    #[test]
    fn ascii_names_use_plain_filename() {
        let value = content_disposition("report.pdf", CHROME);
        assert_eq!(value, "attachment; filename=\"report.pdf\"");
    }

    #[test]
    fn non_ascii_names_use_rfc5987_for_modern_browsers() {
        let value = content_disposition("résumé.pdf", CHROME);
        assert!(value.starts_with("attachment; filename*=UTF-8''"));
        assert!(value.contains("r%C3%A9sum%C3%A9.pdf"));
    }

    #[test]
    fn legacy_microsoft_gets_percent_encoded_filename() {
        let value = content_disposition("résumé.pdf", MSIE);
        assert!(value.starts_with("attachment; filename=\""));
        assert!(value.contains("r%C3%A9sum%C3%A9.pdf"));
        assert!(!value.contains("filename*"));
    }

    #[test]
    fn quotes_in_ascii_names_are_escaped() {
        let value = content_disposition("a\"b.txt", CHROME);
        assert_eq!(value, "attachment; filename=\"a\\\"b.txt\"");
    }

    async fn body_text(response: Response) -> (StatusCode, String) {
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn misses_and_read_failures_answer_with_plain_text() {
        let (status, body) = body_text(not_found()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, "File not found.");

        let (status, body) = body_text(read_failure()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, "File unavailable.");
        assert!(!body.contains('{'));
    }
}
