//! Health probe.

use std::sync::Arc;
use std::time::Duration;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::state::AppState;

const TIMEOUT: Duration = Duration::from_secs(5);

/// GET /health — checks the database with a bounded ping.
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let mut healthy = true;
    let database = match tokio::time::timeout(
        TIMEOUT,
        sqlx::query("SELECT 1").execute(&state.db_pool),
    )
    .await
    {
        Ok(Ok(_)) => "healthy".to_string(),
        Ok(Err(e)) => {
            tracing::error!(error = %e, "database health check failed");
            healthy = false;
            format!("unhealthy: {}", e)
        }
        Err(_) => {
            tracing::error!("database health check timed out");
            healthy = false;
            "timeout".to_string()
        }
    };

    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(json!({
            "status": if healthy { "healthy" } else { "unhealthy" },
            "version": env!("CARGO_PKG_VERSION"),
            "database": database,
        })),
    )
}
