//! Application setup and initialization
//!
//! This module contains all application initialization logic extracted from main.rs
//! for better organization and testability.

pub mod database;
pub mod routes;
pub mod server;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use blogd_core::Config;
use blogd_db::{AttachmentRepository, PostRepository, UserRepository};
use blogd_infra::telemetry::init_telemetry;
use blogd_infra::DiskSpaceGuard;
use blogd_storage::{AttachmentStore, UploadRoot};

use crate::auth::session::InMemorySessionStore;
use crate::state::AppState;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    init_telemetry().map_err(|e| anyhow::anyhow!("failed to initialize telemetry: {}", e))?;

    // Fail fast on misconfiguration
    config.validate().context("configuration validation failed")?;
    tracing::info!(
        environment = config.environment(),
        delivery_mode = ?config.delivery_mode(),
        "configuration loaded"
    );

    let pool = database::setup_database(&config).await?;

    let root = UploadRoot::new(config.app_root(), config.upload_root());
    let store = AttachmentStore::new(root);
    store
        .root()
        .ensure_layout()
        .await
        .context("failed to prepare upload directories")?;

    let session_ttl = Duration::from_secs(config.session_ttl_hours() as u64 * 3600);

    let state = Arc::new(AppState {
        users: UserRepository::new(pool.clone()),
        posts: PostRepository::new(pool.clone()),
        attachments: AttachmentRepository::new(pool.clone()),
        store,
        disk_guard: DiskSpaceGuard::new(),
        sessions: Arc::new(InMemorySessionStore::new(session_ttl)),
        db_pool: pool,
        config,
    });

    let router = routes::setup_routes(state.clone());

    Ok((state, router))
}
