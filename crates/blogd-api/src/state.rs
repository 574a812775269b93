//! Application state shared across handlers.

use std::sync::Arc;

use blogd_core::Config;
use blogd_db::{AttachmentRepository, PostRepository, UserRepository};
use blogd_infra::DiskSpaceGuard;
use blogd_storage::AttachmentStore;
use sqlx::PgPool;

use crate::auth::session::SessionStore;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub db_pool: PgPool,
    pub users: UserRepository,
    pub posts: PostRepository,
    pub attachments: AttachmentRepository,
    pub store: AttachmentStore,
    pub disk_guard: DiskSpaceGuard,
    pub sessions: Arc<dyn SessionStore>,
}
