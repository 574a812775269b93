use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::attachment::StoredAttachment;

/// A blog post. Attachments are owned by the post's lifecycle: they are
/// created alongside it and removed when the post is deleted.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Post {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Post representation in responses, with its attachments resolved.
#[derive(Debug, Serialize, Deserialize)]
pub struct PostResponse {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub attachments: Vec<StoredAttachment>,
}

impl PostResponse {
    pub fn from_post(post: Post, attachments: Vec<StoredAttachment>) -> Self {
        Self {
            id: post.id,
            user_id: post.user_id,
            title: post.title,
            body: post.body,
            created_at: post.created_at,
            updated_at: post.updated_at,
            attachments,
        }
    }
}
