use blogd_core::{AppError, Post};
use sqlx::{PgPool, Postgres};

/// Repository for blog posts
#[derive(Clone)]
pub struct PostRepository {
    pool: PgPool,
}

impl PostRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self, body), fields(db.table = "posts", db.operation = "insert"))]
    pub async fn create(&self, user_id: i64, title: &str, body: &str) -> Result<Post, AppError> {
        let post = sqlx::query_as::<Postgres, Post>(
            r#"
            INSERT INTO posts (user_id, title, body)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, title, body, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(title)
        .bind(body)
        .fetch_one(&self.pool)
        .await?;

        Ok(post)
    }

    #[tracing::instrument(skip(self), fields(db.table = "posts", db.operation = "select", db.record_id = %id))]
    pub async fn get(&self, id: i64) -> Result<Option<Post>, AppError> {
        let post = sqlx::query_as::<Postgres, Post>(
            "SELECT id, user_id, title, body, created_at, updated_at FROM posts WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(post)
    }

    /// Newest-first page of posts.
    #[tracing::instrument(skip(self), fields(db.table = "posts", db.operation = "select"))]
    pub async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Post>, AppError> {
        let posts = sqlx::query_as::<Postgres, Post>(
            r#"
            SELECT id, user_id, title, body, created_at, updated_at
            FROM posts
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(posts)
    }

    /// Update a post's title and body. Scoped to the owning user; returns
    /// None when the post does not exist or belongs to someone else.
    #[tracing::instrument(skip(self, body), fields(db.table = "posts", db.operation = "update", db.record_id = %id))]
    pub async fn update(
        &self,
        id: i64,
        user_id: i64,
        title: &str,
        body: &str,
    ) -> Result<Option<Post>, AppError> {
        let post = sqlx::query_as::<Postgres, Post>(
            r#"
            UPDATE posts
            SET title = $3, body = $4, updated_at = now()
            WHERE id = $1 AND user_id = $2
            RETURNING id, user_id, title, body, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(title)
        .bind(body)
        .fetch_optional(&self.pool)
        .await?;

        Ok(post)
    }

    /// Delete a post, scoped to the owning user. Attachment rows go with it
    /// via ON DELETE CASCADE; the caller removes the files.
    #[tracing::instrument(skip(self), fields(db.table = "posts", db.operation = "delete", db.record_id = %id))]
    pub async fn delete(&self, id: i64, user_id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
