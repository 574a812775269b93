use blogd_core::{AppError, AttachmentClass, NewAttachment, StoredAttachment};
use sqlx::{PgPool, Postgres};

/// Database row for an attachment; `class` is stored as text and parsed on
/// the way out.
#[derive(Debug, sqlx::FromRow)]
struct AttachmentRow {
    id: i64,
    post_id: i64,
    class: String,
    stored_name: String,
    original_name: String,
    relative_path: String,
    size_bytes: i64,
    mime_type: String,
    download_count: i64,
}

impl AttachmentRow {
    fn into_stored(self) -> Result<StoredAttachment, AppError> {
        let class = match self.class.as_str() {
            "image" => AttachmentClass::Image,
            "file" => AttachmentClass::File,
            other => {
                return Err(AppError::Internal(format!(
                    "attachment {} has unknown class '{}'",
                    self.id, other
                )))
            }
        };
        Ok(StoredAttachment {
            id: self.id,
            post_id: self.post_id,
            class,
            stored_name: self.stored_name,
            original_name: self.original_name,
            relative_path: self.relative_path,
            size_bytes: self.size_bytes,
            mime_type: self.mime_type,
            download_count: self.download_count,
        })
    }
}

const SELECT_COLUMNS: &str = "id, post_id, class, stored_name, original_name, relative_path, size_bytes, mime_type, download_count";

/// Repository for post attachments
#[derive(Clone)]
pub struct AttachmentRepository {
    pool: PgPool,
}

impl AttachmentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self, attachment), fields(db.table = "attachments", db.operation = "insert"))]
    pub async fn insert(
        &self,
        post_id: i64,
        attachment: &NewAttachment,
    ) -> Result<StoredAttachment, AppError> {
        let row = sqlx::query_as::<Postgres, AttachmentRow>(
            r#"
            INSERT INTO attachments
                (post_id, class, stored_name, original_name, relative_path, size_bytes, mime_type)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, post_id, class, stored_name, original_name, relative_path, size_bytes, mime_type, download_count
            "#,
        )
        .bind(post_id)
        .bind(attachment.class.name())
        .bind(&attachment.stored_name)
        .bind(&attachment.original_name)
        .bind(&attachment.relative_path)
        .bind(attachment.size_bytes)
        .bind(&attachment.mime_type)
        .fetch_one(&self.pool)
        .await?;

        row.into_stored()
    }

    #[tracing::instrument(skip(self), fields(db.table = "attachments", db.operation = "select", db.record_id = %id))]
    pub async fn get_by_id(&self, id: i64) -> Result<Option<StoredAttachment>, AppError> {
        let row = sqlx::query_as::<Postgres, AttachmentRow>(&format!(
            "SELECT {} FROM attachments WHERE id = $1",
            SELECT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(AttachmentRow::into_stored).transpose()
    }

    #[tracing::instrument(skip(self), fields(db.table = "attachments", db.operation = "select"))]
    pub async fn get_by_post(&self, post_id: i64) -> Result<Vec<StoredAttachment>, AppError> {
        let rows = sqlx::query_as::<Postgres, AttachmentRow>(&format!(
            "SELECT {} FROM attachments WHERE post_id = $1 ORDER BY id ASC",
            SELECT_COLUMNS
        ))
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(AttachmentRow::into_stored).collect()
    }

    /// Best-effort download counter. Deployments that predate the
    /// download_count column must still serve files, so any failure here is
    /// logged and swallowed.
    #[tracing::instrument(skip(self), fields(db.table = "attachments", db.operation = "update", db.record_id = %id))]
    pub async fn increment_download_count(&self, id: i64) {
        let result = sqlx::query(
            "UPDATE attachments SET download_count = COALESCE(download_count, 0) + 1 WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await;

        if let Err(err) = result {
            tracing::warn!(
                attachment_id = id,
                error = %err,
                "failed to increment download count"
            );
        }
    }

    /// Delete all attachment rows for a post, returning the relative paths
    /// of the files that should be unlinked.
    #[tracing::instrument(skip(self), fields(db.table = "attachments", db.operation = "delete"))]
    pub async fn delete_by_post(&self, post_id: i64) -> Result<Vec<String>, AppError> {
        let paths = sqlx::query_scalar::<Postgres, String>(
            "DELETE FROM attachments WHERE post_id = $1 RETURNING relative_path",
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_class_parsing() {
        let row = AttachmentRow {
            id: 1,
            post_id: 2,
            class: "image".to_string(),
            stored_name: "a_1.png".to_string(),
            original_name: "a.png".to_string(),
            relative_path: "uploads/images/a_1.png".to_string(),
            size_bytes: 10,
            mime_type: "image/png".to_string(),
            download_count: 0,
        };
        assert_eq!(row.into_stored().unwrap().class, AttachmentClass::Image);

        let row = AttachmentRow {
            id: 1,
            post_id: 2,
            class: "video".to_string(),
            stored_name: String::new(),
            original_name: String::new(),
            relative_path: String::new(),
            size_bytes: 0,
            mime_type: String::new(),
            download_count: 0,
        };
        assert!(row.into_stored().is_err());
    }
}
