//! Repository for SOP documents, their published versions, read
//! acknowledgements and announcements.

use clinicops_core::documents::DocumentStatus;
use clinicops_core::pagination::Page;
use clinicops_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::document::{
    AcknowledgementEntry, Announcement, CreateAnnouncement, CreateDocument, Document,
    DocumentAcknowledgement, DocumentListParams, DocumentVersion, UpdateDocument,
};

const COLUMNS: &str = "id, code, title, category, content, version, status, author_id, \
                       published_at, created_at, updated_at";

const VERSION_COLUMNS: &str =
    "id, document_id, version, title, content, published_by_id, created_at";

const ACK_COLUMNS: &str = "id, document_id, user_id, version, created_at";

const ANNOUNCEMENT_COLUMNS: &str =
    "id, title, body, priority, author_id, published_at, expires_at, created_at";

/// `$1` status, `$2` category, `$3` search on code/title.
const LIST_FILTER: &str = "($1::TEXT IS NULL OR status = $1) \
     AND ($2::TEXT IS NULL OR category = $2) \
     AND ($3::TEXT IS NULL OR code ILIKE '%' || $3 || '%' OR title ILIKE '%' || $3 || '%')";

pub struct DocumentRepo;

impl DocumentRepo {
    pub async fn create(
        pool: &PgPool,
        input: &CreateDocument,
        author_id: DbId,
    ) -> Result<Document, sqlx::Error> {
        let query = format!(
            "INSERT INTO documents (code, title, category, content, author_id)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Document>(&query)
            .bind(&input.code)
            .bind(&input.title)
            .bind(&input.category)
            .bind(&input.content)
            .bind(author_id)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Document>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM documents WHERE id = $1");
        sqlx::query_as::<_, Document>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list(
        pool: &PgPool,
        params: &DocumentListParams,
        page: Page,
    ) -> Result<Vec<Document>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM documents WHERE {LIST_FILTER}
             ORDER BY code LIMIT $4 OFFSET $5"
        );
        sqlx::query_as::<_, Document>(&query)
            .bind(&params.status)
            .bind(&params.category)
            .bind(&params.search)
            .bind(page.limit)
            .bind(page.offset())
            .fetch_all(pool)
            .await
    }

    pub async fn count(pool: &PgPool, params: &DocumentListParams) -> Result<i64, sqlx::Error> {
        let query = format!("SELECT COUNT(*)::BIGINT FROM documents WHERE {LIST_FILTER}");
        sqlx::query_scalar::<_, i64>(&query)
            .bind(&params.status)
            .bind(&params.category)
            .bind(&params.search)
            .fetch_one(pool)
            .await
    }

    /// Edit a draft. Returns `None` if the document is missing or no longer a draft.
    pub async fn update_draft(
        pool: &PgPool,
        id: DbId,
        input: &UpdateDocument,
    ) -> Result<Option<Document>, sqlx::Error> {
        let query = format!(
            "UPDATE documents SET
                title = COALESCE($2, title),
                category = COALESCE($3, category),
                content = COALESCE($4, content)
             WHERE id = $1 AND status = 'draft'
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Document>(&query)
            .bind(id)
            .bind(&input.title)
            .bind(&input.category)
            .bind(&input.content)
            .fetch_optional(pool)
            .await
    }

    /// Publish a draft: bump the version, snapshot title and content into
    /// `document_versions` and mark it published. Returns `None` if the
    /// document is not a draft.
    pub async fn publish(
        pool: &PgPool,
        id: DbId,
        published_by_id: DbId,
    ) -> Result<Option<(Document, DocumentVersion)>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "UPDATE documents SET
                version = version + 1,
                status = 'published',
                published_at = NOW()
             WHERE id = $1 AND status = 'draft'
             RETURNING {COLUMNS}"
        );
        let Some(doc) = sqlx::query_as::<_, Document>(&query)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(None);
        };

        let query = format!(
            "INSERT INTO document_versions (document_id, version, title, content, published_by_id)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {VERSION_COLUMNS}"
        );
        let version = sqlx::query_as::<_, DocumentVersion>(&query)
            .bind(doc.id)
            .bind(doc.version)
            .bind(&doc.title)
            .bind(&doc.content)
            .bind(published_by_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some((doc, version)))
    }

    /// Move a document from `from` to `to`, guarded on the current status.
    pub async fn set_status(
        pool: &PgPool,
        id: DbId,
        from: DocumentStatus,
        to: DocumentStatus,
    ) -> Result<Option<Document>, sqlx::Error> {
        let query = format!(
            "UPDATE documents SET status = $3 WHERE id = $1 AND status = $2 RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Document>(&query)
            .bind(id)
            .bind(from.as_str())
            .bind(to.as_str())
            .fetch_optional(pool)
            .await
    }

    /// Hard-delete a never-published draft.
    pub async fn delete_draft(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM documents WHERE id = $1 AND status = 'draft'")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn versions(
        pool: &PgPool,
        document_id: DbId,
    ) -> Result<Vec<DocumentVersion>, sqlx::Error> {
        let query = format!(
            "SELECT {VERSION_COLUMNS} FROM document_versions
             WHERE document_id = $1 ORDER BY version DESC"
        );
        sqlx::query_as::<_, DocumentVersion>(&query)
            .bind(document_id)
            .fetch_all(pool)
            .await
    }

    // -----------------------------------------------------------------------
    // Acknowledgements
    // -----------------------------------------------------------------------

    /// Record that `user_id` read `version`. A repeat acknowledgement of the
    /// same version violates `uq_document_acknowledgements_doc_user_version`.
    pub async fn acknowledge(
        pool: &PgPool,
        document_id: DbId,
        user_id: DbId,
        version: i32,
    ) -> Result<DocumentAcknowledgement, sqlx::Error> {
        let query = format!(
            "INSERT INTO document_acknowledgements (document_id, user_id, version)
             VALUES ($1, $2, $3)
             RETURNING {ACK_COLUMNS}"
        );
        sqlx::query_as::<_, DocumentAcknowledgement>(&query)
            .bind(document_id)
            .bind(user_id)
            .bind(version)
            .fetch_one(pool)
            .await
    }

    /// Acknowledgements of the given version, with reader names.
    pub async fn acknowledgements(
        pool: &PgPool,
        document_id: DbId,
        version: i32,
    ) -> Result<Vec<AcknowledgementEntry>, sqlx::Error> {
        sqlx::query_as::<_, AcknowledgementEntry>(
            "SELECT a.user_id, u.full_name, a.version, a.created_at
             FROM document_acknowledgements a
             JOIN users u ON u.id = a.user_id
             WHERE a.document_id = $1 AND a.version = $2
             ORDER BY a.created_at",
        )
        .bind(document_id)
        .bind(version)
        .fetch_all(pool)
        .await
    }

    /// Active users who have not acknowledged the given version.
    pub async fn pending_acknowledgers(
        pool: &PgPool,
        document_id: DbId,
        version: i32,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "SELECT u.id FROM users u
             WHERE u.is_active
               AND NOT EXISTS (
                   SELECT 1 FROM document_acknowledgements a
                   WHERE a.document_id = $1 AND a.version = $2 AND a.user_id = u.id
               )
             ORDER BY u.id",
        )
        .bind(document_id)
        .bind(version)
        .fetch_all(pool)
        .await
    }

    // -----------------------------------------------------------------------
    // Announcements
    // -----------------------------------------------------------------------

    pub async fn create_announcement(
        pool: &PgPool,
        input: &CreateAnnouncement,
        author_id: DbId,
    ) -> Result<Announcement, sqlx::Error> {
        let query = format!(
            "INSERT INTO announcements (title, body, priority, author_id, expires_at)
             VALUES ($1, $2, COALESCE($3, 'normal'), $4, $5)
             RETURNING {ANNOUNCEMENT_COLUMNS}"
        );
        sqlx::query_as::<_, Announcement>(&query)
            .bind(&input.title)
            .bind(&input.body)
            .bind(&input.priority)
            .bind(author_id)
            .bind(input.expires_at)
            .fetch_one(pool)
            .await
    }

    /// Announcements newest first; expired ones only when `include_expired`.
    pub async fn list_announcements(
        pool: &PgPool,
        include_expired: bool,
        now: Timestamp,
        page: Page,
    ) -> Result<Vec<Announcement>, sqlx::Error> {
        let query = format!(
            "SELECT {ANNOUNCEMENT_COLUMNS} FROM announcements
             WHERE $1 OR expires_at IS NULL OR expires_at > $2
             ORDER BY published_at DESC, id DESC LIMIT $3 OFFSET $4"
        );
        sqlx::query_as::<_, Announcement>(&query)
            .bind(include_expired)
            .bind(now)
            .bind(page.limit)
            .bind(page.offset())
            .fetch_all(pool)
            .await
    }

    pub async fn count_announcements(
        pool: &PgPool,
        include_expired: bool,
        now: Timestamp,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*)::BIGINT FROM announcements
             WHERE $1 OR expires_at IS NULL OR expires_at > $2",
        )
        .bind(include_expired)
        .bind(now)
        .fetch_one(pool)
        .await
    }

    pub async fn delete_announcement(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM announcements WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
