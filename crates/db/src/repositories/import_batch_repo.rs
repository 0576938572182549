//! Repository for the `import_batches` table.

use sqlx::PgExecutor;

use refdata_core::import::BatchStatus;
use refdata_core::types::DbId;

use crate::models::import_batch::{CreateImportBatch, ImportBatch};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, dictionary_code, file_name, import_mode, total_records, \
    successful_records, failed_records, status, error_log, performed_by, \
    rolled_back_at, rolled_back_by, created_at, updated_at";

/// Provides lifecycle operations for import batches.
pub struct ImportBatchRepo;

impl ImportBatchRepo {
    /// Insert a new batch in `pending` status, returning the created row.
    pub async fn create(
        executor: impl PgExecutor<'_>,
        body: &CreateImportBatch,
    ) -> Result<ImportBatch, sqlx::Error> {
        let query = format!(
            "INSERT INTO import_batches \
                (dictionary_code, file_name, import_mode, total_records, performed_by) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ImportBatch>(&query)
            .bind(&body.dictionary_code)
            .bind(&body.file_name)
            .bind(&body.import_mode)
            .bind(body.total_records)
            .bind(&body.performed_by)
            .fetch_one(executor)
            .await
    }

    /// Update only the status of a batch.
    pub async fn update_status(
        executor: impl PgExecutor<'_>,
        id: DbId,
        status: BatchStatus,
    ) -> Result<ImportBatch, sqlx::Error> {
        let query = format!(
            "UPDATE import_batches SET status = $2, updated_at = NOW() \
             WHERE id = $1 RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ImportBatch>(&query)
            .bind(id)
            .bind(status.as_str())
            .fetch_one(executor)
            .await
    }

    /// Finalize a batch: terminal status, success/failure counts, error log.
    pub async fn finalize(
        executor: impl PgExecutor<'_>,
        id: DbId,
        status: BatchStatus,
        successful_records: i32,
        failed_records: i32,
        error_log: &[String],
    ) -> Result<ImportBatch, sqlx::Error> {
        let query = format!(
            "UPDATE import_batches \
             SET status = $2, successful_records = $3, failed_records = $4, \
                 error_log = $5, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ImportBatch>(&query)
            .bind(id)
            .bind(status.as_str())
            .bind(successful_records)
            .bind(failed_records)
            .bind(serde_json::json!(error_log))
            .fetch_one(executor)
            .await
    }

    /// Transition a completed batch to `rolled_back`, stamping who and when.
    pub async fn mark_rolled_back(
        executor: impl PgExecutor<'_>,
        id: DbId,
        rolled_back_by: Option<&str>,
    ) -> Result<ImportBatch, sqlx::Error> {
        let query = format!(
            "UPDATE import_batches \
             SET status = 'rolled_back', rolled_back_at = NOW(), \
                 rolled_back_by = $2, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ImportBatch>(&query)
            .bind(id)
            .bind(rolled_back_by)
            .fetch_one(executor)
            .await
    }

    /// Transition a rolled-back batch to `completed` again after a redo,
    /// clearing the rollback stamp.
    pub async fn mark_redone(
        executor: impl PgExecutor<'_>,
        id: DbId,
    ) -> Result<ImportBatch, sqlx::Error> {
        let query = format!(
            "UPDATE import_batches \
             SET status = 'completed', rolled_back_at = NULL, \
                 rolled_back_by = NULL, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ImportBatch>(&query)
            .bind(id)
            .fetch_one(executor)
            .await
    }

    /// Find a single batch by ID.
    pub async fn find_by_id(
        executor: impl PgExecutor<'_>,
        id: DbId,
    ) -> Result<Option<ImportBatch>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM import_batches WHERE id = $1");
        sqlx::query_as::<_, ImportBatch>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Import history for one dictionary, newest first.
    pub async fn list_by_dictionary(
        executor: impl PgExecutor<'_>,
        dictionary_code: &str,
    ) -> Result<Vec<ImportBatch>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM import_batches \
             WHERE dictionary_code = $1 \
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, ImportBatch>(&query)
            .bind(dictionary_code)
            .fetch_all(executor)
            .await
    }

    /// The most recent completed batch of a dictionary, excluding one id.
    /// Used to recede `undo_top` after an undo. Ordered by `updated_at`,
    /// which for completed batches is the completion/redo transition time.
    pub async fn latest_completed_excluding(
        executor: impl PgExecutor<'_>,
        dictionary_code: &str,
        exclude_id: DbId,
    ) -> Result<Option<DbId>, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "SELECT id FROM import_batches \
             WHERE dictionary_code = $1 AND status = 'completed' AND id <> $2 \
             ORDER BY updated_at DESC, id DESC \
             LIMIT 1",
        )
        .bind(dictionary_code)
        .bind(exclude_id)
        .fetch_optional(executor)
        .await
    }

    /// Delete a batch. The journal cascades with it.
    pub async fn delete(executor: impl PgExecutor<'_>, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM import_batches WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
