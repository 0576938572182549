//! Repository for the `change_journal_entries` table.
//!
//! Append and read only. Entries are immutable once the owning batch
//! finalizes, so there are deliberately no update methods here.

use sqlx::PgExecutor;

use refdata_core::types::DbId;

use crate::models::journal_entry::{ChangeJournalEntry, CreateJournalEntry};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str =
    "batch_id, sequence_no, item_id, operation, before_state, after_state, created_at";

/// Provides append/read access to the change journal.
pub struct ChangeJournalRepo;

impl ChangeJournalRepo {
    /// Append one entry, returning the stored row.
    pub async fn append(
        executor: impl PgExecutor<'_>,
        body: &CreateJournalEntry,
    ) -> Result<ChangeJournalEntry, sqlx::Error> {
        let query = format!(
            "INSERT INTO change_journal_entries \
                (batch_id, sequence_no, item_id, operation, before_state, after_state) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ChangeJournalEntry>(&query)
            .bind(body.batch_id)
            .bind(body.sequence_no)
            .bind(body.item_id)
            .bind(body.operation.as_str())
            .bind(&body.before_state)
            .bind(&body.after_state)
            .fetch_one(executor)
            .await
    }

    /// All entries of one batch in `sequence_no` order (the order rows
    /// arrived in the upload). Undo iterates the result in reverse.
    pub async fn list_by_batch(
        executor: impl PgExecutor<'_>,
        batch_id: DbId,
    ) -> Result<Vec<ChangeJournalEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM change_journal_entries \
             WHERE batch_id = $1 \
             ORDER BY sequence_no ASC"
        );
        sqlx::query_as::<_, ChangeJournalEntry>(&query)
            .bind(batch_id)
            .fetch_all(executor)
            .await
    }
}
