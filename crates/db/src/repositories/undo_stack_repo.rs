//! Repository for the `undo_stacks` table.
//!
//! Pointer rows are only mutated while the dictionary's advisory lock is
//! held, and always together with the batch status change that justified
//! the move, inside one transaction.

use sqlx::PgExecutor;

use refdata_core::undo::StackPointers;

use crate::models::undo_stack::UndoStack;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "dictionary_code, undo_top, redo_top, updated_at";

/// Provides access to per-dictionary stack pointers.
pub struct UndoStackRepo;

impl UndoStackRepo {
    /// Current pointers for a dictionary, if any batch ever completed.
    pub async fn get(
        executor: impl PgExecutor<'_>,
        dictionary_code: &str,
    ) -> Result<Option<UndoStack>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM undo_stacks WHERE dictionary_code = $1");
        sqlx::query_as::<_, UndoStack>(&query)
            .bind(dictionary_code)
            .fetch_optional(executor)
            .await
    }

    /// Upsert the pointer pair for a dictionary.
    pub async fn set_tops(
        executor: impl PgExecutor<'_>,
        dictionary_code: &str,
        pointers: &StackPointers,
    ) -> Result<UndoStack, sqlx::Error> {
        let query = format!(
            "INSERT INTO undo_stacks (dictionary_code, undo_top, redo_top) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (dictionary_code) DO UPDATE \
             SET undo_top = EXCLUDED.undo_top, \
                 redo_top = EXCLUDED.redo_top, \
                 updated_at = NOW() \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, UndoStack>(&query)
            .bind(dictionary_code)
            .bind(pointers.undo_top)
            .bind(pointers.redo_top)
            .fetch_one(executor)
            .await
    }
}
