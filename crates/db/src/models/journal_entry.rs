//! Change journal models.
//!
//! A journal entry is one reversible mutation: the full before/after item
//! snapshots for a single row a batch touched. Entries are append-only and
//! immutable once the owning batch finalizes.

use serde::Serialize;
use sqlx::FromRow;

use refdata_core::error::CoreError;
use refdata_core::import::JournalOp;
use refdata_core::types::{DbId, Timestamp};

use super::dictionary_item::ItemSnapshot;

/// A row from the `change_journal_entries` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ChangeJournalEntry {
    pub batch_id: DbId,
    pub sequence_no: i32,
    pub item_id: DbId,
    pub operation: String,
    /// Full prior snapshot; NULL iff the entry created the item.
    pub before_state: Option<serde_json::Value>,
    /// Full snapshot as written by the batch.
    pub after_state: serde_json::Value,
    pub created_at: Timestamp,
}

impl ChangeJournalEntry {
    /// Lift the stored operation string into the typed enum.
    pub fn op(&self) -> Result<JournalOp, CoreError> {
        JournalOp::from_str(&self.operation)
    }

    /// Parse the before-state snapshot, if any.
    pub fn before_snapshot(&self) -> Result<Option<ItemSnapshot>, CoreError> {
        self.before_state
            .as_ref()
            .map(ItemSnapshot::from_value)
            .transpose()
    }

    /// Parse the after-state snapshot.
    pub fn after_snapshot(&self) -> Result<ItemSnapshot, CoreError> {
        ItemSnapshot::from_value(&self.after_state)
    }
}

/// DTO for appending one journal entry.
#[derive(Debug, Clone)]
pub struct CreateJournalEntry {
    pub batch_id: DbId,
    pub sequence_no: i32,
    pub item_id: DbId,
    pub operation: JournalOp,
    pub before_state: Option<serde_json::Value>,
    pub after_state: serde_json::Value,
}
