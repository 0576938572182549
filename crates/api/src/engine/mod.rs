//! The import/undo/redo engine.
//!
//! Transport-independent orchestration: handlers validate and translate
//! HTTP shapes, then call into this module. Everything here runs under the
//! target dictionary's advisory lock and leaves no batch `in_progress`
//! once it returns.

pub mod import;
pub mod undo;

use serde::Serialize;

use refdata_core::types::DbId;
use refdata_db::models::import_batch::ImportBatch;

/// One journal entry that could not be replayed because the stored item no
/// longer matches the snapshot the journal expects.
#[derive(Debug, Clone, Serialize)]
pub struct EntryConflict {
    pub sequence_no: i32,
    pub item_id: DbId,
    pub reason: String,
}

/// Result of an undo or redo attempt.
///
/// When `conflicts` is empty the batch transitioned and the stack pointers
/// moved; otherwise the batch and pointers were left untouched and the
/// cleanly replayed entries are reported alongside the conflicts.
#[derive(Debug, Serialize)]
pub struct ReplayOutcome {
    pub batch: ImportBatch,
    pub entries_total: usize,
    pub entries_applied: usize,
    pub conflicts: Vec<EntryConflict>,
}

impl ReplayOutcome {
    /// True when every journal entry replayed and the stack moved.
    pub fn fully_applied(&self) -> bool {
        self.conflicts.is_empty()
    }
}
