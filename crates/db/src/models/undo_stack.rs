//! Undo stack pointer row.

use serde::Serialize;
use sqlx::FromRow;

use refdata_core::types::{DbId, Timestamp};
use refdata_core::undo::StackPointers;

/// A row from the `undo_stacks` table: the stack pointer pair for one
/// dictionary.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct UndoStack {
    pub dictionary_code: String,
    pub undo_top: Option<DbId>,
    pub redo_top: Option<DbId>,
    pub updated_at: Timestamp,
}

impl UndoStack {
    /// The pointer pair as the core crate's pure value type.
    pub fn pointers(&self) -> StackPointers {
        StackPointers {
            undo_top: self.undo_top,
            redo_top: self.redo_top,
        }
    }
}
