//! Pure undo/redo stack rules.
//!
//! The per-dictionary stack is a pair of pointers: the batch that may be
//! undone (`undo_top`) and the batch that may be redone (`redo_top`).
//! Persistence lives in the db crate; everything here is a pure function
//! of the pointer pair so it can be exhaustively unit tested.

use serde::Serialize;

use crate::error::CoreError;
use crate::import::{can_redo_batch, can_undo_batch, BatchStatus};
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Stack pointers
// ---------------------------------------------------------------------------

/// The `(undo_top, redo_top)` pair for one dictionary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StackPointers {
    /// Most recent applied, not-yet-undone batch.
    pub undo_top: Option<DbId>,
    /// Most recently undone batch, not yet superseded by a new import.
    pub redo_top: Option<DbId>,
}

/// Pointer state after a new batch completes: the batch becomes the undo
/// top and any stale redo history is invalidated.
pub fn after_push(batch_id: DbId) -> StackPointers {
    StackPointers {
        undo_top: Some(batch_id),
        redo_top: None,
    }
}

/// Pointer state after a clean undo: the undo top recedes to the next
/// older completed batch and the undone batch becomes redoable.
pub fn after_undone(batch_id: DbId, next_older_completed: Option<DbId>) -> StackPointers {
    StackPointers {
        undo_top: next_older_completed,
        redo_top: Some(batch_id),
    }
}

/// Pointer state after a clean redo: the batch is the undo top again and
/// redo availability is consumed.
pub fn after_redone(batch_id: DbId) -> StackPointers {
    StackPointers {
        undo_top: Some(batch_id),
        redo_top: None,
    }
}

// ---------------------------------------------------------------------------
// Preconditions
// ---------------------------------------------------------------------------

/// Reject an undo attempt on anything but the current undo top.
pub fn ensure_undo_top(batch_id: DbId, pointers: &StackPointers) -> Result<(), CoreError> {
    if pointers.undo_top == Some(batch_id) {
        Ok(())
    } else {
        Err(CoreError::NotTopOfStack(format!(
            "batch {batch_id} is not the most recent applied import for its dictionary"
        )))
    }
}

/// Reject a redo attempt on anything but the current redo top.
pub fn ensure_redo_top(batch_id: DbId, pointers: &StackPointers) -> Result<(), CoreError> {
    if pointers.redo_top == Some(batch_id) {
        Ok(())
    } else {
        Err(CoreError::NotTopOfStack(format!(
            "batch {batch_id} is not the most recently undone import for its dictionary"
        )))
    }
}

// ---------------------------------------------------------------------------
// Capabilities
// ---------------------------------------------------------------------------

/// Whether a given batch can currently be undone or redone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    pub can_undo: bool,
    pub can_redo: bool,
}

/// Capability of one batch as a pure function of its status and its
/// dictionary's stack pointers.
pub fn capabilities_for(
    batch_id: DbId,
    status: BatchStatus,
    pointers: &StackPointers,
) -> Capabilities {
    Capabilities {
        can_undo: can_undo_batch(status) && pointers.undo_top == Some(batch_id),
        can_redo: can_redo_batch(status) && pointers.redo_top == Some(batch_id),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
