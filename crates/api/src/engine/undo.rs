//! Undo (reverse replay) and redo (forward replay) of an import batch.
//!
//! Both directions use the same conflict discipline: each journal entry is
//! applied only if the stored item still matches the snapshot the journal
//! expects (version-checked). A mismatch records a conflict and continues
//! with the remaining entries; a storage error aborts the attempt. The
//! batch status and the stack pointers move together, in one transaction,
//! and only when every entry replayed cleanly.

use sqlx::PgPool;

use refdata_core::error::CoreError;
use refdata_core::import::{can_redo_batch, can_undo_batch, JournalOp};
use refdata_core::types::DbId;
use refdata_core::undo::{after_redone, after_undone, ensure_redo_top, ensure_undo_top, StackPointers};
use refdata_db::models::import_batch::ImportBatch;
use refdata_db::models::journal_entry::ChangeJournalEntry;
use refdata_db::repositories::{
    ChangeJournalRepo, DictionaryItemRepo, ImportBatchRepo, UndoStackRepo,
};
use refdata_db::DictionaryLock;
use refdata_events::{EventBus, PlatformEvent, EVENT_IMPORT_REDONE, EVENT_IMPORT_UNDONE};

use super::{EntryConflict, ReplayOutcome};
use crate::error::AppError;

// ---------------------------------------------------------------------------
// Undo
// ---------------------------------------------------------------------------

/// Roll back a completed batch by replaying its journal in reverse.
///
/// Preconditions (checked again under the dictionary lock): the batch is
/// `completed` and is its dictionary's current undo top.
pub async fn undo_batch(
    pool: &PgPool,
    event_bus: &EventBus,
    batch_id: DbId,
    performed_by: Option<&str>,
) -> Result<ReplayOutcome, AppError> {
    let batch = load_batch(pool, batch_id).await?;
    ensure_undoable(&batch)?;

    let lock = DictionaryLock::acquire(pool, &batch.dictionary_code).await?;

    // Re-check under the lock: a concurrent operation may have moved the
    // batch or the stack while we waited.
    let batch = load_batch(pool, batch_id).await?;
    ensure_undoable(&batch)?;
    let pointers = load_pointers(pool, &batch.dictionary_code).await?;
    ensure_undo_top(batch_id, &pointers)?;

    let entries = ChangeJournalRepo::list_by_batch(pool, batch_id).await?;
    let entries_total = entries.len();

    let mut conflicts: Vec<EntryConflict> = Vec::new();
    let mut entries_applied = 0usize;
    for entry in entries.iter().rev() {
        match revert_entry(pool, entry).await? {
            None => entries_applied += 1,
            Some(conflict) => conflicts.push(conflict),
        }
    }

    if conflicts.is_empty() {
        let mut tx = pool.begin().await?;
        let updated = ImportBatchRepo::mark_rolled_back(&mut *tx, batch_id, performed_by).await?;
        let next_older = ImportBatchRepo::latest_completed_excluding(
            &mut *tx,
            &batch.dictionary_code,
            batch_id,
        )
        .await?;
        UndoStackRepo::set_tops(
            &mut *tx,
            &batch.dictionary_code,
            &after_undone(batch_id, next_older),
        )
        .await?;
        tx.commit().await?;
        lock.release().await?;

        tracing::info!(batch_id, entries = entries_applied, "Batch rolled back");
        event_bus.publish(
            PlatformEvent::new(EVENT_IMPORT_UNDONE, &batch.dictionary_code, batch_id)
                .with_payload(serde_json::json!({
                    "entries_reverted": entries_applied,
                    "next_undo_top": next_older,
                })),
        );

        Ok(ReplayOutcome {
            batch: updated,
            entries_total,
            entries_applied,
            conflicts,
        })
    } else {
        lock.release().await?;
        tracing::warn!(
            batch_id,
            conflicts = conflicts.len(),
            applied = entries_applied,
            "Undo hit conflicts; batch stays completed and pointers are unchanged",
        );
        Ok(ReplayOutcome {
            batch,
            entries_total,
            entries_applied,
            conflicts,
        })
    }
}

/// Revert one journal entry, newest-first.
///
/// Returns `None` when the entry was cleanly reverted, `Some` with the
/// conflict detail when the stored state no longer matches `after_state`.
async fn revert_entry(
    pool: &PgPool,
    entry: &ChangeJournalEntry,
) -> Result<Option<EntryConflict>, AppError> {
    let after = entry.after_snapshot()?;
    match entry.op()? {
        JournalOp::Created => {
            let deleted =
                DictionaryItemRepo::delete_checked(pool, entry.item_id, after.version).await?;
            if deleted {
                Ok(None)
            } else {
                Ok(Some(conflict_for(
                    entry,
                    "item was modified or removed after the import",
                )))
            }
        }
        JournalOp::Updated => {
            let before = entry.before_snapshot()?.ok_or_else(|| {
                CoreError::Internal(format!(
                    "Journal entry ({}, {}) is 'updated' but has no before state",
                    entry.batch_id, entry.sequence_no
                ))
            })?;
            let restored =
                DictionaryItemRepo::restore_checked(pool, after.version, &before).await?;
            if restored.is_some() {
                Ok(None)
            } else {
                Ok(Some(conflict_for(
                    entry,
                    "item was modified or removed after the import",
                )))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Redo
// ---------------------------------------------------------------------------

/// Re-apply a rolled-back batch by replaying its journal forward.
///
/// Preconditions (checked again under the dictionary lock): the batch is
/// `rolled_back` and is its dictionary's current redo top.
pub async fn redo_batch(
    pool: &PgPool,
    event_bus: &EventBus,
    batch_id: DbId,
    performed_by: Option<&str>,
) -> Result<ReplayOutcome, AppError> {
    let batch = load_batch(pool, batch_id).await?;
    ensure_redoable(&batch)?;

    let lock = DictionaryLock::acquire(pool, &batch.dictionary_code).await?;

    let batch = load_batch(pool, batch_id).await?;
    ensure_redoable(&batch)?;
    let pointers = load_pointers(pool, &batch.dictionary_code).await?;
    ensure_redo_top(batch_id, &pointers)?;

    let entries = ChangeJournalRepo::list_by_batch(pool, batch_id).await?;
    let entries_total = entries.len();

    let mut conflicts: Vec<EntryConflict> = Vec::new();
    let mut entries_applied = 0usize;
    let mut recreated_any = false;
    for entry in &entries {
        match reapply_entry(pool, entry).await? {
            None => {
                entries_applied += 1;
                if entry.op()? == JournalOp::Created {
                    recreated_any = true;
                }
            }
            Some(conflict) => conflicts.push(conflict),
        }
    }

    if recreated_any {
        DictionaryItemRepo::sync_id_sequence(pool).await?;
    }

    if conflicts.is_empty() {
        let mut tx = pool.begin().await?;
        let updated = ImportBatchRepo::mark_redone(&mut *tx, batch_id).await?;
        UndoStackRepo::set_tops(&mut *tx, &batch.dictionary_code, &after_redone(batch_id))
            .await?;
        tx.commit().await?;
        lock.release().await?;

        tracing::info!(
            batch_id,
            entries = entries_applied,
            performed_by,
            "Batch re-applied",
        );
        event_bus.publish(
            PlatformEvent::new(EVENT_IMPORT_REDONE, &batch.dictionary_code, batch_id)
                .with_payload(serde_json::json!({
                    "entries_reapplied": entries_applied,
                })),
        );

        Ok(ReplayOutcome {
            batch: updated,
            entries_total,
            entries_applied,
            conflicts,
        })
    } else {
        lock.release().await?;
        tracing::warn!(
            batch_id,
            conflicts = conflicts.len(),
            applied = entries_applied,
            "Redo hit conflicts; batch stays rolled back and pointers are unchanged",
        );
        Ok(ReplayOutcome {
            batch,
            entries_total,
            entries_applied,
            conflicts,
        })
    }
}

/// Re-apply one journal entry, oldest-first.
///
/// The expected current state is whatever the undo left behind:
/// absence for `created` entries, `before_state` for `updated` entries.
async fn reapply_entry(
    pool: &PgPool,
    entry: &ChangeJournalEntry,
) -> Result<Option<EntryConflict>, AppError> {
    let after = entry.after_snapshot()?;
    match entry.op()? {
        JournalOp::Created => {
            if DictionaryItemRepo::find_by_id(pool, entry.item_id)
                .await?
                .is_some()
            {
                return Ok(Some(conflict_for(entry, "item id is already occupied")));
            }
            if DictionaryItemRepo::find_by_code(pool, &after.dictionary_code, &after.code)
                .await?
                .is_some()
            {
                return Ok(Some(conflict_for(
                    entry,
                    "an item with the same code was created after the undo",
                )));
            }
            DictionaryItemRepo::restore_created(pool, &after).await?;
            Ok(None)
        }
        JournalOp::Updated => {
            let before = entry.before_snapshot()?.ok_or_else(|| {
                CoreError::Internal(format!(
                    "Journal entry ({}, {}) is 'updated' but has no before state",
                    entry.batch_id, entry.sequence_no
                ))
            })?;
            let reapplied =
                DictionaryItemRepo::restore_checked(pool, before.version, &after).await?;
            if reapplied.is_some() {
                Ok(None)
            } else {
                Ok(Some(conflict_for(
                    entry,
                    "item was modified after the undo",
                )))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

async fn load_batch(pool: &PgPool, batch_id: DbId) -> Result<ImportBatch, AppError> {
    ImportBatchRepo::find_by_id(pool, batch_id)
        .await?
        .ok_or_else(|| {
            CoreError::NotFound {
                entity: "ImportBatch",
                id: batch_id,
            }
            .into()
        })
}

async fn load_pointers(pool: &PgPool, dictionary_code: &str) -> Result<StackPointers, AppError> {
    Ok(UndoStackRepo::get(pool, dictionary_code)
        .await?
        .map(|stack| stack.pointers())
        .unwrap_or_default())
}

fn ensure_undoable(batch: &ImportBatch) -> Result<(), AppError> {
    if can_undo_batch(batch.status_enum()?) {
        Ok(())
    } else {
        Err(CoreError::InvalidState(format!(
            "batch {} is '{}'; only completed batches can be undone",
            batch.id, batch.status
        ))
        .into())
    }
}

fn ensure_redoable(batch: &ImportBatch) -> Result<(), AppError> {
    if can_redo_batch(batch.status_enum()?) {
        Ok(())
    } else {
        Err(CoreError::InvalidState(format!(
            "batch {} is '{}'; only rolled-back batches can be redone",
            batch.id, batch.status
        ))
        .into())
    }
}

fn conflict_for(entry: &ChangeJournalEntry, reason: &str) -> EntryConflict {
    EntryConflict {
        sequence_no: entry.sequence_no,
        item_id: entry.item_id,
        reason: reason.to_string(),
    }
}
