//! The import executor.
//!
//! Applies a structurally validated batch of rows to one dictionary under
//! a single import mode, producing exactly one batch record and its change
//! journal, then pushes the completed batch onto the dictionary's undo
//! stack (which invalidates any stale redo history).
//!
//! Atomicity policy:
//! - strict (`skip_errors = false`): item writes, journal writes, batch
//!   finalization and the stack push all share one transaction. Any row
//!   error rolls the whole transaction back -- zero item mutations and
//!   zero journal rows survive, and the batch finalizes as `failed`.
//! - lenient (`skip_errors = true`): each row commits in its own small
//!   transaction (item write + journal entry together), so rows applied
//!   before a storage fault are retained and the batch finalizes as
//!   `failed` with every row accounted for.

use sqlx::{PgConnection, PgPool};

use refdata_core::dictionary::ImportRow;
use refdata_core::error::CoreError;
use refdata_core::import::{
    format_row_aborted, format_row_error, format_unprocessed_range, BatchStatus, ImportMode,
    JournalOp, RowError,
};
use refdata_core::types::DbId;
use refdata_core::undo::after_push;
use refdata_db::models::dictionary_item::{
    CreateDictionaryItem, DictionaryItem, ItemSnapshot, UpdateItemFields,
};
use refdata_db::models::import_batch::{CreateImportBatch, ImportBatch};
use refdata_db::models::journal_entry::CreateJournalEntry;
use refdata_db::repositories::{
    ChangeJournalRepo, DictionaryItemRepo, ImportBatchRepo, UndoStackRepo,
};
use refdata_db::DictionaryLock;
use refdata_events::{EventBus, PlatformEvent, EVENT_IMPORT_COMPLETED};

use crate::error::AppError;

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Execute one bulk import. Rows must already be structurally valid
/// (callers run `refdata_core::dictionary::validate_rows` first).
///
/// Always returns with the batch in a terminal status; a storage fault
/// finalizes the batch as `failed` before the error propagates.
pub async fn run_import(
    pool: &PgPool,
    event_bus: &EventBus,
    dictionary_code: &str,
    mode: ImportMode,
    rows: &[ImportRow],
    skip_errors: bool,
    file_name: &str,
    performed_by: Option<&str>,
) -> Result<ImportBatch, AppError> {
    let lock = DictionaryLock::acquire(pool, dictionary_code).await?;

    let batch = ImportBatchRepo::create(
        pool,
        &CreateImportBatch {
            dictionary_code: dictionary_code.to_string(),
            file_name: file_name.to_string(),
            import_mode: mode.as_str().to_string(),
            total_records: rows.len() as i32,
            performed_by: performed_by.map(str::to_string),
        },
    )
    .await?;
    ImportBatchRepo::update_status(pool, batch.id, BatchStatus::InProgress).await?;

    tracing::info!(
        batch_id = batch.id,
        dictionary_code,
        mode = %mode,
        rows = rows.len(),
        skip_errors,
        "Import started",
    );

    let total = rows.len();
    let batch = if skip_errors {
        match apply_lenient(pool, dictionary_code, mode, rows, batch.id).await {
            Ok(applied) => {
                let failed = applied.errors.len() as i32;
                let finalized = ImportBatchRepo::finalize(
                    pool,
                    batch.id,
                    BatchStatus::Completed,
                    applied.successful,
                    failed,
                    &applied.errors,
                )
                .await?;
                // Row commits already happened, so the push is its own
                // statement; it still runs under the dictionary lock.
                UndoStackRepo::set_tops(pool, dictionary_code, &after_push(batch.id)).await?;
                finalized
            }
            Err(fault) => {
                let batch =
                    finalize_faulted(pool, batch.id, total, fault.successful, fault.errors, fault.row_no)
                        .await?;
                lock.release().await?;
                tracing::error!(batch_id = batch.id, "Import aborted by storage fault");
                return Err(fault.fault);
            }
        }
    } else {
        match apply_strict(pool, dictionary_code, mode, rows, batch.id).await {
            Ok(StrictResult::Committed(batch)) => batch,
            Ok(StrictResult::Discarded(errors)) => {
                // Entire batch voided: every row counts as failed.
                ImportBatchRepo::finalize(
                    pool,
                    batch.id,
                    BatchStatus::Failed,
                    0,
                    total as i32,
                    &errors,
                )
                .await?
            }
            Err(fault) => {
                let batch = finalize_faulted(
                    pool,
                    batch.id,
                    total,
                    fault.successful,
                    fault.errors,
                    fault.row_no,
                )
                .await?;
                lock.release().await?;
                tracing::error!(batch_id = batch.id, "Import aborted by storage fault");
                return Err(fault.fault);
            }
        }
    };

    lock.release().await?;

    let status = batch.status_enum()?;
    tracing::info!(
        batch_id = batch.id,
        status = %batch.status,
        successful = batch.successful_records,
        failed = batch.failed_records,
        "Import finished",
    );

    if status == BatchStatus::Completed {
        event_bus.publish(
            PlatformEvent::new(EVENT_IMPORT_COMPLETED, dictionary_code, batch.id).with_payload(
                serde_json::json!({
                    "successful_records": batch.successful_records,
                    "failed_records": batch.failed_records,
                }),
            ),
        );
    }

    Ok(batch)
}

// ---------------------------------------------------------------------------
// Strict application (all-or-nothing)
// ---------------------------------------------------------------------------

enum StrictResult {
    /// Everything applied; the returned batch is finalized `completed` and
    /// already pushed onto the stack.
    Committed(ImportBatch),
    /// At least one row failed; the transaction was rolled back and the
    /// collected error-log lines are returned for finalization.
    Discarded(Vec<String>),
}

/// A storage fault that killed the batch mid-application.
struct ApplyFault {
    /// 1-based number of the row being applied when the fault hit.
    row_no: usize,
    /// Rows committed before the fault (always 0 in strict mode).
    successful: i32,
    /// Row-error lines collected before the fault.
    errors: Vec<String>,
    fault: AppError,
}

async fn apply_strict(
    pool: &PgPool,
    dictionary_code: &str,
    mode: ImportMode,
    rows: &[ImportRow],
    batch_id: DbId,
) -> Result<StrictResult, ApplyFault> {
    let mut errors: Vec<String> = Vec::new();

    let mut tx = pool
        .begin()
        .await
        .map_err(|e| strict_fault(1, &errors, e.into()))?;

    let mut sequence_no: i32 = 0;
    for (idx, row) in rows.iter().enumerate() {
        let row_no = idx + 1;
        let outcome = apply_row(&mut *tx, dictionary_code, mode, row)
            .await
            .map_err(|e| strict_fault(row_no, &errors, e))?;
        match outcome {
            RowOutcome::Applied(applied) => {
                sequence_no += 1;
                let entry = applied
                    .into_journal_entry(batch_id, sequence_no)
                    .map_err(|e| strict_fault(row_no, &errors, e.into()))?;
                ChangeJournalRepo::append(&mut *tx, &entry)
                    .await
                    .map_err(|e| strict_fault(row_no, &errors, e.into()))?;
            }
            RowOutcome::Failed(row_error) => {
                errors.push(format_row_error(row_no, &row_error));
            }
        }
    }

    if errors.is_empty() {
        let last_row = rows.len();
        let batch = ImportBatchRepo::finalize(
            &mut *tx,
            batch_id,
            BatchStatus::Completed,
            sequence_no,
            0,
            &[],
        )
        .await
        .map_err(|e| strict_fault(last_row, &errors, e.into()))?;
        UndoStackRepo::set_tops(&mut *tx, dictionary_code, &after_push(batch_id))
            .await
            .map_err(|e| strict_fault(last_row, &errors, e.into()))?;
        tx.commit()
            .await
            .map_err(|e| strict_fault(last_row, &errors, e.into()))?;
        Ok(StrictResult::Committed(batch))
    } else {
        // Dropping the transaction also rolls back; be explicit about it.
        if let Err(e) = tx.rollback().await {
            return Err(strict_fault(rows.len(), &errors, e.into()));
        }
        Ok(StrictResult::Discarded(errors))
    }
}

fn strict_fault(row_no: usize, errors: &[String], fault: AppError) -> ApplyFault {
    ApplyFault {
        row_no,
        successful: 0,
        errors: errors.to_vec(),
        fault,
    }
}

// ---------------------------------------------------------------------------
// Lenient application (commit row-by-row)
// ---------------------------------------------------------------------------

struct LenientApplied {
    successful: i32,
    errors: Vec<String>,
}

async fn apply_lenient(
    pool: &PgPool,
    dictionary_code: &str,
    mode: ImportMode,
    rows: &[ImportRow],
    batch_id: DbId,
) -> Result<LenientApplied, ApplyFault> {
    let mut successful: i32 = 0;
    let mut errors: Vec<String> = Vec::new();
    let mut sequence_no: i32 = 0;

    for (idx, row) in rows.iter().enumerate() {
        let row_no = idx + 1;
        let fault = |e: AppError, errors: &[String], successful: i32| ApplyFault {
            row_no,
            successful,
            errors: errors.to_vec(),
            fault: e,
        };

        let mut tx = pool
            .begin()
            .await
            .map_err(|e| fault(e.into(), &errors, successful))?;
        match apply_row(&mut *tx, dictionary_code, mode, row)
            .await
            .map_err(|e| fault(e, &errors, successful))?
        {
            RowOutcome::Applied(applied) => {
                sequence_no += 1;
                let entry = applied
                    .into_journal_entry(batch_id, sequence_no)
                    .map_err(|e| fault(e.into(), &errors, successful))?;
                ChangeJournalRepo::append(&mut *tx, &entry)
                    .await
                    .map_err(|e| fault(e.into(), &errors, successful))?;
                tx.commit()
                    .await
                    .map_err(|e| fault(e.into(), &errors, successful))?;
                successful += 1;
            }
            RowOutcome::Failed(row_error) => {
                tx.rollback()
                    .await
                    .map_err(|e| fault(e.into(), &errors, successful))?;
                errors.push(format_row_error(row_no, &row_error));
            }
        }
    }

    Ok(LenientApplied { successful, errors })
}

/// Finalize a batch killed by a storage fault so it never stays
/// `in_progress`: counts cover every row, and the error log records the
/// faulted row plus the unprocessed tail.
async fn finalize_faulted(
    pool: &PgPool,
    batch_id: DbId,
    total: usize,
    successful: i32,
    mut errors: Vec<String>,
    faulted_row_no: usize,
) -> Result<ImportBatch, AppError> {
    errors.push(format_row_aborted(faulted_row_no));
    if faulted_row_no < total {
        errors.push(format_unprocessed_range(faulted_row_no + 1, total));
    }
    let failed = total as i32 - successful;
    Ok(ImportBatchRepo::finalize(pool, batch_id, BatchStatus::Failed, successful, failed, &errors)
        .await?)
}

// ---------------------------------------------------------------------------
// Per-row resolution
// ---------------------------------------------------------------------------

/// What one row did, carrying the snapshots the journal needs.
enum RowOutcome {
    Applied(AppliedRow),
    Failed(RowError),
}

struct AppliedRow {
    item_id: DbId,
    operation: JournalOp,
    before: Option<ItemSnapshot>,
    after: ItemSnapshot,
}

impl AppliedRow {
    fn into_journal_entry(
        self,
        batch_id: DbId,
        sequence_no: i32,
    ) -> Result<CreateJournalEntry, CoreError> {
        Ok(CreateJournalEntry {
            batch_id,
            sequence_no,
            item_id: self.item_id,
            operation: self.operation,
            before_state: self.before.map(|s| s.to_value()).transpose()?,
            after_state: self.after.to_value()?,
        })
    }
}

/// Resolve one row against the store: look up the `(dictionary_code, code)`
/// target, then dispatch to the mode's resolution function.
async fn apply_row(
    conn: &mut PgConnection,
    dictionary_code: &str,
    mode: ImportMode,
    row: &ImportRow,
) -> Result<RowOutcome, AppError> {
    let existing = DictionaryItemRepo::find_by_code(&mut *conn, dictionary_code, &row.code).await?;

    match mode {
        ImportMode::Create => resolve_create(conn, dictionary_code, row, existing).await,
        ImportMode::Update => resolve_update(conn, row, existing).await,
        ImportMode::Upsert => resolve_upsert(conn, dictionary_code, row, existing).await,
    }
}

async fn resolve_create(
    conn: &mut PgConnection,
    dictionary_code: &str,
    row: &ImportRow,
    existing: Option<DictionaryItem>,
) -> Result<RowOutcome, AppError> {
    if existing.is_some() {
        return Ok(RowOutcome::Failed(RowError::CodeAlreadyExists(
            row.code.clone(),
        )));
    }
    insert_item(conn, dictionary_code, row).await
}

async fn resolve_update(
    conn: &mut PgConnection,
    row: &ImportRow,
    existing: Option<DictionaryItem>,
) -> Result<RowOutcome, AppError> {
    match existing {
        None => Ok(RowOutcome::Failed(RowError::CodeNotFound(row.code.clone()))),
        Some(item) => overwrite_item(conn, item, row).await,
    }
}

async fn resolve_upsert(
    conn: &mut PgConnection,
    dictionary_code: &str,
    row: &ImportRow,
    existing: Option<DictionaryItem>,
) -> Result<RowOutcome, AppError> {
    match existing {
        None => insert_item(conn, dictionary_code, row).await,
        Some(item) => overwrite_item(conn, item, row).await,
    }
}

async fn insert_item(
    conn: &mut PgConnection,
    dictionary_code: &str,
    row: &ImportRow,
) -> Result<RowOutcome, AppError> {
    let created = DictionaryItemRepo::insert(
        &mut *conn,
        &CreateDictionaryItem {
            dictionary_code: dictionary_code.to_string(),
            code: row.code.clone(),
            name: row.name.clone(),
            name_en: row.name_en.clone(),
            name_ru: row.name_ru.clone(),
            name_uz: row.name_uz.clone(),
            icon: row.icon.clone(),
            color: row.color.clone(),
            symbol: row.symbol.clone(),
            sort_order: row.sort_order.unwrap_or(0),
            is_active: row.is_active.unwrap_or(true),
        },
    )
    .await?;

    Ok(RowOutcome::Applied(AppliedRow {
        item_id: created.id,
        operation: JournalOp::Created,
        before: None,
        after: ItemSnapshot::from(&created),
    }))
}

async fn overwrite_item(
    conn: &mut PgConnection,
    item: DictionaryItem,
    row: &ImportRow,
) -> Result<RowOutcome, AppError> {
    let before = ItemSnapshot::from(&item);
    let updated = DictionaryItemRepo::update_merge_checked(
        &mut *conn,
        item.id,
        item.version,
        &UpdateItemFields {
            name: row.name.clone(),
            name_en: row.name_en.clone(),
            name_ru: row.name_ru.clone(),
            name_uz: row.name_uz.clone(),
            icon: row.icon.clone(),
            color: row.color.clone(),
            symbol: row.symbol.clone(),
            sort_order: row.sort_order,
            is_active: row.is_active,
        },
    )
    .await?
    // The advisory lock excludes competing imports, so a version miss here
    // means a direct edit slipped between lookup and write. Treat it as
    // fatal; the batch finalizes as failed.
    .ok_or_else(|| {
        CoreError::Conflict(format!(
            "Item '{}' changed concurrently during import",
            item.code
        ))
    })?;

    Ok(RowOutcome::Applied(AppliedRow {
        item_id: updated.id,
        operation: JournalOp::Updated,
        before: Some(before),
        after: ItemSnapshot::from(&updated),
    }))
}
