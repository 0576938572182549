//! Handlers for dictionary bulk import, undo/redo, history, and journal
//! inspection.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use refdata_core::dictionary::{validate_dictionary_code, validate_rows, ImportRow};
use refdata_core::error::CoreError;
use refdata_core::import::{can_delete_history, ImportMode};
use refdata_core::types::DbId;
use refdata_core::undo::capabilities_for;
use refdata_db::repositories::{ChangeJournalRepo, ImportBatchRepo, UndoStackRepo};

use crate::engine;
use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request DTOs
// ---------------------------------------------------------------------------

/// Request body for a bulk import.
#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    #[serde(default)]
    pub file_name: Option<String>,
    pub import_mode: String,
    #[serde(default)]
    pub skip_errors: bool,
    /// Operator tag supplied by the upstream auth layer; persisted verbatim.
    #[serde(default)]
    pub performed_by: Option<String>,
    pub rows: Vec<ImportRow>,
}

/// Request body for undo/redo.
#[derive(Debug, Default, Deserialize)]
pub struct UndoRedoRequest {
    #[serde(default)]
    pub performed_by: Option<String>,
}

// ---------------------------------------------------------------------------
// Import
// ---------------------------------------------------------------------------

/// POST /dictionaries/{code}/import
///
/// Run a bulk import against one dictionary. Returns the finalized batch,
/// including counts and the row-level error log.
pub async fn import_dictionary(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Json(body): Json<ImportRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<refdata_db::models::import_batch::ImportBatch>>)> {
    validate_dictionary_code(&code)?;
    let mode = ImportMode::from_str(&body.import_mode)?;
    validate_rows(&body.rows)?;

    let batch = engine::import::run_import(
        &state.pool,
        &state.event_bus,
        &code,
        mode,
        &body.rows,
        body.skip_errors,
        body.file_name.as_deref().unwrap_or(""),
        body.performed_by.as_deref(),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(DataResponse { data: batch })))
}

/// GET /dictionaries/{code}/import/history
///
/// Import history for one dictionary, newest first.
pub async fn get_history(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> AppResult<impl IntoResponse> {
    validate_dictionary_code(&code)?;
    let batches = ImportBatchRepo::list_by_dictionary(&state.pool, &code).await?;
    Ok(Json(DataResponse { data: batches }))
}

// ---------------------------------------------------------------------------
// Batch detail & journal
// ---------------------------------------------------------------------------

/// GET /import/batches/{id}
pub async fn get_batch(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let batch = ImportBatchRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "ImportBatch",
            id,
        })?;
    Ok(Json(DataResponse { data: batch }))
}

/// GET /import/batches/{id}/journal
///
/// The batch's journal entries in sequence order, for inspection.
pub async fn get_journal(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    // 404 for unknown batches rather than an empty list.
    ImportBatchRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "ImportBatch",
            id,
        })?;
    let entries = ChangeJournalRepo::list_by_batch(&state.pool, id).await?;
    Ok(Json(DataResponse { data: entries }))
}

/// GET /import/batches/{id}/capabilities
///
/// Whether the batch can currently be undone or redone, as a pure function
/// of its status and its dictionary's stack pointers.
pub async fn get_capabilities(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let batch = ImportBatchRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "ImportBatch",
            id,
        })?;
    let pointers = UndoStackRepo::get(&state.pool, &batch.dictionary_code)
        .await?
        .map(|stack| stack.pointers())
        .unwrap_or_default();

    let caps = capabilities_for(id, batch.status_enum()?, &pointers);
    Ok(Json(DataResponse { data: caps }))
}

// ---------------------------------------------------------------------------
// Undo / redo
// ---------------------------------------------------------------------------

/// POST /import/batches/{id}/undo
///
/// Roll back the batch. Rejected unless the batch is completed and is its
/// dictionary's undo top. Per-entry conflicts are reported in the outcome
/// without moving the stack.
pub async fn undo_import(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(body): Json<UndoRedoRequest>,
) -> AppResult<impl IntoResponse> {
    let outcome = engine::undo::undo_batch(
        &state.pool,
        &state.event_bus,
        id,
        body.performed_by.as_deref(),
    )
    .await?;
    Ok(Json(DataResponse { data: outcome }))
}

/// POST /import/batches/{id}/redo
///
/// Re-apply the most recently undone batch. Same conflict discipline as
/// undo, replayed forward.
pub async fn redo_import(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(body): Json<UndoRedoRequest>,
) -> AppResult<impl IntoResponse> {
    let outcome = engine::undo::redo_batch(
        &state.pool,
        &state.event_bus,
        id,
        body.performed_by.as_deref(),
    )
    .await?;
    Ok(Json(DataResponse { data: outcome }))
}

// ---------------------------------------------------------------------------
// History purge
// ---------------------------------------------------------------------------

/// DELETE /import/batches/{id}
///
/// Purge a batch and its journal from history. Rejected while the batch is
/// running or is a current undo/redo top.
pub async fn delete_batch(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    let batch = ImportBatchRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "ImportBatch",
            id,
        })?;

    if !can_delete_history(batch.status_enum()?) {
        return Err(CoreError::InvalidState(format!(
            "batch {id} is '{}'; running batches cannot be purged",
            batch.status
        ))
        .into());
    }

    if let Some(stack) = UndoStackRepo::get(&state.pool, &batch.dictionary_code).await? {
        if stack.undo_top == Some(id) || stack.redo_top == Some(id) {
            return Err(CoreError::Conflict(format!(
                "batch {id} is the current undo/redo top for dictionary '{}'",
                batch.dictionary_code
            ))
            .into());
        }
    }

    ImportBatchRepo::delete(&state.pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
