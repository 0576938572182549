//! Route definitions for bulk import and undo/redo.
//!
//! Mounted under `/api/v1` by `api_routes()`.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::import;
use crate::state::AppState;

/// Bulk import and undo/redo routes.
pub fn import_router() -> Router<AppState> {
    Router::new()
        .route(
            "/dictionaries/{code}/import",
            post(import::import_dictionary),
        )
        .route(
            "/dictionaries/{code}/import/history",
            get(import::get_history),
        )
        .route(
            "/import/batches/{id}",
            get(import::get_batch).delete(import::delete_batch),
        )
        .route("/import/batches/{id}/journal", get(import::get_journal))
        .route(
            "/import/batches/{id}/capabilities",
            get(import::get_capabilities),
        )
        .route("/import/batches/{id}/undo", post(import::undo_import))
        .route("/import/batches/{id}/redo", post(import::redo_import))
}
