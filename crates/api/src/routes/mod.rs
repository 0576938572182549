pub mod health;
pub mod import;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /dictionaries/{code}/import              run a bulk import (POST)
/// /dictionaries/{code}/import/history      import history (GET)
/// /import/batches/{id}                     batch detail (GET), purge (DELETE)
/// /import/batches/{id}/journal             journal entries (GET)
/// /import/batches/{id}/capabilities        can_undo / can_redo (GET)
/// /import/batches/{id}/undo                roll back (POST)
/// /import/batches/{id}/redo                re-apply (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().merge(import::import_router())
}
