//! Import batch models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use refdata_core::error::CoreError;
use refdata_core::import::BatchStatus;
use refdata_core::types::{DbId, Timestamp};

/// A row from the `import_batches` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ImportBatch {
    pub id: DbId,
    pub dictionary_code: String,
    pub file_name: String,
    pub import_mode: String,
    pub total_records: i32,
    pub successful_records: i32,
    pub failed_records: i32,
    pub status: String,
    /// Ordered JSONB array of row-level error strings.
    pub error_log: serde_json::Value,
    pub performed_by: Option<String>,
    pub rolled_back_at: Option<Timestamp>,
    pub rolled_back_by: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl ImportBatch {
    /// Lift the stored status string into the typed state machine.
    pub fn status_enum(&self) -> Result<BatchStatus, CoreError> {
        BatchStatus::from_str(&self.status)
    }
}

/// DTO for inserting a new batch. Batches always start `pending` with
/// zero success/failure counts.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateImportBatch {
    pub dictionary_code: String,
    pub file_name: String,
    pub import_mode: String,
    pub total_records: i32,
    pub performed_by: Option<String>,
}
