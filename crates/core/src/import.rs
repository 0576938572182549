//! Import batch vocabulary: modes, batch status machine, journal operation
//! tags, and row-level error formatting for the batch error log.

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Import mode
// ---------------------------------------------------------------------------

/// How a batch resolves each row against the existing dictionary.
///
/// A closed variant so adding a mode is a compile-time-checked change in
/// every match over it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportMode {
    /// Every row must be new; an existing code is a row error.
    Create,
    /// Every row must match an existing code; a missing code is a row error.
    Update,
    /// Create when missing, update when present.
    Upsert,
}

impl ImportMode {
    /// Return the database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Upsert => "upsert",
        }
    }

    /// Parse from a string, returning an error for unknown modes.
    pub fn from_str(s: &str) -> Result<Self, CoreError> {
        match s {
            "create" => Ok(Self::Create),
            "update" => Ok(Self::Update),
            "upsert" => Ok(Self::Upsert),
            other => Err(CoreError::Validation(format!(
                "Unknown import mode: '{other}'. Valid modes: {}",
                Self::ALL.join(", ")
            ))),
        }
    }

    /// All valid mode values.
    pub const ALL: &'static [&'static str] = &["create", "update", "upsert"];
}

impl std::fmt::Display for ImportMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Batch status
// ---------------------------------------------------------------------------

/// Lifecycle status of an import batch.
///
/// pending -> in_progress -> {completed, failed};
/// completed -> rolled_back (undo); rolled_back -> completed (redo).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    RolledBack,
}

impl BatchStatus {
    /// Return the database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::RolledBack => "rolled_back",
        }
    }

    /// Parse from a string, returning an error for unknown statuses.
    pub fn from_str(s: &str) -> Result<Self, CoreError> {
        match s {
            "pending" => Ok(Self::Pending),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "rolled_back" => Ok(Self::RolledBack),
            other => Err(CoreError::Validation(format!(
                "Unknown batch status: '{other}'. Valid statuses: {}",
                Self::ALL.join(", ")
            ))),
        }
    }

    /// All valid status values.
    pub const ALL: &'static [&'static str] = &[
        "pending",
        "in_progress",
        "completed",
        "failed",
        "rolled_back",
    ];
}

impl std::fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Only completed batches can be undone.
pub fn can_undo_batch(status: BatchStatus) -> bool {
    matches!(status, BatchStatus::Completed)
}

/// Only rolled-back batches can be redone.
pub fn can_redo_batch(status: BatchStatus) -> bool {
    matches!(status, BatchStatus::RolledBack)
}

/// A batch may be purged from history once it is no longer running.
/// The stack-top restriction is checked separately against the
/// dictionary's stack pointers.
pub fn can_delete_history(status: BatchStatus) -> bool {
    !matches!(status, BatchStatus::Pending | BatchStatus::InProgress)
}

// ---------------------------------------------------------------------------
// Journal operation
// ---------------------------------------------------------------------------

/// What a journal entry did to its item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JournalOp {
    /// The batch inserted the item; `before_state` is NULL.
    Created,
    /// The batch overwrote an existing item.
    Updated,
}

impl JournalOp {
    /// Return the database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
        }
    }

    /// Parse from a string, returning an error for unknown operations.
    pub fn from_str(s: &str) -> Result<Self, CoreError> {
        match s {
            "created" => Ok(Self::Created),
            "updated" => Ok(Self::Updated),
            other => Err(CoreError::Validation(format!(
                "Unknown journal operation: '{other}'"
            ))),
        }
    }
}

impl std::fmt::Display for JournalOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Row-level errors
// ---------------------------------------------------------------------------

/// A recoverable per-row failure recorded in the batch error log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowError {
    /// Create-mode target already exists.
    CodeAlreadyExists(String),
    /// Update-mode target does not exist.
    CodeNotFound(String),
}

impl std::fmt::Display for RowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CodeAlreadyExists(code) => write!(f, "CodeAlreadyExists({code})"),
            Self::CodeNotFound(code) => write!(f, "CodeNotFound({code})"),
        }
    }
}

/// Render one error-log line for a failed row. Row numbers are 1-based.
pub fn format_row_error(row_no: usize, error: &RowError) -> String {
    format!("Row {row_no}: {error}")
}

/// Render the error-log line for the row on which a storage fault killed
/// the batch.
pub fn format_row_aborted(row_no: usize) -> String {
    format!("Row {row_no}: aborted by storage error")
}

/// Render the error-log summary line for rows the batch never reached.
pub fn format_unprocessed_range(first: usize, last: usize) -> String {
    if first == last {
        format!("Row {first}: not processed (batch aborted)")
    } else {
        format!("Rows {first}-{last}: not processed (batch aborted)")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
