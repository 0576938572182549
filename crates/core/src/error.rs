use crate::types::DbId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// The batch is not in the status the operation requires.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The batch is not the current undo/redo top of its dictionary.
    #[error("Not top of stack: {0}")]
    NotTopOfStack(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
