//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - A `Deserialize` create DTO for inserts
//! - Typed accessors that lift stored strings/JSONB into core enums and
//!   snapshots

pub mod dictionary_item;
pub mod import_batch;
pub mod journal_entry;
pub mod undo_stack;
