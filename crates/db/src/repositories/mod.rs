//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept an `impl PgExecutor` as the first argument, so the same query
//! runs against the pool or inside a caller-owned transaction.

pub mod dictionary_item_repo;
pub mod import_batch_repo;
pub mod journal_repo;
pub mod undo_stack_repo;

pub use dictionary_item_repo::DictionaryItemRepo;
pub use import_batch_repo::ImportBatchRepo;
pub use journal_repo::ChangeJournalRepo;
pub use undo_stack_repo::UndoStackRepo;
