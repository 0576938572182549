//! In-process event fan-out for import/undo/redo notifications.

pub mod bus;

pub use bus::{EventBus, PlatformEvent};
pub use bus::{EVENT_IMPORT_COMPLETED, EVENT_IMPORT_REDONE, EVENT_IMPORT_UNDONE};
