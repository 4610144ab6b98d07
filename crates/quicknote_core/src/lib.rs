//! Core logic for QuickNote.
//! Keeps a local note list in step with a document store.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod service;
pub mod store;

pub use config::{ConfigError, SyncConfig};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::note::{Note, NoteDraft, NoteId, NoteValidationError, Timestamp};
pub use service::note_sync::{NoteSynchronizer, RemoveOutcome, SyncError};
pub use service::presenter::{Notification, Presenter};
pub use store::{
    Document, DocumentFields, DocumentId, DocumentStore, FieldValue, MemoryDocumentStore,
    OrderDirection, SqliteDocumentStore, StoreError, StoreResult,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
