//! Domain model for persisted notes and draft input.
//!
//! # Responsibility
//! - Define the note shape projected from store documents.
//! - Keep the pending/committed timestamp distinction explicit in types.
//!
//! # Invariants
//! - Every note is identified by a store-assigned `NoteId`.
//! - Notes are never edited in place; deletion is a hard delete in the store.

pub mod note;
