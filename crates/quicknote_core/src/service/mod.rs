//! Use-case services.
//!
//! # Responsibility
//! - Orchestrate store calls into the note use-cases the UI triggers.
//! - Keep presentation layers decoupled from store details.

pub mod note_sync;
pub mod presenter;
