//! Note domain model.
//!
//! # Responsibility
//! - Define the read model rendered by presentation layers.
//! - Validate draft input before anything reaches the store.
//!
//! # Invariants
//! - `title` and `content` of a draft are non-empty after trimming before a
//!   write is attempted.
//! - `created_at` is `Pending` until the store commits the write.

use chrono::{DateTime, Local, TimeZone, Utc};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Label rendered for notes whose timestamp has not been committed yet.
pub const PENDING_TIMESTAMP_LABEL: &str = "Just now";
const COMMITTED_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Opaque store-assigned note identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NoteId(String);

impl NoteId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for NoteId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NoteId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for NoteId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Server-assigned creation time.
///
/// A write carries a "use commit time" sentinel; until the store has
/// committed and re-read it, readers observe `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Timestamp {
    /// Write accepted, commit time not yet visible.
    Pending,
    /// Commit time in Unix epoch milliseconds.
    Committed(i64),
}

impl Timestamp {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Returns the committed epoch milliseconds, if any.
    pub fn epoch_ms(&self) -> Option<i64> {
        match self {
            Self::Pending => None,
            Self::Committed(value) => Some(*value),
        }
    }

    /// Renders the timestamp as a date-time in `tz`.
    ///
    /// `Pending` renders as [`PENDING_TIMESTAMP_LABEL`]; a committed value
    /// outside chrono's range falls back to raw milliseconds.
    pub fn render_in<Tz: TimeZone>(&self, tz: &Tz) -> String
    where
        Tz::Offset: Display,
    {
        match self {
            Self::Pending => PENDING_TIMESTAMP_LABEL.to_string(),
            Self::Committed(epoch_ms) => match DateTime::<Utc>::from_timestamp_millis(*epoch_ms) {
                Some(utc) => utc
                    .with_timezone(tz)
                    .format(COMMITTED_TIMESTAMP_FORMAT)
                    .to_string(),
                None => epoch_ms.to_string(),
            },
        }
    }
}

/// Local date-time, or "Just now" while pending.
impl Display for Timestamp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.render_in(&Local))
    }
}

/// One persisted note as last read from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    pub id: NoteId,
    pub title: String,
    pub content: String,
    pub created_at: Timestamp,
}

/// Validation failures for note input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteValidationError {
    EmptyTitle,
    EmptyContent,
}

impl Display for NoteValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTitle => write!(f, "note title must not be empty"),
            Self::EmptyContent => write!(f, "note content must not be empty"),
        }
    }
}

impl Error for NoteValidationError {}

/// Cached form input for a note that has not been submitted yet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteDraft {
    pub title: String,
    pub content: String,
}

impl NoteDraft {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
        }
    }

    /// Checks that both parts are non-empty after trimming.
    ///
    /// The stored values are not trimmed; only the emptiness check is.
    pub fn validate(&self) -> Result<(), NoteValidationError> {
        if self.title.trim().is_empty() {
            return Err(NoteValidationError::EmptyTitle);
        }
        if self.content.trim().is_empty() {
            return Err(NoteValidationError::EmptyContent);
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_empty() && self.content.is_empty()
    }

    pub fn clear(&mut self) {
        self.title.clear();
        self.content.clear();
    }
}
