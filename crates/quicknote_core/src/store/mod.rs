//! Document store contract and backends.
//!
//! # Responsibility
//! - Define the schema-less document collection interface the synchronizer
//!   talks to.
//! - Keep field ordering rules shared between backends.
//!
//! # Invariants
//! - `FieldValue::ServerTimestamp` is only ever written, never read back;
//!   stores replace it with the commit time or expose it as `Null`.
//! - Listing is ordered by one field; documents whose field is unset sort as
//!   the greatest value. Ties keep insertion order.
//! - No transactional guarantee exists across calls.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::future::Future;
use std::time::{SystemTime, UNIX_EPOCH};

mod memory;
mod sqlite;

pub use memory::{MemoryDocumentStore, StoreCallCounts};
pub use sqlite::SqliteDocumentStore;

/// Store-assigned document identifier.
pub type DocumentId = String;

/// Field map of one document.
pub type DocumentFields = BTreeMap<String, FieldValue>;

pub type StoreResult<T> = Result<T, StoreError>;

/// One field value inside a schema-less document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Null,
    Text(String),
    Integer(i64),
    /// Committed time in Unix epoch milliseconds.
    Timestamp(i64),
    /// Write-only sentinel: "use the commit time of this write".
    ServerTimestamp,
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }
}

/// A document as returned by a list call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub id: DocumentId,
    pub fields: DocumentFields,
}

/// Sort direction for list calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OrderDirection {
    Ascending,
    #[default]
    Descending,
}

/// Store call failure.
///
/// Transient and permanent failures are not distinguished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A list call failed.
    Read(String),
    /// An add or delete call failed.
    Write(String),
    /// Collection name rejected by the store.
    InvalidCollection(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read(message) => write!(f, "store read failed: {message}"),
            Self::Write(message) => write!(f, "store write failed: {message}"),
            Self::InvalidCollection(name) => write!(f, "invalid collection name: `{name}`"),
        }
    }
}

impl Error for StoreError {}

/// Async document collection interface.
///
/// Implementations own the wire/storage details; callers only see documents.
pub trait DocumentStore {
    /// Adds one document and returns its new id.
    fn add_document(
        &self,
        collection: &str,
        fields: DocumentFields,
    ) -> impl Future<Output = StoreResult<DocumentId>>;

    /// Lists every document in `collection` ordered by `order_by`.
    fn list_documents(
        &self,
        collection: &str,
        order_by: &str,
        direction: OrderDirection,
    ) -> impl Future<Output = StoreResult<Vec<Document>>>;

    /// Deletes one document. Deleting a missing id succeeds.
    fn delete_document(&self, collection: &str, id: &str)
        -> impl Future<Output = StoreResult<()>>;
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum SortKey<'a> {
    Number(i64),
    Text(&'a str),
    Unset,
}

fn sort_key(value: Option<&FieldValue>) -> SortKey<'_> {
    match value {
        Some(FieldValue::Integer(value)) | Some(FieldValue::Timestamp(value)) => {
            SortKey::Number(*value)
        }
        Some(FieldValue::Text(value)) => SortKey::Text(value.as_str()),
        Some(FieldValue::Null) | Some(FieldValue::ServerTimestamp) | None => SortKey::Unset,
    }
}

/// Sorts documents in place by one field. The sort is stable.
pub fn sort_documents(documents: &mut [Document], order_by: &str, direction: OrderDirection) {
    documents.sort_by(|left, right| {
        let ordering = sort_key(left.fields.get(order_by)).cmp(&sort_key(right.fields.get(order_by)));
        match direction {
            OrderDirection::Ascending => ordering,
            OrderDirection::Descending => ordering.reverse(),
        }
    });
}

/// Replaces every `ServerTimestamp` sentinel with `commit_ms`.
///
/// Returns the names of the replaced fields.
pub(crate) fn resolve_server_timestamps(fields: &mut DocumentFields, commit_ms: i64) -> Vec<String> {
    let mut resolved = Vec::new();
    for (name, value) in fields.iter_mut() {
        if *value == FieldValue::ServerTimestamp {
            *value = FieldValue::Timestamp(commit_ms);
            resolved.push(name.clone());
        }
    }
    resolved
}

/// Returns the next commit time, strictly greater than `last_commit_ms`.
pub(crate) fn next_commit_ms(last_commit_ms: i64) -> i64 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or(0);
    match now.cmp(&last_commit_ms) {
        Ordering::Greater => now,
        _ => last_commit_ms + 1,
    }
}
