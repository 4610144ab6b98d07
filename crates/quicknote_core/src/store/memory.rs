//! In-process document store.
//!
//! # Responsibility
//! - Back the synchronizer in tests and demos without any I/O.
//! - Simulate deferred timestamp commits and call failures on demand.
//!
//! # Invariants
//! - Clones share the same underlying collections.
//! - Commit times are strictly increasing per store instance.

use super::{
    next_commit_ms, resolve_server_timestamps, sort_documents, Document, DocumentFields,
    DocumentId, DocumentStore, FieldValue, OrderDirection, StoreError, StoreResult,
};
use crate::config::is_valid_collection_name;
use log::debug;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

/// Number of calls each store operation has received.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreCallCounts {
    pub add: usize,
    pub list: usize,
    pub delete: usize,
}

#[derive(Debug, Default)]
struct MemoryState {
    collections: HashMap<String, Vec<Document>>,
    pending: Vec<(String, DocumentId, String)>,
    last_commit_ms: i64,
    defer_commits: bool,
    fail_reads: bool,
    fail_writes: bool,
    calls: StoreCallCounts,
}

/// In-memory `DocumentStore` for testing and local fallback.
#[derive(Clone, Debug, Default)]
pub struct MemoryDocumentStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store whose server timestamps stay `Null` until
    /// [`commit_pending_timestamps`](Self::commit_pending_timestamps) runs.
    pub fn with_deferred_commits() -> Self {
        let store = Self::default();
        store.lock().defer_commits = true;
        store
    }

    /// Makes every following list call fail (or succeed again).
    pub fn fail_reads(&self, fail: bool) {
        self.lock().fail_reads = fail;
    }

    /// Makes every following add/delete call fail (or succeed again).
    pub fn fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    /// Assigns commit times to every deferred server timestamp.
    ///
    /// Returns the number of fields that were committed.
    pub fn commit_pending_timestamps(&self) -> usize {
        let mut state = self.lock();
        let pending = std::mem::take(&mut state.pending);
        let mut committed = 0;
        for (collection, id, field) in pending {
            let commit_ms = next_commit_ms(state.last_commit_ms);
            let Some(document) = state
                .collections
                .get_mut(&collection)
                .and_then(|documents| documents.iter_mut().find(|doc| doc.id == id))
            else {
                continue;
            };
            document
                .fields
                .insert(field, FieldValue::Timestamp(commit_ms));
            state.last_commit_ms = commit_ms;
            committed += 1;
        }
        committed
    }

    /// Returns how many documents `collection` currently holds.
    pub fn document_count(&self, collection: &str) -> usize {
        self.lock()
            .collections
            .get(collection)
            .map_or(0, Vec::len)
    }

    /// Returns a copy of one document, if present.
    pub fn get_document(&self, collection: &str, id: &str) -> Option<Document> {
        self.lock()
            .collections
            .get(collection)
            .and_then(|documents| documents.iter().find(|doc| doc.id == id).cloned())
    }

    pub fn call_counts(&self) -> StoreCallCounts {
        self.lock().calls
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DocumentStore for MemoryDocumentStore {
    async fn add_document(
        &self,
        collection: &str,
        mut fields: DocumentFields,
    ) -> StoreResult<DocumentId> {
        let mut state = self.lock();
        state.calls.add += 1;
        if !is_valid_collection_name(collection) {
            return Err(StoreError::InvalidCollection(collection.to_string()));
        }
        if state.fail_writes {
            return Err(StoreError::Write("injected write failure".to_string()));
        }

        let id = Uuid::new_v4().simple().to_string();
        if state.defer_commits {
            for (name, value) in fields.iter_mut() {
                if *value == FieldValue::ServerTimestamp {
                    *value = FieldValue::Null;
                    state
                        .pending
                        .push((collection.to_string(), id.clone(), name.clone()));
                }
            }
        } else {
            let commit_ms = next_commit_ms(state.last_commit_ms);
            if !resolve_server_timestamps(&mut fields, commit_ms).is_empty() {
                state.last_commit_ms = commit_ms;
            }
        }

        state
            .collections
            .entry(collection.to_string())
            .or_default()
            .push(Document {
                id: id.clone(),
                fields,
            });
        debug!("event=store_add module=store backend=memory status=ok");
        Ok(id)
    }

    async fn list_documents(
        &self,
        collection: &str,
        order_by: &str,
        direction: OrderDirection,
    ) -> StoreResult<Vec<Document>> {
        let mut state = self.lock();
        state.calls.list += 1;
        if !is_valid_collection_name(collection) {
            return Err(StoreError::InvalidCollection(collection.to_string()));
        }
        if state.fail_reads {
            return Err(StoreError::Read("injected read failure".to_string()));
        }

        let mut documents = state
            .collections
            .get(collection)
            .cloned()
            .unwrap_or_default();
        sort_documents(&mut documents, order_by, direction);
        Ok(documents)
    }

    async fn delete_document(&self, collection: &str, id: &str) -> StoreResult<()> {
        let mut state = self.lock();
        state.calls.delete += 1;
        if !is_valid_collection_name(collection) {
            return Err(StoreError::InvalidCollection(collection.to_string()));
        }
        if state.fail_writes {
            return Err(StoreError::Write("injected write failure".to_string()));
        }

        if let Some(documents) = state.collections.get_mut(collection) {
            documents.retain(|doc| doc.id != id);
        }
        state
            .pending
            .retain(|(pending_collection, pending_id, _)| {
                pending_collection != collection || pending_id != id
            });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::MemoryDocumentStore;
    use crate::store::{DocumentFields, DocumentStore, FieldValue, OrderDirection, StoreError};

    fn fields(title: &str) -> DocumentFields {
        let mut fields = DocumentFields::new();
        fields.insert("title".to_string(), FieldValue::Text(title.to_string()));
        fields.insert("createdAt".to_string(), FieldValue::ServerTimestamp);
        fields
    }

    #[tokio::test]
    async fn add_commits_server_timestamp_and_lists_newest_first() {
        let store = MemoryDocumentStore::new();
        let first = store.add_document("notes", fields("first")).await.unwrap();
        let second = store.add_document("notes", fields("second")).await.unwrap();

        let listed = store
            .list_documents("notes", "createdAt", OrderDirection::Descending)
            .await
            .unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, second);
        assert_eq!(listed[1].id, first);
        assert!(matches!(
            listed[0].fields.get("createdAt"),
            Some(FieldValue::Timestamp(_))
        ));
    }

    #[tokio::test]
    async fn deferred_commits_expose_null_until_committed() {
        let store = MemoryDocumentStore::with_deferred_commits();
        let id = store.add_document("notes", fields("draft")).await.unwrap();

        let before = store.get_document("notes", &id).unwrap();
        assert_eq!(before.fields.get("createdAt"), Some(&FieldValue::Null));

        assert_eq!(store.commit_pending_timestamps(), 1);
        let after = store.get_document("notes", &id).unwrap();
        assert!(matches!(
            after.fields.get("createdAt"),
            Some(FieldValue::Timestamp(_))
        ));
    }

    #[tokio::test]
    async fn injected_failures_map_to_read_and_write_errors() {
        let store = MemoryDocumentStore::new();
        store.fail_writes(true);
        let err = store.add_document("notes", fields("x")).await.unwrap_err();
        assert!(matches!(err, StoreError::Write(_)));
        assert_eq!(store.document_count("notes"), 0);

        store.fail_reads(true);
        let err = store
            .list_documents("notes", "createdAt", OrderDirection::Descending)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Read(_)));

        let calls = store.call_counts();
        assert_eq!(calls.add, 1);
        assert_eq!(calls.list, 1);
    }

    #[tokio::test]
    async fn delete_missing_document_succeeds() {
        let store = MemoryDocumentStore::new();
        store.delete_document("notes", "nope").await.unwrap();
        assert_eq!(store.call_counts().delete, 1);
    }

    #[tokio::test]
    async fn invalid_collection_name_is_rejected() {
        let store = MemoryDocumentStore::new();
        let err = store.add_document("no/slash", fields("x")).await.unwrap_err();
        assert_eq!(err, StoreError::InvalidCollection("no/slash".to_string()));
    }
}
