//! SQLite-backed document store.
//!
//! # Responsibility
//! - Persist schema-less documents as JSON rows keyed by `(collection, id)`.
//! - Assign commit timestamps to `ServerTimestamp` fields at write time.
//!
//! # Invariants
//! - Commit times are strictly increasing for one store handle, seeded from
//!   the newest row on open.
//! - Rows are read back in insertion order before field sorting, so ties keep
//!   insertion order.
//! - A row whose fields do not decode is skipped, not fatal to the list.

use super::{
    next_commit_ms, resolve_server_timestamps, sort_documents, Document, DocumentFields,
    DocumentId, DocumentStore, OrderDirection, StoreError, StoreResult,
};
use crate::config::is_valid_collection_name;
use crate::db::{open_location, DbLocation, DbResult};
use log::{debug, error, warn};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

struct SqliteState {
    conn: Connection,
    last_commit_ms: i64,
}

/// Durable `DocumentStore` over one SQLite connection.
#[derive(Clone)]
pub struct SqliteDocumentStore {
    state: Arc<Mutex<SqliteState>>,
}

impl SqliteDocumentStore {
    /// Opens (and migrates) a database file.
    pub fn open(path: impl AsRef<Path>) -> DbResult<Self> {
        Self::from_location(&DbLocation::File(path.as_ref().to_path_buf()))
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> DbResult<Self> {
        Self::from_location(&DbLocation::Memory)
    }

    fn from_location(location: &DbLocation) -> DbResult<Self> {
        let conn = open_location(location)?;
        let last_commit_ms = conn.query_row(
            "SELECT COALESCE(MAX(committed_at), 0) FROM documents;",
            [],
            |row| row.get::<_, i64>(0),
        )?;
        Ok(Self {
            state: Arc::new(Mutex::new(SqliteState {
                conn,
                last_commit_ms,
            })),
        })
    }

    fn lock(&self) -> MutexGuard<'_, SqliteState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn ensure_collection(collection: &str) -> StoreResult<()> {
    if is_valid_collection_name(collection) {
        Ok(())
    } else {
        Err(StoreError::InvalidCollection(collection.to_string()))
    }
}

fn write_error(op: &str, err: impl std::fmt::Display) -> StoreError {
    error!("event=store_{op} module=store backend=sqlite status=error error={err}");
    StoreError::Write(err.to_string())
}

fn read_error(err: impl std::fmt::Display) -> StoreError {
    error!("event=store_list module=store backend=sqlite status=error error={err}");
    StoreError::Read(err.to_string())
}

impl DocumentStore for SqliteDocumentStore {
    async fn add_document(
        &self,
        collection: &str,
        mut fields: DocumentFields,
    ) -> StoreResult<DocumentId> {
        ensure_collection(collection)?;
        let mut state = self.lock();
        let commit_ms = next_commit_ms(state.last_commit_ms);
        resolve_server_timestamps(&mut fields, commit_ms);

        let encoded = serde_json::to_string(&fields).map_err(|err| write_error("add", err))?;
        let id = Uuid::new_v4().simple().to_string();
        state
            .conn
            .execute(
                "INSERT INTO documents (collection, doc_id, fields, committed_at)
                 VALUES (?1, ?2, ?3, ?4);",
                params![collection, id.as_str(), encoded, commit_ms],
            )
            .map_err(|err| write_error("add", err))?;
        state.last_commit_ms = commit_ms;

        debug!("event=store_add module=store backend=sqlite status=ok");
        Ok(id)
    }

    async fn list_documents(
        &self,
        collection: &str,
        order_by: &str,
        direction: OrderDirection,
    ) -> StoreResult<Vec<Document>> {
        ensure_collection(collection)?;
        let state = self.lock();
        let mut stmt = state
            .conn
            .prepare(
                "SELECT doc_id, fields
                 FROM documents
                 WHERE collection = ?1
                 ORDER BY seq ASC;",
            )
            .map_err(read_error)?;
        let mut rows = stmt.query([collection]).map_err(read_error)?;

        let mut documents = Vec::new();
        while let Some(row) = rows.next().map_err(read_error)? {
            let id: String = row.get("doc_id").map_err(read_error)?;
            let raw: String = row.get("fields").map_err(read_error)?;
            match serde_json::from_str::<DocumentFields>(&raw) {
                Ok(fields) => documents.push(Document { id, fields }),
                Err(err) => warn!(
                    "event=store_list module=store backend=sqlite status=skipped id={id} error={err}"
                ),
            }
        }

        sort_documents(&mut documents, order_by, direction);
        Ok(documents)
    }

    async fn delete_document(&self, collection: &str, id: &str) -> StoreResult<()> {
        ensure_collection(collection)?;
        let state = self.lock();
        let changed = state
            .conn
            .execute(
                "DELETE FROM documents WHERE collection = ?1 AND doc_id = ?2;",
                params![collection, id],
            )
            .map_err(|err| write_error("delete", err))?;
        debug!("event=store_delete module=store backend=sqlite status=ok changed={changed}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::SqliteDocumentStore;
    use crate::store::{DocumentFields, DocumentStore, FieldValue, OrderDirection};

    fn fields(title: &str) -> DocumentFields {
        let mut fields = DocumentFields::new();
        fields.insert("title".to_string(), FieldValue::Text(title.to_string()));
        fields.insert("createdAt".to_string(), FieldValue::ServerTimestamp);
        fields
    }

    #[tokio::test]
    async fn add_list_delete_roundtrip() {
        let store = SqliteDocumentStore::open_in_memory().unwrap();
        let first = store.add_document("notes", fields("first")).await.unwrap();
        let second = store.add_document("notes", fields("second")).await.unwrap();
        store.add_document("other", fields("elsewhere")).await.unwrap();

        let listed = store
            .list_documents("notes", "createdAt", OrderDirection::Descending)
            .await
            .unwrap();
        let ids: Vec<&str> = listed.iter().map(|doc| doc.id.as_str()).collect();
        assert_eq!(ids, vec![second.as_str(), first.as_str()]);

        store.delete_document("notes", &second).await.unwrap();
        let listed = store
            .list_documents("notes", "createdAt", OrderDirection::Descending)
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, first);
    }

    #[tokio::test]
    async fn stored_timestamps_are_committed_values() {
        let store = SqliteDocumentStore::open_in_memory().unwrap();
        store.add_document("notes", fields("only")).await.unwrap();

        let listed = store
            .list_documents("notes", "createdAt", OrderDirection::Ascending)
            .await
            .unwrap();
        assert!(matches!(
            listed[0].fields.get("createdAt"),
            Some(FieldValue::Timestamp(value)) if *value > 0
        ));
    }
}
