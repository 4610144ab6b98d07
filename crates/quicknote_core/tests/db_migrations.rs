use quicknote_core::db::migrations::latest_version;
use quicknote_core::db::{open_db, open_db_in_memory, DbError};
use quicknote_core::SqliteDocumentStore;
use rusqlite::Connection;

#[test]
fn fresh_database_gets_documents_schema() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(user_version(&conn), latest_version());
    assert_eq!(
        column_names(&conn, "documents"),
        vec!["seq", "collection", "doc_id", "fields", "committed_at"]
    );
}

#[test]
fn document_ids_are_unique_per_collection() {
    let conn = open_db_in_memory().unwrap();
    let insert = "INSERT INTO documents (collection, doc_id, fields, committed_at)
                  VALUES (?1, 'same-id', '{}', 1);";

    conn.execute(insert, ["notes"]).unwrap();
    conn.execute(insert, ["archive"]).unwrap();
    assert!(conn.execute(insert, ["notes"]).is_err());
}

#[test]
fn reopened_file_is_not_migrated_again() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("quicknote.db");

    let conn = open_db(&path).unwrap();
    conn.execute(
        "INSERT INTO documents (collection, doc_id, fields, committed_at)
         VALUES ('notes', 'kept', '{}', 7);",
        [],
    )
    .unwrap();
    drop(conn);

    let conn = open_db(&path).unwrap();
    assert_eq!(user_version(&conn), latest_version());
    let rows: i64 = conn
        .query_row("SELECT COUNT(*) FROM documents;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(rows, 1);
}

#[test]
fn store_refuses_database_from_newer_build() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");
    Connection::open(&path)
        .unwrap()
        .pragma_update(None, "user_version", latest_version() + 1)
        .unwrap();

    match SqliteDocumentStore::open(&path) {
        Err(DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        }) => {
            assert_eq!(db_version, latest_version() + 1);
            assert_eq!(latest_supported, latest_version());
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("newer schema was accepted"),
    }
}

fn user_version(conn: &Connection) -> u32 {
    conn.pragma_query_value(None, "user_version", |row| row.get(0))
        .unwrap()
}

fn column_names(conn: &Connection, table: &str) -> Vec<String> {
    let mut stmt = conn
        .prepare("SELECT name FROM pragma_table_info(?1) ORDER BY cid;")
        .unwrap();
    stmt.query_map([table], |row| row.get(0))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap()
}
