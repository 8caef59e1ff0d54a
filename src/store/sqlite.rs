//! SQLite-backed document store.
//!
//! Every collection lives in the single `documents` table as a JSON body.
//! A connection is opened per operation, so concurrent request handlers
//! share nothing but the database file; SQLite's own locking (with a busy
//! timeout) serializes writers.

use super::{new_document_id, Document, DocumentStore, Fields, Filter, StoreError};
use log::{debug, trace};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, TransactionBehavior};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct SqliteStore {
    db_path: PathBuf,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `db_path` and make sure
    /// the schema exists.
    pub fn open(db_path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let store = Self {
            db_path: db_path.into(),
        };
        if let Some(parent) = store.db_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let conn = store.connect()?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS documents (
                collection TEXT NOT NULL,
                id         TEXT NOT NULL,
                body       TEXT NOT NULL,
                PRIMARY KEY (collection, id)
            )",
            (),
        )?;
        debug!("Document store ready at {}", store.db_path.display());
        Ok(store)
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.db_path
    }

    fn connect(&self) -> Result<Connection, StoreError> {
        let conn = Connection::open(&self.db_path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(conn)
    }
}

fn parse_body(body: &str) -> Result<Fields, StoreError> {
    match serde_json::from_str(body)? {
        Value::Object(fields) => Ok(fields),
        _ => Err(StoreError::NotAnObject),
    }
}

impl DocumentStore for SqliteStore {
    fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let conn = self.connect()?;
        let body: Option<String> = conn
            .query_row(
                "SELECT body FROM documents WHERE collection = ?1 AND id = ?2",
                params![collection, id],
                |row| row.get(0),
            )
            .optional()?;

        body.map(|body| {
            Ok(Document {
                id: id.to_string(),
                fields: parse_body(&body)?,
            })
        })
        .transpose()
    }

    fn query(&self, collection: &str, filters: &[Filter]) -> Result<Vec<Document>, StoreError> {
        let mut sql = String::from("SELECT id, body FROM documents WHERE collection = ?");
        let mut args = vec![collection.to_string()];
        for filter in filters {
            // Binding the value as JSON text and extracting `$` gives it the
            // same SQL type json_extract yields for the stored field.
            sql.push_str(" AND json_extract(body, ?) = json_extract(?, '$')");
            args.push(format!("$.{}", filter.field));
            args.push(serde_json::to_string(&filter.value)?);
        }
        sql.push_str(" ORDER BY rowid");
        trace!("query {collection}: {sql}");

        let conn = self.connect()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(args), |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut documents = Vec::new();
        for row in rows {
            let (id, body) = row?;
            documents.push(Document {
                id,
                fields: parse_body(&body)?,
            });
        }
        Ok(documents)
    }

    fn add(&self, collection: &str, fields: Fields) -> Result<String, StoreError> {
        let id = new_document_id();
        let body = serde_json::to_string(&fields)?;
        self.connect()?.execute(
            "INSERT INTO documents (collection, id, body) VALUES (?1, ?2, ?3)",
            params![collection, id, body],
        )?;
        Ok(id)
    }

    fn update(&self, collection: &str, id: &str, fields: Fields) -> Result<(), StoreError> {
        let mut conn = self.connect()?;
        // Deferred read-then-write upgrades return SQLITE_BUSY without waiting.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let body: Option<String> = tx
            .query_row(
                "SELECT body FROM documents WHERE collection = ?1 AND id = ?2",
                params![collection, id],
                |row| row.get(0),
            )
            .optional()?;
        let mut current = match body {
            Some(body) => parse_body(&body)?,
            None => {
                return Err(StoreError::DocumentNotFound {
                    collection: collection.to_string(),
                    id: id.to_string(),
                })
            }
        };
        current.extend(fields);

        tx.execute(
            "UPDATE documents SET body = ?1 WHERE collection = ?2 AND id = ?3",
            params![serde_json::to_string(&current)?, collection, id],
        )?;
        tx.commit()?;
        Ok(())
    }
}
