//! # Document Store
//!
//! The record store is consumed through one small interface,
//! [`DocumentStore`]: `get` by id, equality `query`, `add` and field-merging
//! `update` on named collections. The server builds one store handle at
//! startup and passes it (as `Arc<dyn DocumentStore>`) to the selector,
//! the session updater and the HTTP state.
//!
//! Two implementations ship with the crate:
//!
//! - [`sqlite::SqliteStore`] - JSON documents in a single SQLite table
//! - [`memory::MemoryStore`] - in-process maps, used as the fake in tests
//!
//! Each operation is atomic for the one document it touches. Nothing here
//! spans several documents.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Collection names used by the wave engine.
pub mod collections {
    pub const TRACKS: &str = "tracks";
    pub const SESSIONS: &str = "sessions";
    pub const USER_EVENTS: &str = "userEvents";
}

/// Field map of one stored document, without its id.
pub type Fields = Map<String, Value>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("malformed document: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("document {collection}/{id} does not exist")]
    DocumentNotFound { collection: String, id: String },

    #[error("document body is not a JSON object")]
    NotAnObject,
}

/// A stored document: its id plus its fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

impl Document {
    /// Decode into a typed record. The document id is offered to the
    /// record as an `id` field.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, StoreError> {
        let mut fields = self.fields.clone();
        fields.insert("id".to_string(), Value::String(self.id.clone()));
        Ok(serde_json::from_value(Value::Object(fields))?)
    }
}

/// Serialize a record into document fields, dropping its `id`.
pub fn encode<T: Serialize>(record: &T) -> Result<Fields, StoreError> {
    match serde_json::to_value(record)? {
        Value::Object(mut fields) => {
            fields.remove("id");
            Ok(fields)
        }
        _ => Err(StoreError::NotAnObject),
    }
}

/// One equality condition of a [`DocumentStore::query`].
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub value: Value,
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    fn matches(&self, fields: &Fields) -> bool {
        fields.get(&self.field) == Some(&self.value)
    }
}

/// Collection/query/update operations the engine needs from a record store.
pub trait DocumentStore: Send + Sync {
    /// Fetch one document, `None` when the id is unknown.
    fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// All documents whose fields equal every filter, in insertion order.
    fn query(&self, collection: &str, filters: &[Filter]) -> Result<Vec<Document>, StoreError>;

    /// Insert a new document and return its generated id.
    fn add(&self, collection: &str, fields: Fields) -> Result<String, StoreError>;

    /// Merge `fields` into an existing document.
    ///
    /// # Errors
    ///
    /// [`StoreError::DocumentNotFound`] when the document does not exist.
    fn update(&self, collection: &str, id: &str, fields: Fields) -> Result<(), StoreError>;
}

fn new_document_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
