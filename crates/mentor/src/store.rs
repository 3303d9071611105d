//! Flat JSON collections backing the practice tools.
//!
//! Every collection is an array of JSON records. Implementations must treat
//! a collection that does not exist yet as empty, and must serialize
//! read-modify-write cycles per collection so concurrent appends are never lost.
mod json_file;

pub use json_file::JsonFileStore;

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use strum_macros::{AsRefStr, EnumIter};
use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum Collection {
    /// Student profiles
    Students,
    /// Course tasks per student and week
    WeekTasks,
    /// Tasks created through the assistant
    Followups,
}

impl Collection {
    pub fn file_name(&self) -> &'static str {
        match self {
            Collection::Students => "students.json",
            Collection::WeekTasks => "tasks.json",
            Collection::Followups => "followups.json",
        }
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Collection {collection} is not a valid JSON array: {source}")]
    Corrupted {
        collection: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Could not encode records: {0}")]
    Encode(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Storage for the record collections used by the tools
#[async_trait]
pub trait Store: Send + Sync {
    /// All records of a collection, empty when the collection does not exist
    async fn read_all(&self, collection: Collection) -> StoreResult<Vec<Value>>;

    /// Append one record. Unreadable existing content is treated as empty.
    async fn append(&self, collection: Collection, record: Value) -> StoreResult<()>;

    /// Replace the whole collection
    async fn replace(&self, collection: Collection, records: Vec<Value>) -> StoreResult<()>;
}

/// A store that keeps everything in memory, used in tests and demos
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: Mutex<HashMap<Collection, Vec<Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Preload a collection
    pub fn with_records(mut self, collection: Collection, records: Vec<Value>) -> Self {
        self.collections.get_mut().insert(collection, records);
        self
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn read_all(&self, collection: Collection) -> StoreResult<Vec<Value>> {
        let collections = self.collections.lock().await;
        Ok(collections.get(&collection).cloned().unwrap_or_default())
    }

    async fn append(&self, collection: Collection, record: Value) -> StoreResult<()> {
        let mut collections = self.collections.lock().await;
        collections.entry(collection).or_default().push(record);
        Ok(())
    }

    async fn replace(&self, collection: Collection, records: Vec<Value>) -> StoreResult<()> {
        let mut collections = self.collections.lock().await;
        collections.insert(collection, records);
        Ok(())
    }
}
