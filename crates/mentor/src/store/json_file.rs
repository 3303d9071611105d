use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use strum::IntoEnumIterator;
use tokio::fs;
use tokio::sync::Mutex;

use super::{Collection, Store, StoreError, StoreResult};

/// Stores each collection as a pretty-printed JSON array in `dir`
pub struct JsonFileStore {
    dir: PathBuf,
    locks: HashMap<Collection, Mutex<()>>,
}

impl JsonFileStore {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self {
            dir: dir.into(),
            locks: Collection::iter().map(|c| (c, Mutex::new(()))).collect(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, collection: Collection) -> PathBuf {
        self.dir.join(collection.file_name())
    }

    fn lock(&self, collection: Collection) -> &Mutex<()> {
        // Every collection gets a lock in `new`
        &self.locks[&collection]
    }

    async fn load(&self, collection: Collection) -> StoreResult<Vec<Value>> {
        let content = match fs::read_to_string(self.path(collection)).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&content).map_err(|source| StoreError::Corrupted {
            collection: collection.as_ref().to_string(),
            source,
        })
    }

    /// Write the new content beside the target and rename it into place,
    /// so a crash mid-write leaves the previous file intact
    async fn write(&self, collection: Collection, records: &[Value]) -> StoreResult<()> {
        fs::create_dir_all(&self.dir).await?;
        let path = self.path(collection);
        let tmp_path = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(records)?;
        fs::write(&tmp_path, json).await?;
        fs::rename(&tmp_path, &path).await?;
        Ok(())
    }
}

#[async_trait]
impl Store for JsonFileStore {
    async fn read_all(&self, collection: Collection) -> StoreResult<Vec<Value>> {
        self.load(collection).await
    }

    async fn append(&self, collection: Collection, record: Value) -> StoreResult<()> {
        let _guard = self.lock(collection).lock().await;
        let mut records = match self.load(collection).await {
            Ok(records) => records,
            Err(StoreError::Corrupted { source, .. }) => {
                tracing::warn!(
                    collection = collection.as_ref(),
                    "discarding unreadable collection: {}",
                    source
                );
                Vec::new()
            }
            Err(e) => return Err(e),
        };
        records.push(record);
        self.write(collection, &records).await
    }

    async fn replace(&self, collection: Collection, records: Vec<Value>) -> StoreResult<()> {
        let _guard = self.lock(collection).lock().await;
        self.write(collection, &records).await
    }
}
