//! Record stores.
//!
//! - [`MemoryStore`] keeps records in process memory.
//! - [`JsonFileStore`] keeps one JSON array per record type on disk
//!   (`<dir>/<record_type>.json`).
//!
//! Both enforce one constraint: within a record type, a non-blank `id`
//! may appear only once.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

use crate::codec::format_value;
use crate::config::is_valid_label;
use crate::error::StoreError;
use crate::import::RecordStore;
use crate::models::Record;

/// Directory where records are stored (relative to current dir)
pub const DEFAULT_STORE_DIR: &str = ".recordport/records";

fn record_id(record: &Record) -> Option<String> {
    record
        .get("id")
        .filter(|v| !v.is_blank())
        .map(format_value)
}

fn check_unique(existing: &[Record], record: &Record) -> Result<(), StoreError> {
    if let Some(id) = record_id(record) {
        if existing.iter().any(|r| record_id(r).as_deref() == Some(id.as_str())) {
            return Err(StoreError::Conflict(format!("id '{}' already exists", id)));
        }
    }
    Ok(())
}

// =============================================================================
// In-memory store
// =============================================================================

/// Records held in memory, per record type.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, Vec<Record>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a record type, bypassing the uniqueness check.
    pub async fn seed(&self, record_type: &str, records: Vec<Record>) {
        self.records
            .lock()
            .await
            .entry(record_type.to_string())
            .or_default()
            .extend(records);
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn create(&self, record_type: &str, record: Record) -> Result<(), StoreError> {
        let mut records = self.records.lock().await;
        let bucket = records.entry(record_type.to_string()).or_default();
        check_unique(bucket, &record)?;
        bucket.push(record);
        Ok(())
    }

    async fn list(&self, record_type: &str) -> Result<Vec<Record>, StoreError> {
        Ok(self
            .records
            .lock()
            .await
            .get(record_type)
            .cloned()
            .unwrap_or_default())
    }
}

// =============================================================================
// JSON file store
// =============================================================================

/// Records persisted as pretty-printed JSON arrays, one file per type.
pub struct JsonFileStore {
    dir: PathBuf,
    /// Serializes read-modify-write cycles.
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new() -> Self {
        Self::with_dir(DEFAULT_STORE_DIR)
    }

    /// Create a store rooted at a custom directory
    pub fn with_dir(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Labels are checked so a record type never resolves outside `dir`.
    fn path_for(&self, record_type: &str) -> Result<PathBuf, StoreError> {
        if !is_valid_label(record_type) {
            return Err(StoreError::InvalidRecordType(record_type.to_string()));
        }
        Ok(self.dir.join(format!("{}.json", record_type)))
    }

    async fn load(&self, record_type: &str) -> Result<Vec<Record>, StoreError> {
        let path = self.path_for(record_type)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }
}

impl Default for JsonFileStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordStore for JsonFileStore {
    async fn create(&self, record_type: &str, record: Record) -> Result<(), StoreError> {
        let path = self.path_for(record_type)?;
        let _guard = self.lock.lock().await;

        let mut records = self.load(record_type).await?;
        check_unique(&records, &record)?;
        records.push(record);

        tokio::fs::create_dir_all(&self.dir).await?;
        let content = serde_json::to_string_pretty(&records)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }

    async fn list(&self, record_type: &str) -> Result<Vec<Record>, StoreError> {
        let _guard = self.lock.lock().await;
        self.load(record_type).await
    }
}
