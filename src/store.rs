use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Mutex;
use tokio::fs;

/// Persistence seam for the verdict record.
///
/// The record is a single serialized object read and written whole (the
/// underlying transport has no partial-field access), which is why the cache
/// layer above performs read-merge-write on every update.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Returns the raw record payload, or `None` if no record exists yet.
    async fn read(&self) -> Result<Option<String>>;
    async fn write(&self, payload: &str) -> Result<()>;
}

/// File-backed store. Writes go to a temp file first and are renamed into
/// place so a crash mid-write never leaves a truncated record.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl RecordStore for FileStore {
    async fn read(&self) -> Result<Option<String>> {
        match fs::read_to_string(&self.path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).context("Failed to read verdict record"),
        }
    }

    async fn write(&self, payload: &str) -> Result<()> {
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, payload)
            .await
            .context("Failed to write verdict record")?;
        fs::rename(&tmp, &self.path)
            .await
            .context("Failed to replace verdict record")?;
        Ok(())
    }
}

/// In-memory store for tests and API-less embedding.
#[derive(Default)]
pub struct MemoryStore {
    data: Mutex<Option<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn read(&self) -> Result<Option<String>> {
        Ok(self.data.lock().unwrap().clone())
    }

    async fn write(&self, payload: &str) -> Result<()> {
        *self.data.lock().unwrap() = Some(payload.to_string());
        Ok(())
    }
}
