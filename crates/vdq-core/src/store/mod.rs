//! Key-value metadata stores: the durability substrate for job records.
//!
//! The scheduler never talks to a store directly; `metadata::JobMetadataService`
//! serializes access and (de)serializes records.

mod json_file;
mod memory;
mod sqlite;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use crate::config::StoreBackend;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store I/O: {0}")]
    Io(#[from] std::io::Error),

    #[error("store contents are not a JSON object: {0}")]
    Corrupt(String),

    #[error("sqlite: {0}")]
    Sqlite(#[from] sqlx::Error),

    #[error("record encoding: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// String-to-string map with get/set/delete/list-keys.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
    async fn list_keys(&self) -> Result<Vec<String>, StoreError>;
}

/// Open the configured backend at `path`, creating it if needed.
pub async fn open(backend: StoreBackend, path: &Path) -> Result<Arc<dyn MetadataStore>, StoreError> {
    let store: Arc<dyn MetadataStore> = match backend {
        StoreBackend::Json => Arc::new(JsonFileStore::open(path).await?),
        StoreBackend::Sqlite => Arc::new(SqliteStore::open_at(path).await?),
    };
    tracing::debug!(path = %path.display(), ?backend, "metadata store opened");
    Ok(store)
}
