//! Whole-file JSON map store.
//!
//! Every write reads the file, edits the map and writes it back through a
//! temp file + rename. Callers must serialize access (the metadata service
//! holds a lock around every call).

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::{MetadataStore, StoreError};

#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Open the store at `path`, creating the parent directory and an empty
    /// `{}` file when missing.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let store = Self {
            path: path.as_ref().to_path_buf(),
        };
        store.init().await?;
        Ok(store)
    }

    async fn init(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        match tokio::fs::metadata(&self.path).await {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tokio::fs::write(&self.path, "{}").await?;
                tracing::debug!(path = %self.path.display(), "created empty metadata file");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn read_map(&self) -> Result<Map<String, Value>, StoreError> {
        let data = match tokio::fs::read_to_string(&self.path).await {
            Ok(d) => d,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(e.into()),
        };
        if data.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str::<Value>(&data)? {
            Value::Object(map) => Ok(map),
            other => Err(StoreError::Corrupt(format!(
                "{}: top-level value is {}",
                self.path.display(),
                kind_of(&other)
            ))),
        }
    }

    async fn write_map(&self, map: &Map<String, Value>) -> Result<(), StoreError> {
        let json = serde_json::to_string(map)?;
        let mut tmp = self.path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

fn kind_of(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[async_trait]
impl MetadataStore for JsonFileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let map = self.read_map().await?;
        Ok(match map.get(key) {
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
            None => None,
        })
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut map = self.read_map().await?;
        map.insert(key.to_string(), Value::String(value.to_string()));
        self.write_map(&map).await
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut map = self.read_map().await?;
        if map.remove(key).is_some() {
            self.write_map(&map).await?;
        }
        Ok(())
    }

    async fn list_keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.read_map().await?.keys().cloned().collect())
    }
}
