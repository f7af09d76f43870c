// File-based storage: one pretty-printed JSON document per key

use crate::storage_trait::{StorageBackend, StorageResult};
use crate::error::CoreError;
use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use std::path::PathBuf;
use log::debug;

pub struct FileStorage {
    base_dir: PathBuf,
}

impl FileStorage {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self { base_dir: base_dir.into() }
    }

    fn get_path(&self, key: &str) -> PathBuf {
        self.base_dir.join(format!("{}.json", key))
    }

    fn validate_key(key: &str) -> StorageResult<()> {
        let valid = !key.is_empty()
            && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if valid {
            Ok(())
        } else {
            Err(CoreError::InvalidInput(format!("invalid storage key: {:?}", key)))
        }
    }
}

#[async_trait]
impl StorageBackend for FileStorage {
    async fn save<T: Serialize + Sync>(&self, key: &str, data: &T) -> StorageResult<()> {
        Self::validate_key(key)?;
        let path = self.get_path(key);
        debug!("Saving {} to {:?}", key, path);

        tokio::fs::create_dir_all(&self.base_dir).await?;

        let json = serde_json::to_string_pretty(data)?;

        // Write next to the target and rename so a crash never leaves half a document
        let tmp_path = path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, json).await?;
        tokio::fs::rename(&tmp_path, &path).await?;

        Ok(())
    }

    async fn load<T: DeserializeOwned>(&self, key: &str) -> StorageResult<Option<T>> {
        Self::validate_key(key)?;
        let path = self.get_path(key);

        let json = match tokio::fs::read_to_string(&path).await {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No stored value for {} at {:?}", key, path);
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Some(serde_json::from_str(&json)?))
    }
}
