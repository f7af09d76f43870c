// Storage abstraction - key-value persistence for caches and local state

use crate::error::CoreError;
use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};

/// Result type for storage operations
pub type StorageResult<T> = Result<T, CoreError>;

/// Abstract storage backend trait
/// Values are serialized as JSON documents, one per key
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Save data with a key
    async fn save<T: Serialize + Sync>(&self, key: &str, data: &T) -> StorageResult<()>;

    /// Load data by key
    async fn load<T: DeserializeOwned>(&self, key: &str) -> StorageResult<Option<T>>;
}

/// Standard storage keys used across the application
pub mod keys {
    pub const PROFILES: &str = "cached_profiles";
}
