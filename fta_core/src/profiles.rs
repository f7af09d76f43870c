// Trader profile lookup with a persisted cache
//
// The cache is loaded once when the lookup is built and written back through
// the storage backend on every insert.

use crate::error::CoreError;
use crate::models::CachedProfile;
use crate::storage_trait::{keys, StorageBackend};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use log::{debug, warn};
use std::collections::HashMap;
use tokio::sync::Mutex;

pub type ProfileResult<T> = Result<T, CoreError>;

#[async_trait]
pub trait ProfileLookup: Send + Sync {
    /// Profile for `address`, `None` if the platform does not know it
    async fn profile(&self, address: &str) -> ProfileResult<Option<CachedProfile>>;

    /// Name to show in notifications
    async fn display_name(&self, address: &str) -> ProfileResult<Option<String>> {
        Ok(self
            .profile(address)
            .await?
            .and_then(|p| p.twitter_name.or(p.twitter_username)))
    }
}

pub struct CachedProfileLookup<L, S> {
    inner: L,
    storage: S,
    ttl: Duration,
    entries: Mutex<HashMap<String, CachedProfile>>,
}

impl<L: ProfileLookup, S: StorageBackend> CachedProfileLookup<L, S> {
    /// Load the persisted cache. A corrupt cache file is logged and discarded.
    pub async fn load(inner: L, storage: S, ttl: Duration) -> ProfileResult<Self> {
        let entries = match storage.load::<HashMap<String, CachedProfile>>(keys::PROFILES).await {
            Ok(Some(entries)) => entries,
            Ok(None) => HashMap::new(),
            Err(CoreError::Json(e)) => {
                warn!("Discarding unreadable profile cache: {}", e);
                HashMap::new()
            }
            Err(e) => return Err(e),
        };
        debug!("Loaded {} cached profiles", entries.len());

        Ok(Self {
            inner,
            storage,
            ttl,
            entries: Mutex::new(entries),
        })
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    async fn insert(&self, profile: CachedProfile) -> ProfileResult<()> {
        let mut entries = self.entries.lock().await;
        entries.insert(profile.address.to_ascii_lowercase(), profile);
        self.storage.save(keys::PROFILES, &*entries).await
    }
}

#[async_trait]
impl<L: ProfileLookup, S: StorageBackend> ProfileLookup for CachedProfileLookup<L, S> {
    async fn profile(&self, address: &str) -> ProfileResult<Option<CachedProfile>> {
        let key = address.to_ascii_lowercase();
        if let Some(hit) = self.entries.lock().await.get(&key) {
            if Utc::now() - hit.fetched_at < self.ttl {
                return Ok(Some(hit.clone()));
            }
        }

        let fetched = self.inner.profile(address).await?;
        if let Some(profile) = &fetched {
            if let Err(e) = self.insert(profile.clone()).await {
                warn!("Failed to persist profile cache: {}", e);
            }
        }
        Ok(fetched)
    }
}
