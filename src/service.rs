//! Configuration store adapter: the operations behind every route.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::Value as JsonValue;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::models::{ConfigDetail, ConfigSummary, ListFilter, StatsResponse};
use crate::store::{
    BlobStore, ConfigDocument, DocumentFilter, DocumentStore, NewConfigDocument, StoreError,
    StoreResult, StoredValue,
};

const UUID_LEN: usize = 36;

/// Which kind of store call failed; decides the status reported to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    Query,
    Lookup,
    Write,
}

/// Error kinds returned by [`ConfigService`] operations
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration not found: {config_type}/{name}")]
    NotFound { config_type: String, name: String },

    #[error("{0}")]
    Conflict(String),

    #[error("Invalid ID: {0}")]
    InvalidIdentifier(String),

    #[error("Store error: {source}")]
    StoreUnavailable {
        op: StoreOp,
        #[source]
        source: StoreError,
    },
}

impl ConfigError {
    fn not_found(config_type: &str, name: &str) -> Self {
        ConfigError::NotFound {
            config_type: config_type.to_string(),
            name: name.to_string(),
        }
    }

    fn from_store(op: StoreOp, err: StoreError) -> Self {
        match err {
            StoreError::InvalidIdentifier(id) => ConfigError::InvalidIdentifier(id),
            StoreError::DuplicateKey(key) => ConfigError::Conflict(format!("Duplicate key: {}", key)),
            source => ConfigError::StoreUnavailable { op, source },
        }
    }
}

trait StoreResultExt<T> {
    fn during(self, op: StoreOp) -> Result<T, ConfigError>;
}

impl<T> StoreResultExt<T> for StoreResult<T> {
    fn during(self, op: StoreOp) -> Result<T, ConfigError> {
        self.map_err(|err| ConfigError::from_store(op, err))
    }
}

/// Name given to a document when it is discarded
///
/// A name already ending in a canonical UUID is returned unchanged, so
/// discarding twice never stacks suffixes.
pub fn discarded_name(name: &str) -> String {
    if has_uuid_suffix(name) {
        name.to_string()
    } else {
        format!("{}_{}", name, Uuid::new_v4())
    }
}

fn has_uuid_suffix(name: &str) -> bool {
    let Some(start) = name.len().checked_sub(UUID_LEN) else {
        return false;
    };
    let Some(suffix) = name.get(start..) else {
        return false;
    };
    Uuid::parse_str(suffix).is_ok_and(|id| id.hyphenated().to_string() == suffix)
}

/// Per-`(config_type, name)` async locks serialising mutations of one key
#[derive(Default)]
struct KeyLocks {
    locks: Mutex<HashMap<(String, String), Arc<AsyncMutex<()>>>>,
}

impl KeyLocks {
    /// Lock every named key of `config_type`, in sorted order
    async fn acquire(&self, config_type: &str, names: &[&str]) -> Vec<OwnedMutexGuard<()>> {
        let mut keys: Vec<(String, String)> = names
            .iter()
            .map(|name| (config_type.to_string(), name.to_string()))
            .collect();
        keys.sort();
        keys.dedup();

        let handles: Vec<Arc<AsyncMutex<()>>> = {
            let mut locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            // Entries only the map still references are idle
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            keys.into_iter()
                .map(|key| locks.entry(key).or_default().clone())
                .collect()
        };

        let mut guards = Vec::with_capacity(handles.len());
        for handle in handles {
            guards.push(handle.lock_owned().await);
        }
        guards
    }
}

/// Configuration store adapter over an injected document store and blob store
#[derive(Clone)]
pub struct ConfigService {
    documents: Arc<dyn DocumentStore>,
    blobs: Arc<dyn BlobStore>,
    blob_threshold_bytes: usize,
    locks: Arc<KeyLocks>,
}

impl ConfigService {
    /// Values whose serialized JSON exceeds `blob_threshold_bytes` are
    /// written to `blobs` and referenced by id.
    pub fn new(
        documents: Arc<dyn DocumentStore>,
        blobs: Arc<dyn BlobStore>,
        blob_threshold_bytes: usize,
    ) -> Self {
        Self {
            documents,
            blobs,
            blob_threshold_bytes,
            locks: Arc::new(KeyLocks::default()),
        }
    }

    /// Distinct config types, sorted
    pub async fn config_types(&self) -> Result<Vec<String>, ConfigError> {
        let mut types = self.documents.config_types().await.during(StoreOp::Query)?;
        types.sort();
        types.dedup();
        Ok(types)
    }

    pub async fn stats(&self) -> Result<StatsResponse, ConfigError> {
        let count = self.documents.count().await.during(StoreOp::Query)?;
        let document_bytes = self.documents.data_size().await.during(StoreOp::Query)?;
        let blob_bytes = self.blobs.data_size().await.during(StoreOp::Query)?;
        Ok(StatsResponse {
            size: document_bytes + blob_bytes,
            count,
        })
    }

    pub async fn list(
        &self,
        config_type: &str,
        discarded: bool,
        filter: ListFilter,
    ) -> Result<Vec<ConfigSummary>, ConfigError> {
        let filter = DocumentFilter {
            config_type: Some(config_type.to_string()),
            name: filter.name,
            discarded: Some(discarded),
        };

        let documents = self.documents.find(&filter).await.during(StoreOp::Query)?;
        Ok(documents.into_iter().map(summary).collect())
    }

    pub async fn get(
        &self,
        config_type: &str,
        name: &str,
        discarded: bool,
    ) -> Result<ConfigDetail, ConfigError> {
        let doc = self.find(config_type, name, discarded).await?;
        let value = self.resolve_value(&doc.value).await?;

        Ok(ConfigDetail {
            name: doc.name,
            config_type: doc.config_type,
            value,
            created: doc.created,
            modified: doc.modified,
            discarded: doc.discarded,
        })
    }

    /// Store `value` under `(config_type, name)`, discarding the current
    /// holder of that key first. Returns the holder's new name, or an empty
    /// string when the key was free.
    pub async fn insert(
        &self,
        config_type: &str,
        name: &str,
        value: JsonValue,
    ) -> Result<String, ConfigError> {
        let _guards = self.locks.acquire(config_type, &[name]).await;

        let predecessor = self.discard_locked(config_type, name, true).await?;
        let value = self.store_value(value).await?;

        let id = self
            .documents
            .insert(NewConfigDocument {
                config_type: config_type.to_string(),
                name: name.to_string(),
                value,
                created: chrono::Utc::now(),
            })
            .await
            .during(StoreOp::Write)?;

        tracing::info!(
            "Inserted config {}/{} (id: {}, predecessor: {:?})",
            config_type,
            name,
            id,
            predecessor
        );
        Ok(predecessor)
    }

    /// Soft-delete the live `(config_type, name)` document, returning its new name
    pub async fn discard(&self, config_type: &str, name: &str) -> Result<String, ConfigError> {
        let _guards = self.locks.acquire(config_type, &[name]).await;
        self.discard_locked(config_type, name, false).await
    }

    /// Return the discarded document called `name` to the live set
    pub async fn restore(&self, config_type: &str, name: &str) -> Result<u64, ConfigError> {
        let _guards = self.locks.acquire(config_type, &[name]).await;

        let doc = self.find(config_type, name, true).await?;
        if self.find_optional(config_type, name, false).await?.is_some() {
            return Err(ConfigError::Conflict("Name already in use.".to_string()));
        }

        let restored = self
            .documents
            .update(&doc.id, &doc.name, false)
            .await
            .during(StoreOp::Write)?;

        tracing::info!("Restored config {}/{}", config_type, name);
        Ok(restored)
    }

    pub async fn rename(
        &self,
        config_type: &str,
        old_name: &str,
        new_name: &str,
    ) -> Result<u64, ConfigError> {
        let _guards = self.locks.acquire(config_type, &[old_name, new_name]).await;

        if self.find_optional(config_type, new_name, false).await?.is_some() {
            return Err(ConfigError::Conflict("Name already in use.".to_string()));
        }

        let doc = self.find(config_type, old_name, false).await?;
        let renamed = self
            .documents
            .update(&doc.id, new_name, false)
            .await
            .during(StoreOp::Write)?;

        tracing::info!("Renamed config {}/{} to {}", config_type, old_name, new_name);
        Ok(renamed)
    }

    pub async fn health_check(&self) -> StoreResult<()> {
        self.documents.health_check().await
    }

    /// Caller must hold the key lock for `(config_type, name)`
    async fn discard_locked(
        &self,
        config_type: &str,
        name: &str,
        silent: bool,
    ) -> Result<String, ConfigError> {
        let Some(doc) = self.find_optional(config_type, name, false).await? else {
            return if silent {
                Ok(String::new())
            } else {
                Err(ConfigError::not_found(config_type, name))
            };
        };

        let new_name = discarded_name(&doc.name);
        self.documents
            .update(&doc.id, &new_name, true)
            .await
            .during(StoreOp::Write)?;

        tracing::info!("Discarded config {}/{} as {}", config_type, name, new_name);
        Ok(new_name)
    }

    async fn find_optional(
        &self,
        config_type: &str,
        name: &str,
        discarded: bool,
    ) -> Result<Option<ConfigDocument>, ConfigError> {
        self.documents
            .find_one(&DocumentFilter::key(config_type, name, discarded))
            .await
            .during(StoreOp::Lookup)
    }

    async fn find(
        &self,
        config_type: &str,
        name: &str,
        discarded: bool,
    ) -> Result<ConfigDocument, ConfigError> {
        self.find_optional(config_type, name, discarded)
            .await?
            .ok_or_else(|| ConfigError::not_found(config_type, name))
    }

    async fn store_value(&self, value: JsonValue) -> Result<StoredValue, ConfigError> {
        let encoded = serde_json::to_vec(&value)
            .map_err(|err| ConfigError::from_store(StoreOp::Write, anyhow::Error::new(err).into()))?;

        if encoded.len() <= self.blob_threshold_bytes {
            return Ok(StoredValue::Inline(value));
        }

        let blob = self.blobs.put(encoded).await.during(StoreOp::Write)?;
        Ok(StoredValue::Blob(blob))
    }

    async fn resolve_value(&self, value: &StoredValue) -> Result<JsonValue, ConfigError> {
        match value {
            StoredValue::Inline(value) => Ok(value.clone()),
            StoredValue::Blob(id) => {
                let content = self.blobs.get(id).await.during(StoreOp::Lookup)?;
                serde_json::from_slice(&content).map_err(|err| {
                    tracing::warn!("Blob {} does not hold valid JSON: {}", id, err);
                    ConfigError::from_store(StoreOp::Lookup, anyhow::Error::new(err).into())
                })
            }
        }
    }
}

fn summary(doc: ConfigDocument) -> ConfigSummary {
    ConfigSummary {
        name: doc.name,
        config_type: doc.config_type,
        created: doc.created,
        modified: doc.modified,
        discarded: doc.discarded,
    }
}
