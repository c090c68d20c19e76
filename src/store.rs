//! Storage seams consumed by [`crate::service::ConfigService`].
//!
//! A [`DocumentStore`] holds configuration documents; a [`BlobStore`] holds
//! large values by content hash. Both are implemented by the Spanner client
//! and by the in-memory store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use sha2::{Digest, Sha256};

/// Errors raised by storage backends
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    #[error("blob not found: {0}")]
    BlobNotFound(String),

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Where a document's value lives
#[derive(Debug, Clone, PartialEq)]
pub enum StoredValue {
    Inline(JsonValue),
    Blob(String),
}

/// A configuration document as persisted by a [`DocumentStore`]
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigDocument {
    pub id: String,
    pub config_type: String,
    pub name: String,
    pub value: StoredValue,
    pub created: DateTime<Utc>,
    pub modified: Vec<DateTime<Utc>>,
    pub discarded: bool,
}

/// Fields supplied when inserting a document; the store assigns the id
#[derive(Debug, Clone)]
pub struct NewConfigDocument {
    pub config_type: String,
    pub name: String,
    pub value: StoredValue,
    pub created: DateTime<Utc>,
}

/// Equality filter over document fields. `None` matches anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentFilter {
    pub config_type: Option<String>,
    pub name: Option<String>,
    pub discarded: Option<bool>,
}

impl DocumentFilter {
    pub fn key(config_type: &str, name: &str, discarded: bool) -> Self {
        Self {
            config_type: Some(config_type.to_string()),
            name: Some(name.to_string()),
            discarded: Some(discarded),
        }
    }

    pub fn matches(&self, doc: &ConfigDocument) -> bool {
        self.config_type.as_deref().is_none_or(|t| t == doc.config_type)
            && self.name.as_deref().is_none_or(|n| n == doc.name)
            && self.discarded.is_none_or(|d| d == doc.discarded)
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// All documents matching `filter`, in store-default order
    async fn find(&self, filter: &DocumentFilter) -> StoreResult<Vec<ConfigDocument>>;

    /// The first document matching `filter`
    async fn find_one(&self, filter: &DocumentFilter) -> StoreResult<Option<ConfigDocument>>;

    /// Persist a new document, returning its assigned id
    async fn insert(&self, doc: NewConfigDocument) -> StoreResult<String>;

    /// Set `name` and `discarded` on the document with `id` and append the
    /// current time to its `modified` list. Returns the number of documents
    /// modified.
    async fn update(&self, id: &str, name: &str, discarded: bool) -> StoreResult<u64>;

    /// Distinct `config_type` values across all documents
    async fn config_types(&self) -> StoreResult<Vec<String>>;

    /// Total number of documents, discarded ones included
    async fn count(&self) -> StoreResult<u64>;

    /// Approximate bytes held by the document collection
    async fn data_size(&self) -> StoreResult<u64>;

    async fn health_check(&self) -> StoreResult<()>;
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `content` and return its content-derived id
    async fn put(&self, content: Vec<u8>) -> StoreResult<String>;

    async fn get(&self, id: &str) -> StoreResult<Vec<u8>>;

    /// Approximate bytes held by the blob store
    async fn data_size(&self) -> StoreResult<u64>;
}

/// Content id of a blob: lowercase hex SHA-256
pub fn blob_id(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    hex::encode(hasher.finalize())
}

/// Reject ids that cannot have come from [`blob_id`]
pub fn validate_blob_id(id: &str) -> StoreResult<()> {
    let well_formed = id.len() == 64
        && id.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
    if well_formed {
        Ok(())
    } else {
        Err(StoreError::InvalidIdentifier(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(config_type: &str, name: &str, discarded: bool) -> ConfigDocument {
        let now = Utc::now();
        ConfigDocument {
            id: "1".to_string(),
            config_type: config_type.to_string(),
            name: name.to_string(),
            value: StoredValue::Inline(serde_json::json!({})),
            created: now,
            modified: vec![now],
            discarded,
        }
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        let filter = DocumentFilter::default();
        assert!(filter.matches(&doc("net", "eth0", false)));
        assert!(filter.matches(&doc("display", "main", true)));
    }

    #[test]
    fn test_key_filter() {
        let filter = DocumentFilter::key("net", "eth0", false);
        assert!(filter.matches(&doc("net", "eth0", false)));
        assert!(!filter.matches(&doc("net", "eth0", true)));
        assert!(!filter.matches(&doc("net", "eth1", false)));
        assert!(!filter.matches(&doc("display", "eth0", false)));
    }

    #[test]
    fn test_blob_id_is_content_addressed() {
        let a = blob_id(b"{\"mtu\":1500}");
        let b = blob_id(b"{\"mtu\":1500}");
        let c = blob_id(b"{\"mtu\":9000}");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
        assert!(validate_blob_id(&a).is_ok());
    }

    #[test]
    fn test_validate_blob_id_rejects_malformed() {
        assert!(matches!(
            validate_blob_id("not-a-blob"),
            Err(StoreError::InvalidIdentifier(_))
        ));
        assert!(validate_blob_id(&"A".repeat(64)).is_err());
        assert!(validate_blob_id(&"0".repeat(63)).is_err());
    }
}
