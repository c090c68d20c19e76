use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

use crate::store::{
    blob_id, validate_blob_id, BlobStore, ConfigDocument, DocumentFilter, DocumentStore,
    NewConfigDocument, StoreError, StoreResult, StoredValue,
};

#[derive(Default)]
struct MemoryState {
    // Insertion order doubles as the store-default listing order
    documents: Vec<ConfigDocument>,
    blobs: HashMap<String, Vec<u8>>,
}

/// Process-local document and blob store
#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<RwLock<MemoryState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, MemoryState>> {
        self.inner
            .read()
            .map_err(|_| StoreError::Backend(anyhow::anyhow!("in-memory store lock poisoned")))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, MemoryState>> {
        self.inner
            .write()
            .map_err(|_| StoreError::Backend(anyhow::anyhow!("in-memory store lock poisoned")))
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn find(&self, filter: &DocumentFilter) -> StoreResult<Vec<ConfigDocument>> {
        let state = self.read()?;
        Ok(state
            .documents
            .iter()
            .filter(|doc| filter.matches(doc))
            .cloned()
            .collect())
    }

    async fn find_one(&self, filter: &DocumentFilter) -> StoreResult<Option<ConfigDocument>> {
        let state = self.read()?;
        Ok(state.documents.iter().find(|doc| filter.matches(doc)).cloned())
    }

    async fn insert(&self, doc: NewConfigDocument) -> StoreResult<String> {
        let id = Uuid::new_v4().to_string();
        let mut state = self.write()?;
        state.documents.push(ConfigDocument {
            id: id.clone(),
            config_type: doc.config_type,
            name: doc.name,
            value: doc.value,
            created: doc.created,
            modified: vec![doc.created],
            discarded: false,
        });
        tracing::debug!("Inserted document with id: {}", id);
        Ok(id)
    }

    async fn update(&self, id: &str, name: &str, discarded: bool) -> StoreResult<u64> {
        Uuid::parse_str(id).map_err(|_| StoreError::InvalidIdentifier(id.to_string()))?;

        let mut state = self.write()?;
        match state.documents.iter_mut().find(|doc| doc.id == id) {
            Some(doc) => {
                doc.name = name.to_string();
                doc.discarded = discarded;
                doc.modified.push(Utc::now());
                tracing::debug!("Updated document with id: {}", id);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn config_types(&self) -> StoreResult<Vec<String>> {
        let state = self.read()?;
        let types: BTreeSet<&str> = state
            .documents
            .iter()
            .map(|doc| doc.config_type.as_str())
            .collect();
        Ok(types.into_iter().map(str::to_string).collect())
    }

    async fn count(&self) -> StoreResult<u64> {
        Ok(self.read()?.documents.len() as u64)
    }

    async fn data_size(&self) -> StoreResult<u64> {
        let state = self.read()?;
        let size = state
            .documents
            .iter()
            .map(|doc| {
                let value_len = match &doc.value {
                    StoredValue::Inline(value) => value.to_string().len(),
                    StoredValue::Blob(id) => id.len(),
                };
                doc.id.len() + doc.config_type.len() + doc.name.len() + value_len
            })
            .sum::<usize>();
        Ok(size as u64)
    }

    async fn health_check(&self) -> StoreResult<()> {
        self.read().map(|_| ())
    }
}

#[async_trait]
impl BlobStore for InMemoryStore {
    async fn put(&self, content: Vec<u8>) -> StoreResult<String> {
        let id = blob_id(&content);
        let mut state = self.write()?;
        state.blobs.entry(id.clone()).or_insert(content);
        tracing::debug!("Stored blob with id: {}", id);
        Ok(id)
    }

    async fn get(&self, id: &str) -> StoreResult<Vec<u8>> {
        validate_blob_id(id)?;
        let state = self.read()?;
        state
            .blobs
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::BlobNotFound(id.to_string()))
    }

    async fn data_size(&self) -> StoreResult<u64> {
        let state = self.read()?;
        Ok(state.blobs.values().map(|blob| blob.len() as u64).sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn new_doc(config_type: &str, name: &str) -> NewConfigDocument {
        NewConfigDocument {
            config_type: config_type.to_string(),
            name: name.to_string(),
            value: StoredValue::Inline(json!({"mtu": 1500})),
            created: Utc::now(),
        }
    }

    #[test]
    fn test_store_is_clonable_and_send_sync() {
        fn assert_clone_send_sync<T: Clone + Send + Sync>() {}
        assert_clone_send_sync::<InMemoryStore>();
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let store = InMemoryStore::new();
        let id = store.insert(new_doc("net", "eth0")).await.unwrap();

        let found = store
            .find_one(&DocumentFilter::key("net", "eth0", false))
            .await
            .unwrap()
            .expect("document should exist");
        assert_eq!(found.id, id);
        assert_eq!(found.modified, vec![found.created]);
        assert!(!found.discarded);

        let missing = store
            .find_one(&DocumentFilter::key("net", "eth0", true))
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_find_preserves_insertion_order() {
        let store = InMemoryStore::new();
        store.insert(new_doc("net", "b")).await.unwrap();
        store.insert(new_doc("net", "a")).await.unwrap();
        store.insert(new_doc("display", "c")).await.unwrap();

        let filter = DocumentFilter {
            config_type: Some("net".to_string()),
            ..Default::default()
        };
        let names: Vec<String> = store
            .find(&filter)
            .await
            .unwrap()
            .into_iter()
            .map(|doc| doc.name)
            .collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[tokio::test]
    async fn test_update_appends_modified() {
        let store = InMemoryStore::new();
        let id = store.insert(new_doc("net", "eth0")).await.unwrap();

        assert_eq!(store.update(&id, "eth0_old", true).await.unwrap(), 1);

        let doc = store
            .find_one(&DocumentFilter::key("net", "eth0_old", true))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(doc.modified.len(), 2);
        assert!(doc.modified[1] >= doc.modified[0]);
    }

    #[tokio::test]
    async fn test_update_unknown_and_malformed_ids() {
        let store = InMemoryStore::new();
        let unknown = Uuid::new_v4().to_string();
        assert_eq!(store.update(&unknown, "x", false).await.unwrap(), 0);
        assert!(matches!(
            store.update("not-an-id", "x", false).await,
            Err(StoreError::InvalidIdentifier(_))
        ));
    }

    #[tokio::test]
    async fn test_config_types_and_count() {
        let store = InMemoryStore::new();
        store.insert(new_doc("net", "eth0")).await.unwrap();
        store.insert(new_doc("display", "main")).await.unwrap();
        store.insert(new_doc("net", "eth1")).await.unwrap();

        assert_eq!(store.config_types().await.unwrap(), vec!["display", "net"]);
        assert_eq!(store.count().await.unwrap(), 3);
        assert!(DocumentStore::data_size(&store).await.unwrap() > 0);
    }

    #[tokio::test]
    async fn test_blob_put_get() {
        let store = InMemoryStore::new();
        let content = br#"{"big":true}"#.to_vec();

        let id = store.put(content.clone()).await.unwrap();
        let again = store.put(content.clone()).await.unwrap();
        assert_eq!(id, again);
        assert_eq!(store.get(&id).await.unwrap(), content);
        assert_eq!(BlobStore::data_size(&store).await.unwrap(), content.len() as u64);

        let absent = blob_id(b"absent");
        assert!(matches!(store.get(&absent).await, Err(StoreError::BlobNotFound(_))));
        assert!(matches!(store.get("zz").await, Err(StoreError::InvalidIdentifier(_))));
    }
}
