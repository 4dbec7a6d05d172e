//! Storage collaborators: where postage batches come from and where bundles go.
//!
//! The bundler only needs two capabilities, both expressed as traits so a Bee
//! node, an in-memory store or a test double can stand behind them.

use crate::bundle::{ArtifactBundle, Payload};
use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Mutex;

/// A postage batch as reported by the Bee node. Only `batch_id` is required;
/// the remaining fields are informational.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostageBatch {
    #[serde(rename = "batchID")]
    pub batch_id: String,
    #[serde(default)]
    pub utilization: Option<u64>,
    #[serde(default)]
    pub usable: Option<bool>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub depth: Option<u8>,
    #[serde(default)]
    pub amount: Option<String>,
    #[serde(default, rename = "batchTTL")]
    pub batch_ttl: Option<i64>,
}

impl PostageBatch {
    pub fn new(batch_id: &str) -> Self {
        Self {
            batch_id: batch_id.to_string(),
            ..Default::default()
        }
    }
}

/// Options forwarded with a collection upload
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadOptions {
    /// Payload served for the collection root
    pub index_document: Option<String>,
}

/// Response of a successful upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResult {
    /// Content reference of the uploaded collection
    pub reference: String,
}

/// Source of postage batches (the storage locator)
#[async_trait]
pub trait BatchProvider: Send + Sync {
    /// List every postage batch the node knows about
    async fn get_all_postage_batches(&self) -> Result<Vec<PostageBatch>>;
}

/// Destination that persists a bundle and returns its content reference
#[async_trait]
pub trait PersistenceClient: Send + Sync {
    /// Upload all payloads of `bundle` as one collection paid for by `batch_id`
    async fn upload_files(
        &self,
        batch_id: &str,
        bundle: &ArtifactBundle,
        options: &UploadOptions,
    ) -> Result<UploadResult>;
}

/// A collection kept by `MemoryStore`
#[derive(Debug, Clone)]
pub struct StoredCollection {
    pub batch_id: String,
    pub index_document: Option<String>,
    pub payloads: Vec<Payload>,
}

/// In-memory store used for dry runs and tests. References are the hex
/// SHA-256 of the collection's names, content types and bytes.
pub struct MemoryStore {
    batches: Vec<PostageBatch>,
    collections: Mutex<HashMap<String, StoredCollection>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_batches(vec![PostageBatch::new(&"0".repeat(64))])
    }

    pub fn with_batches(batches: Vec<PostageBatch>) -> Self {
        MemoryStore {
            batches,
            collections: Mutex::new(HashMap::new()),
        }
    }

    /// Fetch a stored collection by reference
    pub fn get(&self, reference: &str) -> Option<StoredCollection> {
        self.collections.lock().ok()?.get(reference).cloned()
    }

    pub fn len(&self) -> usize {
        self.collections.lock().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Content reference `MemoryStore` assigns to a bundle
pub fn bundle_reference(bundle: &ArtifactBundle) -> String {
    let mut hasher = Sha256::new();
    for p in bundle.payloads() {
        hasher.update(p.name.as_bytes());
        hasher.update([0u8]);
        hasher.update(p.content_type.as_bytes());
        hasher.update([0u8]);
        hasher.update((p.bytes.len() as u64).to_be_bytes());
        hasher.update(&p.bytes);
    }
    hex::encode(hasher.finalize())
}

#[async_trait]
impl BatchProvider for MemoryStore {
    async fn get_all_postage_batches(&self) -> Result<Vec<PostageBatch>> {
        Ok(self.batches.clone())
    }
}

#[async_trait]
impl PersistenceClient for MemoryStore {
    async fn upload_files(
        &self,
        batch_id: &str,
        bundle: &ArtifactBundle,
        options: &UploadOptions,
    ) -> Result<UploadResult> {
        if !self.batches.iter().any(|b| b.batch_id == batch_id) {
            return Err(crate::Error::Persistence(format!("unknown postage batch {}", batch_id)));
        }
        let reference = bundle_reference(bundle);
        let collection = StoredCollection {
            batch_id: batch_id.to_string(),
            index_document: options.index_document.clone(),
            payloads: bundle.payloads().to_vec(),
        };
        self.collections
            .lock()
            .map_err(|e| crate::Error::Persistence(format!("store poisoned: {}", e)))?
            .insert(reference.clone(), collection);
        Ok(UploadResult { reference })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::GenerationOutput;

    fn bundle(desc: &str) -> ArtifactBundle {
        let out = GenerationOutput {
            description: desc.to_string(),
            ..Default::default()
        };
        ArtifactBundle::assemble(vec![1, 2, 3], &out)
    }

    #[test]
    fn postage_batch_parses_bee_json() {
        let json = r#"{
            "batchID": "abc", "utilization": 0, "usable": true, "label": "", "depth": 20,
            "amount": "1000", "bucketDepth": 16, "blockNumber": 1, "immutableFlag": false,
            "exists": true, "batchTTL": 3600
        }"#;
        let batch: PostageBatch = serde_json::from_str(json).unwrap();
        assert_eq!(batch.batch_id, "abc");
        assert_eq!(batch.depth, Some(20));
        assert_eq!(batch.batch_ttl, Some(3600));

        let minimal: PostageBatch = serde_json::from_str(r#"{"batchID":"x"}"#).unwrap();
        assert_eq!(minimal, PostageBatch::new("x"));
    }

    #[test]
    fn references_are_content_derived() {
        assert_eq!(bundle_reference(&bundle("a")), bundle_reference(&bundle("a")));
        assert_ne!(bundle_reference(&bundle("a")), bundle_reference(&bundle("b")));
        assert_eq!(bundle_reference(&bundle("a")).len(), 64);
    }

    #[tokio::test]
    async fn memory_store_keeps_collections() {
        let store = MemoryStore::with_batches(vec![PostageBatch::new("b1")]);
        let opts = UploadOptions {
            index_document: Some("nft".to_string()),
        };
        let res = store.upload_files("b1", &bundle("a"), &opts).await.unwrap();
        let stored = store.get(&res.reference).unwrap();
        assert_eq!(stored.batch_id, "b1");
        assert_eq!(stored.index_document.as_deref(), Some("nft"));
        assert_eq!(stored.payloads.len(), 6);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn memory_store_rejects_unknown_batch() {
        let store = MemoryStore::with_batches(vec![]);
        let err = store
            .upload_files("nope", &bundle("a"), &UploadOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, crate::Error::Persistence(_)));
        assert!(store.is_empty());
    }
}
