//! Bee backend: postage batches, collection uploads and downloads over the
//! Bee HTTP API.
//!
//! Batches come from the debug API (`GET /stamps`), collections are posted to
//! `/bzz` as `multipart/form-data` with one part per payload, and stored
//! files are read back from `/bzz/<reference>/<path>`.

use crate::bundle::{ArtifactBundle, Payload};
use crate::index::{Shard, ShardLoader};
use crate::storage::{BatchProvider, PersistenceClient, PostageBatch, UploadOptions, UploadResult};
use crate::{Error, GalleryConfig, Result};
use async_trait::async_trait;
use log::warn;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

pub const HEADER_POSTAGE_BATCH_ID: &str = "swarm-postage-batch-id";
pub const HEADER_COLLECTION: &str = "swarm-collection";
pub const HEADER_INDEX_DOCUMENT: &str = "swarm-index-document";

/// Index document name used when a shard is uploaded on its own
pub const SHARD_DOCUMENT: &str = "shard.json";

#[derive(Deserialize)]
struct StampsResponse {
    #[serde(default)]
    stamps: Vec<PostageBatch>,
}

/// HTTP client for one Bee node. Cheap to clone.
#[derive(Clone)]
pub struct BeeClient {
    client: Client,
    config: GalleryConfig,
}

fn endpoint(base: &Url, path: &str) -> String {
    format!("{}/{}", base.as_str().trim_end_matches('/'), path.trim_start_matches('/'))
}

impl BeeClient {
    pub fn new(config: GalleryConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    /// Post `payloads` as one collection
    async fn post_collection(
        &self,
        batch_id: &str,
        payloads: &[Payload],
        index_document: Option<&str>,
    ) -> Result<UploadResult> {
        let mut form = Form::new();
        for p in payloads {
            let part = Part::bytes(p.bytes.clone())
                .file_name(p.name.clone())
                .mime_str(&p.content_type)
                .map_err(|e| {
                    Error::Persistence(format!("invalid content type {}: {}", p.content_type, e))
                })?;
            form = form.part(p.name.clone(), part);
        }

        let url = endpoint(&self.config.service_url, "bzz");
        let mut req = self
            .client
            .post(&url)
            .header(HEADER_POSTAGE_BATCH_ID, batch_id)
            .header(HEADER_COLLECTION, "true")
            .multipart(form);
        if let Some(doc) = index_document {
            req = req.header(HEADER_INDEX_DOCUMENT, doc);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| Error::Persistence(format!("POST {} failed: {}", url, e)))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!("POST {} returned {}: {}", url, status, body);
            return Err(Error::Persistence(format!("POST {} returned {}: {}", url, status, body)));
        }
        resp.json::<UploadResult>()
            .await
            .map_err(|e| Error::Persistence(format!("unexpected upload response: {}", e)))
    }

    /// Read `path` inside the collection `reference`; an empty path returns
    /// the index document.
    pub async fn download(&self, reference: &str, path: &str) -> Result<Vec<u8>> {
        let url = endpoint(
            &self.config.service_url,
            &format!("bzz/{}/{}", reference, path.trim_start_matches('/')),
        );
        let resp = self.client.get(&url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!("GET {} returned {}: {}", url, status, body);
            return Err(Error::Network(format!("GET {} returned {}: {}", url, status, body)));
        }
        Ok(resp.bytes().await?.to_vec())
    }

    /// Upload one index shard as a single-file collection
    pub async fn upload_shard(&self, batch_id: &str, shard: &Shard) -> Result<UploadResult> {
        let payload = Payload::new(SHARD_DOCUMENT, shard.to_json()?, "application/json");
        self.post_collection(batch_id, &[payload], Some(SHARD_DOCUMENT)).await
    }
}

#[async_trait]
impl BatchProvider for BeeClient {
    async fn get_all_postage_batches(&self) -> Result<Vec<PostageBatch>> {
        let url = endpoint(&self.config.admin_url, "stamps");
        let resp = self.client.get(&url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!("GET {} returned {}: {}", url, status, body);
            return Err(Error::Network(format!("GET {} returned {}: {}", url, status, body)));
        }
        let stamps: StampsResponse = resp.json().await?;
        log::debug!("{} postage batches available", stamps.stamps.len());
        Ok(stamps.stamps)
    }
}

#[async_trait]
impl PersistenceClient for BeeClient {
    async fn upload_files(
        &self,
        batch_id: &str,
        bundle: &ArtifactBundle,
        options: &UploadOptions,
    ) -> Result<UploadResult> {
        self.post_collection(batch_id, bundle.payloads(), options.index_document.as_deref())
            .await
    }
}

#[async_trait]
impl ShardLoader for BeeClient {
    async fn load_shard(&self, reference: &str) -> Result<Shard> {
        let bytes = self.download(reference, "").await?;
        Shard::from_json(&bytes)
    }
}
