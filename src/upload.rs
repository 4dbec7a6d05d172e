//! Upload flow: decode, pick a batch, assemble, persist, build the URL.

use crate::bundle::{decode_base64, ArtifactBundle, GenerationOutput, INDEX_DOCUMENT};
use crate::storage::{BatchProvider, PersistenceClient, PostageBatch, UploadOptions};
use crate::{Error, GalleryConfig, Result};

/// Retrieval URL of a collection: `<service_url>/bzz/<reference>/`
pub fn retrieval_url(config: &GalleryConfig, reference: &str) -> String {
    format!(
        "{}/bzz/{}/",
        config.service_url.as_str().trim_end_matches('/'),
        reference
    )
}

/// The batch uploads are paid with: the first one `batches` reports.
pub async fn select_batch(batches: &dyn BatchProvider) -> Result<PostageBatch> {
    batches
        .get_all_postage_batches()
        .await?
        .into_iter()
        .next()
        .ok_or(Error::NoBatchAvailable)
}

/// Upload one generation result and return its retrieval URL.
///
/// The image is decoded before any collaborator is contacted, a fresh batch
/// lookup happens on every call, and collaborator errors are returned as-is.
pub async fn upload(
    config: &GalleryConfig,
    output: &GenerationOutput,
    batches: &dyn BatchProvider,
    store: &dyn PersistenceClient,
) -> Result<String> {
    let image = decode_base64(&output.image_base64)?;
    log::debug!("decoded image: {} bytes", image.len());

    let batch_id = select_batch(batches).await?.batch_id;

    let bundle = ArtifactBundle::assemble(image, output);
    log::debug!(
        "uploading {} payloads ({} bytes) with batch {}",
        bundle.len(),
        bundle.total_bytes(),
        batch_id
    );

    let options = UploadOptions {
        index_document: Some(INDEX_DOCUMENT.to_string()),
    };
    let result = store.upload_files(&batch_id, &bundle, &options).await?;
    log::info!("uploaded collection {}", result.reference);
    Ok(retrieval_url(config, &result.reference))
}

/// Binds a configuration to a batch provider and a persistence client.
pub struct ArtifactBundler<B, P> {
    config: GalleryConfig,
    batches: B,
    store: P,
}

impl<B: BatchProvider, P: PersistenceClient> ArtifactBundler<B, P> {
    pub fn new(config: GalleryConfig, batches: B, store: P) -> Self {
        Self { config, batches, store }
    }

    pub fn store(&self) -> &P {
        &self.store
    }

    /// See [`upload`]
    pub async fn upload(&self, output: &GenerationOutput) -> Result<String> {
        upload(&self.config, output, &self.batches, &self.store).await
    }
}

#[cfg(feature = "bee")]
impl ArtifactBundler<crate::bee::BeeClient, crate::bee::BeeClient> {
    /// A bundler that talks to the Bee node described by `config` for both
    /// batch lookups and uploads.
    pub fn bee(config: GalleryConfig) -> Result<Self> {
        let client = crate::bee::BeeClient::new(config.clone())?;
        Ok(Self::new(config, client.clone(), client))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStore, UploadResult};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn output() -> GenerationOutput {
        GenerationOutput {
            image_base64: "iVBORw0KGgo=".to_string(),
            description: "d".to_string(),
            poem: "p".to_string(),
            colors: "c".to_string(),
            metadata: "{}".to_string(),
            generated: "g".to_string(),
        }
    }

    struct FixedBatches(Vec<PostageBatch>, AtomicUsize);

    impl FixedBatches {
        fn new(ids: &[&str]) -> Self {
            FixedBatches(ids.iter().map(|id| PostageBatch::new(id)).collect(), AtomicUsize::new(0))
        }
    }

    #[async_trait]
    impl BatchProvider for FixedBatches {
        async fn get_all_postage_batches(&self) -> Result<Vec<PostageBatch>> {
            self.1.fetch_add(1, Ordering::SeqCst);
            Ok(self.0.clone())
        }
    }

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<(String, Vec<String>, Option<String>)>>,
        fail: bool,
    }

    #[async_trait]
    impl PersistenceClient for Recorder {
        async fn upload_files(
            &self,
            batch_id: &str,
            bundle: &ArtifactBundle,
            options: &UploadOptions,
        ) -> Result<UploadResult> {
            let names = bundle.payloads().iter().map(|p| p.name.clone()).collect();
            self.calls
                .lock()
                .unwrap()
                .push((batch_id.to_string(), names, options.index_document.clone()));
            if self.fail {
                return Err(Error::Persistence("node refused".to_string()));
            }
            Ok(UploadResult {
                reference: "ref123".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn end_to_end_with_stubs() {
        let batches = FixedBatches::new(&["abc"]);
        let store = Recorder::default();
        let url = upload(&GalleryConfig::default(), &output(), &batches, &store)
            .await
            .unwrap();
        assert_eq!(url, "http://localhost:1633/bzz/ref123/");

        let calls = store.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "abc");
        assert_eq!(calls[0].1, ["nft", "desc", "poem", "colors", "metadata", "gen"]);
        assert_eq!(calls[0].2.as_deref(), Some("nft"));
    }

    #[tokio::test]
    async fn first_batch_wins() {
        let batches = FixedBatches::new(&["first", "second"]);
        let store = Recorder::default();
        upload(&GalleryConfig::default(), &output(), &batches, &store)
            .await
            .unwrap();
        assert_eq!(store.calls.lock().unwrap()[0].0, "first");
    }

    #[tokio::test]
    async fn select_batch_takes_the_first() {
        let batch = select_batch(&FixedBatches::new(&["x", "y"])).await.unwrap();
        assert_eq!(batch.batch_id, "x");
        let err = select_batch(&FixedBatches::new(&[])).await.unwrap_err();
        assert!(matches!(err, Error::NoBatchAvailable));
    }

    #[tokio::test]
    async fn empty_batch_list_skips_upload() {
        let batches = FixedBatches::new(&[]);
        let store = Recorder::default();
        let err = upload(&GalleryConfig::default(), &output(), &batches, &store)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NoBatchAvailable));
        assert!(store.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn bad_image_fails_before_any_lookup() {
        let batches = FixedBatches::new(&["abc"]);
        let store = Recorder::default();
        let mut out = output();
        out.image_base64 = "not base64!".to_string();
        let err = upload(&GalleryConfig::default(), &out, &batches, &store)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
        assert_eq!(batches.1.load(Ordering::SeqCst), 0);
        assert!(store.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn persistence_errors_propagate_without_retry() {
        let batches = FixedBatches::new(&["abc"]);
        let store = Recorder {
            fail: true,
            ..Default::default()
        };
        let err = upload(&GalleryConfig::default(), &output(), &batches, &store)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Persistence(_)));
        assert_eq!(store.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn every_upload_looks_up_a_fresh_batch() {
        let bundler = ArtifactBundler::new(
            GalleryConfig::default(),
            FixedBatches::new(&["abc"]),
            Recorder::default(),
        );
        bundler.upload(&output()).await.unwrap();
        bundler.upload(&output()).await.unwrap();
        assert_eq!(bundler.batches.1.load(Ordering::SeqCst), 2);
        assert_eq!(bundler.store().calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn memory_store_round_trip() {
        let store = MemoryStore::with_batches(vec![PostageBatch::new("b")]);
        let url = upload(&GalleryConfig::default(), &output(), &store, &store)
            .await
            .unwrap();
        let reference = url
            .trim_start_matches("http://localhost:1633/bzz/")
            .trim_end_matches('/');
        let stored = store.get(reference).unwrap();
        assert_eq!(stored.payloads[0].bytes.len(), 8);
    }

    #[test]
    fn retrieval_url_avoids_double_slash() {
        let mut cfg = GalleryConfig::default();
        cfg.service_url = url::Url::parse("http://bee.local:8080/").unwrap();
        assert_eq!(retrieval_url(&cfg, "r"), "http://bee.local:8080/bzz/r/");
    }
}
