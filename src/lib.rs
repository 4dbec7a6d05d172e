//! Swarm Gallery
//!
//! Renders generated NFT gallery cards and uploads generation artifacts to a
//! Swarm Bee node.
//!
//! # Features
//!
//! - **Cards**: `render_result` builds a `div.result` card in an in-memory
//!   `Document`, with a details panel revealed on pointer hover
//! - **Bundles**: `upload` decodes the image, picks a postage batch, uploads a
//!   fixed six-file collection and returns the `/bzz/` retrieval URL
//! - **Search**: a keyword prefix index, optionally sharded and stored on Swarm
//! - **Bee backend** (default feature `bee`): HTTP client for a Bee node
//!
//! # Example
//!
//! ```no_run
//! use swarmgallery::{ArtifactBundler, GalleryConfig, GenerationOutput};
//!
//! # async fn run() -> swarmgallery::Result<()> {
//! let bundler = ArtifactBundler::bee(GalleryConfig::default())?;
//! let output = GenerationOutput {
//!     image_base64: "iVBORw0KGgo=".to_string(),
//!     metadata: "{}".to_string(),
//!     ..Default::default()
//! };
//! let url = bundler.upload(&output).await?;
//! println!("{}", url);
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};
use url::Url;

pub mod error;
pub use error::{Error, Result};

pub mod bundle;
pub mod index;
pub mod rendering;
pub mod storage;
pub mod upload;

// HTTP client for a Bee node
#[cfg(feature = "bee")]
pub mod bee;

pub use bundle::{decode_base64, ArtifactBundle, GenerationOutput, Payload};
pub use index::{GalleryIndex, ShardedIndex};
pub use rendering::{render_details, render_result, Document, EventKind, NodeId};
pub use storage::{
    BatchProvider, MemoryStore, PersistenceClient, PostageBatch, UploadOptions, UploadResult,
};
pub use upload::{select_batch, upload, ArtifactBundler};

#[cfg(feature = "bee")]
pub use bee::BeeClient;

/// Default Bee API endpoint
pub const DEFAULT_SERVICE_URL: &str = "http://localhost:1633";
/// Default Bee debug (administrative) endpoint
pub const DEFAULT_ADMIN_URL: &str = "http://localhost:1635";

/// Environment variable overriding `service_url`
pub const ENV_SERVICE_URL: &str = "SWARM_BEE_API_URL";
/// Environment variable overriding `admin_url`
pub const ENV_ADMIN_URL: &str = "SWARM_BEE_DEBUG_API_URL";

/// Where the Bee node lives and how to talk to it
///
/// # Examples
///
/// ```
/// let cfg = swarmgallery::GalleryConfig::default();
/// assert_eq!(cfg.service_url.port(), Some(1633));
/// ```
#[derive(Debug, Clone)]
pub struct GalleryConfig {
    /// Bee API base URL (uploads, downloads, retrieval URLs)
    pub service_url: Url,
    /// Bee debug API base URL (postage batches)
    pub admin_url: Url,
    /// Request timeout in milliseconds
    pub timeout_ms: u64,
    /// User agent string sent with requests
    pub user_agent: String,
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            service_url: Url::parse(DEFAULT_SERVICE_URL).expect("default service URL is valid"),
            admin_url: Url::parse(DEFAULT_ADMIN_URL).expect("default admin URL is valid"),
            timeout_ms: 30000,
            user_agent: format!("swarmgallery/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl GalleryConfig {
    /// Build a config from explicit endpoints
    pub fn new(service_url: &str, admin_url: &str) -> Result<Self> {
        Ok(Self {
            service_url: Url::parse(service_url)?,
            admin_url: Url::parse(admin_url)?,
            ..Default::default()
        })
    }

    /// Defaults overridden by `SWARM_BEE_API_URL` / `SWARM_BEE_DEBUG_API_URL`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        if let Some(v) = lookup(ENV_SERVICE_URL) {
            cfg.service_url = Url::parse(&v)
                .map_err(|e| Error::Config(format!("{}={}: {}", ENV_SERVICE_URL, v, e)))?;
        }
        if let Some(v) = lookup(ENV_ADMIN_URL) {
            cfg.admin_url = Url::parse(&v)
                .map_err(|e| Error::Config(format!("{}={}: {}", ENV_ADMIN_URL, v, e)))?;
        }
        Ok(cfg)
    }
}

/// A search result shown as one gallery card
///
/// Keywords keep their order for rendering, but two items are equal when
/// they carry the same keyword set, description and image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GalleryItem {
    pub image_url: String,
    pub keywords: Vec<String>,
    pub description: String,
}

impl GalleryItem {
    fn keyword_set(&self) -> BTreeSet<&str> {
        self.keywords.iter().map(String::as_str).collect()
    }
}

impl PartialEq for GalleryItem {
    fn eq(&self, other: &Self) -> bool {
        self.image_url == other.image_url
            && self.description == other.description
            && self.keyword_set() == other.keyword_set()
    }
}

impl Eq for GalleryItem {}

impl Hash for GalleryItem {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.image_url.hash(state);
        self.description.hash(state);
        self.keyword_set().hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_default_config() {
        let config = GalleryConfig::default();
        assert_eq!(config.service_url.as_str(), "http://localhost:1633/");
        assert_eq!(config.admin_url.port(), Some(1635));
        assert_eq!(config.timeout_ms, 30000);
    }

    #[test]
    fn test_config_from_lookup() {
        let cfg = GalleryConfig::from_lookup(|k| {
            (k == ENV_SERVICE_URL).then(|| "http://bee:1633".to_string())
        })
        .unwrap();
        assert_eq!(cfg.service_url.host_str(), Some("bee"));
        assert_eq!(cfg.admin_url.port(), Some(1635));

        let err =
            GalleryConfig::from_lookup(|k| (k == ENV_ADMIN_URL).then(|| "not a url".to_string()));
        assert!(matches!(err, Err(Error::Config(_))));
    }

    #[test]
    fn test_item_equality_ignores_keyword_order() {
        let a = GalleryItem {
            image_url: "u".into(),
            keywords: vec!["x".into(), "y".into()],
            description: "d".into(),
        };
        let mut b = a.clone();
        b.keywords.reverse();
        assert_eq!(a, b);
        let set: HashSet<GalleryItem> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 1);
    }
}
