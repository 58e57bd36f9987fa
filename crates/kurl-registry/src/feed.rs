//! Upstream feed fetching
//!
//! Feeds publish a JSON array of add-on records. Supported-versions
//! artifacts are published per kURL release under the dist bucket.

use crate::addon::ExternalAddon;
use anyhow::{anyhow, Context, Result};
use reqwest::StatusCode;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, warn};

/// Records pulled from each feed, by add-on name
pub type PulledRecords = BTreeMap<String, Vec<ExternalAddon>>;

/// HTTP client for feeds and dist artifacts
#[derive(Debug, Clone)]
pub struct FeedClient {
    client: reqwest::Client,
}

impl FeedClient {
    /// Client whose requests give up after `timeout`
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("kurl/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { client })
    }

    /// Fetch one feed
    pub async fn fetch_feed(&self, url: &str) -> Result<Vec<ExternalAddon>> {
        debug!("Fetching add-on feed from: {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch {}", url))?;

        if !response.status().is_success() {
            return Err(anyhow!("Failed to fetch {}: {}", url, response.status()));
        }

        let records: Vec<ExternalAddon> = response
            .json()
            .await
            .with_context(|| format!("Invalid add-on feed at {}", url))?;
        Ok(records)
    }

    /// Fetch every feed. A feed that fails is logged and left out of this
    /// pull; the others still count.
    pub async fn pull(&self, feeds: &BTreeMap<String, String>) -> PulledRecords {
        let mut pulled = PulledRecords::new();
        for (addon, url) in feeds {
            match self.fetch_feed(url).await {
                Ok(records) => {
                    debug!("Pulled {} {} records", records.len(), addon);
                    pulled.insert(addon.clone(), records);
                }
                Err(e) => warn!("Skipping {} feed this cycle: {:#}", addon, e),
            }
        }
        pulled
    }

    /// Fetch a supported-versions artifact.
    ///
    /// `Ok(None)` when the artifact is not published (403 or 404); other
    /// failures are errors.
    pub async fn fetch_supported_versions(&self, url: &str) -> Result<Option<Vec<u8>>> {
        debug!("Fetching supported versions from: {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch {}", url))?;

        match response.status() {
            StatusCode::NOT_FOUND | StatusCode::FORBIDDEN => {
                debug!("No supported versions published at {}", url);
                Ok(None)
            }
            status if status.is_success() => {
                let bytes = response
                    .bytes()
                    .await
                    .with_context(|| format!("Failed to read {}", url))?;
                Ok(Some(bytes.to_vec()))
            }
            status => Err(anyhow!("Unexpected status code {} fetching {}", status, url)),
        }
    }
}
