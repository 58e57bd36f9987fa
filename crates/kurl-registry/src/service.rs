//! Catalog service
//!
//! Owns the catalog snapshot request handling reads from and the background
//! task that refreshes it. Each refresh loads the registry document, imports
//! what the feeds publish, writes the document back when it changed, merges
//! it over the built-in catalog and swaps the whole snapshot in. A refresh
//! that fails leaves the previous snapshot serving.

use crate::addon::{AddonRegistry, ImportReport};
use crate::blob::{load_registry, save_registry, BlobStore};
use crate::feed::FeedClient;
use anyhow::{Context, Result};
use arc_swap::ArcSwap;
use async_trait::async_trait;
use kurl_core::KurlConfig;
use kurl_versions::{CatalogProvider, StrategyTable, VersionCatalog};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Per-release artifact listing the versions a kURL release shipped with
pub const SUPPORTED_VERSIONS_FILE: &str = "supported-versions-gen.json";

/// What one refresh cycle did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshReport {
    pub import: ImportReport,
    /// Whether the registry document was written back
    pub published: bool,
    /// Add-ons in the new snapshot
    pub addons: usize,
}

struct Inner {
    builtin: Arc<VersionCatalog>,
    current: ArcSwap<VersionCatalog>,
    registry: ArcSwap<AddonRegistry>,
    store: Arc<dyn BlobStore>,
    client: FeedClient,
    strategies: StrategyTable,
    config: KurlConfig,
    /// Supported-versions catalogs by artifact URL
    releases: RwLock<HashMap<String, Arc<VersionCatalog>>>,
}

struct RefreshTask {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Refreshable catalog shared by request handlers
pub struct CatalogService {
    inner: Arc<Inner>,
    task: Mutex<Option<RefreshTask>>,
}

impl CatalogService {
    /// Service over the embedded built-in catalog
    pub fn new(config: KurlConfig, store: Arc<dyn BlobStore>) -> Result<Self> {
        let builtin = VersionCatalog::builtin().context("Failed to load built-in catalog")?;
        Self::with_builtin(config, store, builtin)
    }

    /// Service over an explicit base catalog
    pub fn with_builtin(config: KurlConfig, store: Arc<dyn BlobStore>, builtin: VersionCatalog) -> Result<Self> {
        let builtin = Arc::new(builtin.with_preferred_latest(config.preferred_latest.clone()));
        let client = FeedClient::new(config.fetch_timeout())?;

        Ok(Self {
            inner: Arc::new(Inner {
                current: ArcSwap::new(Arc::clone(&builtin)),
                builtin,
                registry: ArcSwap::from_pointee(AddonRegistry::new()),
                store,
                client,
                strategies: StrategyTable::builtin(),
                config,
                releases: RwLock::new(HashMap::new()),
            }),
            task: Mutex::new(None),
        })
    }

    /// The snapshot to serve from
    pub fn snapshot(&self) -> Arc<VersionCatalog> {
        self.inner.current.load_full()
    }

    /// The registry document as of the last successful refresh
    pub fn registry(&self) -> Arc<AddonRegistry> {
        self.inner.registry.load_full()
    }

    /// Run one refresh cycle now
    pub async fn refresh_once(&self) -> Result<RefreshReport> {
        self.inner.refresh_once().await
    }

    /// Catalog for a specific kURL release.
    ///
    /// Reads that release's supported-versions artifact and merges external
    /// add-ons compatible with it. Releases that did not publish the artifact
    /// fall back to the built-in catalog. Without a release this is the
    /// current snapshot.
    pub async fn catalog_for(&self, kurl_version: Option<&str>) -> Result<Arc<VersionCatalog>> {
        let Some(version) = kurl_version.filter(|v| !v.is_empty()) else {
            return Ok(self.snapshot());
        };

        let base = self.inner.release_catalog(version).await?;
        let registry = self.registry();
        let merged = VersionCatalog::merge(&base, registry.addons(), Some(version))
            .with_preferred_latest(self.inner.config.preferred_latest.clone());
        Ok(Arc::new(merged))
    }

    /// Start the periodic refresh loop. The first cycle runs immediately.
    /// Does nothing when the loop is already running.
    pub async fn start(&self) {
        let mut task = self.task.lock().await;
        if task.is_some() {
            debug!("Catalog refresh already running");
            return;
        }

        let (shutdown, mut stopped) = watch::channel(false);
        let inner = Arc::clone(&self.inner);
        let interval = inner.config.refresh_interval();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = inner.refresh_once().await {
                            warn!("Catalog refresh failed, keeping previous snapshot: {:#}", e);
                        }
                    }
                    _ = stopped.changed() => break,
                }
            }
            debug!("Catalog refresh loop stopped");
        });

        info!("Started catalog refresh every {}s", interval.as_secs());
        *task = Some(RefreshTask { shutdown, handle });
    }

    /// Stop the refresh loop and wait for it to exit
    pub async fn stop(&self) {
        let Some(task) = self.task.lock().await.take() else {
            return;
        };
        // the receiver is gone only if the loop already exited
        let _ = task.shutdown.send(true);
        if let Err(e) = task.handle.await {
            warn!("Catalog refresh task ended abnormally: {}", e);
        }
        info!("Stopped catalog refresh");
    }

    pub async fn is_running(&self) -> bool {
        self.task.lock().await.is_some()
    }
}

impl Drop for CatalogService {
    fn drop(&mut self) {
        if let Some(task) = self.task.get_mut().take() {
            task.handle.abort();
        }
    }
}

#[async_trait]
impl CatalogProvider for CatalogService {
    fn current(&self) -> Arc<VersionCatalog> {
        self.snapshot()
    }

    async fn catalog_for(&self, installer_version: Option<&str>) -> kurl_core::Result<Arc<VersionCatalog>> {
        CatalogService::catalog_for(self, installer_version).await.map_err(|e| {
            kurl_core::Error::catalog_unavailable(installer_version.unwrap_or_default(), format!("{:#}", e))
        })
    }
}

impl Inner {
    async fn refresh_once(&self) -> Result<RefreshReport> {
        let key = &self.config.registry_key;
        let mut registry = load_registry(self.store.as_ref(), key).await?;

        let pulled = self.client.pull(&self.config.feeds).await;
        let mut import = ImportReport::default();
        for (addon, records) in pulled {
            import.absorb(registry.import(&addon, records, &self.strategies));
        }

        let published = import.changed();
        if published {
            save_registry(self.store.as_ref(), key, &registry).await?;
        }

        let merged = VersionCatalog::merge(
            &self.builtin,
            registry.addons(),
            self.config.installer_version.as_deref(),
        )
        .with_preferred_latest(self.config.preferred_latest.clone());
        let addons = merged.addons().count();

        self.current.store(Arc::new(merged));
        self.registry.store(Arc::new(registry));
        info!(
            "Refreshed catalog: {} add-ons, {} imported, {} released",
            addons,
            import.added.len(),
            import.promoted.len()
        );

        Ok(RefreshReport {
            import,
            published,
            addons,
        })
    }

    async fn release_catalog(&self, version: &str) -> Result<Arc<VersionCatalog>> {
        let url = self.config.package_url(Some(version), SUPPORTED_VERSIONS_FILE);
        if let Some(cached) = self.releases.read().await.get(&url) {
            return Ok(Arc::clone(cached));
        }

        let Some(bytes) = self.client.fetch_supported_versions(&url).await? else {
            debug!("Using built-in catalog for kURL {}", version);
            return Ok(Arc::clone(&self.builtin));
        };
        let catalog = VersionCatalog::from_supported_versions_json(&bytes)
            .with_context(|| format!("Invalid supported versions at {}", url))?;

        let catalog = Arc::new(catalog);
        self.releases.write().await.insert(url, Arc::clone(&catalog));
        Ok(catalog)
    }
}
