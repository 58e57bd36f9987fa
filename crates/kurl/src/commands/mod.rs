//! CLI command implementations

pub mod config;
pub mod refresh;
pub mod spec;
pub mod versions;

use anyhow::{Context, Result};
use camino::Utf8Path;
use kurl_core::{ConfigLoader, KurlConfig};
use kurl_registry::{BlobStore, CatalogService, MemoryBlobStore};
use kurl_versions::VersionCatalog;
use std::io::Read;
use std::sync::Arc;
use tracing::debug;

/// Read a document from a file, or stdin for `-`
pub fn read_input(file: &str) -> Result<String> {
    if file == "-" {
        let mut content = String::new();
        std::io::stdin()
            .read_to_string(&mut content)
            .context("Failed to read stdin")?;
        return Ok(content);
    }
    std::fs::read_to_string(file).with_context(|| format!("Failed to read {}", file))
}

/// Load configuration, with `path` replacing ~/.kurl/config.yaml when given
pub fn load_config(path: Option<&Utf8Path>) -> Result<KurlConfig> {
    let loader = ConfigLoader::new()?;
    let config = match path {
        Some(path) => loader.load_from(path)?,
        None => loader.load()?,
    };
    Ok(config)
}

/// Catalog for a kURL release, or the built-in catalog
pub async fn load_catalog(config: &KurlConfig, release: Option<&str>) -> Result<Arc<VersionCatalog>> {
    match release.filter(|r| !r.is_empty()) {
        Some(release) => {
            debug!("Loading catalog for kURL {}", release);
            let store: Arc<dyn BlobStore> = Arc::new(MemoryBlobStore::new());
            let service = CatalogService::new(config.clone(), store)?;
            service.catalog_for(Some(release)).await
        }
        None => {
            let catalog = VersionCatalog::builtin()?.with_preferred_latest(config.preferred_latest.clone());
            Ok(Arc::new(catalog))
        }
    }
}
