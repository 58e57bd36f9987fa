//! Refresh command

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use kurl_core::get_home_dir;
use kurl_registry::{BlobStore, CatalogService, FsBlobStore};
use std::sync::Arc;

use super::load_config;
use crate::cli::RefreshArgs;
use crate::output;

fn default_store_dir() -> Result<Utf8PathBuf> {
    let home = Utf8PathBuf::from_path_buf(get_home_dir()?)
        .map_err(|p| anyhow::anyhow!("Home directory is not valid UTF-8: {}", p.display()))?;
    Ok(home.join(".kurl").join("blobs"))
}

pub async fn run(args: RefreshArgs, config_path: Option<&Utf8Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let dir = match args.store_dir {
        Some(dir) => dir,
        None => default_store_dir()?,
    };
    let key = config.registry_key.clone();

    let store: Arc<dyn BlobStore> = Arc::new(FsBlobStore::new(dir.clone()));
    let service = CatalogService::new(config, store)?;
    let report = service
        .refresh_once()
        .await
        .with_context(|| format!("Failed to refresh registry in {}", dir))?;

    output::header("Registry refresh");
    output::kv("Registry", dir.join(&key).as_str());
    output::kv("Imported", &report.import.added.len().to_string());
    output::kv("Released", &report.import.promoted.len().to_string());
    output::kv("Add-ons", &report.addons.to_string());

    for (addon, version) in &report.import.added {
        output::info(&format!("Imported {} {}", addon, version));
    }
    for (addon, version) in &report.import.promoted {
        output::info(&format!("Released {} {}", addon, version));
    }
    if report.published {
        output::success("Registry document updated");
    } else {
        output::success("Registry is up to date");
    }
    Ok(())
}
