//! Blob storage for the external add-on registry
//!
//! The registry document lives in an object store bucket in production. The
//! trait keeps the refresh loop independent of where bytes are kept.

use crate::addon::AddonRegistry;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Key/value byte storage
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Bytes stored at `key`, or `None` when the key does not exist
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<()>;
}

/// In-process blob store
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.blobs.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.blobs.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
        self.blobs.write().await.insert(key.to_string(), bytes);
        Ok(())
    }
}

/// Blob store rooted at a local directory. Keys are relative paths.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: Utf8PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<Utf8PathBuf> {
        let relative = Utf8Path::new(key);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Utf8Component::Normal(_)));
        if key.is_empty() || escapes {
            return Err(anyhow!("Invalid blob key: {:?}", key));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", path)),
        }
    }

    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent))?;
        }

        // write then rename so readers never see a partial document
        let tmp = path.with_extension("tmp");
        tokio::fs::write(&tmp, &bytes)
            .await
            .with_context(|| format!("Failed to write {}", tmp))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .with_context(|| format!("Failed to move {} into place", path))?;
        debug!("Wrote {} bytes to {}", bytes.len(), path);
        Ok(())
    }
}

/// Load the registry document. A missing document is an empty registry.
pub async fn load_registry(store: &dyn BlobStore, key: &str) -> Result<AddonRegistry> {
    match store.get(key).await? {
        Some(bytes) => AddonRegistry::from_json(&bytes)
            .with_context(|| format!("Failed to parse add-on registry at {}", key)),
        None => {
            debug!("No add-on registry at {}, starting empty", key);
            Ok(AddonRegistry::new())
        }
    }
}

pub async fn save_registry(store: &dyn BlobStore, key: &str, registry: &AddonRegistry) -> Result<()> {
    let bytes = registry.to_json().context("Failed to serialize add-on registry")?;
    store.put(key, bytes).await?;
    info!("Saved add-on registry to {}", key);
    Ok(())
}
