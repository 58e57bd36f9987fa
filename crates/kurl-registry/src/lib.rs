//! # kurl-registry
//!
//! Externally built add-ons and the refreshed catalog they feed:
//! - [`AddonRegistry`]: write-once add-on records with pre-release promotion
//! - [`FeedClient`]: upstream feed and supported-versions fetching
//! - [`BlobStore`]: where the registry document is kept
//! - [`CatalogService`]: the snapshot request handling reads and its refresh loop

pub mod addon;
pub mod blob;
pub mod feed;
pub mod service;

pub use addon::{append, find_version, is_version_releasing, promote, AddonRegistry, ExternalAddon, ImportReport};
pub use blob::{load_registry, save_registry, BlobStore, FsBlobStore, MemoryBlobStore};
pub use feed::{FeedClient, PulledRecords};
pub use service::{CatalogService, RefreshReport, SUPPORTED_VERSIONS_FILE};
