//! # kurl-installer
//!
//! Installer specs and what is done with them:
//! - Parsing YAML documents into [`InstallerSpec`], with legacy field migration
//! - Content hashing, canonical YAML rendering and installer flag derivation
//! - Validation against the version catalog, the JSON schema and business rules
//! - Installer storage with team ownership, and the service flows built on it

pub mod component;
pub mod error;
pub mod fields;
pub mod flags;
pub mod hash;
pub mod ids;
pub mod parse;
pub mod render;
pub mod service;
pub mod spec;
pub mod store;
pub mod validate;

pub use component::ComponentName;
pub use error::{Error, ParseError, PersistenceError, Result};
pub use ids::{is_sha, is_valid_cidr_range, is_valid_slug, package_name, slug_is_reserved};
pub use service::{InstallerService, SavedInstaller};
pub use spec::{ComponentSpec, InstallerSpec};
pub use store::{InstallerStore, MemoryInstallerStore, StoredInstaller, UpsertOutcome};
pub use validate::{ValidationContext, ValidationError, ValidationErrorKind, ValidationPolicy};
