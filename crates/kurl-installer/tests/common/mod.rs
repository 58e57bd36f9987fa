//! Common test utilities for kurl-installer
//!
//! Shared fixtures: the built-in catalog, a resolver, validation contexts
//! and a service over an in-memory store.

#![allow(dead_code)]

use kurl_core::SchemaValidator;
use kurl_installer::{InstallerService, MemoryInstallerStore, ValidationContext};
use kurl_versions::{CatalogProvider, StrategyTable, VersionCatalog, VersionResolver};
use std::sync::{Arc, LazyLock};

pub const BASE_URL: &str = "https://kurl.sh";

/// The historical fixture document and its id
pub const FIXTURE_YAML: &str = "spec:\n  kubernetes:\n    version: \"1.15.1\"\n";
pub const FIXTURE_ID: &str = "6898644";

pub const TEAM: &str = "team-1";
pub const OTHER_TEAM: &str = "team-2";

pub static CATALOG: LazyLock<Arc<VersionCatalog>> =
    LazyLock::new(|| Arc::new(VersionCatalog::builtin().expect("built-in catalog loads")));

pub static RESOLVER: LazyLock<VersionResolver> =
    LazyLock::new(|| VersionResolver::new(StrategyTable::builtin()));

pub fn context() -> ValidationContext<'static> {
    let schema = SchemaValidator::global().expect("embedded schema loads");
    ValidationContext::new(&CATALOG, &RESOLVER, schema)
}

pub fn catalog_provider() -> Arc<dyn CatalogProvider> {
    Arc::new(Arc::clone(&CATALOG))
}

pub fn store() -> Arc<MemoryInstallerStore> {
    Arc::new(MemoryInstallerStore::default())
}

pub fn service_with(store: Arc<MemoryInstallerStore>) -> InstallerService {
    InstallerService::new(store, catalog_provider(), BASE_URL).expect("service builds")
}

pub fn service() -> InstallerService {
    service_with(store())
}

/// A valid team document, parameterized by Kubernetes version
pub fn team_yaml(kubernetes: &str) -> String {
    format!(
        "apiVersion: cluster.kurl.sh/v1beta1\nkind: Installer\nspec:\n  kubernetes:\n    version: {}\n  containerd:\n    version: latest\n  kotsadm:\n    version: latest\n",
        kubernetes
    )
}
