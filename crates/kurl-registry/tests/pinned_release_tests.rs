//! Installer flows over the refreshable catalog
//!
//! Tests cover:
//! - specs pinned with `kurl.installerVersion` validate and resolve against
//!   that release's supported versions
//! - unpinned specs keep using the current snapshot
//! - a release catalog that cannot be loaded is a server error

mod common;

use common::*;
use kurl_installer::{ComponentName, Error, InstallerService, MemoryInstallerStore, UpsertOutcome};
use kurl_registry::MemoryBlobStore;
use serde_json::json;
use std::sync::Arc;
use wiremock::MockServer;

const PINNED_YAML: &str =
    "spec:\n  kubernetes:\n    version: 1.26.x\n  kurl:\n    installerVersion: v2023.02.13-0\n";
const UNPINNED_YAML: &str = "spec:\n  kubernetes:\n    version: 1.26.x\n";

fn installer_service(server: &MockServer) -> InstallerService {
    let catalog = Arc::new(service_for(server, Arc::new(MemoryBlobStore::new())));
    InstallerService::new(Arc::new(MemoryInstallerStore::default()), catalog, "https://kurl.sh").unwrap()
}

async fn mock_release(server: &MockServer) {
    mock_supported_versions(
        server,
        KURL_RELEASE,
        json!({
            "supportedVersions": {
                "kubernetes": ["latest", "1.26.1", "1.25.6"]
            }
        }),
    )
    .await;
}

#[tokio::test]
async fn test_pinned_spec_uses_release_catalog() {
    let server = MockServer::start().await;
    mock_release(&server).await;
    let service = installer_service(&server);

    service.validate(PINNED_YAML).await.unwrap();

    let saved = service.create_anonymous(PINNED_YAML).await.unwrap();
    assert_eq!(saved.outcome, Some(UpsertOutcome::Inserted));

    let resolved = service.get(&saved.id, true).await.unwrap();
    assert_eq!(resolved.version(ComponentName::Kubernetes), Some("1.26.1"));
    assert_eq!(resolved.installer_version(), Some(KURL_RELEASE));
}

#[tokio::test]
async fn test_unpinned_spec_uses_current_snapshot() {
    let server = MockServer::start().await;
    mock_release(&server).await;
    let service = installer_service(&server);

    let err = service.validate(UNPINNED_YAML).await.unwrap_err();
    assert_eq!(err.validation_errors().len(), 1);
    assert_eq!(err.http_status(), 400);
}

#[tokio::test]
async fn test_unpublished_release_falls_back_to_builtin() {
    let server = MockServer::start().await;
    mock_status(&server, &format!("/dist/{}/supported-versions-gen.json", KURL_RELEASE), 404).await;
    let service = installer_service(&server);

    let err = service.validate(PINNED_YAML).await.unwrap_err();
    assert_eq!(err.validation_errors().len(), 1);
    assert!(err.to_string().contains(KURL_RELEASE));
}

#[tokio::test]
async fn test_unavailable_release_catalog() {
    let server = MockServer::start().await;
    mock_status(&server, &format!("/dist/{}/supported-versions-gen.json", KURL_RELEASE), 500).await;
    let service = installer_service(&server);

    let err = service.validate(PINNED_YAML).await.unwrap_err();
    assert!(matches!(err, Error::Core(kurl_core::Error::CatalogUnavailable { .. })));
    assert_eq!(err.http_status(), 500);
}
