//! Catalog refresh against mocked feeds
//!
//! Tests cover:
//! - A refresh imports feed records, publishes the registry and swaps the snapshot
//! - Pre-release records stay out of the catalog until released
//! - Failed feeds and unreadable registries keep the previous snapshot
//! - Per-release catalogs from supported-versions artifacts, with fallback
//! - The background loop starts, refreshes and stops

mod common;

use common::*;
use kurl_registry::{load_registry, BlobStore, CatalogService, FeedClient, MemoryBlobStore};
use kurl_versions::{CatalogProvider, VersionCatalog};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use test_case::test_case;
use wiremock::MockServer;

#[tokio::test]
async fn test_refresh_imports_and_publishes() {
    let server = MockServer::start().await;
    mock_feed(&server, KOTSADM_FEED, &[record("1.94.0", false), record("1.93.1", false)]).await;

    let store = Arc::new(MemoryBlobStore::new());
    let service = service_for(&server, Arc::clone(&store));
    assert_eq!(service.current().get("kotsadm")[0], "1.86.0");

    let report = service.refresh_once().await.unwrap();
    assert_eq!(report.import.added.len(), 2);
    assert!(report.published);

    let catalog = service.current();
    assert_eq!(&catalog.get("kotsadm")[..3], ["1.94.0", "1.93.1", "1.86.0"]);

    let stored = load_registry(store.as_ref(), REGISTRY_KEY).await.unwrap();
    assert_eq!(stored.records("kotsadm").len(), 2);

    // nothing new upstream: no write back
    let report = service.refresh_once().await.unwrap();
    assert!(!report.import.changed());
    assert!(!report.published);
}

#[tokio::test]
async fn test_prerelease_promotion() {
    let server = MockServer::start().await;
    mock_feed_sequence(
        &server,
        KOTSADM_FEED,
        &[record("1.95.0", true)],
        &[record("1.95.0", false)],
    )
    .await;

    let service = service_for(&server, Arc::new(MemoryBlobStore::new()));

    service.refresh_once().await.unwrap();
    assert!(!service.current().contains("kotsadm", "1.95.0"));
    assert!(service.registry().find_version("kotsadm", "1.95.0").unwrap().is_prerelease);

    let report = service.refresh_once().await.unwrap();
    assert_eq!(report.import.promoted.len(), 1);
    assert!(report.published);
    assert_eq!(service.current().get("kotsadm")[0], "1.95.0");
}

#[test_case(500 ; "server error")]
#[test_case(404 ; "missing feed")]
#[tokio::test]
async fn test_failed_feed_keeps_registry(status: u16) {
    let server = MockServer::start().await;
    mock_status(&server, KOTSADM_FEED, status).await;

    let store = Arc::new(MemoryBlobStore::new());
    let existing = r#"{"kotsadm": [{"version": "1.90.0", "origin": "https://x/kotsadm-1.90.0.tar.gz", "isPrerelease": false, "sha256Sum": "s"}]}"#;
    store.put(REGISTRY_KEY, existing.as_bytes().to_vec()).await.unwrap();

    let service = service_for(&server, Arc::clone(&store));
    let report = service.refresh_once().await.unwrap();
    assert!(!report.published);
    assert_eq!(service.current().get("kotsadm")[0], "1.90.0");
}

#[tokio::test]
async fn test_unreadable_registry_keeps_snapshot() {
    let server = MockServer::start().await;
    mock_feed(&server, KOTSADM_FEED, &[record("1.94.0", false)]).await;

    let store = Arc::new(MemoryBlobStore::new());
    let service = service_for(&server, Arc::clone(&store));
    service.refresh_once().await.unwrap();
    let before = service.current();

    store.put(REGISTRY_KEY, b"{ not json".to_vec()).await.unwrap();
    assert!(service.refresh_once().await.is_err());
    assert!(Arc::ptr_eq(&before, &service.current()));
}

#[tokio::test]
async fn test_incompatible_records_are_skipped() {
    let server = MockServer::start().await;
    let mut future_only = record("2.0.0", false);
    future_only.kurl_version_compatibility_range = Some(">= v2099.01.01-0".to_string());
    mock_feed(&server, KOTSADM_FEED, &[future_only, record("1.94.0", false)]).await;

    let mut config = config_for(&server);
    config.installer_version = Some(KURL_RELEASE.to_string());
    let store: Arc<dyn BlobStore> = Arc::new(MemoryBlobStore::new());
    let service = CatalogService::new(config, store).unwrap();

    service.refresh_once().await.unwrap();
    let catalog = service.current();
    assert!(!catalog.contains("kotsadm", "2.0.0"));
    assert_eq!(catalog.get("kotsadm")[0], "1.94.0");
    // the registry still records it for releases that can use it
    assert!(service.registry().find_version("kotsadm", "2.0.0").is_some());
}

#[tokio::test]
async fn test_catalog_for_release() {
    let server = MockServer::start().await;
    mock_feed(&server, KOTSADM_FEED, &[record("1.94.0", false)]).await;
    mock_supported_versions(
        &server,
        KURL_RELEASE,
        json!({
            "_comment": "generated",
            "supportedVersions": {
                "kubernetes": ["latest", "1.26.1", "1.25.6"],
                "kotsadm": ["latest", "1.93.0"]
            }
        }),
    )
    .await;

    let service = service_for(&server, Arc::new(MemoryBlobStore::new()));
    service.refresh_once().await.unwrap();

    let catalog = service.catalog_for(Some(KURL_RELEASE)).await.unwrap();
    assert_eq!(catalog.get("kubernetes"), ["1.26.1", "1.25.6"]);
    assert_eq!(catalog.get("kotsadm"), ["1.94.0", "1.93.0"]);

    let current = service.catalog_for(None).await.unwrap();
    assert!(Arc::ptr_eq(&current, &service.current()));
}

#[test_case(404 ; "not published")]
#[test_case(403 ; "forbidden")]
#[tokio::test]
async fn test_catalog_for_unpublished_release_falls_back(status: u16) {
    let server = MockServer::start().await;
    mock_status(&server, &format!("/dist/{}/supported-versions-gen.json", KURL_RELEASE), status).await;

    let service = service_for(&server, Arc::new(MemoryBlobStore::new()));
    let catalog = service.catalog_for(Some(KURL_RELEASE)).await.unwrap();
    let builtin = VersionCatalog::builtin().unwrap();
    assert_eq!(catalog.get("kubernetes"), builtin.get("kubernetes"));
}

#[tokio::test]
async fn test_catalog_for_rejects_bad_artifacts() {
    let server = MockServer::start().await;
    mock_status(&server, "/dist/v2023.01.01-0/supported-versions-gen.json", 500).await;
    mock_supported_versions(&server, KURL_RELEASE, json!({"supportedVersions": {"kotsadm": ["latest"]}})).await;

    let service = service_for(&server, Arc::new(MemoryBlobStore::new()));
    assert!(service.catalog_for(Some("v2023.01.01-0")).await.is_err());
    assert!(service.catalog_for(Some(KURL_RELEASE)).await.is_err());
}

#[tokio::test]
async fn test_feed_client_pull_skips_failures() {
    let server = MockServer::start().await;
    mock_feed(&server, KOTSADM_FEED, &[record("1.94.0", false)]).await;
    mock_status(&server, "/broken.json", 502).await;

    let mut feeds = config_for(&server).feeds;
    feeds.insert("velero".to_string(), format!("{}/broken.json", server.uri()));

    let client = FeedClient::new(Duration::from_secs(2)).unwrap();
    let pulled = client.pull(&feeds).await;
    assert_eq!(pulled.len(), 1);
    assert_eq!(pulled["kotsadm"][0].origin, "https://kotsadm.example.com/kotsadm-1.94.0.tar.gz");
}

#[tokio::test]
async fn test_refresh_loop_lifecycle() {
    let server = MockServer::start().await;
    mock_feed(&server, KOTSADM_FEED, &[record("1.94.0", false)]).await;

    let service = service_for(&server, Arc::new(MemoryBlobStore::new()));
    service.start().await;
    service.start().await;
    assert!(service.is_running().await);

    let mut refreshed = false;
    for _ in 0..50 {
        if service.current().get("kotsadm")[0] == "1.94.0" {
            refreshed = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(refreshed, "first refresh runs on start");

    service.stop().await;
    assert!(!service.is_running().await);
    service.stop().await;
}
