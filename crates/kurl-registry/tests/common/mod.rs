//! Common test utilities for kurl-registry
//!
//! Feed records, wiremock endpoints and services wired to a mock server.

#![allow(dead_code)]

use kurl_core::KurlConfig;
use kurl_registry::{BlobStore, CatalogService, ExternalAddon, MemoryBlobStore};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const REGISTRY_KEY: &str = "external/addon-registry.json";
pub const KOTSADM_FEED: &str = "/kotsadm/versions.json";
pub const KURL_RELEASE: &str = "v2023.02.13-0";

pub fn record(version: &str, prerelease: bool) -> ExternalAddon {
    ExternalAddon {
        version: version.to_string(),
        kurl_version_compatibility_range: Some(">= v2022.09.19-0".to_string()),
        origin: format!("https://kotsadm.example.com/kotsadm-{}.tar.gz", version),
        is_prerelease: prerelease,
        sha256_sum: format!("sha-{}", version),
    }
}

/// Feed body in the upstream shape, which names the origin `url`
pub fn feed_body(records: &[ExternalAddon]) -> serde_json::Value {
    records
        .iter()
        .map(|r| {
            json!({
                "version": r.version,
                "url": r.origin,
                "kurlVersionCompatibilityRange": r.kurl_version_compatibility_range,
                "isPrerelease": r.is_prerelease,
                "sha256Sum": r.sha256_sum,
            })
        })
        .collect()
}

/// Serve a feed at `route`
pub async fn mock_feed(server: &MockServer, route: &str, records: &[ExternalAddon]) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(feed_body(records)))
        .mount(server)
        .await;
}

/// Serve a feed that returns `records` once, then `later` afterwards
pub async fn mock_feed_sequence(
    server: &MockServer,
    route: &str,
    records: &[ExternalAddon],
    later: &[ExternalAddon],
) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(feed_body(records)))
        .up_to_n_times(1)
        .mount(server)
        .await;
    mock_feed(server, route, later).await;
}

/// Respond to `route` with a bare status code
pub async fn mock_status(server: &MockServer, route: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

/// Serve a supported-versions artifact for `release`
pub async fn mock_supported_versions(server: &MockServer, release: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(format!("/dist/{}/supported-versions-gen.json", release)))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Configuration pointing the kotsadm feed and dist bucket at `server`
pub fn config_for(server: &MockServer) -> KurlConfig {
    let mut feeds = BTreeMap::new();
    feeds.insert("kotsadm".to_string(), format!("{}{}", server.uri(), KOTSADM_FEED));
    KurlConfig {
        dist_url: format!("{}/dist", server.uri()),
        fetch_timeout_secs: 2,
        refresh_interval_secs: 1,
        registry_key: REGISTRY_KEY.to_string(),
        feeds,
        ..Default::default()
    }
}

pub fn service_for(server: &MockServer, store: Arc<MemoryBlobStore>) -> CatalogService {
    let store: Arc<dyn BlobStore> = store;
    CatalogService::new(config_for(server), store).expect("service builds")
}
