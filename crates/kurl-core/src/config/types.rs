//! Resolver configuration types
//!
//! Operational knobs for the resolver service: where artifacts live, how
//! often the external add-on registry is refreshed and how long I/O may take.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Complete resolver configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct KurlConfig {
    /// Public base URL installers are served from
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Distribution bucket URL for add-on packages and generated artifacts
    #[serde(default = "default_dist_url")]
    pub dist_url: String,

    /// kURL release this server runs as, if pinned
    #[serde(default)]
    pub installer_version: Option<String>,

    /// Seconds between external add-on registry refreshes
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,

    /// Timeout for a single feed or artifact fetch
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,

    /// Timeout for acquiring an installer row lock
    #[serde(default = "default_store_lock_timeout")]
    pub store_lock_timeout_secs: u64,

    /// Blob store key of the external add-on registry document
    #[serde(default = "default_registry_key")]
    pub registry_key: String,

    /// Upstream feeds of externally built add-ons, by add-on name
    #[serde(default)]
    pub feeds: BTreeMap<String, String>,

    /// Pins "latest" to a specific version, by add-on name
    #[serde(default)]
    pub preferred_latest: BTreeMap<String, String>,
}

impl Default for KurlConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            dist_url: default_dist_url(),
            installer_version: None,
            refresh_interval_secs: default_refresh_interval(),
            fetch_timeout_secs: default_fetch_timeout(),
            store_lock_timeout_secs: default_store_lock_timeout(),
            registry_key: default_registry_key(),
            feeds: BTreeMap::new(),
            preferred_latest: BTreeMap::new(),
        }
    }
}

impl KurlConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn store_lock_timeout(&self) -> Duration {
        Duration::from_secs(self.store_lock_timeout_secs)
    }

    /// URL of a versioned dist artifact, e.g. `{dist}/v2023.02.13-0/supported-versions-gen.json`
    pub fn package_url(&self, installer_version: Option<&str>, package: &str) -> String {
        let dist = self.dist_url.trim_end_matches('/');
        match installer_version.or(self.installer_version.as_deref()) {
            Some(v) if !v.is_empty() => format!("{}/{}/{}", dist, v, package),
            _ => format!("{}/{}", dist, package),
        }
    }
}

fn default_base_url() -> String {
    "https://kurl.sh".to_string()
}

fn default_dist_url() -> String {
    "https://kurl-sh.s3.amazonaws.com/dist".to_string()
}

fn default_refresh_interval() -> u64 {
    900
}

fn default_fetch_timeout() -> u64 {
    10
}

fn default_store_lock_timeout() -> u64 {
    10
}

fn default_registry_key() -> String {
    "external/addon-registry.json".to_string()
}
