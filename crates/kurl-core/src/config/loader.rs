//! Layered configuration loader
//!
//! Loads configuration from multiple sources with the following precedence (low to high):
//! 1. Embedded defaults (built into binary)
//! 2. Config file (~/.kurl/config.yaml, or an explicit path)
//! 3. Environment variables (KURL_* prefix)
//! 4. CLI flags (handled by caller)

use crate::config::KurlConfig;
use crate::error::{Error, Result};
use camino::{Utf8Path, Utf8PathBuf};
use rust_embed::RustEmbed;
use serde_yaml_ng::Value;
use std::env;
use std::fs;
use tracing::debug;

/// Embedded configuration files
#[derive(RustEmbed)]
#[folder = "$CARGO_MANIFEST_DIR/../../embedded/config/"]
#[prefix = ""]
struct EmbeddedConfigs;

const DEFAULTS_FILE: &str = "kurl-defaults.yaml";
const CONFIG_FILE: &str = "config.yaml";

/// Configuration loader
pub struct ConfigLoader {
    /// Base directory for configuration files
    config_dir: Utf8PathBuf,
}

impl ConfigLoader {
    /// Create a loader rooted at ~/.kurl
    pub fn new() -> Result<Self> {
        let home = crate::utils::get_home_dir()
            .map_err(|e| Error::invalid_config(e.to_string()))?;
        let home = Utf8PathBuf::from_path_buf(home)
            .map_err(|_| Error::invalid_config("Home directory is not valid UTF-8"))?;
        Ok(Self {
            config_dir: home.join(".kurl"),
        })
    }

    /// Create a loader with a custom config directory
    pub fn with_dir(config_dir: Utf8PathBuf) -> Self {
        Self { config_dir }
    }

    /// Load configuration from defaults, `<config_dir>/config.yaml` and the environment
    pub fn load(&self) -> Result<KurlConfig> {
        self.load_from(&self.config_dir.join(CONFIG_FILE))
    }

    /// Load configuration using an explicit file in place of the default location
    pub fn load_from(&self, path: &Utf8Path) -> Result<KurlConfig> {
        let mut merged = Self::load_embedded_defaults()?;

        if path.exists() {
            debug!("Loading config overrides from {}", path);
            let content = fs::read_to_string(path)?;
            let overlay: Value = serde_yaml_ng::from_str(&content)
                .map_err(|e| Error::invalid_config(format!("Failed to parse {}: {}", path, e)))?;
            merge_values(&mut merged, overlay);
        }

        let config: KurlConfig = serde_yaml_ng::from_value(merged)
            .map_err(|e| Error::invalid_config(format!("Invalid configuration: {}", e)))?;

        let config = apply_env_overrides(config)?;
        check_urls(&config)?;
        Ok(config)
    }

    fn load_embedded_defaults() -> Result<Value> {
        let embedded_file = EmbeddedConfigs::get(DEFAULTS_FILE).ok_or_else(|| {
            Error::config_not_found(format!("Embedded config not found: {}", DEFAULTS_FILE))
        })?;

        let content = std::str::from_utf8(&embedded_file.data).map_err(|_| {
            Error::invalid_config(format!("Invalid UTF-8 in embedded config: {}", DEFAULTS_FILE))
        })?;

        serde_yaml_ng::from_str(content).map_err(|e| {
            Error::invalid_config(format!(
                "Failed to parse embedded config {}: {}",
                DEFAULTS_FILE, e
            ))
        })
    }

    /// Get the config directory path
    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }
}

/// Overlay mappings key by key; any other value replaces the base outright
fn merge_values(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Mapping(base_map), Value::Mapping(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

fn parse_secs(name: &str, val: &str) -> Result<u64> {
    val.parse()
        .map_err(|_| Error::invalid_config(format!("{} must be a valid number", name)))
}

fn apply_env_overrides(mut config: KurlConfig) -> Result<KurlConfig> {
    if let Ok(val) = env::var("KURL_BASE_URL") {
        config.base_url = val;
    }

    if let Ok(val) = env::var("KURL_DIST_URL") {
        config.dist_url = val;
    }

    if let Ok(val) = env::var("KURL_INSTALLER_VERSION") {
        config.installer_version = (!val.is_empty()).then_some(val);
    }

    if let Ok(val) = env::var("KURL_REFRESH_INTERVAL_SECS") {
        config.refresh_interval_secs = parse_secs("KURL_REFRESH_INTERVAL_SECS", &val)?;
    }

    if let Ok(val) = env::var("KURL_FETCH_TIMEOUT_SECS") {
        config.fetch_timeout_secs = parse_secs("KURL_FETCH_TIMEOUT_SECS", &val)?;
    }

    if let Ok(val) = env::var("KURL_STORE_LOCK_TIMEOUT_SECS") {
        config.store_lock_timeout_secs = parse_secs("KURL_STORE_LOCK_TIMEOUT_SECS", &val)?;
    }

    Ok(config)
}

fn check_urls(config: &KurlConfig) -> Result<()> {
    for (name, value) in [("base-url", &config.base_url), ("dist-url", &config.dist_url)] {
        url::Url::parse(value)
            .map_err(|e| Error::invalid_config(format!("{} {:?} is not a URL: {}", name, value, e)))?;
    }
    for (addon, feed) in &config.feeds {
        url::Url::parse(feed).map_err(|e| {
            Error::invalid_config(format!("feed for {} is not a URL: {}", addon, e))
        })?;
    }
    Ok(())
}
