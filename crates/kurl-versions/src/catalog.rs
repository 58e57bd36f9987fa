//! Add-on version catalog
//!
//! Maps add-on name to an ordered list of known versions, newest first.
//! Index 0 is what "latest" resolves to unless a preferred-latest override
//! names another version. A catalog is immutable once built; refreshes build
//! a new one and swap the whole value.

use crate::strategy::StrategyTable;
use async_trait::async_trait;
use kurl_core::{Error, Result};
use regex::Regex;
use rust_embed::RustEmbed;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock};
use tracing::{debug, warn};

/// Embedded version tables
#[derive(RustEmbed)]
#[folder = "$CARGO_MANIFEST_DIR/../../embedded/catalog/"]
#[prefix = ""]
struct EmbeddedCatalog;

const BUILTIN_FILE: &str = "versions.yaml";

/// Marker prepended to every list in published version listings
pub const LATEST: &str = "latest";

static KURL_VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"v?0*(\d+)\.0*(\d+)\.0*(\d+)(?:-[0-9A-Za-z.]+)?").expect("kurl version regex is valid")
});

/// An externally built add-on version that can be merged into a catalog
pub trait ExternalVersion {
    fn version(&self) -> &str;

    /// Range of kURL releases the version supports, e.g. `>= v2022.09.19-0`
    fn compatibility_range(&self) -> Option<&str>;

    fn is_prerelease(&self) -> bool;
}

/// Generated `supported-versions-gen.json` document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportedVersionsFile {
    #[serde(rename = "_comment", default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,

    pub supported_versions: BTreeMap<String, Vec<String>>,
}

/// Ordered version lists per add-on
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VersionCatalog {
    entries: BTreeMap<String, Vec<String>>,
    preferred_latest: BTreeMap<String, String>,
}

impl VersionCatalog {
    /// Build from explicit lists; order within each list is preserved
    pub fn from_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: IntoIterator,
        V::Item: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into_iter().map(Into::into).collect()))
                .collect(),
            preferred_latest: BTreeMap::new(),
        }
    }

    /// The catalog baked into the binary
    pub fn builtin() -> Result<Self> {
        let file = EmbeddedCatalog::get(BUILTIN_FILE).ok_or_else(|| {
            Error::config_not_found(format!("Embedded catalog not found: {}", BUILTIN_FILE))
        })?;
        let content = std::str::from_utf8(&file.data).map_err(|_| {
            Error::invalid_config(format!("Invalid UTF-8 in embedded catalog: {}", BUILTIN_FILE))
        })?;
        let entries: BTreeMap<String, Vec<String>> = serde_yaml_ng::from_str(content)?;
        debug!("Loaded built-in catalog with {} add-ons", entries.len());
        Ok(Self {
            entries,
            preferred_latest: BTreeMap::new(),
        })
    }

    /// Read a generated supported-versions document. The leading `latest`
    /// marker of each list is dropped.
    pub fn from_supported_versions_json(bytes: &[u8]) -> Result<Self> {
        let file: SupportedVersionsFile = serde_json::from_slice(bytes)?;
        if file
            .supported_versions
            .get("kubernetes")
            .is_none_or(|v| v.iter().all(|v| v == LATEST))
        {
            return Err(Error::invalid_config(
                "supported versions document has no kubernetes versions",
            ));
        }
        Ok(Self::from_entries(file.supported_versions.into_iter().map(
            |(addon, versions)| {
                let versions: Vec<String> = versions.into_iter().filter(|v| v != LATEST).collect();
                (addon, versions)
            },
        )))
    }

    /// Pin "latest" for the given add-ons
    pub fn with_preferred_latest(mut self, preferred: BTreeMap<String, String>) -> Self {
        self.preferred_latest = preferred;
        self
    }

    pub fn preferred_latest(&self) -> &BTreeMap<String, String> {
        &self.preferred_latest
    }

    /// Known versions of an add-on, newest first (empty if unknown)
    pub fn get(&self, addon: &str) -> &[String] {
        self.entries.get(addon).map_or(&[], |v| v.as_slice())
    }

    pub fn has_addon(&self, addon: &str) -> bool {
        self.entries.contains_key(addon)
    }

    pub fn contains(&self, addon: &str, version: &str) -> bool {
        self.get(addon).iter().any(|v| v == version)
    }

    pub fn addons(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Position of a version in its list (0 = newest)
    pub fn position(&self, addon: &str, version: &str) -> Option<usize> {
        self.get(addon).iter().position(|v| v == version)
    }

    /// Canonical "latest" target: the preferred override, otherwise the first
    /// entry that is not a channel marker
    pub fn latest(&self, addon: &str, strategies: &StrategyTable) -> Option<&str> {
        if let Some(pinned) = self.preferred_latest.get(addon) {
            return Some(pinned.as_str());
        }
        let versions = self.get(addon);
        versions
            .iter()
            .find(|v| !strategies.is_channel(addon, v))
            .or_else(|| versions.first())
            .map(String::as_str)
    }

    /// Merge externally built add-on versions ahead of the internal lists.
    ///
    /// Pre-release records are skipped, and so are records whose kURL
    /// compatibility range excludes `installer_version` when one is given.
    pub fn merge<E: ExternalVersion>(
        internal: &VersionCatalog,
        external: &BTreeMap<String, Vec<E>>,
        installer_version: Option<&str>,
    ) -> VersionCatalog {
        let mut merged = internal.clone();

        for (addon, records) in external {
            let mut prepend: Vec<String> = Vec::new();
            for record in records {
                if record.is_prerelease() {
                    debug!("Skipping pre-release {} {}", addon, record.version());
                    continue;
                }
                if let (Some(installer), Some(range)) = (installer_version, record.compatibility_range())
                {
                    if !kurl_version_satisfies(range, installer) {
                        debug!(
                            "Skipping {} {}: requires kURL {}, have {}",
                            addon,
                            record.version(),
                            range,
                            installer
                        );
                        continue;
                    }
                }
                if !prepend.iter().any(|v| v == record.version()) {
                    prepend.push(record.version().to_string());
                }
            }

            let list = merged.entries.entry(addon.clone()).or_default();
            list.retain(|v| !prepend.contains(v));
            prepend.append(list);
            *list = prepend;
        }

        merged
    }

    /// Build supported-version lists from discovered add-on versions.
    ///
    /// Discovered versions are sorted newest first with channel markers last,
    /// and any add-on present in `preferred` takes that list verbatim.
    pub fn from_discovered(
        discovered: BTreeMap<String, Vec<String>>,
        preferred: &VersionCatalog,
        strategies: &StrategyTable,
    ) -> Self {
        let entries = discovered
            .into_iter()
            .map(|(addon, mut versions)| {
                if preferred.has_addon(&addon) {
                    return (addon.clone(), preferred.get(&addon).to_vec());
                }
                strategies.sort_descending(&addon, &mut versions);
                (addon, versions)
            })
            .collect();
        Self {
            entries,
            preferred_latest: BTreeMap::new(),
        }
    }

    /// Public listing: every add-on with `latest` prepended
    pub fn listing(&self) -> BTreeMap<String, Vec<String>> {
        self.entries
            .iter()
            .map(|(addon, versions)| {
                let mut list = Vec::with_capacity(versions.len() + 1);
                list.push(LATEST.to_string());
                list.extend(versions.iter().cloned());
                (addon.clone(), list)
            })
            .collect()
    }

    pub fn to_supported_versions_file(&self, comment: Option<String>) -> SupportedVersionsFile {
        SupportedVersionsFile {
            comment,
            supported_versions: self.listing(),
        }
    }
}

/// Source of the catalogs request handling should read from
#[async_trait]
pub trait CatalogProvider: Send + Sync {
    /// Snapshot for specs not pinned to a kURL release
    fn current(&self) -> Arc<VersionCatalog>;

    /// Catalog for specs pinned to `installer_version`, the current snapshot
    /// when unpinned. Providers without per-release data serve the current
    /// snapshot either way.
    async fn catalog_for(&self, installer_version: Option<&str>) -> Result<Arc<VersionCatalog>> {
        let _ = installer_version;
        Ok(self.current())
    }
}

#[async_trait]
impl CatalogProvider for Arc<VersionCatalog> {
    fn current(&self) -> Arc<VersionCatalog> {
        Arc::clone(self)
    }
}

/// Normalize a kURL release (`v2023.02.13-0`) to a semver release (`2023.2.13`)
fn normalize_kurl_versions(text: &str) -> String {
    KURL_VERSION_RE.replace_all(text, "$1.$2.$3").into_owned()
}

/// Whether a kURL release satisfies a compatibility range such as
/// `>= v2022.09.19-0, < v2024.01.01-0`. Unparseable input never satisfies.
pub fn kurl_version_satisfies(range: &str, kurl_version: &str) -> bool {
    let range = range.trim();
    if range.is_empty() || range == "*" {
        return true;
    }
    let req = match semver::VersionReq::parse(&normalize_kurl_versions(range)) {
        Ok(req) => req,
        Err(e) => {
            warn!("Invalid kURL compatibility range {:?}: {}", range, e);
            return false;
        }
    };
    match semver::Version::parse(&normalize_kurl_versions(kurl_version.trim())) {
        Ok(version) => req.matches(&version),
        Err(e) => {
            warn!("Invalid kURL version {:?}: {}", kurl_version, e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Ext {
        version: &'static str,
        range: Option<&'static str>,
        pre: bool,
    }

    impl ExternalVersion for Ext {
        fn version(&self) -> &str {
            self.version
        }
        fn compatibility_range(&self) -> Option<&str> {
            self.range
        }
        fn is_prerelease(&self) -> bool {
            self.pre
        }
    }

    fn ext(version: &'static str, range: Option<&'static str>, pre: bool) -> Ext {
        Ext {
            version,
            range,
            pre,
        }
    }

    #[test]
    fn test_builtin_catalog() {
        let catalog = VersionCatalog::builtin().unwrap();
        assert_eq!(catalog.get("kubernetes")[0], "1.19.16");
        assert_eq!(catalog.get("docker")[0], "20.10.17");
        assert_eq!(catalog.get("rook")[0], "1.0.4");
        assert!(catalog.contains("collectd", "v5"));
        assert!(catalog.get("unknown").is_empty());
    }

    #[test]
    fn test_latest_with_override() {
        let strategies = StrategyTable::builtin();
        let catalog = VersionCatalog::from_entries([("kubernetes", ["1.26.1", "1.19.16"])]);
        assert_eq!(catalog.latest("kubernetes", &strategies), Some("1.26.1"));

        let pinned = catalog.with_preferred_latest(BTreeMap::from([(
            "kubernetes".to_string(),
            "1.19.16".to_string(),
        )]));
        assert_eq!(pinned.latest("kubernetes", &strategies), Some("1.19.16"));
    }

    #[test]
    fn test_latest_skips_channel_markers() {
        let strategies = StrategyTable::builtin();
        let catalog = VersionCatalog::from_entries([("kotsadm", ["nightly", "1.86.0"])]);
        assert_eq!(catalog.latest("kotsadm", &strategies), Some("1.86.0"));
    }

    #[test]
    fn test_merge_prepends_external() {
        let internal = VersionCatalog::from_entries([("kotsadm", ["1.86.0", "1.85.0"])]);
        let external = BTreeMap::from([(
            "kotsadm".to_string(),
            vec![ext("1.88.0", None, false), ext("1.87.0", None, false), ext("1.86.0", None, false)],
        )]);
        let merged = VersionCatalog::merge(&internal, &external, None);
        assert_eq!(merged.get("kotsadm"), ["1.88.0", "1.87.0", "1.86.0", "1.85.0"]);
        assert_eq!(internal.get("kotsadm"), ["1.86.0", "1.85.0"]);
    }

    #[test]
    fn test_merge_filters_prerelease_and_incompatible() {
        let internal = VersionCatalog::from_entries([("kotsadm", ["1.86.0"])]);
        let external = BTreeMap::from([(
            "kotsadm".to_string(),
            vec![
                ext("1.90.0", None, true),
                ext("1.89.0", Some(">= v2023.03.01-0"), false),
                ext("1.88.0", Some(">= v2023.01.01-0"), false),
            ],
        )]);
        let merged = VersionCatalog::merge(&internal, &external, Some("v2023.02.13-0"));
        assert_eq!(merged.get("kotsadm"), ["1.88.0", "1.86.0"]);

        let unpinned = VersionCatalog::merge(&internal, &external, None);
        assert_eq!(unpinned.get("kotsadm"), ["1.89.0", "1.88.0", "1.86.0"]);
    }

    #[test]
    fn test_kurl_version_satisfies() {
        assert!(kurl_version_satisfies(">= v2022.09.19-0", "v2023.02.13-0"));
        assert!(!kurl_version_satisfies(">= v2023.03.01-0", "v2023.02.13-0"));
        assert!(kurl_version_satisfies(">=v2022.01.01-0, <v2024.01.01-0", "v2023.02.13-0"));
        assert!(kurl_version_satisfies("", "v2023.02.13-0"));
        assert!(!kurl_version_satisfies("not a range", "v2023.02.13-0"));
    }

    #[test]
    fn test_supported_versions_round_trip() {
        let json = br#"{"_comment":"generated","supportedVersions":{"kubernetes":["latest","1.19.16","1.19.15"],"weave":["latest","2.8.1"]}}"#;
        let catalog = VersionCatalog::from_supported_versions_json(json).unwrap();
        assert_eq!(catalog.get("kubernetes"), ["1.19.16", "1.19.15"]);
        assert_eq!(catalog.listing()["weave"], ["latest", "2.8.1"]);
    }

    #[test]
    fn test_supported_versions_requires_kubernetes() {
        let json = br#"{"supportedVersions":{"kubernetes":["latest"]}}"#;
        assert!(VersionCatalog::from_supported_versions_json(json).is_err());
    }

    #[test]
    fn test_from_discovered() {
        let strategies = StrategyTable::builtin();
        let preferred = VersionCatalog::from_entries([("kubernetes", ["1.19.16", "1.26.1"])]);
        let discovered = BTreeMap::from([
            ("kubernetes".to_string(), vec!["1.26.1".to_string(), "1.19.16".to_string()]),
            (
                "kotsadm".to_string(),
                vec!["alpha".to_string(), "1.85.0".to_string(), "1.86.0".to_string()],
            ),
        ]);
        let catalog = VersionCatalog::from_discovered(discovered, &preferred, &strategies);
        assert_eq!(catalog.get("kubernetes"), ["1.19.16", "1.26.1"]);
        assert_eq!(catalog.get("kotsadm"), ["1.86.0", "1.85.0", "alpha"]);
    }

    #[tokio::test]
    async fn test_plain_provider_ignores_pin() {
        let provider: Arc<VersionCatalog> = Arc::new(VersionCatalog::from_entries([("kubernetes", ["1.19.16"])]));
        let pinned = provider.catalog_for(Some("v2023.02.13-0")).await.unwrap();
        assert!(Arc::ptr_eq(&pinned, &provider));
    }
}
