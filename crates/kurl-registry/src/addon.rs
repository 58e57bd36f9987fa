//! External add-on records
//!
//! The registry is a JSON document mapping add-on name to its externally
//! built versions, newest first:
//!
//! ```json
//! { "kotsadm": [ { "version": "1.94.0", "kurlVersionCompatibilityRange": ">= v2022.09.19-0",
//!                  "origin": "https://.../kotsadm-1.94.0.tar.gz", "isPrerelease": false,
//!                  "sha256Sum": "..." } ] }
//! ```
//!
//! Records are write-once. The only allowed change to a stored record is
//! releasing it: `isPrerelease` going from `true` to `false`.

use kurl_versions::{ExternalVersion, StrategyTable};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// One externally built add-on version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalAddon {
    pub version: String,

    /// kURL releases this build supports, e.g. `>= v2022.09.19-0`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kurl_version_compatibility_range: Option<String>,

    /// Download location of the add-on package. Upstream feeds call it `url`.
    #[serde(alias = "url")]
    pub origin: String,

    #[serde(default)]
    pub is_prerelease: bool,

    #[serde(default)]
    pub sha256_sum: String,
}

impl ExternalVersion for ExternalAddon {
    fn version(&self) -> &str {
        &self.version
    }

    fn compatibility_range(&self) -> Option<&str> {
        self.kurl_version_compatibility_range.as_deref()
    }

    fn is_prerelease(&self) -> bool {
        self.is_prerelease
    }
}

/// Whether `incoming` releases a stored pre-release of the same version
pub fn is_version_releasing(existing: &ExternalAddon, incoming: &ExternalAddon) -> bool {
    existing.is_prerelease && !incoming.is_prerelease
}

/// Flip a pre-release to released. Returns whether the record changed.
pub fn promote(record: &mut ExternalAddon) -> bool {
    if !record.is_prerelease {
        return false;
    }
    record.is_prerelease = false;
    true
}

/// Records of one add-on with `incoming` added: de-duplicated by version
/// (the existing record wins) and sorted newest first
pub fn append(
    addon: &str,
    existing: &[ExternalAddon],
    incoming: ExternalAddon,
    strategies: &StrategyTable,
) -> Vec<ExternalAddon> {
    let mut merged = existing.to_vec();
    if find_version(&merged, &incoming.version).is_none() {
        merged.push(incoming);
    }
    sort_descending(addon, &mut merged, strategies);
    merged
}

pub fn find_version<'a>(records: &'a [ExternalAddon], version: &str) -> Option<&'a ExternalAddon> {
    records.iter().find(|r| r.version == version)
}

fn sort_descending(addon: &str, records: &mut [ExternalAddon], strategies: &StrategyTable) {
    let mut order: Vec<String> = records.iter().map(|r| r.version.clone()).collect();
    strategies.sort_descending(addon, &mut order);
    records.sort_by_key(|r| order.iter().position(|v| *v == r.version));
}

/// What an import did to the registry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    /// `(addon, version)` pairs appended
    pub added: Vec<(String, String)>,
    /// `(addon, version)` pairs released
    pub promoted: Vec<(String, String)>,
}

impl ImportReport {
    /// Whether the registry needs to be written back
    pub fn changed(&self) -> bool {
        !self.added.is_empty() || !self.promoted.is_empty()
    }

    pub fn absorb(&mut self, other: ImportReport) {
        self.added.extend(other.added);
        self.promoted.extend(other.promoted);
    }
}

/// All external add-on records, by add-on name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AddonRegistry {
    addons: BTreeMap<String, Vec<ExternalAddon>>,
}

impl AddonRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }

    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec_pretty(self)
    }

    pub fn addons(&self) -> &BTreeMap<String, Vec<ExternalAddon>> {
        &self.addons
    }

    pub fn records(&self, addon: &str) -> &[ExternalAddon] {
        self.addons.get(addon).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn find_version(&self, addon: &str, version: &str) -> Option<&ExternalAddon> {
        find_version(self.records(addon), version)
    }

    /// Release a stored pre-release. Returns whether anything changed.
    pub fn promote(&mut self, addon: &str, version: &str) -> bool {
        self.addons
            .get_mut(addon)
            .and_then(|records| records.iter_mut().find(|r| r.version == version))
            .is_some_and(promote)
    }

    /// Import records pulled for one add-on.
    ///
    /// New versions are appended; a version already present is left as stored
    /// except that a stored pre-release is released when the incoming record
    /// is a release.
    pub fn import(
        &mut self,
        addon: &str,
        incoming: impl IntoIterator<Item = ExternalAddon>,
        strategies: &StrategyTable,
    ) -> ImportReport {
        let mut report = ImportReport::default();

        for record in incoming {
            match self.find_version(addon, &record.version) {
                Some(existing) => {
                    if is_version_releasing(existing, &record) && self.promote(addon, &record.version) {
                        info!("Released {} {}", addon, record.version);
                        report.promoted.push((addon.to_string(), record.version));
                    } else {
                        debug!("{} {} already registered", addon, record.version);
                    }
                }
                None => {
                    let version = record.version.clone();
                    let merged = append(addon, self.records(addon), record, strategies);
                    self.addons.insert(addon.to_string(), merged);
                    info!("Registered {} {}", addon, version);
                    report.added.push((addon.to_string(), version));
                }
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(version: &str, pre: bool) -> ExternalAddon {
        ExternalAddon {
            version: version.to_string(),
            kurl_version_compatibility_range: Some(">= v2022.09.19-0".to_string()),
            origin: format!("https://example.com/kotsadm-{}.tar.gz", version),
            is_prerelease: pre,
            sha256_sum: "abc".to_string(),
        }
    }

    fn versions(records: &[ExternalAddon]) -> Vec<&str> {
        records.iter().map(|r| r.version.as_str()).collect()
    }

    #[test]
    fn test_append_sorts_and_dedups() {
        let strategies = StrategyTable::builtin();
        let existing = vec![record("1.94.0", false), record("1.92.0", false)];

        let merged = append("kotsadm", &existing, record("1.93.1", false), &strategies);
        assert_eq!(versions(&merged), vec!["1.94.0", "1.93.1", "1.92.0"]);

        let mut changed = record("1.94.0", true);
        changed.origin = "https://elsewhere".into();
        let merged = append("kotsadm", &existing, changed, &strategies);
        assert_eq!(merged, existing);
    }

    #[test]
    fn test_promote_only_releases() {
        let mut pre = record("1.95.0-beta.1", true);
        assert!(promote(&mut pre));
        assert!(!pre.is_prerelease);
        assert!(!promote(&mut pre));
    }

    #[test]
    fn test_releasing() {
        assert!(is_version_releasing(&record("1.0.0", true), &record("1.0.0", false)));
        assert!(!is_version_releasing(&record("1.0.0", false), &record("1.0.0", true)));
        assert!(!is_version_releasing(&record("1.0.0", true), &record("1.0.0", true)));
    }

    #[test]
    fn test_import_is_write_once() {
        let strategies = StrategyTable::builtin();
        let mut registry = AddonRegistry::new();

        let report = registry.import("kotsadm", [record("1.94.0", true), record("1.93.0", false)], &strategies);
        assert_eq!(report.added.len(), 2);
        assert!(report.changed());

        let mut rewritten = record("1.93.0", false);
        rewritten.sha256_sum = "different".into();
        let report = registry.import("kotsadm", [rewritten], &strategies);
        assert!(!report.changed());
        assert_eq!(registry.find_version("kotsadm", "1.93.0").unwrap().sha256_sum, "abc");

        let report = registry.import("kotsadm", [record("1.94.0", false)], &strategies);
        assert_eq!(report.promoted, vec![("kotsadm".to_string(), "1.94.0".to_string())]);
        assert!(!registry.find_version("kotsadm", "1.94.0").unwrap().is_prerelease);

        // released records never go back to pre-release
        let report = registry.import("kotsadm", [record("1.94.0", true)], &strategies);
        assert!(!report.changed());
        assert!(!registry.find_version("kotsadm", "1.94.0").unwrap().is_prerelease);
    }

    #[test]
    fn test_json_shape() {
        let json = br#"{
            "kotsadm": [
                {"version": "1.94.0", "kurlVersionCompatibilityRange": ">= v2022.09.19-0",
                 "origin": "https://example.com/kotsadm-1.94.0.tar.gz", "isPrerelease": false,
                 "sha256Sum": "abc"}
            ]
        }"#;
        let registry = AddonRegistry::from_json(json).unwrap();
        assert_eq!(registry.records("kotsadm").len(), 1);

        let value: serde_json::Value = serde_json::from_slice(&registry.to_json().unwrap()).unwrap();
        assert_eq!(value["kotsadm"][0]["isPrerelease"], false);
        assert_eq!(value["kotsadm"][0]["kurlVersionCompatibilityRange"], ">= v2022.09.19-0");
        assert!(registry.records("missing").is_empty());
    }
}
