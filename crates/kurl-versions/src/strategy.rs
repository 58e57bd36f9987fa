//! Per-add-on version normalization
//!
//! Add-on versions do not all follow semver. Each quirk is captured by a
//! [`NormalizationStrategy`] that maps a raw version string onto an orderable
//! [`VersionKey`], and a [`StrategyTable`] decides which strategy applies to
//! which add-on. Generic code (wildcard resolution, sorting, business-rule
//! comparisons) only ever talks to the table.
//!
//! Built-in strategies:
//! - [`SemverStrategy`]: plain semver, optional leading `v`, build metadata ignored
//! - [`ZeroPaddedStrategy`]: docker-style `19.03.15`
//! - [`PatchSuffixStrategy`]: `2.8.1-20230130`, `0.62.0-44.3.1`; the suffix is a rebuild
//!   of the base version and sorts after it
//! - [`TimestampStrategy`]: minio-style `2023-02-10T18-48-39Z`
//! - [`ChannelMarkerStrategy`]: wraps another strategy and treats literals such as
//!   `alpha` and `nightly` as channels that never take part in ordering

use regex::Regex;
use semver::Prerelease;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, LazyLock};

static TIMESTAMP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4})-(\d{2})-(\d{2})T(\d{2})-(\d{2})-(\d{2})Z$")
        .expect("timestamp regex is valid")
});

/// Position of a version relative to its `major.minor.patch` release
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Revision {
    /// Pre-release of the base version (`1.87.0-beta.1`)
    Pre(Prerelease),
    /// The base version itself
    Release,
    /// Rebuild of the base version (`2.8.1-20230130`)
    Post(Prerelease),
}

/// Normalized, totally ordered representation of a version string
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct VersionKey {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub revision: Revision,
}

impl VersionKey {
    pub fn release(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            revision: Revision::Release,
        }
    }

    pub fn major_minor(&self) -> (u64, u64) {
        (self.major, self.minor)
    }

    /// The same version with any pre/post revision dropped
    pub fn base(&self) -> Self {
        Self::release(self.major, self.minor, self.patch)
    }
}

/// Maps raw version strings of one add-on onto orderable keys
pub trait NormalizationStrategy: Send + Sync + fmt::Debug {
    /// Short identifier used in logs
    fn name(&self) -> &'static str;

    /// Orderable key, or `None` when the string cannot take part in ordering
    fn key(&self, raw: &str) -> Option<VersionKey>;

    /// Whether the string is a release channel marker rather than a version
    fn is_channel(&self, _raw: &str) -> bool {
        false
    }
}

/// Split `1.2.3[-suffix][+build]` into numeric parts and an optional suffix.
/// Leading zeros in numeric parts are accepted.
fn split_numeric(raw: &str) -> Option<(u64, u64, u64, Option<&str>)> {
    let raw = raw.strip_prefix('v').unwrap_or(raw);
    let raw = raw.split_once('+').map_or(raw, |(head, _)| head);
    let (base, suffix) = match raw.split_once('-') {
        Some((base, suffix)) => (base, Some(suffix)),
        None => (raw, None),
    };

    let mut parts = base.split('.');
    let mut next = || -> Option<u64> {
        let part = parts.next()?;
        if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        part.parse().ok()
    };
    let (major, minor, patch) = (next()?, next()?, next()?);
    if parts.next().is_some() {
        return None;
    }
    Some((major, minor, patch, suffix))
}

/// Plain semver with an optional `v` prefix
#[derive(Debug, Default, Clone, Copy)]
pub struct SemverStrategy;

impl NormalizationStrategy for SemverStrategy {
    fn name(&self) -> &'static str {
        "semver"
    }

    fn key(&self, raw: &str) -> Option<VersionKey> {
        let version = semver::Version::parse(raw.strip_prefix('v').unwrap_or(raw)).ok()?;
        let revision = if version.pre.is_empty() {
            Revision::Release
        } else {
            Revision::Pre(version.pre)
        };
        Some(VersionKey {
            major: version.major,
            minor: version.minor,
            patch: version.patch,
            revision,
        })
    }
}

/// Semver whose numeric parts may carry leading zeros (`19.03.015`)
#[derive(Debug, Default, Clone, Copy)]
pub struct ZeroPaddedStrategy;

impl NormalizationStrategy for ZeroPaddedStrategy {
    fn name(&self) -> &'static str {
        "zero-padded"
    }

    fn key(&self, raw: &str) -> Option<VersionKey> {
        let (major, minor, patch, suffix) = split_numeric(raw)?;
        let revision = match suffix {
            Some(s) => Revision::Pre(Prerelease::new(s).ok()?),
            None => Revision::Release,
        };
        Some(VersionKey {
            major,
            minor,
            patch,
            revision,
        })
    }
}

/// `X.Y.Z-suffix` where the suffix marks a newer build of `X.Y.Z`
#[derive(Debug, Default, Clone, Copy)]
pub struct PatchSuffixStrategy;

impl NormalizationStrategy for PatchSuffixStrategy {
    fn name(&self) -> &'static str {
        "patch-suffix"
    }

    fn key(&self, raw: &str) -> Option<VersionKey> {
        let (major, minor, patch, suffix) = split_numeric(raw)?;
        let revision = match suffix {
            Some(s) => Revision::Post(Prerelease::new(s).ok()?),
            None => Revision::Release,
        };
        Some(VersionKey {
            major,
            minor,
            patch,
            revision,
        })
    }
}

/// `YYYY-MM-DDThh-mm-ssZ` release tags
#[derive(Debug, Default, Clone, Copy)]
pub struct TimestampStrategy;

impl NormalizationStrategy for TimestampStrategy {
    fn name(&self) -> &'static str {
        "timestamp"
    }

    fn key(&self, raw: &str) -> Option<VersionKey> {
        let caps = TIMESTAMP_RE.captures(raw)?;
        let num = |i: usize| caps[i].parse::<u64>().ok();
        let seconds = num(4)? * 3600 + num(5)? * 60 + num(6)?;
        Some(VersionKey {
            major: num(1)?,
            minor: num(2)?,
            patch: num(3)?,
            revision: Revision::Post(Prerelease::new(&seconds.to_string()).ok()?),
        })
    }
}

/// Wraps a strategy and excludes channel literals from ordering
#[derive(Debug)]
pub struct ChannelMarkerStrategy {
    channels: Vec<String>,
    inner: Arc<dyn NormalizationStrategy>,
}

impl ChannelMarkerStrategy {
    pub fn new<I, S>(channels: I, inner: Arc<dyn NormalizationStrategy>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            channels: channels.into_iter().map(Into::into).collect(),
            inner,
        }
    }
}

impl NormalizationStrategy for ChannelMarkerStrategy {
    fn name(&self) -> &'static str {
        "channel-marker"
    }

    fn key(&self, raw: &str) -> Option<VersionKey> {
        if self.is_channel(raw) {
            return None;
        }
        self.inner.key(raw)
    }

    fn is_channel(&self, raw: &str) -> bool {
        self.channels.iter().any(|c| c == raw)
    }
}

/// Add-on name to normalization strategy, with a semver fallback
#[derive(Debug, Clone)]
pub struct StrategyTable {
    default: Arc<dyn NormalizationStrategy>,
    by_addon: HashMap<String, Arc<dyn NormalizationStrategy>>,
}

impl Default for StrategyTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl StrategyTable {
    /// Table with no per-add-on entries; everything is plain semver
    pub fn semver_only() -> Self {
        Self {
            default: Arc::new(SemverStrategy),
            by_addon: HashMap::new(),
        }
    }

    /// The strategies for the add-ons shipped in the built-in catalog
    pub fn builtin() -> Self {
        let mut table = Self::semver_only();
        table
            .register("docker", ZeroPaddedStrategy)
            .register("weave", PatchSuffixStrategy)
            .register("rook", PatchSuffixStrategy)
            .register("prometheus", PatchSuffixStrategy)
            .register("goldpinger", PatchSuffixStrategy)
            .register("minio", TimestampStrategy)
            .register(
                "kotsadm",
                ChannelMarkerStrategy::new(["alpha", "nightly"], Arc::new(SemverStrategy)),
            );
        table
    }

    /// Register (or replace) the strategy for an add-on
    pub fn register(
        &mut self,
        addon: impl Into<String>,
        strategy: impl NormalizationStrategy + 'static,
    ) -> &mut Self {
        self.by_addon.insert(addon.into(), Arc::new(strategy));
        self
    }

    pub fn for_addon(&self, addon: &str) -> &dyn NormalizationStrategy {
        self.by_addon
            .get(addon)
            .map_or(self.default.as_ref(), |s| s.as_ref())
    }

    pub fn key(&self, addon: &str, raw: &str) -> Option<VersionKey> {
        self.for_addon(addon).key(raw)
    }

    pub fn is_channel(&self, addon: &str, raw: &str) -> bool {
        self.for_addon(addon).is_channel(raw)
    }

    /// Compare two versions of one add-on; `None` if either is not orderable
    pub fn compare(&self, addon: &str, a: &str, b: &str) -> Option<Ordering> {
        let strategy = self.for_addon(addon);
        Some(strategy.key(a)?.cmp(&strategy.key(b)?))
    }

    /// Sort newest first. Orderable versions lead (ties broken by the greater
    /// string), then unorderable ones in their original order, then channels.
    pub fn sort_descending(&self, addon: &str, versions: &mut [String]) {
        let strategy = self.for_addon(addon);
        let rank = |v: &str| -> u8 {
            if strategy.is_channel(v) {
                2
            } else if strategy.key(v).is_some() {
                0
            } else {
                1
            }
        };
        versions.sort_by(|a, b| {
            let (ra, rb) = (rank(a), rank(b));
            if ra != rb || ra != 0 {
                return ra.cmp(&rb);
            }
            match (strategy.key(a), strategy.key(b)) {
                (Some(ka), Some(kb)) => kb.cmp(&ka).then_with(|| b.cmp(a)),
                _ => Ordering::Equal,
            }
        });
    }
}
