//! Version token resolution
//!
//! A token is one of:
//! - `""`: unset, nothing to resolve
//! - `latest`: the catalog's canonical latest
//! - `X.Y.x`: the greatest known `X.Y.*` version
//! - anything else: an exact version that must be in the catalog, unless the
//!   caller trusts it (components with a download override)

use crate::catalog::{VersionCatalog, LATEST};
use crate::strategy::StrategyTable;
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::{debug, trace};

static WILDCARD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\.(\d+)\.x$").expect("wildcard regex is valid"));

/// Why a version token could not be resolved
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    /// `latest` or `X.Y.x` matched nothing in the catalog
    #[error("no {addon} version matches {token:?}")]
    VersionNotFound { addon: String, token: String },

    /// An exact version that is not in the catalog
    #[error("{addon} version {version:?} is not supported")]
    UnsupportedVersion { addon: String, version: String },
}

impl ResolutionError {
    pub fn addon(&self) -> &str {
        match self {
            Self::VersionNotFound { addon, .. } | Self::UnsupportedVersion { addon, .. } => addon,
        }
    }

    pub fn token(&self) -> &str {
        match self {
            Self::VersionNotFound { token, .. } => token,
            Self::UnsupportedVersion { version, .. } => version,
        }
    }
}

/// Classified version token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionToken<'a> {
    Unset,
    Latest,
    Wildcard { major: u64, minor: u64 },
    Exact(&'a str),
}

impl<'a> VersionToken<'a> {
    pub fn parse(token: &'a str) -> Self {
        if token.is_empty() {
            return Self::Unset;
        }
        if token == LATEST {
            return Self::Latest;
        }
        if let Some(caps) = WILDCARD_RE.captures(token) {
            if let (Ok(major), Ok(minor)) = (caps[1].parse(), caps[2].parse()) {
                return Self::Wildcard { major, minor };
            }
        }
        Self::Exact(token)
    }

    pub fn is_symbolic(&self) -> bool {
        matches!(self, Self::Latest | Self::Wildcard { .. })
    }
}

/// Resolves version tokens against a catalog using per-add-on strategies
#[derive(Debug, Clone, Default)]
pub struct VersionResolver {
    strategies: StrategyTable,
}

impl VersionResolver {
    pub fn new(strategies: StrategyTable) -> Self {
        Self { strategies }
    }

    pub fn strategies(&self) -> &StrategyTable {
        &self.strategies
    }

    /// Resolve `token` for `addon`. `Ok(None)` means the token was unset.
    ///
    /// `trust_literal` skips the membership check for exact versions.
    pub fn resolve(
        &self,
        addon: &str,
        token: &str,
        catalog: &VersionCatalog,
        trust_literal: bool,
    ) -> Result<Option<String>, ResolutionError> {
        let resolved = match VersionToken::parse(token) {
            VersionToken::Unset => return Ok(None),
            VersionToken::Latest => catalog
                .latest(addon, &self.strategies)
                .map(str::to_string)
                .ok_or_else(|| not_found(addon, token))?,
            VersionToken::Wildcard { major, minor } => self
                .latest_patch(addon, major, minor, catalog)
                .ok_or_else(|| not_found(addon, token))?,
            VersionToken::Exact(version) => {
                if !trust_literal && !catalog.contains(addon, version) {
                    return Err(ResolutionError::UnsupportedVersion {
                        addon: addon.to_string(),
                        version: version.to_string(),
                    });
                }
                version.to_string()
            }
        };

        debug!("Resolved {} {:?} to {}", addon, token, resolved);
        Ok(Some(resolved))
    }

    /// Greatest catalog version of `addon` within `major.minor`. Equal keys
    /// are broken by the lexicographically greatest string.
    pub fn latest_patch(
        &self,
        addon: &str,
        major: u64,
        minor: u64,
        catalog: &VersionCatalog,
    ) -> Option<String> {
        let strategy = self.strategies.for_addon(addon);
        catalog
            .get(addon)
            .iter()
            .filter_map(|raw| {
                let key = strategy.key(raw);
                if key.is_none() {
                    trace!("{} version {:?} is not orderable by {}", addon, raw, strategy.name());
                }
                key.map(|k| (k, raw))
            })
            .filter(|(key, _)| key.major_minor() == (major, minor))
            .max_by(|(ka, a), (kb, b)| ka.cmp(kb).then_with(|| a.cmp(b)))
            .map(|(_, raw)| raw.clone())
    }
}

fn not_found(addon: &str, token: &str) -> ResolutionError {
    ResolutionError::VersionNotFound {
        addon: addon.to_string(),
        token: token.to_string(),
    }
}
