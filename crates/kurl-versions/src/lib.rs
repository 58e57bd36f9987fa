//! # kurl-versions
//!
//! Known add-on versions and how version tokens resolve against them:
//! - [`VersionCatalog`]: ordered version lists per add-on, merged from the
//!   built-in table and externally built add-ons
//! - [`StrategyTable`]: per-add-on version normalization
//! - [`VersionResolver`]: `latest`, `X.Y.x` and exact token resolution

pub mod catalog;
pub mod resolver;
pub mod strategy;

pub use catalog::{
    kurl_version_satisfies, CatalogProvider, ExternalVersion, SupportedVersionsFile, VersionCatalog, LATEST,
};
pub use resolver::{ResolutionError, VersionResolver, VersionToken};
pub use strategy::{
    ChannelMarkerStrategy, NormalizationStrategy, PatchSuffixStrategy, Revision, SemverStrategy,
    StrategyTable, TimestampStrategy, VersionKey, ZeroPaddedStrategy,
};
