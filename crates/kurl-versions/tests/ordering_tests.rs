//! Ordering properties of the built-in strategies
//!
//! Tests cover:
//! - Sorting is newest-first for every add-on in the built-in catalog
//! - Wildcard resolution always returns the maximum of its major.minor group
//! - Custom strategies plug into resolution without touching the resolver

use kurl_versions::{
    NormalizationStrategy, Revision, StrategyTable, VersionCatalog, VersionKey, VersionResolver,
};
use proptest::prelude::*;

#[test]
fn test_builtin_lists_sort_newest_first() {
    let catalog = VersionCatalog::builtin().unwrap();
    let strategies = StrategyTable::builtin();

    for addon in catalog.addons() {
        let mut sorted = catalog.get(addon).to_vec();
        strategies.sort_descending(addon, &mut sorted);

        let keys: Vec<VersionKey> = sorted
            .iter()
            .filter_map(|v| strategies.key(addon, v))
            .collect();
        assert!(
            keys.windows(2).all(|w| w[0] >= w[1]),
            "{} is not sorted newest first: {:?}",
            addon,
            sorted
        );
    }
}

#[test]
fn test_wildcard_picks_group_maximum() {
    let catalog = VersionCatalog::builtin().unwrap();
    let resolver = VersionResolver::default();

    for addon in ["kubernetes", "containerd", "weave", "rook", "prometheus", "docker"] {
        let strategies = resolver.strategies();
        for version in catalog.get(addon) {
            let Some(key) = strategies.key(addon, version) else {
                continue;
            };
            let token = format!("{}.{}.x", key.major, key.minor);
            let resolved = resolver
                .resolve(addon, &token, &catalog, false)
                .unwrap()
                .unwrap();
            let resolved_key = strategies.key(addon, &resolved).unwrap();
            assert!(resolved_key >= key, "{} {} resolved to {}", addon, token, resolved);
        }
    }
}

/// Versions like `r42` for an add-on that only counts releases
#[derive(Debug)]
struct ReleaseCounter;

impl NormalizationStrategy for ReleaseCounter {
    fn name(&self) -> &'static str {
        "release-counter"
    }

    fn key(&self, raw: &str) -> Option<VersionKey> {
        let n = raw.strip_prefix('r')?.parse().ok()?;
        Some(VersionKey {
            major: 1,
            minor: 0,
            patch: n,
            revision: Revision::Release,
        })
    }
}

#[test]
fn test_registered_strategy_drives_resolution() {
    let mut strategies = StrategyTable::builtin();
    strategies.register("counter", ReleaseCounter);
    let resolver = VersionResolver::new(strategies);
    let catalog = VersionCatalog::from_entries([("counter", ["r9", "r12", "r3"])]);

    assert_eq!(
        resolver.resolve("counter", "1.0.x", &catalog, false).unwrap().as_deref(),
        Some("r12")
    );
}

proptest! {
    #[test]
    fn prop_semver_sort_is_descending(
        versions in prop::collection::vec((0u64..5, 0u64..20, 0u64..30), 1..20)
    ) {
        let strategies = StrategyTable::builtin();
        let mut raw: Vec<String> = versions
            .iter()
            .map(|(a, b, c)| format!("{}.{}.{}", a, b, c))
            .collect();
        strategies.sort_descending("kubernetes", &mut raw);
        let keys: Vec<VersionKey> = raw.iter().filter_map(|v| strategies.key("kubernetes", v)).collect();
        prop_assert_eq!(keys.len(), raw.len());
        prop_assert!(keys.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn prop_docker_padding_is_transparent(major in 1u64..30, minor in 0u64..10, patch in 0u64..30) {
        let strategies = StrategyTable::builtin();
        let padded = format!("{}.{:02}.{}", major, minor, patch);
        let plain = format!("{}.{}.{}", major, minor, patch);
        prop_assert_eq!(strategies.key("docker", &padded), strategies.key("docker", &plain));
    }
}
