//! Versions command

use anyhow::{anyhow, Result};
use camino::Utf8Path;
use kurl_versions::StrategyTable;
use std::collections::BTreeMap;
use tabled::{settings::Style, Table, Tabled};

use super::{load_catalog, load_config};
use crate::cli::VersionsArgs;
use crate::output;

#[derive(Tabled)]
struct VersionRow {
    addon: String,
    latest: String,
    versions: usize,
}

pub async fn run(args: VersionsArgs, config_path: Option<&Utf8Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let catalog = load_catalog(&config, args.catalog.release.as_deref()).await?;
    let mut listing = catalog.listing();

    if let Some(addon) = &args.addon {
        let versions = listing
            .remove(addon)
            .ok_or_else(|| anyhow!("Unknown add-on: {}", addon))?;
        listing = BTreeMap::from([(addon.clone(), versions)]);
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(());
    }

    if let Some(addon) = &args.addon {
        output::header(addon);
        for version in listing.values().flatten() {
            println!("  {}", version);
        }
        return Ok(());
    }

    if listing.is_empty() {
        output::warning("Catalog is empty");
        return Ok(());
    }

    let strategies = StrategyTable::builtin();
    let rows = rows(&listing, |addon| {
        catalog.latest(addon, &strategies).unwrap_or("-").to_string()
    });
    let mut table = Table::new(rows);
    table.with(Style::sharp());
    println!("{}", table);
    Ok(())
}

fn rows(listing: &BTreeMap<String, Vec<String>>, latest: impl Fn(&str) -> String) -> Vec<VersionRow> {
    listing
        .iter()
        .map(|(addon, versions)| VersionRow {
            addon: addon.clone(),
            latest: latest(addon),
            // listings carry a leading "latest" marker
            versions: versions.len().saturating_sub(1),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_skip_latest_marker() {
        let listing = BTreeMap::from([(
            "weave".to_string(),
            vec!["latest".to_string(), "2.8.1".to_string(), "2.6.5".to_string()],
        )]);
        let rows = rows(&listing, |_| "2.8.1".to_string());
        assert_eq!(rows[0].versions, 2);
        assert_eq!(rows[0].latest, "2.8.1");
    }
}
