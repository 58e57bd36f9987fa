//! Config command

use anyhow::Result;
use camino::Utf8Path;

use super::load_config;
use crate::cli::{ConfigCommands, ConfigShowArgs};
use crate::output;

pub fn run(cmd: ConfigCommands, config_path: Option<&Utf8Path>) -> Result<()> {
    match cmd {
        ConfigCommands::Show(args) => show(args, config_path),
    }
}

fn show(args: ConfigShowArgs, config_path: Option<&Utf8Path>) -> Result<()> {
    let config = load_config(config_path)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    output::header("Configuration");
    output::kv("Base URL", &config.base_url);
    output::kv("Dist URL", &config.dist_url);
    output::kv(
        "Installer version",
        config.installer_version.as_deref().unwrap_or("(unpinned)"),
    );
    output::kv("Refresh interval", &format!("{}s", config.refresh_interval_secs));
    output::kv("Fetch timeout", &format!("{}s", config.fetch_timeout_secs));
    output::kv("Store lock timeout", &format!("{}s", config.store_lock_timeout_secs));
    output::kv("Registry key", &config.registry_key);

    if !config.feeds.is_empty() {
        output::header("Feeds");
        for (addon, url) in &config.feeds {
            output::kv(addon, url);
        }
    }
    if !config.preferred_latest.is_empty() {
        output::header("Preferred latest");
        for (addon, version) in &config.preferred_latest {
            output::kv(addon, version);
        }
    }
    Ok(())
}
