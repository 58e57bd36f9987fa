//! Installer spec commands

use anyhow::{anyhow, Result};
use camino::Utf8Path;
use kurl_core::SchemaValidator;
use kurl_installer::{InstallerSpec, ValidationContext, ValidationError, ValidationPolicy};
use kurl_versions::{StrategyTable, VersionResolver};
use serde_json::json;

use super::{load_catalog, load_config, read_input};
use crate::cli::{RenderArgs, ResolveArgs, SpecArgs, ValidateArgs};
use crate::output;

fn load_spec(args: &SpecArgs) -> Result<InstallerSpec> {
    let yaml = read_input(&args.file)?;
    Ok(InstallerSpec::parse(&yaml, None)?)
}

pub fn parse(args: SpecArgs) -> Result<()> {
    let spec = load_spec(&args)?;
    let known = spec.components().count();
    let unknown = spec.unknown_components().count();
    output::success(&format!("Parsed {} components ({} unknown)", known + unknown, unknown));
    if spec.is_latest() {
        output::info("Every component is at latest");
    }
    Ok(())
}

pub async fn validate(args: ValidateArgs, config_path: Option<&Utf8Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let spec = load_spec(&args.spec)?;
    let release = pinned_release(args.catalog.release.as_deref(), &spec);
    let catalog = load_catalog(&config, release).await?;
    let resolver = VersionResolver::new(StrategyTable::builtin());
    let schema = SchemaValidator::global()?;

    let policy = if args.all {
        ValidationPolicy::CollectAll
    } else {
        ValidationPolicy::FirstError
    };
    let ctx = ValidationContext::new(&catalog, &resolver, schema).with_policy(policy);
    let errors = spec.validate(&ctx)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&errors_json(&errors))?);
    } else if errors.is_empty() {
        output::success("Installer spec is valid");
    } else {
        for error in &errors {
            output::error(&format!("{}: {}", error.field, error.message));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(anyhow!("Installer spec has {} validation error(s)", errors.len()))
    }
}

/// `--release` wins over the spec's own `kurl.installerVersion`
fn pinned_release<'a>(flag: Option<&'a str>, spec: &'a InstallerSpec) -> Option<&'a str> {
    flag.filter(|r| !r.is_empty()).or_else(|| spec.installer_version())
}

fn errors_json(errors: &[ValidationError]) -> serde_json::Value {
    errors
        .iter()
        .map(|e| {
            json!({
                "kind": e.kind.as_str(),
                "field": e.field,
                "message": e.message,
            })
        })
        .collect()
}

pub fn hash(args: SpecArgs) -> Result<()> {
    let spec = load_spec(&args)?;
    println!("{}", spec.hash());
    Ok(())
}

pub fn render(args: RenderArgs) -> Result<()> {
    let spec = load_spec(&args.spec)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&spec.to_json())?);
    } else {
        print!("{}", spec.to_yaml());
    }
    Ok(())
}

pub fn flags(args: SpecArgs) -> Result<()> {
    let spec = load_spec(&args)?;
    println!("{}", spec.flags());
    Ok(())
}

pub async fn resolve(args: ResolveArgs, config_path: Option<&Utf8Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let spec = load_spec(&args.spec)?;
    let release = pinned_release(args.catalog.release.as_deref(), &spec);
    let catalog = load_catalog(&config, release).await?;
    let resolver = VersionResolver::new(StrategyTable::builtin());

    let resolved = spec.resolve(&catalog, &resolver)?;
    print!("{}", resolved.to_yaml());
    Ok(())
}
