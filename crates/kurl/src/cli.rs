//! CLI argument parsing with clap

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};

/// kURL installer spec tooling
#[derive(Parser, Debug)]
#[command(name = "kurl")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to a config.yaml overriding ~/.kurl/config.yaml
    #[arg(short, long, global = true)]
    pub config: Option<Utf8PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check that an installer spec parses
    Parse(SpecArgs),

    /// Validate an installer spec against the catalog and business rules
    Validate(ValidateArgs),

    /// Print the content hash of an installer spec
    Hash(SpecArgs),

    /// Print the canonical YAML of an installer spec
    Render(RenderArgs),

    /// Print the installer flags of an installer spec
    Flags(SpecArgs),

    /// Print an installer spec with every version token resolved
    Resolve(ResolveArgs),

    /// List known add-on versions
    Versions(VersionsArgs),

    /// Pull add-on feeds once and update the registry document
    Refresh(RefreshArgs),

    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommands),
}

/// An installer spec document
#[derive(Args, Debug)]
pub struct SpecArgs {
    /// Installer YAML file, or `-` for stdin
    #[arg(default_value = "-")]
    pub file: String,
}

/// Which catalog to check against
#[derive(Args, Debug, Default)]
pub struct CatalogArgs {
    /// kURL release whose supported versions to use (e.g. v2023.02.13-0)
    #[arg(long)]
    pub release: Option<String>,
}

#[derive(Args, Debug)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub spec: SpecArgs,

    #[command(flatten)]
    pub catalog: CatalogArgs,

    /// Report every failure instead of stopping at the first
    #[arg(long)]
    pub all: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct RenderArgs {
    #[command(flatten)]
    pub spec: SpecArgs,

    /// Render as JSON instead of YAML
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ResolveArgs {
    #[command(flatten)]
    pub spec: SpecArgs,

    #[command(flatten)]
    pub catalog: CatalogArgs,
}

#[derive(Args, Debug)]
pub struct VersionsArgs {
    /// Only list this add-on
    pub addon: Option<String>,

    #[command(flatten)]
    pub catalog: CatalogArgs,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct RefreshArgs {
    /// Directory holding the registry document (default: ~/.kurl/blobs)
    #[arg(long)]
    pub store_dir: Option<Utf8PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show resolved configuration
    Show(ConfigShowArgs),
}

#[derive(Args, Debug)]
pub struct ConfigShowArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_spec_defaults_to_stdin() {
        let cli = Cli::try_parse_from(["kurl", "hash"]).unwrap();
        match cli.command {
            Commands::Hash(args) => assert_eq!(args.file, "-"),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::try_parse_from(["kurl", "validate", "a.yaml", "--all", "-vv", "--release", "v2023.02.13-0"])
            .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Validate(args) => {
                assert!(args.all);
                assert_eq!(args.spec.file, "a.yaml");
                assert_eq!(args.catalog.release.as_deref(), Some("v2023.02.13-0"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
