//! kURL CLI
//!
//! Entry point for working with installer specs from the command line.

mod cli;
mod commands;
mod output;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.quiet);

    let config = cli.config.as_deref();
    match cli.command {
        Commands::Parse(args) => commands::spec::parse(args),
        Commands::Validate(args) => commands::spec::validate(args, config).await,
        Commands::Hash(args) => commands::spec::hash(args),
        Commands::Render(args) => commands::spec::render(args),
        Commands::Flags(args) => commands::spec::flags(args),
        Commands::Resolve(args) => commands::spec::resolve(args, config).await,
        Commands::Versions(args) => commands::versions::run(args, config).await,
        Commands::Refresh(args) => commands::refresh::run(args, config).await,
        Commands::Config(args) => commands::config::run(args, config),
    }
}

/// Initialize tracing with appropriate verbosity
fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("warn"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}
