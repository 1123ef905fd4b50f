//! recsync - Mirror external CRM records into a local store.
//!
//! Runs the HTTP service (`recsync serve`) or drives the same engine from
//! the command line for imports and inspection.

mod cli;
mod commands;
mod config;
mod http;
mod output;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Best-effort .env load so clap's env fallbacks can see it
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    init_logging(cli.verbose, cli.json_logs);

    match cli.command {
        Commands::Serve(args) => commands::serve::run(&cli.config, args).await,
        Commands::Import(args) => commands::import::run(&cli.config, args).await,
        Commands::ImportAll(args) => commands::import_all::run(&cli.config, args).await,
        Commands::List(args) => commands::list::run(&cli.config, args).await,
        Commands::Get(args) => commands::get::run(&cli.config, args).await,
        Commands::Journal(args) => commands::journal::run(&cli.config, args).await,
    }
}

fn init_logging(verbosity: u8, json: bool) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init();
    }
}
