//! CLI argument definitions.

use clap::{Parser, Subcommand};

use crate::commands::{get, import, import_all, journal, list, serve};
use crate::config::Config;

/// Mirror external CRM records into a local store.
#[derive(Parser, Debug)]
#[command(name = "recsync")]
#[command(author, about, long_about = None)]
#[command(version = env!("RECSYNC_VERSION"))]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(flatten)]
    pub config: Config,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP service
    Serve(serve::ServeArgs),

    /// Import one record type for a customer
    Import(import::ImportArgs),

    /// Import every configured record type from one connection
    ImportAll(import_all::ImportAllArgs),

    /// List mirrored records
    List(list::ListArgs),

    /// Fetch a single mirrored record
    Get(get::GetArgs),

    /// Print the store's write journal
    Journal(journal::JournalArgs),
}
