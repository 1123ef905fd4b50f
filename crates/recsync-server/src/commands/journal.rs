//! Journal command implementation.

use anyhow::{Context, Result};
use clap::Args;

use crate::config::Config;
use crate::output;

#[derive(Args, Debug)]
pub struct JournalArgs {
    /// Only show the last N entries
    #[arg(long)]
    pub tail: Option<usize>,
}

pub async fn run(config: &Config, args: JournalArgs) -> Result<()> {
    let store = config.open_store()?;
    let entries = store.journal().context("Failed to read journal")?;

    if entries.is_empty() {
        output::note("Journal is empty.");
        return Ok(());
    }

    let skip = args
        .tail
        .map(|n| entries.len().saturating_sub(n))
        .unwrap_or(0);

    for entry in entries.iter().skip(skip) {
        output::json(entry, false)?;
    }

    Ok(())
}
