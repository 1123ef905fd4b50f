//! Get command implementation.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use recsync_core::{CustomerId, RecordId};
use recsync_engine::QueryService;

use crate::config::Config;
use crate::output;

#[derive(Args, Debug)]
pub struct GetArgs {
    /// External record id
    pub id: String,

    /// Customer (tenant) id
    #[arg(long)]
    pub customer: String,
}

pub async fn run(config: &Config, args: GetArgs) -> Result<()> {
    let customer = CustomerId::new(&args.customer).context("Invalid customer id")?;
    let id = RecordId::new(&args.id).context("Invalid record id")?;

    let query = QueryService::new(Arc::new(config.open_store()?));
    let record = query
        .get(&customer, &id)
        .await
        .context("Failed to get record")?;

    output::json(&record, true)?;
    Ok(())
}
