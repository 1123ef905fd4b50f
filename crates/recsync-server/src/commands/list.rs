//! List command implementation.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use recsync_core::{CustomerId, RecordType};
use recsync_engine::QueryService;

use crate::config::Config;
use crate::output;

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Customer (tenant) id
    #[arg(long)]
    pub customer: String,

    /// Record type / action key (e.g. get-contacts)
    #[arg(long)]
    pub action: String,

    /// Case-insensitive search over id, name, industry and domain
    #[arg(long)]
    pub search: Option<String>,

    /// Pagination cursor
    #[arg(long)]
    pub cursor: Option<String>,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,
}

pub async fn run(config: &Config, args: ListArgs) -> Result<()> {
    let customer = CustomerId::new(&args.customer).context("Invalid customer id")?;
    let record_type = RecordType::new(&args.action).context("Invalid action")?;

    let query = QueryService::new(Arc::new(config.open_store()?)).with_page_size(config.page_size);
    let page = query
        .list(
            &customer,
            &record_type,
            args.cursor.as_deref(),
            args.search.as_deref(),
        )
        .await
        .context("Failed to list records")?;

    if page.records.is_empty() {
        output::note("No records found.");
        return Ok(());
    }

    for record in &page.records {
        output::json(record, args.pretty)?;
    }

    if let Some(cursor) = &page.cursor {
        output::field("Next cursor", cursor);
    }

    Ok(())
}
