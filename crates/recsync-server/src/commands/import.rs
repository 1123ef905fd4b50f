//! Import command implementation.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use recsync_core::{CustomerId, RecordType};
use recsync_engine::Importer;

use crate::config::Config;
use crate::output;

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Customer (tenant) id
    #[arg(long)]
    pub customer: String,

    /// Record type / action key (e.g. get-contacts)
    #[arg(long)]
    pub action: String,
}

pub async fn run(config: &Config, args: ImportArgs) -> Result<()> {
    let customer = CustomerId::new(&args.customer).context("Invalid customer id")?;
    let record_type = RecordType::new(&args.action).context("Invalid action")?;

    let importer = Importer::new(
        Arc::new(config.open_store()?),
        Arc::new(config.actions()?),
        config.import_options(),
    );

    let report = importer
        .import(&customer, &record_type, &config.cancel_signal())
        .await
        .with_context(|| format!("Failed to import {}", record_type))?;

    output::json(&report, false)?;

    if report.is_complete() {
        output::success(&format!(
            "Imported {} records of {} ({} created, {} updated, {} unchanged)",
            report.records_count, record_type, report.created, report.updated, report.unchanged
        ));
    } else {
        output::error(&format!(
            "Import of {} cancelled after {} pages",
            record_type, report.pages
        ));
    }

    if report.failed() > 0 {
        output::field("Failed records", &report.failed().to_string());
    }

    Ok(())
}
