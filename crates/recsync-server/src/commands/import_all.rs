//! Import-all command implementation.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Args;

use recsync_core::CustomerId;
use recsync_engine::Importer;

use crate::config::Config;
use crate::output;

#[derive(Args, Debug)]
pub struct ImportAllArgs {
    /// Customer (tenant) id
    #[arg(long)]
    pub customer: String,

    /// Connection to import from
    #[arg(long)]
    pub connection: String,

    /// Customer display name sent with API calls
    #[arg(long)]
    pub customer_name: Option<String>,
}

pub async fn run(config: &Config, args: ImportAllArgs) -> Result<()> {
    let customer = CustomerId::new(&args.customer).context("Invalid customer id")?;

    let importer = Importer::new(
        Arc::new(config.open_store()?),
        Arc::new(config.actions()?),
        config.import_options(),
    );

    let types = config.import_types();
    let results = importer
        .import_all(
            &customer,
            args.customer_name.as_deref(),
            &args.connection,
            &types,
            &config.cancel_signal(),
        )
        .await;

    let mut failed = 0;
    for result in &results {
        match &result.outcome {
            Ok(report) => {
                output::json(report, false)?;
                output::success(&format!(
                    "{}: {} records",
                    result.record_type, report.records_count
                ));
            }
            Err(e) => {
                failed += 1;
                output::error(&format!("{}: {}", result.record_type, e));
            }
        }
    }

    if failed == results.len() && !results.is_empty() {
        bail!("Every record type failed to import");
    }

    output::success(&format!(
        "Imported {} of {} record types",
        results.len() - failed,
        results.len()
    ));
    Ok(())
}
