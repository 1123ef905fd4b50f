//! Serve command implementation.

use std::net::SocketAddr;

use anyhow::Result;
use clap::Args;

use crate::config::Config;
use crate::http;
use crate::output;

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to listen on
    #[arg(long, env = "RECSYNC_BIND", default_value = "127.0.0.1:3000")]
    pub bind: SocketAddr,
}

pub async fn run(config: &Config, args: ServeArgs) -> Result<()> {
    let state = config.app_state()?;

    output::success(&format!("recsync {} serving on {}", env!("RECSYNC_VERSION"), args.bind));
    output::field("Data directory", &config.data_dir()?.display().to_string());
    if config.webhook_secret.is_none() {
        output::field("Tenant tokens", "not verified (no webhook secret)");
    }

    http::serve(state, args.bind).await
}
