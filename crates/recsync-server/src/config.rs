//! Runtime configuration.
//!
//! Every setting is a CLI flag with a `RECSYNC_*` environment fallback. A
//! `.env` file in the working directory is loaded first if present.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use directories::ProjectDirs;
use url::Url;

use recsync_core::RecordType;
use recsync_engine::{CancelSignal, ImportOptions, TenantResolver};
use recsync_file::FileStore;
use recsync_remote::{
    ApiClient, IntegrationActions, TokenIssuer, WebhookNotifier, WebhookRoute, WebhookUrls,
};

/// Settings shared by every command.
#[derive(Args, Debug, Clone)]
pub struct Config {
    /// Directory holding the record store
    #[arg(long, env = "RECSYNC_DATA_DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Base URL of the external integration API
    #[arg(
        long,
        env = "RECSYNC_API_URL",
        default_value = "https://api.integration.app",
        global = true
    )]
    pub api_url: Url,

    /// Workspace key, used as the issuer of API tokens
    #[arg(long, env = "RECSYNC_WORKSPACE_KEY", global = true)]
    pub workspace_key: Option<String>,

    /// Workspace secret, used to sign API tokens
    #[arg(long, env = "RECSYNC_WORKSPACE_SECRET", hide_env_values = true, global = true)]
    pub workspace_secret: Option<String>,

    /// Secret for verifying tenant tokens; unverified when unset
    #[arg(long, env = "RECSYNC_WEBHOOK_SECRET", hide_env_values = true, global = true)]
    pub webhook_secret: Option<String>,

    /// Outbound webhook route as entity=URL (repeatable; `default` is the fallback)
    #[arg(
        long = "webhook-url",
        env = "RECSYNC_WEBHOOK_URLS",
        value_delimiter = ',',
        global = true
    )]
    pub webhook_urls: Vec<WebhookRoute>,

    /// Pages fetched per record type before an import is abandoned
    #[arg(long, env = "RECSYNC_MAX_PAGES", default_value_t = 1000, global = true)]
    pub max_pages: u32,

    /// Record types imported concurrently by import-all
    #[arg(long, env = "RECSYNC_TYPE_CONCURRENCY", default_value_t = 4, global = true)]
    pub type_concurrency: usize,

    /// Upserts in flight at once within one page
    #[arg(long, env = "RECSYNC_WRITE_CONCURRENCY", default_value_t = 16, global = true)]
    pub write_concurrency: usize,

    /// Records per list page
    #[arg(long, env = "RECSYNC_PAGE_SIZE", default_value_t = 100, global = true)]
    pub page_size: usize,

    /// Abort imports between pages after this many seconds
    #[arg(long, env = "RECSYNC_IMPORT_TIMEOUT", global = true)]
    pub import_timeout: Option<u64>,

    /// Record types imported by import-all (comma separated)
    #[arg(
        long = "import-type",
        env = "RECSYNC_IMPORT_TYPES",
        value_delimiter = ',',
        global = true
    )]
    pub import_types: Vec<RecordType>,

    /// Timeout for outbound HTTP calls, in seconds
    #[arg(long, env = "RECSYNC_HTTP_TIMEOUT", default_value_t = 30, global = true)]
    pub http_timeout: u64,
}

impl Config {
    /// The store directory, defaulting to the platform data directory.
    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.data_dir {
            return Ok(dir.clone());
        }

        let dirs =
            ProjectDirs::from("", "", "recsync").context("Could not determine data directory")?;
        Ok(dirs.data_dir().join("store"))
    }

    pub fn open_store(&self) -> Result<FileStore> {
        let dir = self.data_dir()?;
        FileStore::open(&dir)
            .with_context(|| format!("Failed to open record store at {}", dir.display()))
    }

    pub fn import_options(&self) -> ImportOptions {
        ImportOptions {
            max_pages: self.max_pages,
            type_concurrency: self.type_concurrency,
            write_concurrency: self.write_concurrency,
        }
    }

    pub fn import_types(&self) -> Vec<RecordType> {
        if self.import_types.is_empty() {
            RecordType::defaults()
        } else {
            self.import_types.clone()
        }
    }

    pub fn import_timeout(&self) -> Option<Duration> {
        self.import_timeout.map(Duration::from_secs)
    }

    /// A fresh cancel signal honouring the import timeout.
    pub fn cancel_signal(&self) -> CancelSignal {
        CancelSignal::from_timeout(self.import_timeout())
    }

    pub fn tenants(&self) -> TenantResolver {
        TenantResolver::new(self.webhook_secret.as_deref())
    }

    fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout)
    }

    /// The external action API client.
    pub fn actions(&self) -> Result<IntegrationActions> {
        let key = self
            .workspace_key
            .as_deref()
            .context("RECSYNC_WORKSPACE_KEY (--workspace-key) is required")?;
        let secret = self
            .workspace_secret
            .as_deref()
            .context("RECSYNC_WORKSPACE_SECRET (--workspace-secret) is required")?;

        let client = ApiClient::new(self.api_url.clone(), self.http_timeout())
            .context("Failed to build API client")?;
        Ok(IntegrationActions::new(client, TokenIssuer::new(key, secret)))
    }

    pub fn notifier(&self) -> Result<WebhookNotifier> {
        let urls = WebhookUrls::new(self.webhook_urls.iter().cloned());
        WebhookNotifier::new(urls, self.http_timeout()).context("Failed to build webhook client")
    }

    /// Everything the HTTP service needs, with the store opened lazily.
    pub fn app_state(&self) -> Result<crate::http::AppState> {
        Ok(crate::http::AppState::new(crate::http::Services {
            data_dir: self.data_dir()?,
            actions: Arc::new(self.actions()?),
            notifier: Arc::new(self.notifier()?),
            tenants: self.tenants(),
            import_options: self.import_options(),
            import_types: self.import_types(),
            import_timeout: self.import_timeout(),
            page_size: self.page_size,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser, Debug)]
    struct TestCli {
        #[command(flatten)]
        config: Config,
    }

    fn parse(args: &[&str]) -> Config {
        let mut argv = vec!["recsync"];
        argv.extend_from_slice(args);
        TestCli::try_parse_from(argv).unwrap().config
    }

    #[test]
    fn defaults() {
        let config = parse(&[]);
        assert_eq!(config.max_pages, 1000);
        assert_eq!(config.type_concurrency, 4);
        assert_eq!(config.write_concurrency, 16);
        assert_eq!(config.page_size, 100);
        assert!(config.import_timeout().is_none());
        assert_eq!(config.import_types(), RecordType::defaults());
    }

    #[test]
    fn parses_routes_and_types() {
        let config = parse(&[
            "--webhook-url",
            "contacts=https://hooks.example.com/c,default=https://hooks.example.com/d",
            "--import-type",
            "contacts,notes",
            "--data-dir",
            "/tmp/recsync-test",
        ]);

        assert_eq!(config.webhook_urls.len(), 2);
        assert_eq!(config.webhook_urls[0].entity, "contacts");
        let types: Vec<_> = config.import_types().iter().map(|t| t.to_string()).collect();
        assert_eq!(types, vec!["get-contacts", "get-notes"]);
        assert_eq!(
            config.data_dir().unwrap(),
            PathBuf::from("/tmp/recsync-test")
        );
    }

    #[test]
    fn rejects_bad_routes() {
        assert!(TestCli::try_parse_from(["recsync", "--webhook-url", "contacts"]).is_err());
        assert!(TestCli::try_parse_from(["recsync", "--import-type", "bad type"]).is_err());
    }

    #[test]
    fn builds_clients_from_credentials() {
        let config = parse(&[
            "--workspace-key",
            "ws-key",
            "--workspace-secret",
            "ws-secret",
            "--api-url",
            "http://127.0.0.1:9/",
        ]);
        assert!(config.actions().is_ok());
        assert!(config.notifier().is_ok());
        assert!(!config.tenants().verifies());

        let config = parse(&["--webhook-secret", "s3cret"]);
        assert!(config.tenants().verifies());
    }
}
