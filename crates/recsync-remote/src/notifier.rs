//! Outbound change notifications over plain webhooks.

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, instrument, warn};
use url::Url;

use recsync_core::error::{InvalidInputError, UpstreamError};
use recsync_core::{ChangeNotifier, Error, OutboundEvent, RecordType, Result};

use crate::client::{map_reqwest, parse_error_response};

/// Name used for the fallback route.
const DEFAULT_ROUTE: &str = "default";

/// One `entity=URL` webhook route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookRoute {
    /// Bare entity name (`contacts`) or `default`.
    pub entity: String,
    pub url: Url,
}

impl FromStr for WebhookRoute {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (entity, url) = s.split_once('=').ok_or_else(|| InvalidInputError::Other {
            message: format!("webhook route '{}' must look like entity=URL", s),
        })?;

        let entity = entity.trim().to_ascii_lowercase();
        let entity = if entity == DEFAULT_ROUTE {
            entity
        } else {
            RecordType::new(entity)?.entity().to_string()
        };

        let url = Url::parse(url.trim()).map_err(|e| InvalidInputError::Other {
            message: format!("invalid webhook URL '{}': {}", url, e),
        })?;

        Ok(Self { entity, url })
    }
}

/// Webhook destinations per entity, with an optional fallback.
#[derive(Debug, Clone, Default)]
pub struct WebhookUrls {
    by_entity: HashMap<String, Url>,
    default: Option<Url>,
}

impl WebhookUrls {
    pub fn new(routes: impl IntoIterator<Item = WebhookRoute>) -> Self {
        let mut urls = Self::default();
        for route in routes {
            if route.entity == DEFAULT_ROUTE {
                urls.default = Some(route.url);
            } else {
                urls.by_entity.insert(route.entity, route.url);
            }
        }
        urls
    }

    /// Destination for a record type, falling back to the default route.
    pub fn resolve(&self, record_type: &RecordType) -> Option<&Url> {
        self.by_entity
            .get(record_type.entity())
            .or(self.default.as_ref())
    }

    pub fn is_empty(&self) -> bool {
        self.by_entity.is_empty() && self.default.is_none()
    }
}

/// Posts [`OutboundEvent`]s as JSON to the configured webhook.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    urls: WebhookUrls,
}

impl WebhookNotifier {
    pub fn new(urls: WebhookUrls, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("recsync/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(map_reqwest)?;

        if urls.is_empty() {
            warn!("No outbound webhook URLs configured; local edits will fail to notify");
        }

        Ok(Self { client, urls })
    }
}

#[async_trait]
impl ChangeNotifier for WebhookNotifier {
    #[instrument(skip(self, event), fields(kind = ?event.kind, record_type = %event.record_type))]
    async fn notify(&self, event: &OutboundEvent) -> Result<()> {
        let url = self
            .urls
            .resolve(&event.record_type)
            .ok_or_else(|| UpstreamError::NotConfigured {
                target: event.record_type.entity().to_string(),
            })?;

        debug!(%url, "Sending webhook");
        let response = self
            .client
            .post(url.clone())
            .json(event)
            .send()
            .await
            .map_err(map_reqwest)?;

        if !response.status().is_success() {
            return Err(parse_error_response(response).await.into());
        }

        Ok(())
    }
}
