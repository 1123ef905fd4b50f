//! [`ActionRunner`] backed by the external integration API.

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, instrument};

use recsync_core::error::UpstreamError;
use recsync_core::{ActionPage, ActionRunner, Connection, CustomerId, RecordType, Result};

use crate::client::ApiClient;
use crate::endpoints::{ConnectionsResponse, RunActionInput, RunActionResponse};
use crate::token::TokenIssuer;

/// Calls the integration API on behalf of each customer.
#[derive(Debug, Clone)]
pub struct IntegrationActions {
    client: ApiClient,
    tokens: TokenIssuer,
}

impl IntegrationActions {
    pub fn new(client: ApiClient, tokens: TokenIssuer) -> Self {
        Self { client, tokens }
    }
}

#[async_trait]
impl ActionRunner for IntegrationActions {
    #[instrument(skip(self), fields(customer = %customer_id))]
    async fn connections(&self, customer_id: &CustomerId) -> Result<Vec<Connection>> {
        let token = self.tokens.issue(customer_id, None)?;
        let response: ConnectionsResponse =
            self.client.get_authed(&["connections"], &token).await?;

        let connections = response
            .items
            .into_iter()
            .map(|item| Connection {
                id: item.id,
                name: item.name,
                integration_key: item.integration.and_then(|i| i.key),
            })
            .collect::<Vec<_>>();

        debug!(count = connections.len(), "Fetched connections");
        Ok(connections)
    }

    #[instrument(skip(self), fields(customer = %customer_id, record_type = %record_type))]
    async fn run_action(
        &self,
        customer_id: &CustomerId,
        customer_name: Option<&str>,
        connection_id: &str,
        record_type: &RecordType,
        cursor: Option<&str>,
    ) -> Result<ActionPage> {
        let token = self.tokens.issue(customer_id, customer_name)?;
        let input = cursor
            .filter(|c| !c.is_empty())
            .map(|cursor| RunActionInput { cursor });

        let response: RunActionResponse = self
            .client
            .post_authed(
                &[
                    "connections",
                    connection_id,
                    "actions",
                    record_type.as_str(),
                    "run",
                ],
                &input,
                &token,
            )
            .await?;

        let output = response.output.ok_or_else(|| UpstreamError::Malformed {
            message: "action response has no output".to_string(),
        })?;
        let records = output.records.unwrap_or_default();

        let cursor = match output.cursor {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s.is_empty() => None,
            Some(Value::String(s)) => Some(s),
            Some(Value::Number(n)) => Some(n.to_string()),
            Some(other) => {
                return Err(UpstreamError::Malformed {
                    message: format!("unexpected cursor value: {}", other),
                }
                .into());
            }
        };

        debug!(records = records.len(), has_cursor = cursor.is_some(), "Fetched page");
        Ok(ActionPage { records, cursor })
    }
}
