//! External API request/response types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Error body returned by the external API.
#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Response from `GET /connections`.
#[derive(Debug, Deserialize)]
pub struct ConnectionsResponse {
    #[serde(default)]
    pub items: Vec<ConnectionItem>,
}

#[derive(Debug, Deserialize)]
pub struct ConnectionItem {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub integration: Option<IntegrationRef>,
}

#[derive(Debug, Deserialize)]
pub struct IntegrationRef {
    #[serde(default)]
    pub key: Option<String>,
}

/// Input for `POST /connections/{id}/actions/{key}/run`. Serialized as
/// `null` on the first page.
#[derive(Debug, Serialize)]
pub struct RunActionInput<'a> {
    pub cursor: &'a str,
}

/// Response from running an action.
#[derive(Debug, Deserialize)]
pub struct RunActionResponse {
    pub output: Option<RunActionOutput>,
}

#[derive(Debug, Deserialize)]
pub struct RunActionOutput {
    #[serde(default)]
    pub records: Option<Vec<Value>>,
    #[serde(default)]
    pub cursor: Option<Value>,
}
