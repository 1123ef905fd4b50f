//! External paginated action trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Result;
use crate::types::{CustomerId, RecordType};

/// A customer's connection to an external application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integration_key: Option<String>,
}

/// One page returned by an external action.
#[derive(Debug, Clone, Default)]
pub struct ActionPage {
    /// Raw records, not yet normalized.
    pub records: Vec<Value>,

    /// Cursor for the next page; `None` when the action is exhausted.
    pub cursor: Option<String>,
}

/// The external "run action" API, treated as an opaque paginated source.
#[async_trait]
pub trait ActionRunner: Send + Sync {
    /// List the customer's connections.
    async fn connections(&self, customer_id: &CustomerId) -> Result<Vec<Connection>>;

    /// Run the action for `record_type` on a connection, starting at `cursor`.
    ///
    /// `customer_name` is forwarded to the external system when known.
    async fn run_action(
        &self,
        customer_id: &CustomerId,
        customer_name: Option<&str>,
        connection_id: &str,
        record_type: &RecordType,
        cursor: Option<&str>,
    ) -> Result<ActionPage>;
}
