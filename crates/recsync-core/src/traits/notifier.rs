//! Outbound change notification trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Result;
use crate::types::{CustomerId, RecordType};

/// The kind of local edit being reported to the external system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Created,
    Updated,
    Deleted,
}

/// A UI-driven change to push to the external system.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    /// The bare entity name, e.g. `contacts`.
    #[serde(serialize_with = "serialize_entity")]
    pub record_type: RecordType,
    pub customer_id: CustomerId,
    pub data: Value,
}

fn serialize_entity<S>(
    record_type: &RecordType,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(record_type.entity())
}

/// Delivers local edits to the external system.
#[async_trait]
pub trait ChangeNotifier: Send + Sync {
    async fn notify(&self, event: &OutboundEvent) -> Result<()>;
}
