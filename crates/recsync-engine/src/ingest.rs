//! Single-record push events from the external system.

use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, instrument};

use recsync_core::error::InvalidInputError;
use recsync_core::{ChangeKind, CustomerId, Record, RecordId, RecordStore, RecordType, Result};

use crate::apply::apply;
use crate::auth::TenantResolver;

/// What a webhook call did.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestOutcome {
    pub record_id: RecordId,
    pub customer_id: CustomerId,
    pub record_type: RecordType,
    pub status: ChangeKind,
}

/// Authenticates, validates and applies webhook events.
pub struct WebhookIngest<S: ?Sized> {
    store: Arc<S>,
    tenants: TenantResolver,
}

impl<S: ?Sized> Clone for WebhookIngest<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            tenants: self.tenants.clone(),
        }
    }
}

impl<S> WebhookIngest<S>
where
    S: RecordStore + ?Sized,
{
    pub fn new(store: Arc<S>, tenants: TenantResolver) -> Self {
        Self { store, tenants }
    }

    /// Process one event of the shape
    /// `{"customerId"?, "recordType", "data": {"id", ...}}`.
    ///
    /// The tenant comes from `token` and/or the payload's `customerId`.
    /// `updatedTime` is stamped with the current instant on every accepted
    /// write; an identical replay reports `unchanged` and writes nothing.
    ///
    /// # Errors
    ///
    /// `Unauthorized` before any validation when no tenant resolves,
    /// `BadRequest` when `recordType` or `data.id` is missing.
    #[instrument(skip_all)]
    pub async fn handle(&self, token: Option<&str>, payload: &Value) -> Result<IngestOutcome> {
        let payload_customer = payload.get("customerId").and_then(scalar_string);
        let customer_id = self
            .tenants
            .resolve(token, payload_customer.as_deref())?;

        let record_type = payload
            .get("recordType")
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| InvalidInputError::missing("recordType"))?;
        let record_type = RecordType::new(record_type)?;

        let data = match payload.get("data") {
            Some(data @ Value::Object(_)) => data.clone(),
            _ => return Err(InvalidInputError::missing("data").into()),
        };

        let mut record = Record::from_source(customer_id.clone(), record_type.clone(), data)?;
        record.updated_time = Some(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true));

        let applied = apply(&*self.store, record).await?;
        let outcome = IngestOutcome {
            record_id: applied.record.record.id,
            customer_id,
            record_type,
            status: applied.change,
        };

        info!(
            customer = %outcome.customer_id,
            record_type = %outcome.record_type,
            record_id = %outcome.record_id,
            status = %outcome.status,
            "Webhook applied"
        );
        Ok(outcome)
    }
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
