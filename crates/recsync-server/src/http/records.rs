//! `/records` handlers.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use recsync_core::error::InvalidInputError;
use recsync_core::{ChangeKind, CustomerId, Record, RecordId, RecordType, StoredRecord};
use recsync_engine::{ImportReport, ImportStatus, QueryPage, RecordPatch};

use super::extractors::Customer;
use super::{ApiError, AppState};

/// The event type that triggers a full import.
const CONNECTION_CREATED: &str = "connection.created";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/records", get(list_records).post(create_record))
        .route("/records/import", get(import_records))
        .route("/records/import-all", post(import_all))
        .route(
            "/records/{id}",
            get(get_record).put(update_record).delete(delete_record),
        )
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub action: Option<String>,
    pub cursor: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ActionParams {
    pub action: Option<String>,
}

fn required_action(action: Option<&str>) -> Result<RecordType, ApiError> {
    let action = action
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .ok_or_else(|| InvalidInputError::missing("action"))?;
    Ok(RecordType::new(action)?)
}

async fn list_records(
    State(state): State<AppState>,
    Customer(customer): Customer,
    Query(params): Query<ListParams>,
) -> Result<Json<QueryPage>, ApiError> {
    let record_type = required_action(params.action.as_deref())?;
    let page = state
        .query()
        .await?
        .list(
            &customer,
            &record_type,
            params.cursor.as_deref(),
            params.search.as_deref(),
        )
        .await?;
    Ok(Json(page))
}

async fn get_record(
    State(state): State<AppState>,
    Customer(customer): Customer,
    Path(id): Path<String>,
) -> Result<Json<StoredRecord>, ApiError> {
    let id = RecordId::new(id)?;
    let record = state.query().await?.get(&customer, &id).await?;
    Ok(Json(record))
}

#[derive(Debug, Serialize)]
struct CreateResponse {
    success: bool,
    record: Record,
}

async fn create_record(
    State(state): State<AppState>,
    Customer(customer): Customer,
    Query(params): Query<ActionParams>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<CreateResponse>, ApiError> {
    let record_type = required_action(params.action.as_deref())?;
    let Json(data) = body?;

    let record = state
        .editor()
        .await?
        .create(&customer, &record_type, data)
        .await?;

    Ok(Json(CreateResponse {
        success: true,
        record,
    }))
}

#[derive(Debug, Serialize)]
struct UpdateResponse {
    success: bool,
    status: ChangeKind,
    record: StoredRecord,
}

async fn update_record(
    State(state): State<AppState>,
    Customer(customer): Customer,
    Path(id): Path<String>,
    body: Result<Json<RecordPatch>, JsonRejection>,
) -> Result<Json<UpdateResponse>, ApiError> {
    let id = RecordId::new(id)?;
    let Json(patch) = body?;

    let applied = state.editor().await?.update(&customer, &id, patch).await?;

    Ok(Json(UpdateResponse {
        success: true,
        status: applied.change,
        record: applied.record,
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DeleteResponse {
    success: bool,
    record_id: RecordId,
}

async fn delete_record(
    State(state): State<AppState>,
    Customer(customer): Customer,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let id = RecordId::new(id)?;
    let deleted = state.editor().await?.delete(&customer, &id).await?;

    Ok(Json(DeleteResponse {
        success: true,
        record_id: deleted.record.id,
    }))
}

#[derive(Debug, Serialize)]
struct ImportResponse {
    success: bool,
    #[serde(flatten)]
    report: ImportReport,
}

async fn import_records(
    State(state): State<AppState>,
    Customer(customer): Customer,
    Query(params): Query<ActionParams>,
) -> Result<Json<ImportResponse>, ApiError> {
    let record_type = required_action(params.action.as_deref())?;

    let report = state
        .importer()
        .await?
        .import(&customer, &record_type, &state.cancel_signal())
        .await?;

    Ok(Json(ImportResponse {
        success: report.is_complete(),
        report,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionEvent {
    #[serde(default)]
    pub event_type: Option<String>,
    #[serde(default)]
    pub data: Option<ConnectionEventData>,
}

#[derive(Debug, Deserialize)]
pub struct ConnectionEventData {
    #[serde(default)]
    pub connection: Option<EventConnection>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventConnection {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub user: Option<EventUser>,
    #[serde(default)]
    pub integration: Option<EventIntegration>,
}

#[derive(Debug, Deserialize)]
pub struct EventUser {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EventIntegration {
    #[serde(default)]
    pub key: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TypeResultBody {
    action_key: RecordType,
    #[serde(skip_serializing_if = "Option::is_none")]
    records_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<ImportStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImportAllResponse {
    success: bool,
    connection_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    integration_key: Option<String>,
    results: Vec<TypeResultBody>,
}

async fn import_all(
    State(state): State<AppState>,
    body: Result<Json<ConnectionEvent>, JsonRejection>,
) -> Result<Json<ImportAllResponse>, ApiError> {
    let Json(event) = body?;

    if event.event_type.as_deref() != Some(CONNECTION_CREATED) {
        return Err(InvalidInputError::Other {
            message: format!(
                "invalid event type '{}'",
                event.event_type.as_deref().unwrap_or_default()
            ),
        }
        .into());
    }

    let connection = event
        .data
        .and_then(|d| d.connection)
        .ok_or_else(|| InvalidInputError::missing("data.connection"))?;
    let connection_id = connection
        .id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| InvalidInputError::missing("data.connection.id"))?;
    let customer = connection
        .user_id
        .ok_or_else(|| InvalidInputError::missing("data.connection.userId"))?;
    let customer = CustomerId::new(customer)?;
    let integration_key = connection.integration.and_then(|i| i.key);
    let customer_name = connection.user.and_then(|u| u.name);

    info!(
        customer = %customer,
        connection = %connection_id,
        integration = integration_key.as_deref().unwrap_or("-"),
        "Connection created, importing all record types"
    );

    let results = state
        .importer()
        .await?
        .import_all(
            &customer,
            customer_name.as_deref(),
            &connection_id,
            state.import_types(),
            &state.cancel_signal(),
        )
        .await;

    let results = results
        .into_iter()
        .map(|result| match result.outcome {
            Ok(report) => TypeResultBody {
                action_key: result.record_type,
                records_count: Some(report.records_count),
                status: Some(report.status),
                error: None,
            },
            Err(e) => TypeResultBody {
                action_key: result.record_type,
                records_count: None,
                status: None,
                error: Some(e.to_string()),
            },
        })
        .collect();

    Ok(Json(ImportAllResponse {
        success: true,
        connection_id,
        integration_key,
        results,
    }))
}
