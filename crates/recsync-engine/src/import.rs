//! Cursor-paginated bulk import from the external action API.

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::{StreamExt, stream};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info, instrument, warn};

use recsync_core::error::UpstreamError;
use recsync_core::{
    ActionRunner, ChangeKind, CustomerId, Error, Record, RecordStore, RecordType, Result,
};

use crate::apply::apply;
use crate::cancel::CancelSignal;

/// Tuning knobs for the importer.
#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Pages fetched per type before the import is abandoned.
    pub max_pages: u32,
    /// Record types imported at once by [`Importer::import_all`].
    pub type_concurrency: usize,
    /// Upserts in flight at once within one page.
    pub write_concurrency: usize,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            max_pages: 1000,
            type_concurrency: 4,
            write_concurrency: 16,
        }
    }
}

/// How an import run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportStatus {
    /// The action stopped returning cursors.
    Completed,
    /// The cancel signal fired between pages.
    Cancelled,
}

/// A record that could not be normalized or written.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordFailure {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_id: Option<String>,
    pub error: String,
}

/// Outcome of importing one record type.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub record_type: RecordType,
    pub connection_id: String,
    pub status: ImportStatus,
    /// Pages fetched, including empty ones.
    pub pages: u32,
    /// Non-empty pages processed.
    pub batches: u32,
    /// Raw records received across all pages.
    pub records_count: u64,
    pub created: u64,
    pub updated: u64,
    pub unchanged: u64,
    pub failures: Vec<RecordFailure>,
}

impl ImportReport {
    fn new(record_type: RecordType, connection_id: &str) -> Self {
        Self {
            record_type,
            connection_id: connection_id.to_string(),
            status: ImportStatus::Completed,
            pages: 0,
            batches: 0,
            records_count: 0,
            created: 0,
            updated: 0,
            unchanged: 0,
            failures: Vec::new(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.status == ImportStatus::Completed
    }

    pub fn failed(&self) -> u64 {
        self.failures.len() as u64
    }

    fn record(&mut self, change: ChangeKind) {
        match change {
            ChangeKind::Created => self.created += 1,
            ChangeKind::Updated => self.updated += 1,
            ChangeKind::Unchanged => self.unchanged += 1,
        }
    }
}

/// Result for one type of a multi-type import.
#[derive(Debug)]
pub struct TypeResult {
    pub record_type: RecordType,
    pub outcome: Result<ImportReport>,
}

/// Drives external paginated actions into the record store.
pub struct Importer<S: ?Sized, A: ?Sized> {
    store: Arc<S>,
    actions: Arc<A>,
    options: ImportOptions,
}

impl<S: ?Sized, A: ?Sized> Clone for Importer<S, A> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            actions: Arc::clone(&self.actions),
            options: self.options.clone(),
        }
    }
}

impl<S, A> Importer<S, A>
where
    S: RecordStore + ?Sized,
    A: ActionRunner + ?Sized,
{
    pub fn new(store: Arc<S>, actions: Arc<A>, options: ImportOptions) -> Self {
        Self {
            store,
            actions,
            options,
        }
    }

    pub fn options(&self) -> &ImportOptions {
        &self.options
    }

    /// Import one record type using the customer's first connection.
    ///
    /// # Errors
    ///
    /// Returns `Upstream(NoConnection)` when the customer has no connection,
    /// or the error of the first failing page fetch. Pages written before
    /// the failure stay committed.
    #[instrument(skip(self, cancel), fields(customer = %customer_id, record_type = %record_type))]
    pub async fn import(
        &self,
        customer_id: &CustomerId,
        record_type: &RecordType,
        cancel: &CancelSignal,
    ) -> Result<ImportReport> {
        let connections = self.actions.connections(customer_id).await?;
        let connection = connections
            .into_iter()
            .next()
            .ok_or_else(|| UpstreamError::NoConnection {
                customer_id: customer_id.to_string(),
            })?;

        debug!(connection = %connection.id, "Using first connection");
        self.import_from(customer_id, None, &connection.id, record_type, cancel)
            .await
    }

    /// Import several record types from one connection.
    ///
    /// Types run concurrently up to `type_concurrency`. A failing type is
    /// reported in its own [`TypeResult`] and never aborts the others.
    /// Results keep the order of `record_types`. `customer_name`, when
    /// known, is passed on with every action call.
    #[instrument(skip(self, record_types, cancel), fields(customer = %customer_id, connection = connection_id))]
    pub async fn import_all(
        &self,
        customer_id: &CustomerId,
        customer_name: Option<&str>,
        connection_id: &str,
        record_types: &[RecordType],
        cancel: &CancelSignal,
    ) -> Vec<TypeResult> {
        let results: Vec<TypeResult> = stream::iter(record_types.iter().cloned())
            .map(|record_type| async move {
                let outcome = self
                    .import_from(customer_id, customer_name, connection_id, &record_type, cancel)
                    .await;
                if let Err(e) = &outcome {
                    error!(record_type = %record_type, error = %e, "Import failed");
                }
                TypeResult {
                    record_type,
                    outcome,
                }
            })
            .buffered(self.options.type_concurrency.max(1))
            .collect()
            .await;

        let failed = results.iter().filter(|r| r.outcome.is_err()).count();
        info!(types = results.len(), failed, "Import-all finished");
        results
    }

    /// Page through one action until it stops returning a cursor.
    async fn import_from(
        &self,
        customer_id: &CustomerId,
        customer_name: Option<&str>,
        connection_id: &str,
        record_type: &RecordType,
        cancel: &CancelSignal,
    ) -> Result<ImportReport> {
        let mut report = ImportReport::new(record_type.clone(), connection_id);
        let mut cursor: Option<String> = None;

        loop {
            if cancel.is_cancelled() {
                warn!(
                    customer = %customer_id,
                    record_type = %record_type,
                    pages = report.pages,
                    "Import cancelled between pages"
                );
                report.status = ImportStatus::Cancelled;
                return Ok(report);
            }

            let page = self
                .actions
                .run_action(
                    customer_id,
                    customer_name,
                    connection_id,
                    record_type,
                    cursor.as_deref(),
                )
                .await?;
            report.pages += 1;
            report.records_count += page.records.len() as u64;

            debug!(
                record_type = %record_type,
                page = report.pages,
                records = page.records.len(),
                "Fetched page"
            );

            if !page.records.is_empty() {
                report.batches += 1;
                self.write_batch(customer_id, record_type, page.records, &mut report)
                    .await;
            }

            cursor = page.cursor.filter(|c| !c.is_empty());
            if cursor.is_none() {
                break;
            }

            if report.pages >= self.options.max_pages {
                return Err(UpstreamError::PageLimitExceeded {
                    record_type: record_type.to_string(),
                    max_pages: self.options.max_pages,
                }
                .into());
            }
        }

        info!(
            customer = %customer_id,
            record_type = %record_type,
            pages = report.pages,
            records = report.records_count,
            created = report.created,
            updated = report.updated,
            unchanged = report.unchanged,
            failed = report.failed(),
            "Import completed"
        );
        Ok(report)
    }

    /// Normalize and apply one page. Failures are collected per record.
    ///
    /// A page repeating an id is applied once, with the last occurrence.
    async fn write_batch(
        &self,
        customer_id: &CustomerId,
        record_type: &RecordType,
        raw: Vec<Value>,
        report: &mut ImportReport,
    ) {
        let mut records: Vec<Record> = Vec::with_capacity(raw.len());
        let mut positions: HashMap<String, usize> = HashMap::new();
        for value in raw {
            let record_id = value.get("id").map(display_id);
            match Record::from_source(customer_id.clone(), record_type.clone(), value) {
                Ok(record) => match positions.get(record.id.as_str()) {
                    Some(&at) => {
                        debug!(record_id = %record.id, "Duplicate id in page, keeping the last");
                        records[at] = record;
                    }
                    None => {
                        positions.insert(record.id.to_string(), records.len());
                        records.push(record);
                    }
                },
                Err(e) => fail(report, record_type, record_id, e),
            }
        }

        let store = &*self.store;
        let outcomes: Vec<(String, Result<ChangeKind>)> = stream::iter(records)
            .map(|record| async move {
                let id = record.id.to_string();
                (id, apply(store, record).await.map(|applied| applied.change))
            })
            .buffer_unordered(self.options.write_concurrency.max(1))
            .collect()
            .await;

        for (id, outcome) in outcomes {
            match outcome {
                Ok(change) => report.record(change),
                Err(e) => fail(report, record_type, Some(id), e),
            }
        }
    }
}

fn fail(report: &mut ImportReport, record_type: &RecordType, record_id: Option<String>, e: Error) {
    warn!(
        record_type = %record_type,
        record_id = record_id.as_deref().unwrap_or("-"),
        error = %e,
        "Skipping record"
    );
    report.failures.push(RecordFailure {
        record_id,
        error: e.to_string(),
    });
}

fn display_id(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FailingStore, ScriptedActions, customer, record_type, temp_store};
    use recsync_core::{ListQuery, RecordId, SearchFilter};
    use recsync_file::FileStore;
    use serde_json::json;

    fn importer(
        store: FileStore,
        actions: ScriptedActions,
    ) -> (Importer<FileStore, ScriptedActions>, Arc<FileStore>, Arc<ScriptedActions>) {
        let store = Arc::new(store);
        let actions = Arc::new(actions);
        let importer = Importer::new(
            Arc::clone(&store),
            Arc::clone(&actions),
            ImportOptions::default(),
        );
        (importer, store, actions)
    }

    async fn count(store: &FileStore, customer_id: &str, record_type_name: &str) -> usize {
        store
            .list(&ListQuery {
                customer_id: customer(customer_id),
                record_type: record_type(record_type_name),
                filter: None,
                offset: 0,
                limit: 10_000,
            })
            .await
            .unwrap()
            .records
            .len()
    }

    #[tokio::test]
    async fn n_pages_make_n_batches() {
        let (_dir, store) = temp_store();
        let actions = ScriptedActions::new().pages(
            "contacts",
            vec![
                vec![json!({"id": 1}), json!({"id": 2})],
                vec![json!({"id": 3})],
                vec![json!({"id": 4}), json!({"id": 5})],
                vec![],
            ],
        );
        let (importer, store, actions) = importer(store, actions);

        let report = importer
            .import(&customer("T1"), &record_type("get-contacts"), &CancelSignal::new())
            .await
            .unwrap();

        assert!(report.is_complete());
        assert_eq!(report.pages, 4);
        assert_eq!(report.batches, 3);
        assert_eq!(report.records_count, 5);
        assert_eq!(report.created, 5);
        assert_eq!(report.connection_id, "conn-1");
        assert_eq!(count(&store, "T1", "contacts").await, 5);

        let cursors: Vec<_> = actions.cursors().into_iter().map(|(_, c)| c).collect();
        assert_eq!(
            cursors,
            vec![None, Some("1".into()), Some("2".into()), Some("3".into())]
        );
    }

    #[tokio::test]
    async fn reimport_is_idempotent() {
        let (_dir, store) = temp_store();
        let actions = ScriptedActions::new().pages(
            "deals",
            vec![vec![
                json!({"id": "d1", "name": "Big", "fields": {"amount": 10}}),
                json!({"id": "d2", "name": "Small"}),
            ]],
        );
        let (importer, store, _) = importer(store, actions);
        let deals = record_type("deals");

        importer
            .import(&customer("T1"), &deals, &CancelSignal::new())
            .await
            .unwrap();
        let before = store.journal().unwrap().len();

        let second = importer
            .import(&customer("T1"), &deals, &CancelSignal::new())
            .await
            .unwrap();

        assert_eq!(second.unchanged, 2);
        assert_eq!(second.created + second.updated, 0);
        assert_eq!(store.journal().unwrap().len(), before);
        assert_eq!(count(&store, "T1", "deals").await, 2);
    }

    #[tokio::test]
    async fn source_updated_time_is_preserved() {
        let (_dir, store) = temp_store();
        let actions = ScriptedActions::new().pages(
            "leads",
            vec![vec![
                json!({"id": "l1", "updatedTime": "2024-03-20T15:30:00Z"}),
                json!({"id": "l2"}),
            ]],
        );
        let (importer, store, _) = importer(store, actions);

        importer
            .import(&customer("T1"), &record_type("leads"), &CancelSignal::new())
            .await
            .unwrap();

        let page = store
            .list(&ListQuery {
                customer_id: customer("T1"),
                record_type: record_type("leads"),
                filter: None,
                offset: 0,
                limit: 10,
            })
            .await
            .unwrap();
        assert_eq!(
            page.records[0].record.updated_time.as_deref(),
            Some("2024-03-20T15:30:00Z")
        );
        assert!(page.records[1].record.updated_time.is_some());
    }

    #[tokio::test]
    async fn bad_records_do_not_abort_the_batch() {
        let (_dir, store) = temp_store();
        let actions = ScriptedActions::new().pages(
            "companies",
            vec![vec![
                json!({"id": "ok-1", "fields": {"industry": "Retail"}}),
                json!({"name": "no id"}),
                json!({"id": "bad-fields", "fields": "nope"}),
                json!({"id": "ok-2"}),
            ]],
        );
        let (importer, store, _) = importer(store, actions);

        let report = importer
            .import(&customer("T1"), &record_type("companies"), &CancelSignal::new())
            .await
            .unwrap();

        assert_eq!(report.created, 2);
        assert_eq!(report.failed(), 2);
        assert_eq!(report.failures[1].record_id.as_deref(), Some("bad-fields"));
        assert_eq!(count(&store, "T1", "companies").await, 2);
    }

    #[tokio::test]
    async fn page_failure_keeps_earlier_pages() {
        let (_dir, store) = temp_store();
        let actions = ScriptedActions::new().fail_at("contacts", 2);
        let (importer, store, _) = importer(store, actions);

        let err = importer
            .import(&customer("T1"), &record_type("contacts"), &CancelSignal::new())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Upstream(UpstreamError::Http(_))));
        assert_eq!(count(&store, "T1", "contacts").await, 2);
    }

    #[tokio::test]
    async fn endless_cursor_hits_page_cap() {
        let (_dir, store) = temp_store();
        let store = Arc::new(store);
        let actions = Arc::new(ScriptedActions::new().endless("contacts"));
        let importer = Importer::new(
            Arc::clone(&store),
            Arc::clone(&actions),
            ImportOptions {
                max_pages: 5,
                ..ImportOptions::default()
            },
        );

        let err = importer
            .import(&customer("T1"), &record_type("contacts"), &CancelSignal::new())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::Upstream(UpstreamError::PageLimitExceeded { max_pages: 5, .. })
        ));
        assert_eq!(actions.calls(), 5);
        assert_eq!(count(&store, "T1", "contacts").await, 5);
    }

    #[tokio::test]
    async fn cancellation_stops_between_pages() {
        let (_dir, store) = temp_store();
        let cancel = CancelSignal::new();
        let actions = ScriptedActions::new()
            .endless("contacts")
            .cancel_after(3, cancel.clone());
        let (importer, store, actions) = importer(store, actions);

        let report = importer
            .import(&customer("T1"), &record_type("contacts"), &cancel)
            .await
            .unwrap();

        assert_eq!(report.status, ImportStatus::Cancelled);
        assert_eq!(report.pages, 3);
        assert_eq!(actions.calls(), 3);
        assert_eq!(count(&store, "T1", "contacts").await, 3);
    }

    #[tokio::test]
    async fn no_connection_is_an_upstream_error() {
        let (_dir, store) = temp_store();
        let (importer, _, actions) = importer(store, ScriptedActions::without_connections());

        let err = importer
            .import(&customer("T1"), &record_type("contacts"), &CancelSignal::new())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::Upstream(UpstreamError::NoConnection { .. })
        ));
        assert_eq!(actions.calls(), 0);
    }

    #[tokio::test]
    async fn import_all_isolates_failing_types() {
        let (_dir, store) = temp_store();
        let actions = ScriptedActions::new()
            .pages("leads", vec![vec![json!({"id": "l1"})]])
            .fail_at("deals", 0)
            .pages("contacts", vec![vec![json!({"id": "c1"}), json!({"id": "c2"})]])
            .pages("companies", vec![vec![]]);
        let (importer, store, actions) = importer(store, actions);

        let results = importer
            .import_all(
                &customer("T1"),
                Some("Tenant One"),
                "conn-9",
                &RecordType::defaults(),
                &CancelSignal::new(),
            )
            .await;

        let keys: Vec<_> = results.iter().map(|r| r.record_type.as_str()).collect();
        assert_eq!(
            keys,
            vec!["get-leads", "get-deals", "get-contacts", "get-companies"]
        );
        assert!(results[1].outcome.is_err());
        assert_eq!(results[2].outcome.as_ref().unwrap().records_count, 2);
        assert_eq!(results[2].outcome.as_ref().unwrap().connection_id, "conn-9");
        assert_eq!(results[3].outcome.as_ref().unwrap().batches, 0);
        assert_eq!(count(&store, "T1", "contacts").await, 2);
        assert_eq!(count(&store, "T1", "leads").await, 1);

        let names = actions.customer_names();
        assert_eq!(names.len(), 4);
        assert!(names.iter().all(|n| n.as_deref() == Some("Tenant One")));
    }

    #[tokio::test]
    async fn single_import_sends_no_customer_name() {
        let (_dir, store) = temp_store();
        let actions = ScriptedActions::new().pages("leads", vec![vec![json!({"id": "l1"})]]);
        let (importer, _, actions) = importer(store, actions);

        importer
            .import(&customer("T1"), &record_type("leads"), &CancelSignal::new())
            .await
            .unwrap();

        assert_eq!(actions.customer_names(), vec![None]);
    }

    #[tokio::test]
    async fn repeated_id_in_a_page_is_applied_once() {
        let (_dir, store) = temp_store();
        let actions = ScriptedActions::new().pages(
            "contacts",
            vec![vec![
                json!({"id": "c1", "name": "First"}),
                json!({"id": "c2"}),
                json!({"id": "c1", "name": "Second"}),
            ]],
        );
        let (importer, store, _) = importer(store, actions);

        let report = importer
            .import(&customer("T1"), &record_type("contacts"), &CancelSignal::new())
            .await
            .unwrap();

        assert_eq!(report.records_count, 3);
        assert_eq!(report.created, 2);
        assert_eq!(report.failed(), 0);
        assert_eq!(count(&store, "T1", "contacts").await, 2);

        let stored = store
            .find_one(&customer("T1"), &RecordId::new("c1").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.record.name.as_deref(), Some("Second"));
        assert_eq!(stored.version, 1);
    }

    #[tokio::test]
    async fn store_failure_is_collected_per_record() {
        let (_dir, store) = temp_store();
        let store = Arc::new(FailingStore::new(store, &["c2"]));
        let actions = Arc::new(ScriptedActions::new().pages(
            "contacts",
            vec![
                vec![json!({"id": "c1"}), json!({"id": "c2"}), json!({"id": "c3"})],
                vec![json!({"id": "c4"})],
            ],
        ));
        let importer = Importer::new(Arc::clone(&store), actions, ImportOptions::default());

        let report = importer
            .import(&customer("T1"), &record_type("contacts"), &CancelSignal::new())
            .await
            .unwrap();

        assert!(report.is_complete());
        assert_eq!(report.pages, 2);
        assert_eq!(report.created, 3);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.failures[0].record_id.as_deref(), Some("c2"));
        assert!(report.failures[0].error.contains("disk full"));
        assert_eq!(count(store.inner(), "T1", "contacts").await, 3);
    }

    #[tokio::test]
    async fn imports_are_scoped_to_the_customer() {
        let (_dir, store) = temp_store();
        let actions = ScriptedActions::new().pages(
            "companies",
            vec![vec![json!({"id": "x", "fields": {"industry": "Retail"}})]],
        );
        let (importer, store, _) = importer(store, actions);

        for tenant in ["A", "B"] {
            importer
                .import(&customer(tenant), &record_type("companies"), &CancelSignal::new())
                .await
                .unwrap();
        }

        let page = store
            .list(&ListQuery {
                customer_id: customer("A"),
                record_type: record_type("companies"),
                filter: SearchFilter::parse(Some("retail")),
                offset: 0,
                limit: 100,
            })
            .await
            .unwrap();
        assert_eq!(page.records.len(), 1);
        assert!(page.records.iter().all(|r| r.record.customer_id.as_str() == "A"));
    }
}
