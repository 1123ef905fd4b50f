//! Shared fixtures for engine tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::Value;
use tempfile::TempDir;

use recsync_core::error::{HttpStatusError, StoreError, UpstreamError};
use recsync_core::{
    ActionPage, ActionRunner, ChangeNotifier, Connection, CustomerId, ListPage, ListQuery,
    OutboundEvent, Record, RecordId, RecordKey, RecordStore, RecordType, Result, StoredRecord,
};
use recsync_file::FileStore;

use crate::CancelSignal;

pub fn temp_store() -> (TempDir, FileStore) {
    let dir = TempDir::new().unwrap();
    let store = FileStore::open(dir.path()).unwrap();
    (dir, store)
}

pub fn customer(id: &str) -> CustomerId {
    CustomerId::new(id).unwrap()
}

pub fn record_type(name: &str) -> RecordType {
    RecordType::new(name).unwrap()
}

pub fn record(customer_id: &str, record_type_name: &str, raw: Value) -> Record {
    Record::from_source(customer(customer_id), record_type(record_type_name), raw).unwrap()
}

enum Script {
    Pages(Vec<Vec<Value>>),
    Endless,
    FailAt(usize),
}

/// An [`ActionRunner`] that replays canned pages. Cursors are page indexes.
#[derive(Default)]
pub struct ScriptedActions {
    connections: Vec<Connection>,
    scripts: HashMap<String, Script>,
    cancel_after: Option<(usize, CancelSignal)>,
    calls: AtomicUsize,
    cursors: Mutex<Vec<(String, Option<String>)>>,
    customer_names: Mutex<Vec<Option<String>>>,
}

impl ScriptedActions {
    pub fn new() -> Self {
        Self {
            connections: vec![Connection {
                id: "conn-1".to_string(),
                name: Some("CRM".to_string()),
                integration_key: Some("crm".to_string()),
            }],
            ..Self::default()
        }
    }

    pub fn without_connections() -> Self {
        Self::default()
    }

    pub fn pages(mut self, record_type_name: &str, pages: Vec<Vec<Value>>) -> Self {
        self.scripts
            .insert(record_type(record_type_name).to_string(), Script::Pages(pages));
        self
    }

    pub fn endless(mut self, record_type_name: &str) -> Self {
        self.scripts
            .insert(record_type(record_type_name).to_string(), Script::Endless);
        self
    }

    pub fn fail_at(mut self, record_type_name: &str, page: usize) -> Self {
        self.scripts
            .insert(record_type(record_type_name).to_string(), Script::FailAt(page));
        self
    }

    /// Fire `signal` once `calls` pages have been served.
    pub fn cancel_after(mut self, calls: usize, signal: CancelSignal) -> Self {
        self.cancel_after = Some((calls, signal));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn cursors(&self) -> Vec<(String, Option<String>)> {
        self.cursors.lock().unwrap().clone()
    }

    /// The customer name passed with each action call.
    pub fn customer_names(&self) -> Vec<Option<String>> {
        self.customer_names.lock().unwrap().clone()
    }
}

#[async_trait]
impl ActionRunner for ScriptedActions {
    async fn connections(&self, _customer_id: &CustomerId) -> Result<Vec<Connection>> {
        Ok(self.connections.clone())
    }

    async fn run_action(
        &self,
        _customer_id: &CustomerId,
        customer_name: Option<&str>,
        _connection_id: &str,
        record_type: &RecordType,
        cursor: Option<&str>,
    ) -> Result<ActionPage> {
        let served = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.customer_names
            .lock()
            .unwrap()
            .push(customer_name.map(str::to_string));
        self.cursors
            .lock()
            .unwrap()
            .push((record_type.to_string(), cursor.map(str::to_string)));

        if let Some((after, signal)) = &self.cancel_after
            && served >= *after
        {
            signal.cancel();
        }

        let index: usize = cursor.map(|c| c.parse().unwrap()).unwrap_or(0);

        match self.scripts.get(record_type.as_str()) {
            Some(Script::Pages(pages)) => {
                let records = pages.get(index).cloned().unwrap_or_default();
                let cursor = (index + 1 < pages.len()).then(|| (index + 1).to_string());
                Ok(ActionPage { records, cursor })
            }
            Some(Script::Endless) => Ok(ActionPage {
                records: vec![serde_json::json!({"id": format!("e{index}")})],
                cursor: Some((index + 1).to_string()),
            }),
            Some(Script::FailAt(page)) if *page == index => Err(HttpStatusError::new(
                502,
                Some("bad gateway".to_string()),
            )
            .into()),
            Some(Script::FailAt(_)) => Ok(ActionPage {
                records: vec![serde_json::json!({"id": format!("f{index}")})],
                cursor: Some((index + 1).to_string()),
            }),
            None => Err(UpstreamError::Malformed {
                message: format!("no script for {record_type}"),
            }
            .into()),
        }
    }
}

/// A [`ChangeNotifier`] that records every event, optionally failing.
#[derive(Default)]
pub struct RecordingNotifier {
    pub events: Mutex<Vec<OutboundEvent>>,
    pub fail: bool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn events(&self) -> Vec<OutboundEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChangeNotifier for RecordingNotifier {
    async fn notify(&self, event: &OutboundEvent) -> Result<()> {
        if self.fail {
            return Err(HttpStatusError::new(500, Some("webhook down".to_string())).into());
        }
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

/// A [`FileStore`] whose upserts fail for chosen record ids.
pub struct FailingStore {
    inner: FileStore,
    fail_ids: Vec<String>,
}

impl FailingStore {
    pub fn new(inner: FileStore, fail_ids: &[&str]) -> Self {
        Self {
            inner,
            fail_ids: fail_ids.iter().map(|id| id.to_string()).collect(),
        }
    }

    pub fn inner(&self) -> &FileStore {
        &self.inner
    }
}

#[async_trait]
impl RecordStore for FailingStore {
    async fn find(&self, key: &RecordKey) -> Result<Option<StoredRecord>> {
        self.inner.find(key).await
    }

    async fn find_one(
        &self,
        customer_id: &CustomerId,
        id: &RecordId,
    ) -> Result<Option<StoredRecord>> {
        self.inner.find_one(customer_id, id).await
    }

    async fn upsert(&self, record: Record) -> Result<StoredRecord> {
        if self.fail_ids.iter().any(|id| id == record.id.as_str()) {
            return Err(StoreError::Io {
                message: "disk full".to_string(),
            }
            .into());
        }
        self.inner.upsert(record).await
    }

    async fn list(&self, query: &ListQuery) -> Result<ListPage> {
        self.inner.list(query).await
    }

    async fn delete(&self, key: &RecordKey) -> Result<bool> {
        self.inner.delete(key).await
    }
}
