//! UI-driven edits, reported to the external system.

use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{info, instrument};

use recsync_core::error::{InvalidInputError, StoreError};
use recsync_core::{
    ChangeNotifier, CustomerId, Error, EventKind, OutboundEvent, Record, RecordId, RecordStore,
    RecordType, Result, StoredRecord,
};

use crate::apply::{Applied, apply};

/// Changes to apply to an existing record. `null` field values remove the
/// field.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecordPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

/// Creates, updates and deletes records on behalf of a user.
///
/// Every edit is announced through the [`ChangeNotifier`] first; if the
/// notification fails, the local mirror is left untouched.
pub struct RecordEditor<S: ?Sized, N: ?Sized> {
    store: Arc<S>,
    notifier: Arc<N>,
}

impl<S: ?Sized, N: ?Sized> Clone for RecordEditor<S, N> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            notifier: Arc::clone(&self.notifier),
        }
    }
}

impl<S, N> RecordEditor<S, N>
where
    S: RecordStore + ?Sized,
    N: ChangeNotifier + ?Sized,
{
    pub fn new(store: Arc<S>, notifier: Arc<N>) -> Self {
        Self { store, notifier }
    }

    /// Announce a new record to the external system.
    ///
    /// The record gets a provisional `temp_<millis>` id unless `data`
    /// carries one. It is not stored locally: the mirror picks it up when
    /// the external system pushes it back through the webhook.
    #[instrument(skip(self, data), fields(customer = %customer_id, record_type = %record_type))]
    pub async fn create(
        &self,
        customer_id: &CustomerId,
        record_type: &RecordType,
        data: Value,
    ) -> Result<Record> {
        let Value::Object(mut data) = data else {
            return Err(InvalidInputError::Other {
                message: "record must be a JSON object".to_string(),
            }
            .into());
        };

        let now = Utc::now();
        if data.get("id").is_none_or(Value::is_null) {
            data.insert(
                "id".to_string(),
                Value::String(format!("temp_{}", now.timestamp_millis())),
            );
        }
        data.insert(
            "createdTime".to_string(),
            Value::String(now.to_rfc3339_opts(SecondsFormat::Millis, true)),
        );

        let record = Record::from_source(customer_id.clone(), record_type.clone(), Value::Object(data))?;
        self.announce(EventKind::Created, &record).await?;

        info!(record_id = %record.id, "Record creation sent");
        Ok(record)
    }

    /// Merge `patch` into a stored record, announce it, then apply it
    /// locally through change detection.
    #[instrument(skip(self, patch), fields(customer = %customer_id, record_id = %id))]
    pub async fn update(
        &self,
        customer_id: &CustomerId,
        id: &RecordId,
        patch: RecordPatch,
    ) -> Result<Applied> {
        let stored = self.load(customer_id, id).await?;

        let mut record = stored.record;
        if let Some(name) = patch.name {
            record.name = Some(name);
        }
        for (key, value) in patch.fields {
            if value.is_null() {
                record.fields.remove(&key);
            } else {
                record.fields.insert(key, value);
            }
        }
        record.updated_time = Some(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true));

        self.announce(EventKind::Updated, &record).await?;
        let applied = apply(&*self.store, record).await?;

        info!(status = %applied.change, "Record update applied");
        Ok(applied)
    }

    /// Announce a deletion, then remove the local copy.
    #[instrument(skip(self), fields(customer = %customer_id, record_id = %id))]
    pub async fn delete(&self, customer_id: &CustomerId, id: &RecordId) -> Result<StoredRecord> {
        let stored = self.load(customer_id, id).await?;

        self.announce(EventKind::Deleted, &stored.record).await?;
        self.store.delete(&stored.record.key()).await?;

        info!("Record deleted");
        Ok(stored)
    }

    async fn load(&self, customer_id: &CustomerId, id: &RecordId) -> Result<StoredRecord> {
        self.store
            .find_one(customer_id, id)
            .await?
            .ok_or_else(|| Error::not_found(format!("{}/{}", customer_id, id)))
    }

    async fn announce(&self, kind: EventKind, record: &Record) -> Result<()> {
        let data = serde_json::to_value(record).map_err(|e| StoreError::Serialization {
            message: e.to_string(),
        })?;

        self.notifier
            .notify(&OutboundEvent {
                kind,
                record_type: record.record_type.clone(),
                customer_id: record.customer_id.clone(),
                data,
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingNotifier, customer, record, record_type, temp_store};
    use recsync_core::ChangeKind;
    use recsync_file::FileStore;
    use serde_json::json;

    fn editor(
        store: FileStore,
        notifier: RecordingNotifier,
    ) -> (
        RecordEditor<FileStore, RecordingNotifier>,
        Arc<FileStore>,
        Arc<RecordingNotifier>,
    ) {
        let store = Arc::new(store);
        let notifier = Arc::new(notifier);
        (
            RecordEditor::new(Arc::clone(&store), Arc::clone(&notifier)),
            store,
            notifier,
        )
    }

    #[tokio::test]
    async fn create_assigns_provisional_id_and_notifies() {
        let (_dir, store) = temp_store();
        let (editor, store, notifier) = editor(store, RecordingNotifier::default());

        let created = editor
            .create(
                &customer("T1"),
                &record_type("contacts"),
                json!({"name": "Jane", "fields": {"email": "jane@example.com"}}),
            )
            .await
            .unwrap();

        assert!(created.id.as_str().starts_with("temp_"));
        assert!(created.created_time.is_some());

        let events = notifier.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::Created);
        assert_eq!(events[0].data["name"], "Jane");

        let found = store.find_one(&customer("T1"), &created.id).await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn update_merges_and_applies() {
        let (_dir, store) = temp_store();
        store
            .upsert(record(
                "T1",
                "companies",
                json!({"id": "co1", "name": "Acme", "fields": {"industry": "Retail", "domain": "acme.test"}}),
            ))
            .await
            .unwrap();
        let (editor, store, notifier) = editor(store, RecordingNotifier::default());

        let applied = editor
            .update(
                &customer("T1"),
                &RecordId::new("co1").unwrap(),
                RecordPatch {
                    name: None,
                    fields: json!({"industry": "Finance", "domain": null})
                        .as_object()
                        .unwrap()
                        .clone(),
                },
            )
            .await
            .unwrap();

        assert_eq!(applied.change, ChangeKind::Updated);
        let fields = &applied.record.record.fields;
        assert_eq!(fields["industry"], "Finance");
        assert!(!fields.contains_key("domain"));
        assert_eq!(applied.record.record.name.as_deref(), Some("Acme"));

        assert_eq!(notifier.events()[0].kind, EventKind::Updated);
        let stored = store
            .find_one(&customer("T1"), &RecordId::new("co1").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.version, 2);
    }

    #[tokio::test]
    async fn failed_notification_leaves_store_untouched() {
        let (_dir, store) = temp_store();
        store
            .upsert(record("T1", "leads", json!({"id": "l1", "name": "Lead"})))
            .await
            .unwrap();
        let (editor, store, _) = editor(store, RecordingNotifier::failing());
        let id = RecordId::new("l1").unwrap();

        assert!(editor.delete(&customer("T1"), &id).await.is_err());
        assert!(store.find_one(&customer("T1"), &id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn delete_removes_local_copy() {
        let (_dir, store) = temp_store();
        store
            .upsert(record("T1", "leads", json!({"id": "l1"})))
            .await
            .unwrap();
        let (editor, store, notifier) = editor(store, RecordingNotifier::default());
        let id = RecordId::new("l1").unwrap();

        editor.delete(&customer("T1"), &id).await.unwrap();
        assert!(store.find_one(&customer("T1"), &id).await.unwrap().is_none());
        assert_eq!(notifier.events()[0].kind, EventKind::Deleted);
        assert_eq!(notifier.events()[0].record_type.entity(), "leads");
    }

    #[tokio::test]
    async fn other_tenants_records_are_not_found() {
        let (_dir, store) = temp_store();
        store
            .upsert(record("T1", "leads", json!({"id": "l1"})))
            .await
            .unwrap();
        let (editor, _, notifier) = editor(store, RecordingNotifier::default());

        let err = editor
            .delete(&customer("T2"), &RecordId::new("l1").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
        assert!(notifier.events().is_empty());
    }
}
