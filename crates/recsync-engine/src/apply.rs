//! Change-detected writes shared by every ingress path.

use tracing::trace;

use recsync_core::{ChangeKind, Record, RecordStore, Result, StoredRecord, detect_change};

/// The result of applying one record to the store.
#[derive(Debug, Clone)]
pub struct Applied {
    pub change: ChangeKind,
    /// The stored document after the call. For `Unchanged` this is the
    /// existing document, untouched.
    pub record: StoredRecord,
}

/// Write `record` unless it is materially identical to the stored copy.
///
/// `Unchanged` issues no store write and leaves `updatedTime` alone.
pub async fn apply<S>(store: &S, record: Record) -> Result<Applied>
where
    S: RecordStore + ?Sized,
{
    let key = record.key();
    let existing = store.find(&key).await?;
    let change = detect_change(existing.as_ref().map(|s| &s.record), &record);

    match (change, existing) {
        (ChangeKind::Unchanged, Some(existing)) => {
            trace!(%key, "Record unchanged, skipping write");
            Ok(Applied {
                change,
                record: existing,
            })
        }
        _ => {
            let stored = store.upsert(record).await?;
            trace!(%key, %change, version = stored.version, "Record written");
            Ok(Applied {
                change,
                record: stored,
            })
        }
    }
}
