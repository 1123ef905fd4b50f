//! Filesystem storage for mirrored records.
//!
//! Layout under the root directory:
//!
//! ```text
//! records/<customer>/<record type>/<record id>.json
//! sequence          last assigned internal id
//! store.lock        exclusive lock held for every write
//! journal.jsonl     one line per accepted write or delete
//! ```
//!
//! Path segments are percent-encoded, so any id maps to exactly one file
//! and no id can escape its directory.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use fs2::FileExt;
use tracing::{debug, instrument, warn};

use recsync_core::error::{Error, StoreError};
use recsync_core::record::{Record, RecordKey, StoredRecord};
use recsync_core::traits::{ListPage, ListQuery, RecordStore};
use recsync_core::types::{CustomerId, RecordId, RecordType};
use recsync_core::Result;

use crate::journal::{self, JournalEntry, JournalOp};

pub(crate) fn map_io(err: std::io::Error) -> Error {
    Error::Store(StoreError::Io {
        message: err.to_string(),
    })
}

pub(crate) fn map_serde(err: serde_json::Error) -> Error {
    Error::Store(StoreError::Serialization {
        message: err.to_string(),
    })
}

/// Encode a path segment: ASCII alphanumerics, `-` and `_` pass through,
/// every other byte becomes `%XX`.
fn segment(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for byte in s.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{:02X}", byte));
        }
    }
    out
}

/// Held for the duration of a write; released on drop.
struct StoreLock {
    file: File,
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            warn!(error = %e, "Failed to release store lock");
        }
    }
}

/// Filesystem-backed record store.
///
/// Cheap to clone; clones share the same directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Open (creating if needed) a store at the given root directory.
    ///
    /// # Errors
    ///
    /// Returns a store error if the directory cannot be created or locked.
    #[instrument(skip_all, fields(root = %root.as_ref().display()))]
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let store = Self {
            root: root.as_ref().to_path_buf(),
        };

        fs::create_dir_all(store.records_dir()).map_err(map_io)?;
        // Probe the lock once so an unusable directory fails here, not on the first write.
        drop(store.lock()?);

        debug!("Opened record store");
        Ok(store)
    }

    /// Get the root directory path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn records_dir(&self) -> PathBuf {
        self.root.join("records")
    }

    fn customer_dir(&self, customer_id: &CustomerId) -> PathBuf {
        self.records_dir().join(segment(customer_id.as_str()))
    }

    fn type_dir(&self, customer_id: &CustomerId, record_type: &RecordType) -> PathBuf {
        self.customer_dir(customer_id)
            .join(segment(record_type.as_str()))
    }

    fn record_path(&self, key: &RecordKey) -> PathBuf {
        self.type_dir(&key.customer_id, &key.record_type)
            .join(format!("{}.json", segment(key.id.as_str())))
    }

    fn sequence_path(&self) -> PathBuf {
        self.root.join("sequence")
    }

    fn lock_path(&self) -> PathBuf {
        self.root.join("store.lock")
    }

    fn journal_path(&self) -> PathBuf {
        self.root.join("journal.jsonl")
    }

    fn lock(&self) -> Result<StoreLock> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(self.lock_path())
            .map_err(map_io)?;

        file.lock_exclusive().map_err(map_io)?;

        Ok(StoreLock { file })
    }

    /// Allocate the next internal id. The caller must hold the store lock.
    fn next_seq(&self) -> Result<u64> {
        let path = self.sequence_path();
        let current = if path.exists() {
            let content = fs::read_to_string(&path).map_err(map_io)?;
            content.trim().parse::<u64>().map_err(|e| {
                Error::Store(StoreError::Corrupt {
                    location: path.display().to_string(),
                    message: e.to_string(),
                })
            })?
        } else {
            0
        };

        let next = current + 1;
        write_atomic(&path, next.to_string().as_bytes())?;
        Ok(next)
    }

    fn read_document(&self, path: &Path) -> Result<Option<StoredRecord>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(path).map_err(map_io)?;
        let stored = serde_json::from_str(&content).map_err(|e| {
            Error::Store(StoreError::Corrupt {
                location: path.display().to_string(),
                message: e.to_string(),
            })
        })?;

        Ok(Some(stored))
    }

    /// Read every document of one type directory, ordered by `seq`.
    fn read_type_dir(&self, dir: &Path) -> Result<Vec<StoredRecord>> {
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut records = Vec::new();
        for entry in fs::read_dir(dir).map_err(map_io)? {
            let path = entry.map_err(map_io)?.path();
            if !path.extension().is_some_and(|ext| ext == "json") {
                continue;
            }
            match self.read_document(&path) {
                Ok(Some(stored)) => records.push(stored),
                Ok(None) => {}
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable record"),
            }
        }

        records.sort_by_key(|r| r.seq);
        Ok(records)
    }

    /// Read the write journal.
    pub fn journal(&self) -> Result<Vec<JournalEntry>> {
        journal::read_all(&self.journal_path())
    }
}

fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(map_io)?;
    }
    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, content).map_err(map_io)?;
    fs::rename(&temp_path, path).map_err(map_io)?;
    Ok(())
}

#[async_trait]
impl RecordStore for FileStore {
    #[instrument(skip(self), fields(%key))]
    async fn find(&self, key: &RecordKey) -> Result<Option<StoredRecord>> {
        self.read_document(&self.record_path(key))
    }

    #[instrument(skip(self))]
    async fn find_one(
        &self,
        customer_id: &CustomerId,
        id: &RecordId,
    ) -> Result<Option<StoredRecord>> {
        let dir = self.customer_dir(customer_id);
        if !dir.exists() {
            return Ok(None);
        }

        let file_name = format!("{}.json", segment(id.as_str()));
        let mut found: Option<StoredRecord> = None;

        for entry in fs::read_dir(&dir).map_err(map_io)? {
            let path = entry.map_err(map_io)?.path().join(&file_name);
            if let Some(stored) = self.read_document(&path)?
                && found.as_ref().is_none_or(|f| stored.seq < f.seq)
            {
                found = Some(stored);
            }
        }

        Ok(found.filter(|f| &f.record.customer_id == customer_id))
    }

    #[instrument(skip(self, record), fields(key = %record.key()))]
    async fn upsert(&self, mut record: Record) -> Result<StoredRecord> {
        if record.updated_time.is_none() {
            record.updated_time = Some(Utc::now().to_rfc3339());
        }

        let key = record.key();
        let path = self.record_path(&key);

        let _lock = self.lock()?;

        let now = Utc::now();
        let (stored, op) = match self.read_document(&path)? {
            Some(previous) => (
                StoredRecord {
                    seq: previous.seq,
                    version: previous.version + 1,
                    created_at: previous.created_at,
                    updated_at: now,
                    record,
                },
                JournalOp::Updated,
            ),
            None => (
                StoredRecord {
                    seq: self.next_seq()?,
                    version: 1,
                    created_at: now,
                    updated_at: now,
                    record,
                },
                JournalOp::Created,
            ),
        };

        let content = serde_json::to_vec_pretty(&stored).map_err(map_serde)?;
        write_atomic(&path, &content)?;
        journal::append(&self.journal_path(), &key, stored.seq, op)?;

        debug!(seq = stored.seq, version = stored.version, ?op, "Stored record");

        Ok(stored)
    }

    #[instrument(skip(self, query), fields(customer = %query.customer_id, record_type = %query.record_type))]
    async fn list(&self, query: &ListQuery) -> Result<ListPage> {
        let dir = self.type_dir(&query.customer_id, &query.record_type);

        let mut matching = self
            .read_type_dir(&dir)?
            .into_iter()
            .filter(|r| r.record.customer_id == query.customer_id)
            .filter(|r| query.filter.as_ref().is_none_or(|f| f.matches(&r.record)))
            .skip(query.offset as usize);

        let records: Vec<StoredRecord> = matching.by_ref().take(query.limit).collect();
        let has_more = matching.next().is_some();

        Ok(ListPage { records, has_more })
    }

    #[instrument(skip(self), fields(%key))]
    async fn delete(&self, key: &RecordKey) -> Result<bool> {
        let path = self.record_path(key);

        let _lock = self.lock()?;

        let Some(previous) = self.read_document(&path)? else {
            return Ok(false);
        };

        fs::remove_file(&path).map_err(map_io)?;
        journal::append(&self.journal_path(), key, previous.seq, JournalOp::Deleted)?;

        debug!("Deleted record");
        Ok(true)
    }
}
