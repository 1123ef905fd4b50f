//! Append-only journal of accepted writes.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::warn;

use recsync_core::Result;
use recsync_core::record::RecordKey;

use crate::store::{map_io, map_serde};

/// One accepted write or delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// `customer/type/id`.
    pub key: String,
    /// Internal sequence number of the affected document.
    pub seq: u64,
    /// RFC 3339 timestamp.
    pub time: String,
    pub op: JournalOp,
}

/// The type of journaled operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JournalOp {
    Created,
    Updated,
    Deleted,
}

/// Append one entry. The caller must hold the store lock.
pub(crate) fn append(path: &Path, key: &RecordKey, seq: u64, op: JournalOp) -> Result<()> {
    let entry = JournalEntry {
        key: key.to_string(),
        seq,
        time: Utc::now().to_rfc3339(),
        op,
    };

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(map_io)?;

    let line = serde_json::to_string(&entry).map_err(map_serde)?;
    writeln!(file, "{}", line).map_err(map_io)?;
    file.sync_data().map_err(map_io)?;

    Ok(())
}

/// Read every entry. Unparseable lines are skipped.
pub(crate) fn read_all(path: &Path) -> Result<Vec<JournalEntry>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let content = fs::read_to_string(path).map_err(map_io)?;
    let entries = content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| match serde_json::from_str(line) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(error = %e, "Skipping unreadable journal line");
                None
            }
        })
        .collect();

    Ok(entries)
}
