//! Change detection between a stored record and an incoming candidate.
//!
//! Both sides are reduced to a canonical JSON form before comparison:
//! object keys compare as sets, `null` members are dropped, integral floats
//! collapse to integers, and `updatedTime` is ignored. Arrays keep their
//! order.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use super::Record;

/// Largest integer an `f64` represents exactly.
const MAX_EXACT_FLOAT: f64 = 9_007_199_254_740_992.0;

/// Outcome of comparing an incoming record with the stored one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// No record existed for the key.
    Created,
    /// A record existed and differs.
    Updated,
    /// A record existed and is materially identical; no write is needed.
    Unchanged,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Created => "created",
            ChangeKind::Updated => "updated",
            ChangeKind::Unchanged => "unchanged",
        }
    }

    /// Whether this outcome requires a store write.
    pub fn needs_write(&self) -> bool {
        !matches!(self, ChangeKind::Unchanged)
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify `incoming` against the currently stored record for its key.
///
/// # Example
///
/// ```
/// use recsync_core::{ChangeKind, CustomerId, Record, RecordType, detect_change};
/// use serde_json::json;
///
/// let make = |raw| {
///     Record::from_source(
///         CustomerId::new("T1").unwrap(),
///         RecordType::new("contacts").unwrap(),
///         raw,
///     )
///     .unwrap()
/// };
///
/// let stored = make(json!({"id": "1", "fields": {"a": 1, "b": 2}}));
/// let replay = make(json!({"id": "1", "fields": {"b": 2, "a": 1}}));
/// assert_eq!(detect_change(Some(&stored), &replay), ChangeKind::Unchanged);
/// assert_eq!(detect_change(None, &replay), ChangeKind::Created);
/// ```
pub fn detect_change(existing: Option<&Record>, incoming: &Record) -> ChangeKind {
    match existing {
        None => ChangeKind::Created,
        Some(existing) if canonical_form(existing) == canonical_form(incoming) => {
            ChangeKind::Unchanged
        }
        Some(_) => ChangeKind::Updated,
    }
}

/// Build the comparison form of a record, without `updatedTime`.
fn canonical_form(record: &Record) -> Value {
    let mut obj = Map::new();

    for (key, value) in record.extra.iter().filter(|(_, v)| !v.is_null()) {
        obj.insert(key.clone(), canonicalize(value));
    }

    obj.insert("id".to_string(), Value::from(record.id.as_str()));
    obj.insert(
        "customerId".to_string(),
        Value::from(record.customer_id.as_str()),
    );
    obj.insert(
        "recordType".to_string(),
        Value::from(record.record_type.as_str()),
    );
    obj.insert(
        "fields".to_string(),
        canonicalize(&Value::Object(record.fields.clone())),
    );

    let optional = [
        ("name", &record.name),
        ("createdTime", &record.created_time),
        ("uri", &record.uri),
    ];
    for (key, value) in optional {
        match value {
            Some(v) => obj.insert(key.to_string(), Value::from(v.as_str())),
            None => obj.remove(key),
        };
    }
    obj.remove("updatedTime");

    Value::Object(obj)
}

fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k.clone(), canonicalize(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() <= MAX_EXACT_FLOAT => {
                Value::from(f as i64)
            }
            _ => value.clone(),
        },
        other => other.clone(),
    }
}
