//! Record types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::error::{Error, InvalidInputError};
use crate::types::{CustomerId, RecordId, RecordType};

/// Keys that belong to the storage layer or the record envelope and are
/// never copied from a source payload into `extra`.
const RESERVED_KEYS: [&str; 8] = [
    "customerId",
    "recordType",
    "_id",
    "__v",
    "seq",
    "version",
    "createdAt",
    "updatedAt",
];

/// The storage key of a record: unique per collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordKey {
    pub customer_id: CustomerId,
    pub record_type: RecordType,
    pub id: RecordId,
}

impl RecordKey {
    pub fn new(customer_id: CustomerId, record_type: RecordType, id: RecordId) -> Self {
        Self {
            customer_id,
            record_type,
            id,
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.customer_id, self.record_type, self.id)
    }
}

/// One mirrored external entity in canonical form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// External-system identifier.
    pub id: RecordId,

    /// Owning tenant.
    pub customer_id: CustomerId,

    /// Canonical action key, e.g. `get-contacts`.
    pub record_type: RecordType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Domain-specific attributes (industry, domain, address, ...).
    #[serde(default)]
    pub fields: Map<String, Value>,

    /// Source-supplied creation time (ISO-8601).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_time: Option<String>,

    /// Source-supplied or store-stamped update time (ISO-8601).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_time: Option<String>,

    /// Link to the record in the external system.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,

    /// Other top-level attributes sent by the source, kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Record {
    /// Create an empty record for a key.
    pub fn new(customer_id: CustomerId, record_type: RecordType, id: RecordId) -> Self {
        Self {
            id,
            customer_id,
            record_type,
            name: None,
            fields: Map::new(),
            created_time: None,
            updated_time: None,
            uri: None,
            extra: Map::new(),
        }
    }

    /// Normalize a raw source payload into a canonical record.
    ///
    /// The tenant and type are attached from the caller, never trusted from
    /// the payload. Numeric ids are coerced to strings.
    ///
    /// # Errors
    ///
    /// Returns `BadRequest` if the payload is not an object, has no usable
    /// `id`, or carries a non-object `fields` value.
    ///
    /// # Example
    ///
    /// ```
    /// use recsync_core::{CustomerId, Record, RecordType};
    /// use serde_json::json;
    ///
    /// let record = Record::from_source(
    ///     CustomerId::new("T1").unwrap(),
    ///     RecordType::new("contacts").unwrap(),
    ///     json!({"id": 42, "name": "Acme", "fields": {"industry": "Retail"}}),
    /// )
    /// .unwrap();
    ///
    /// assert_eq!(record.id.as_str(), "42");
    /// assert_eq!(record.record_type.as_str(), "get-contacts");
    /// ```
    pub fn from_source(
        customer_id: CustomerId,
        record_type: RecordType,
        raw: Value,
    ) -> Result<Self, Error> {
        let Value::Object(mut obj) = raw else {
            return Err(InvalidInputError::Other {
                message: "record must be a JSON object".to_string(),
            }
            .into());
        };

        let id = match obj.remove("id") {
            Some(value) => RecordId::from_json(&value)?,
            None => return Err(InvalidInputError::missing("id").into()),
        };

        let fields = match obj.remove("fields") {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(fields)) => fields,
            Some(_) => {
                return Err(InvalidInputError::Other {
                    message: "'fields' must be a JSON object".to_string(),
                }
                .into());
            }
        };

        let name = take_string(&mut obj, "name");
        let created_time = take_string(&mut obj, "createdTime");
        let updated_time = take_string(&mut obj, "updatedTime");
        let uri = take_string(&mut obj, "uri");

        for key in RESERVED_KEYS {
            obj.remove(key);
        }

        Ok(Self {
            id,
            customer_id,
            record_type,
            name,
            fields,
            created_time,
            updated_time,
            uri,
            extra: obj,
        })
    }

    /// The storage key of this record.
    pub fn key(&self) -> RecordKey {
        RecordKey::new(
            self.customer_id.clone(),
            self.record_type.clone(),
            self.id.clone(),
        )
    }

    /// Look up a field by name, falling back to top-level extra attributes.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name).or_else(|| self.extra.get(name))
    }
}

/// Remove `key` from `obj` and render it as a string. `null` counts as absent.
fn take_string(obj: &mut Map<String, Value>, key: &str) -> Option<String> {
    match obj.remove(key)? {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

/// A record as persisted, with storage-assigned metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredRecord {
    /// Monotonic internal identifier, assigned on first insert.
    pub seq: u64,

    /// Number of accepted writes for this key, starting at 1.
    pub version: u64,

    /// When the store first saw this key.
    pub created_at: DateTime<Utc>,

    /// When the store last accepted a write for this key.
    pub updated_at: DateTime<Utc>,

    #[serde(flatten)]
    pub record: Record,
}
