//! External record identifier type.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, InvalidInputError};

/// The external system's identifier for a record.
///
/// Always a non-empty string. Sources that send numeric ids are coerced with
/// [`RecordId::from_json`], so `42` and `"42"` name the same record.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RecordId(String);

impl RecordId {
    /// Create a record id from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the id is empty after trimming.
    pub fn new(s: impl Into<String>) -> Result<Self, Error> {
        let s = s.into();
        if s.trim().is_empty() {
            return Err(InvalidInputError::RecordId {
                value: s,
                reason: "must be non-empty".to_string(),
            }
            .into());
        }
        Ok(Self(s))
    }

    /// Coerce a JSON id (string or number) into a record id.
    ///
    /// # Example
    ///
    /// ```
    /// use recsync_core::RecordId;
    /// use serde_json::json;
    ///
    /// assert_eq!(RecordId::from_json(&json!(42)).unwrap().as_str(), "42");
    /// assert_eq!(RecordId::from_json(&json!("42")).unwrap().as_str(), "42");
    /// ```
    pub fn from_json(value: &Value) -> Result<Self, Error> {
        match value {
            Value::String(s) => Self::new(s.clone()),
            Value::Number(n) => Self::new(n.to_string()),
            Value::Null => Err(InvalidInputError::missing("id").into()),
            other => Err(InvalidInputError::RecordId {
                value: other.to_string(),
                reason: "must be a string or number".to_string(),
            }
            .into()),
        }
    }

    /// Returns the id string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RecordId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for RecordId {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<RecordId> for String {
    fn from(id: RecordId) -> Self {
        id.0
    }
}

impl AsRef<str> for RecordId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
