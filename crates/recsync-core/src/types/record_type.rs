//! Record type (action key) identifier.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, InvalidInputError};

/// Prefix shared by every pull-side action key.
const ACTION_PREFIX: &str = "get-";

/// Default record types with their display names.
const DEFAULT_TYPES: [(&str, &str); 4] = [
    ("get-leads", "Leads"),
    ("get-deals", "Opportunities"),
    ("get-contacts", "Contacts"),
    ("get-companies", "Companies"),
];

/// The category of an external entity, in its canonical action-key form.
///
/// Both the importer (which already speaks in action keys such as
/// `get-contacts`) and the webhook (which sends bare entity names such as
/// `contacts`) produce the same `RecordType`, so both paths write to the
/// same partition.
///
/// # Example
///
/// ```
/// use recsync_core::RecordType;
///
/// let pushed = RecordType::new("contacts").unwrap();
/// let pulled = RecordType::new("get-contacts").unwrap();
/// assert_eq!(pushed, pulled);
/// assert_eq!(pushed.entity(), "contacts");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RecordType(String);

impl RecordType {
    /// Create a record type, canonicalizing case and the `get-` prefix.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity name is empty or contains characters
    /// other than ASCII letters, digits, `-` and `_`.
    pub fn new(s: impl Into<String>) -> Result<Self, Error> {
        let s = s.into();
        let lowered = s.trim().to_ascii_lowercase();
        let entity = lowered.strip_prefix(ACTION_PREFIX).unwrap_or(&lowered);

        if entity.is_empty() {
            return Err(InvalidInputError::RecordType {
                value: s,
                reason: "entity name must be non-empty".to_string(),
            }
            .into());
        }

        if !entity
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(InvalidInputError::RecordType {
                value: s,
                reason: "must contain only letters, digits, '-' or '_'".to_string(),
            }
            .into());
        }

        Ok(Self(format!("{ACTION_PREFIX}{entity}")))
    }

    /// The record types imported by default, in catalogue order.
    pub fn defaults() -> Vec<RecordType> {
        DEFAULT_TYPES
            .iter()
            .map(|(key, _)| RecordType((*key).to_string()))
            .collect()
    }

    /// Human-readable name for the default types, if this is one of them.
    pub fn display_name(&self) -> Option<&'static str> {
        DEFAULT_TYPES
            .iter()
            .find(|(key, _)| *key == self.0)
            .map(|(_, name)| *name)
    }

    /// The canonical action key, e.g. `get-contacts`.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The bare entity name, e.g. `contacts`.
    pub fn entity(&self) -> &str {
        &self.0[ACTION_PREFIX.len()..]
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RecordType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for RecordType {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<RecordType> for String {
    fn from(t: RecordType) -> Self {
        t.0
    }
}

impl AsRef<str> for RecordType {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
