//! Tenant identifier type.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, InvalidInputError};

/// The id of the customer (tenant) that owns a record.
///
/// Every read and write is scoped by a `CustomerId`.
///
/// # Example
///
/// ```
/// use recsync_core::CustomerId;
///
/// let customer = CustomerId::new("  cust-1 ").unwrap();
/// assert_eq!(customer.as_str(), "cust-1");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CustomerId(String);

impl CustomerId {
    /// Maximum accepted length in bytes.
    pub const MAX_LEN: usize = 256;

    /// Create a new customer id, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns an error if the id is empty, too long, or contains control
    /// characters.
    pub fn new(s: impl Into<String>) -> Result<Self, Error> {
        let s = s.into();
        let trimmed = s.trim();
        Self::validate(trimmed)?;
        Ok(Self(trimmed.to_string()))
    }

    /// Returns the customer id string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(s: &str) -> Result<(), Error> {
        let reason = if s.is_empty() {
            "must be non-empty"
        } else if s.len() > Self::MAX_LEN {
            "is too long"
        } else if s.chars().any(char::is_control) {
            "must not contain control characters"
        } else {
            return Ok(());
        };

        Err(InvalidInputError::CustomerId {
            value: s.to_string(),
            reason: reason.to_string(),
        }
        .into())
    }
}

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CustomerId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for CustomerId {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<CustomerId> for String {
    fn from(id: CustomerId) -> Self {
        id.0
    }
}

impl AsRef<str> for CustomerId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
