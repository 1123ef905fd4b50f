//! Search filtering for list queries.

use serde_json::Value;

use crate::record::Record;

/// Nested field names a search term is matched against, besides `id` and
/// `name`.
pub const SEARCH_FIELDS: [&str; 2] = ["industry", "domain"];

/// A case-insensitive substring search over a record's identifying
/// attributes.
///
/// # Example
///
/// ```
/// use recsync_core::SearchFilter;
///
/// assert!(SearchFilter::parse(Some("  ")).is_none());
/// assert_eq!(SearchFilter::parse(Some("Retail")).unwrap().term(), "retail");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchFilter {
    term: String,
}

impl SearchFilter {
    /// Build a filter from an optional user-supplied term. Blank terms yield
    /// no filter, i.e. the full scoped set.
    pub fn parse(term: Option<&str>) -> Option<Self> {
        let term = term?.trim();
        if term.is_empty() {
            return None;
        }
        Some(Self {
            term: term.to_lowercase(),
        })
    }

    /// The lowercased term.
    pub fn term(&self) -> &str {
        &self.term
    }

    /// Whether the record's id, name, or one of [`SEARCH_FIELDS`] contains
    /// the term.
    pub fn matches(&self, record: &Record) -> bool {
        if self.contains(record.id.as_str()) {
            return true;
        }
        if record.name.as_deref().is_some_and(|n| self.contains(n)) {
            return true;
        }
        SEARCH_FIELDS.iter().any(|field| match record.fields.get(*field) {
            Some(Value::String(s)) => self.contains(s),
            Some(Value::Number(n)) => self.contains(&n.to_string()),
            _ => false,
        })
    }

    fn contains(&self, haystack: &str) -> bool {
        haystack.to_lowercase().contains(&self.term)
    }
}
