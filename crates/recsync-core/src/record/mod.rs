//! The canonical record model and change detection.
//!
//! Every ingress path (bulk import, webhook, editor) converts its input into
//! a [`Record`] with [`Record::from_source`] before it reaches the store.

mod change;
mod types;

pub use change::{ChangeKind, detect_change};
pub use types::{Record, RecordKey, StoredRecord};
