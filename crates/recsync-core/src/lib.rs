//! recsync-core - Core record types and traits for the record mirror.

pub mod error;
pub mod filter;
pub mod record;
pub mod traits;
pub mod types;

pub use error::Error;
pub use filter::SearchFilter;
pub use record::{ChangeKind, Record, RecordKey, StoredRecord, detect_change};
pub use traits::{
    ActionPage, ActionRunner, ChangeNotifier, Connection, EventKind, ListPage, ListQuery,
    OutboundEvent, RecordStore,
};
pub use types::{CustomerId, RecordId, RecordType};

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;
