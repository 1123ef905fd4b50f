//! Identifier types for the record mirror.
//!
//! These types enforce their invariants at construction time, so a stored
//! record can never carry an empty id, type or tenant.

mod customer_id;
mod record_id;
mod record_type;

pub use customer_id::CustomerId;
pub use record_id::RecordId;
pub use record_type::RecordType;
