//! Seams between the sync engine and its collaborators.

mod action;
mod notifier;
mod store;

pub use action::{ActionPage, ActionRunner, Connection};
pub use notifier::{ChangeNotifier, EventKind, OutboundEvent};
pub use store::{ListPage, ListQuery, RecordStore};
