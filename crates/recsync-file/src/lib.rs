//! recsync-file - Filesystem-backed record store.

mod journal;
mod store;

pub use journal::{JournalEntry, JournalOp};
pub use store::FileStore;
