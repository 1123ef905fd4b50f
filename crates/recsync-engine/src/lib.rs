//! recsync-engine - The record synchronization engine.
//!
//! Both ingress paths ([`Importer`] for pull, [`WebhookIngest`] for push)
//! normalize payloads into [`Record`](recsync_core::Record)s and write them
//! through [`apply`], which consults the change detector before touching the
//! store. [`QueryService`] reads the same store; [`RecordEditor`] handles
//! UI-driven edits that are reported back to the external system.

mod apply;
mod auth;
mod cancel;
mod editor;
mod import;
mod ingest;
mod query;

#[cfg(test)]
mod testing;

pub use apply::{Applied, apply};
pub use auth::TenantResolver;
pub use cancel::CancelSignal;
pub use editor::{RecordEditor, RecordPatch};
pub use import::{ImportOptions, ImportReport, ImportStatus, Importer, RecordFailure, TypeResult};
pub use ingest::{IngestOutcome, WebhookIngest};
pub use query::{QueryPage, QueryService};
