//! recsync-remote - HTTP clients for the external system.
//!
//! [`IntegrationActions`] pulls pages from the external "run action" API;
//! [`WebhookNotifier`] pushes local edits back out.

mod actions;
mod client;
mod endpoints;
mod notifier;
mod token;

pub use actions::IntegrationActions;
pub use client::ApiClient;
pub use notifier::{WebhookNotifier, WebhookRoute, WebhookUrls};
pub use token::TokenIssuer;
