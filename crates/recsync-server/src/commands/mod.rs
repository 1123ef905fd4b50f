//! Subcommand implementations.

pub mod get;
pub mod import;
pub mod import_all;
pub mod journal;
pub mod list;
pub mod serve;
