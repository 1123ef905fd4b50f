//! Terminal output.
//!
//! stdout carries only JSON documents, one per line unless pretty-printed,
//! so command output can be piped into `jq` or another `recsync` run.
//! Status lines for humans go to stderr.

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;

/// A completed step.
pub fn success(msg: &str) {
    eprintln!("{} {}", "✓".green(), msg);
}

/// A step that did not complete. The command may still exit successfully.
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Secondary information, such as an empty result.
pub fn note(msg: &str) {
    eprintln!("{}", msg.dimmed());
}

/// A `label: value` status line.
pub fn field(label: &str, value: &str) {
    eprintln!("{}: {}", label.dimmed(), value);
}

/// Write one JSON document to stdout.
pub fn json<T: Serialize + ?Sized>(value: &T, pretty: bool) -> Result<()> {
    let text = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{text}");
    Ok(())
}
