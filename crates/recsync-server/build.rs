//! Stamps the binary with `RECSYNC_VERSION`: the output of
//! `git describe` when built from a checkout, else the crate version.

use std::process::Command;

fn main() {
    for path in [".git/HEAD", ".git/refs/tags"] {
        println!("cargo:rerun-if-changed={path}");
    }

    let version = describe().unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string());
    println!("cargo:rustc-env=RECSYNC_VERSION={version}");
}

/// `v0.3.1-4-gabc1234` becomes `0.3.1-4-gabc1234`. A dirty tree is marked.
fn describe() -> Option<String> {
    let output = Command::new("git")
        .args(["describe", "--tags", "--always", "--dirty"])
        .output()
        .ok()
        .filter(|o| o.status.success())?;

    let described = String::from_utf8(output.stdout).ok()?;
    let described = described.trim().trim_start_matches('v');
    (!described.is_empty()).then(|| described.to_string())
}
