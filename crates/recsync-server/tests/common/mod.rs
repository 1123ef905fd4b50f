use std::path::Path;
use std::process::{Command, Output};

/// Environment variables that would leak host configuration into tests.
const CONFIG_VARS: &[&str] = &[
    "RECSYNC_DATA_DIR",
    "RECSYNC_API_URL",
    "RECSYNC_WORKSPACE_KEY",
    "RECSYNC_WORKSPACE_SECRET",
    "RECSYNC_WEBHOOK_SECRET",
    "RECSYNC_WEBHOOK_URLS",
    "RECSYNC_IMPORT_TYPES",
    "RECSYNC_MAX_PAGES",
];

/// Run the CLI with an isolated data directory.
pub fn run_cli(args: &[&str], data_dir: &Path, extra_env: &[(&str, &str)]) -> Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_recsync"));
    for var in CONFIG_VARS {
        cmd.env_remove(var);
    }
    cmd.args(args);
    cmd.current_dir(data_dir);
    cmd.env("RECSYNC_DATA_DIR", data_dir.join("store"));
    cmd.env("NO_COLOR", "1");
    for (key, value) in extra_env {
        cmd.env(key, value);
    }
    cmd.output().expect("Failed to execute CLI")
}

/// Run the CLI and expect success.
pub fn run_cli_success(args: &[&str], data_dir: &Path, extra_env: &[(&str, &str)]) -> String {
    let output = run_cli(args, data_dir, extra_env);
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        panic!("CLI command failed: {:?}\nstderr: {}", args, stderr);
    }
    String::from_utf8_lossy(&output.stdout).to_string()
}

/// Run the CLI and expect failure, returning stderr.
pub fn run_cli_failure(args: &[&str], data_dir: &Path, extra_env: &[(&str, &str)]) -> String {
    let output = run_cli(args, data_dir, extra_env);
    if output.status.success() {
        panic!("CLI command should have failed: {:?}", args);
    }
    String::from_utf8_lossy(&output.stderr).to_string()
}
