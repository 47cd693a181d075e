use std::process::Command;

use chrono::{SecondsFormat, Utc};
use serde_json::{json, Map, Value};

/// Resolve the current git commit hash, if this runs inside a repository.
/// Any failure (no git, not a repo) is non-fatal.
pub fn git_commit_hash() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "HEAD"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let hash = String::from_utf8(output.stdout).ok()?.trim().to_string();
    (!hash.is_empty()).then_some(hash)
}

/// Provenance block recorded at the top of every export: when it was
/// produced, by which command, with which parameters, from where, at which
/// commit, and how many records it holds.
pub fn run_metadata(script: &str, params: &Value, record_count: usize) -> Map<String, Value> {
    let mut meta = Map::new();
    meta.insert(
        "generated_at".to_string(),
        json!(Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)),
    );
    meta.insert("script".to_string(), json!(script));
    meta.insert("params".to_string(), params.clone());
    meta.insert(
        "cwd".to_string(),
        std::env::current_dir()
            .map(|p| json!(p.display().to_string()))
            .unwrap_or(Value::Null),
    );
    meta.insert(
        "tool_version".to_string(),
        json!(env!("CARGO_PKG_VERSION")),
    );
    meta.insert(
        "git_commit".to_string(),
        git_commit_hash().map(Value::String).unwrap_or(Value::Null),
    );
    meta.insert("record_count".to_string(), json!(record_count));
    meta
}
