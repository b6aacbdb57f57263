// src/utils/logbook.rs
use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use std::{fs, io::Write, path::Path};

#[derive(Serialize)]
struct LogLine<'a> {
    timestamp: &'a str,
    event: &'a str,
    data: Value,
}

/// Append one JSON line to the logbook at `log_path`.
pub fn emit_event(log_path: &Path, event: &str, data: Value, ts: &str) -> Result<()> {
    if let Some(parent) = log_path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create_dir_all({:?})", parent))?;
    }
    let line = LogLine { timestamp: ts, event, data };
    let json = serde_json::to_string(&line)?;
    let mut f = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .with_context(|| format!("open logbook {:?}", log_path))?;
    writeln!(f, "{}", json)?;
    Ok(())
}

/// Stable id for one invocation: blake3 over caller, function, args and time.
pub fn invocation_id(caller: &str, function: &str, args: &[String], ts: &str) -> String {
    let mut h = blake3::Hasher::new();
    for part in [caller, function, ts] {
        h.update(part.as_bytes());
        h.update(&[0]);
    }
    for arg in args {
        h.update(arg.as_bytes());
        h.update(&[0]);
    }
    h.finalize().to_hex().as_str()[..16].to_string()
}
