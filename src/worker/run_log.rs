//! Per-agent JSON run logs under `<log_dir>/<agent_id>/<target_date>.json`.

use chrono::NaiveDate;
use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::domain::{ErrorPayload, Result};

fn log_path(log_dir: &Path, agent_id: i64, target_date: NaiveDate) -> PathBuf {
    log_dir
        .join(agent_id.to_string())
        .join(format!("{target_date}.json"))
}

/// Write the day's outcome payload, creating the per-agent directory.
pub fn write_daily_log(
    log_dir: &Path,
    agent_id: i64,
    target_date: NaiveDate,
    payload: &Value,
) -> Result<PathBuf> {
    let path = log_path(log_dir, agent_id, target_date);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, serde_json::to_string_pretty(payload)?)?;
    Ok(path)
}

/// Write an error payload in the run-log slot for the day.
pub fn write_error_log(
    log_dir: &Path,
    agent_id: i64,
    target_date: NaiveDate,
    error: &ErrorPayload,
) -> Result<PathBuf> {
    let payload = serde_json::json!({
        "agent_id": agent_id,
        "target_date": target_date,
        "error": error,
    });
    write_daily_log(log_dir, agent_id, target_date, &payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_layout() {
        let dir = tempfile::tempdir().unwrap();
        let date = NaiveDate::from_ymd_opt(2026, 1, 8).unwrap();
        let path = write_daily_log(dir.path(), 7, date, &serde_json::json!({"status": "success"}))
            .unwrap();
        assert!(path.ends_with("7/2026-01-08.json"));
        let written: Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["status"], "success");
    }
}
