use crate::domain::models::{ValidationResult, Verdict};
use anyhow::Context;
use chrono::{SecondsFormat, Utc};
use std::io::Write;
use std::path::Path;

fn ensure_parent(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create {}", parent.display()))?;
    }
    Ok(())
}

/// Writes pretty JSON, creating parent directories.
pub fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    ensure_parent(path)?;
    std::fs::write(path, serde_json::to_string_pretty(value)?)
        .with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

/// Appends one JSON line summarising an inspection.
pub fn append_history(path: &Path, result: &ValidationResult) -> anyhow::Result<()> {
    ensure_parent(path)?;
    let event = serde_json::json!({
        "ts": Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        "car": result.info.car,
        "verdict": result.verdict(),
        "matched_reference": result.matched_reference,
        "exact_physics_match": result.exact_physics_match,
        "violations": result.rule_violations.len(),
        "physics_mismatches": result.physics_mismatches.len(),
    });
    let line = format!("{event}\n");
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .and_then(|mut f| f.write_all(line.as_bytes()))
        .with_context(|| format!("append {}", path.display()))?;
    tracing::debug!(path = %path.display(), verdict = %result.verdict(), "history appended");
    Ok(())
}

/// Counts history lines per verdict; unreadable lines are skipped.
pub fn history_counts(path: &Path) -> anyhow::Result<(usize, usize)> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let mut pass = 0;
    let mut fail = 0;
    for line in raw.lines().filter(|l| !l.trim().is_empty()) {
        let Ok(v) = serde_json::from_str::<serde_json::Value>(line) else {
            continue;
        };
        match serde_json::from_value::<Verdict>(v["verdict"].clone()) {
            Ok(Verdict::Pass) => pass += 1,
            Ok(Verdict::Fail) => fail += 1,
            Err(_) => {}
        }
    }
    Ok((pass, fail))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::InspectionInfo;
    use tempfile::TempDir;

    fn result(car: &str, exact: bool) -> ValidationResult {
        ValidationResult {
            matched_reference: Some("ref_a".to_string()),
            exact_physics_match: exact,
            physics_mismatches: Vec::new(),
            rule_violations: Vec::new(),
            info: InspectionInfo {
                car: car.to_string(),
                ..InspectionInfo::default()
            },
        }
    }

    #[test]
    fn history_appends_one_line_per_run() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("logs/history.jsonl");
        append_history(&path, &result("a", true)).expect("append");
        append_history(&path, &result("b", false)).expect("append");

        let raw = std::fs::read_to_string(&path).expect("read");
        assert_eq!(raw.lines().count(), 2);
        let first: serde_json::Value = serde_json::from_str(raw.lines().next().unwrap_or_default()).expect("json");
        assert_eq!(first["car"], "a");
        assert_eq!(first["verdict"], "PASS");
        assert_eq!(history_counts(&path).expect("counts"), (1, 1));
    }
}
