use crate::domain::models::{CheckStatus, JsonOut, ValidationResult};
use serde::Serialize;

pub fn print_out<T: Serialize>(
    json: bool,
    data: &[T],
    row: impl Fn(&T) -> String,
) -> anyhow::Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&JsonOut { ok: true, data })?
        );
    } else {
        for d in data {
            println!("{}", row(d));
        }
    }
    Ok(())
}

pub fn print_one<T: Serialize>(
    json: bool,
    data: T,
    text: impl Fn(&T) -> String,
) -> anyhow::Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&JsonOut { ok: true, data })?
        );
    } else {
        println!("{}", text(&data));
    }
    Ok(())
}

/// Human-readable summary of one inspection.
pub fn summarize(result: &ValidationResult) -> String {
    let mut lines = vec![
        format!("car: {}", result.info.car),
        format!("verdict: {}", result.verdict()),
        format!(
            "matched reference: {}",
            result.matched_reference.as_deref().unwrap_or("none")
        ),
        format!("exact physics match: {}", result.exact_physics_match),
    ];
    if !result.physics_mismatches.is_empty() {
        lines.push(format!("physics mismatches: {}", result.physics_mismatches.join(", ")));
    }
    for v in &result.rule_violations {
        lines.push(format!("  - {v}"));
    }
    for check in result.info.anti_cheat.iter().filter(|c| c.status != CheckStatus::Pass) {
        let status = match check.status {
            CheckStatus::Fail => "FAIL",
            _ => "warn",
        };
        lines.push(format!("  [{}] {} {}: {}", status, check.code, check.label, check.detail));
    }
    lines.join("\n")
}
