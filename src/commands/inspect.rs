use crate::cli::{Cli, Commands, RulebookArgs};
use anyhow::Context;
use car_inspector::domain::models::{BatchRow, CheckStatus, ValidationResult};
use car_inspector::domain::rulebook::RulebookConfig;
use car_inspector::services::output::{print_one, print_out, summarize};
use car_inspector::services::policy::resolve_rulebook;
use car_inspector::services::reference_index::ReferenceIndex;
use car_inspector::services::{storage, validator};
use std::path::{Path, PathBuf};

fn load_inputs(index: &Path, rules: &RulebookArgs) -> anyhow::Result<(ReferenceIndex, RulebookConfig)> {
    let index = ReferenceIndex::load(index).with_context(|| format!("load index {}", index.display()))?;
    let rulebook = resolve_rulebook(rules.ruleset.into(), rules.rulebook.as_deref(), rules.overrides())?;
    Ok((index, rulebook))
}

fn record(history: &Option<PathBuf>, result: &ValidationResult) -> anyhow::Result<()> {
    match history {
        Some(path) => storage::append_history(path, result),
        None => Ok(()),
    }
}

fn row(result: &ValidationResult) -> BatchRow {
    BatchRow {
        car: result.info.car.clone(),
        verdict: result.verdict(),
        matched_reference: result.matched_reference.clone(),
        violations: result.rule_violations.len(),
        anti_cheat_failures: result
            .info
            .anti_cheat
            .iter()
            .filter(|c| c.status == CheckStatus::Fail)
            .count(),
    }
}

pub fn handle_inspect_commands(cli: &Cli) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Inspect {
            car,
            index,
            rules,
            history,
        } => {
            if !car.is_dir() {
                anyhow::bail!("car folder not found: {}", car.display());
            }
            let (index, rulebook) = load_inputs(index, rules)?;
            let result = validator::validate(car, &index, &rulebook);
            tracing::info!(car = %result.info.car, verdict = %result.verdict(), "inspection finished");
            record(history, &result)?;
            print_one(cli.json, result, summarize)?;
        }
        Commands::InspectBatch {
            root,
            index,
            rules,
            history,
        } => {
            let (index, rulebook) = load_inputs(index, rules)?;
            let results = validator::validate_batch(root, &index, &rulebook)?;
            for result in &results {
                record(history, result)?;
            }
            if let Some(path) = history.as_deref().filter(|p| p.is_file()) {
                let (passed, failed) = storage::history_counts(path)?;
                tracing::info!(passed, failed, history = %path.display(), "history totals");
            }
            let rows: Vec<BatchRow> = results.iter().map(row).collect();
            print_out(cli.json, &rows, |r| {
                format!(
                    "{}\t{}\t{}\tviolations={}\tac_fail={}",
                    r.car,
                    r.verdict,
                    r.matched_reference.as_deref().unwrap_or("-"),
                    r.violations,
                    r.anti_cheat_failures
                )
            })?;
        }
        _ => {}
    }
    Ok(())
}
