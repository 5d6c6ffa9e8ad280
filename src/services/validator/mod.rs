//! Validation pipeline.
//!
//! [`validate`] runs every check over one submitted car folder and freezes
//! the accumulated [`Diagnostics`] into a [`ValidationResult`]. Each step
//! lives in its own module and only appends violations or fills its part
//! of the info record; no step reads another step's violations.
//!
//! Step order:
//! 1. naming  2. fingerprint match (fallback resolved here)  3. metadata
//! 4-6. physics, gearing, tyres  7. assets  8-9. integrity, extension, root
//! 10. setup  11. power  12. steering  13. kn5 stats
//! 14. fallback outcome  15. anti-cheat  16. duplicate INI sections

mod assets;
mod integrity;
mod kn5_stats;
mod metadata;
mod naming;
mod physics;
mod power;
mod setup;
mod steering;

use crate::domain::constants::FINGERPRINT_FILES;
use crate::domain::models::{
    CheckStatus, DuplicateSection, InspectionInfo, SpecComparison, SpecUnit, ValidationResult,
};
use crate::domain::rulebook::RulebookConfig;
use crate::error::{read_json, InspectError, Result};
use crate::ini::ConfigDocument;
use crate::services::anti_cheat;
use crate::services::fingerprint::{self, Fingerprint};
use crate::services::reference_index::{ReferenceCarSpec, ReferenceIndex};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Extra INI files parsed alongside the fingerprint set.
const AUX_FILES: [&str; 1] = ["colliders.ini"];

/// Every `data/*.ini` the pipeline reads, parsed once.
pub(crate) struct SubmissionDocs {
    files: BTreeMap<String, ConfigDocument>,
    empty: ConfigDocument,
}

impl SubmissionDocs {
    pub(crate) fn load(car_root: &Path) -> Self {
        let mut files = BTreeMap::new();
        for name in FINGERPRINT_FILES.iter().chain(AUX_FILES.iter()) {
            let path = car_root.join("data").join(name);
            match ConfigDocument::parse(&path) {
                Ok(doc) => {
                    files.insert(name.to_string(), doc);
                }
                Err(e) if e.is_not_found() => {}
                Err(e) => tracing::warn!(error = %e, "submission ini unreadable"),
            }
        }
        Self {
            files,
            empty: ConfigDocument::default(),
        }
    }

    /// Parsed document, or an empty one when the file is absent.
    pub(crate) fn get(&self, name: &str) -> &ConfigDocument {
        self.files.get(name).unwrap_or(&self.empty)
    }

    pub(crate) fn parsed(&self, name: &str) -> Option<&ConfigDocument> {
        self.files.get(name)
    }

    pub(crate) fn fingerprint(&self) -> Fingerprint {
        self.files
            .iter()
            .filter(|(name, _)| FINGERPRINT_FILES.contains(&name.as_str()))
            .map(|(name, doc)| (name.clone(), fingerprint::from_document(doc)))
            .collect()
    }

    fn duplicates(&self) -> Vec<DuplicateSection> {
        self.files
            .iter()
            .flat_map(|(name, doc)| {
                doc.duplicate_sections().iter().map(move |section| DuplicateSection {
                    file: format!("data/{name}"),
                    section: section.clone(),
                })
            })
            .collect()
    }
}

/// Read-only inputs shared by every step.
pub(crate) struct Submission<'a> {
    pub root: &'a Path,
    pub docs: SubmissionDocs,
    pub ui: serde_json::Value,
    pub rulebook: &'a RulebookConfig,
    pub reference: Option<&'a ReferenceCarSpec>,
}

/// Mutable accumulator threaded through the pipeline.
#[derive(Default)]
pub(crate) struct Diagnostics {
    pub violations: Vec<String>,
    pub info: InspectionInfo,
}

impl Diagnostics {
    pub(crate) fn violation(&mut self, message: impl Into<String>) {
        self.violations.push(message.into());
    }

    /// Records a submitted-vs-reference comparison when both sides are known.
    /// Out-of-tolerance values also produce a violation.
    pub(crate) fn compare_spec(
        &mut self,
        key: &str,
        submitted: Option<f64>,
        reference: Option<f64>,
        label: &str,
        unit: SpecUnit,
        tolerance: f64,
    ) {
        let (Some(submitted), Some(reference)) = (submitted, reference) else {
            return;
        };
        let delta = submitted - reference;
        let within_tolerance = delta.abs() <= tolerance;
        if !within_tolerance {
            self.violation(format!(
                "{label} differs from reference: {} vs {} (Δ {})",
                unit.format(submitted, false),
                unit.format(reference, false),
                unit.format(delta, true),
            ));
        }
        self.info.spec_compare.insert(
            key.to_string(),
            SpecComparison {
                label: label.to_string(),
                unit,
                submitted,
                reference,
                delta,
                tolerance,
                within_tolerance,
            },
        );
    }
}

struct MatchOutcome {
    matched_reference: Option<String>,
    exact: bool,
    mismatches: Vec<String>,
    fallback_violation: Option<String>,
}

fn resolve_match(submitted: &Fingerprint, index: &ReferenceIndex, rulebook: &RulebookConfig, diag: &mut Diagnostics) -> MatchOutcome {
    let best = fingerprint::compare_to_index(submitted, &index.fingerprints.cars);
    let mut outcome = MatchOutcome {
        matched_reference: best.matched_key,
        exact: best.exact,
        mismatches: if best.exact { Vec::new() } else { best.mismatches },
        fallback_violation: None,
    };
    diag.info.fallback.configured = rulebook.fallback_reference_key.clone();
    if outcome.exact {
        return outcome;
    }
    let Some(key) = rulebook.fallback_reference_key.as_deref() else {
        return outcome;
    };
    match index.fingerprint(key) {
        Some(reference) => {
            if fingerprint::compare_pair(submitted, reference).exact {
                tracing::debug!(fallback = key, "fallback reference matched");
                diag.info.fallback.used = true;
                outcome.matched_reference = Some(key.to_string());
                outcome.exact = true;
                outcome.mismatches.clear();
            } else {
                outcome.fallback_violation = Some(format!(
                    "Exact match to reference failed; fallback '{key}' also mismatched"
                ));
            }
        }
        None => {
            outcome.fallback_violation = Some(format!("Configured fallback reference '{key}' not found in index"));
        }
    }
    outcome
}

fn load_ui(car_root: &Path) -> serde_json::Value {
    match read_json(&car_root.join(crate::domain::constants::UI_CAR_JSON)) {
        Ok(value) => value,
        Err(e) if e.is_not_found() => serde_json::Value::Null,
        Err(e) => {
            tracing::warn!(error = %e, "ui_car.json unreadable");
            serde_json::Value::Null
        }
    }
}

/// Validates one submitted car. Never fails: every problem becomes result data.
pub fn validate(car_root: &Path, index: &ReferenceIndex, rulebook: &RulebookConfig) -> ValidationResult {
    let mut diag = Diagnostics::default();
    diag.info.car = car_root
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    diag.info.rulebook = rulebook.clone();

    let docs = SubmissionDocs::load(car_root);
    let submitted_fp = docs.fingerprint();
    let ui = load_ui(car_root);
    diag.info.metadata.ui_present = !ui.is_null();

    let mut sub = Submission {
        root: car_root,
        docs,
        ui,
        rulebook,
        reference: None,
    };

    naming::check(&sub, &mut diag);
    let outcome = resolve_match(&submitted_fp, index, rulebook, &mut diag);
    sub.reference = outcome.matched_reference.as_deref().and_then(|k| index.spec(k));
    tracing::debug!(
        car = %diag.info.car,
        matched = ?outcome.matched_reference,
        exact = outcome.exact,
        "fingerprint compared"
    );

    metadata::check(&sub, &mut diag);
    physics::check(&sub, &mut diag);
    physics::check_gearing(&sub, &mut diag);
    physics::check_tyres(&sub, &mut diag);
    assets::check(&sub, &mut diag);
    integrity::check(&sub, &mut diag);
    setup::check(&sub, &mut diag);
    power::check(&sub, &mut diag);
    steering::check(&sub, &mut diag);
    kn5_stats::check(&sub, &mut diag);

    if let Some(message) = outcome.fallback_violation {
        diag.violation(message);
    }

    let ctx = anti_cheat::CheckContext {
        car_root,
        info: &diag.info,
        rulebook,
        matched_reference: outcome.matched_reference.as_deref(),
        exact_physics_match: outcome.exact,
    };
    let checks = anti_cheat::run(&ctx);
    let failures = checks.iter().filter(|c| c.status == CheckStatus::Fail).count();
    diag.info.anti_cheat = checks;
    if failures > 0 {
        diag.violation(format!("Anti-cheat failures: {failures}"));
    }

    let duplicates = sub.docs.duplicates();
    for dup in &duplicates {
        diag.violation(format!("Duplicate INI section '{}' detected in {}", dup.section, dup.file));
    }
    diag.info.duplicate_sections = duplicates;

    ValidationResult {
        matched_reference: outcome.matched_reference,
        exact_physics_match: outcome.exact,
        physics_mismatches: outcome.mismatches,
        rule_violations: diag.violations,
        info: diag.info,
    }
}

/// Validates every sub-directory of `root`, in name order.
pub fn validate_batch(root: &Path, index: &ReferenceIndex, rulebook: &RulebookConfig) -> Result<Vec<ValidationResult>> {
    let rd = std::fs::read_dir(root).map_err(|e| InspectError::io(root, e))?;
    let mut cars: Vec<PathBuf> = rd
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    cars.sort();
    Ok(cars.iter().map(|car| validate(car, index, rulebook)).collect())
}

pub(crate) fn has_prefix(value: &str, prefix: &str) -> bool {
    value
        .trim()
        .to_lowercase()
        .starts_with(&prefix.trim().to_lowercase())
}

pub(crate) fn bytes_to_mb(bytes: u64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0)
}
