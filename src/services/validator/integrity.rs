//! Content integrity against the matched reference: the `data/` file set,
//! SHA1 identity of hashed files, structured INI diffs, the extension
//! folder and the root-level inventory.

use super::{Diagnostics, Submission};
use crate::domain::constants::{
    SAFE_EXTRA_ROOT_DIRS, SAFE_MISSING_ROOT_DIRS, SAFE_ROOT_FILE_EXTS, SUSPICIOUS_ROOT_DIRS,
    SUSPICIOUS_ROOT_FILE_EXTS,
};
use crate::domain::models::{
    ExtensionStatus, FileModification, HashMismatch, IniChange, RootInventory, Severity,
};
use crate::ini::ConfigDocument;
use crate::services::reference_index::{load_doc, ReferenceCarSpec};
use crate::services::{extension, hashing, ini_diff};
use std::borrow::Cow;
use std::collections::BTreeSet;
use std::path::Path;

const EXTENSION_DETAIL_LIMIT: usize = 5;
const ROOT_LIST_LIMIT: usize = 10;

/// File and directory names directly under `dir`, each sorted.
fn entries(dir: &Path) -> (BTreeSet<String>, BTreeSet<String>) {
    let mut dirs = BTreeSet::new();
    let mut files = BTreeSet::new();
    if let Ok(rd) = std::fs::read_dir(dir) {
        for entry in rd.filter_map(|e| e.ok()) {
            let name = entry.file_name().to_string_lossy().to_string();
            let path = entry.path();
            if path.is_dir() {
                dirs.insert(name);
            } else if path.is_file() {
                files.insert(name);
            }
        }
    }
    (dirs, files)
}

fn extension_of(name: &str) -> String {
    Path::new(name)
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default()
}

pub(super) fn check(sub: &Submission<'_>, diag: &mut Diagnostics) {
    if let Some(reference) = sub.reference {
        check_data_whitelist(sub.root, reference, diag);
        check_hashes(sub, reference, diag);
    }
    check_extension(sub, diag);
    check_root(sub.root, sub.reference, diag);
}

fn check_data_whitelist(car_root: &Path, reference: &ReferenceCarSpec, diag: &mut Diagnostics) {
    let ref_data = reference.path.join("data");
    let sub_data = car_root.join("data");
    if !ref_data.is_dir() || !sub_data.is_dir() {
        return;
    }
    let (_, ref_files) = entries(&ref_data);
    let (_, sub_files) = entries(&sub_data);
    let extra: Vec<String> = sub_files.difference(&ref_files).cloned().collect();
    let missing: Vec<String> = ref_files.difference(&sub_files).cloned().collect();
    for f in &extra {
        diag.violation(format!("Unexpected file in data: {f}"));
    }
    for f in &missing {
        diag.violation(format!("Missing expected data file: {f}"));
    }
    let files = &mut diag.info.data_files;
    files.whitelist_ok = Some(extra.is_empty() && missing.is_empty());
    files.extra = extra;
    files.missing = missing;
}

/// The submission's parsed copy when it is a top-level `data/*.ini`.
fn submitted_doc<'s>(sub: &'s Submission<'_>, rel: &str) -> Cow<'s, ConfigDocument> {
    let parsed = rel
        .strip_prefix("data/")
        .filter(|name| !name.contains('/'))
        .and_then(|name| sub.docs.parsed(name));
    match parsed {
        Some(doc) => Cow::Borrowed(doc),
        None => Cow::Owned(load_doc(&sub.root.join(rel))),
    }
}

fn single_change(path: &str, severity: Severity, detail: &str) -> FileModification {
    FileModification {
        path: path.to_string(),
        severity,
        changes: vec![IniChange {
            section: String::new(),
            key: None,
            severity,
            detail: detail.to_string(),
            reference: None,
            value: None,
            delta: None,
        }],
    }
}

fn classify_data_change(sub: &Submission<'_>, reference: &ReferenceCarSpec, rel: &str) -> FileModification {
    let ref_file = reference.path.join(rel);
    if !rel.to_lowercase().ends_with(".ini") || !ref_file.is_file() {
        return single_change(rel, Severity::High, "Binary change");
    }
    let submitted = submitted_doc(sub, rel);
    let reference_doc = load_doc(&ref_file);
    ini_diff::diff_documents(rel, &submitted, &reference_doc)
        .unwrap_or_else(|| single_change(rel, Severity::Low, "Formatting change"))
}

fn check_hashes(sub: &Submission<'_>, reference: &ReferenceCarSpec, diag: &mut Diagnostics) {
    for (rel, expected) in &reference.hashed_files {
        let path = sub.root.join(rel);
        if !path.is_file() {
            continue;
        }
        let actual = match hashing::sha1_file(&path) {
            Ok(digest) => digest,
            Err(e) => {
                tracing::warn!(error = %e, "cannot hash submitted file");
                continue;
            }
        };
        if &actual == expected {
            continue;
        }
        let lower = rel.to_lowercase();
        diag.info.data_files.hash_mismatches.push(HashMismatch {
            path: rel.clone(),
            expected: expected.clone(),
            actual,
        });
        if lower == "collider.kn5" {
            diag.violation("Collider KN5 differs from reference (collider.kn5)");
            diag.info.data_files.collider_hash_mismatch = true;
        } else if lower.starts_with("data/") {
            let modification = classify_data_change(sub, reference, rel);
            diag.violation(format!("Data file changed ({}) {rel}", modification.severity));
            diag.info.data_files.whitelist_ok = Some(false);
            diag.info.data_files.modifications.push(modification);
        } else if lower.starts_with("extension/") {
            diag.info.data_files.extension_hash_mismatches.push(rel.clone());
        }
    }
}

fn check_extension(sub: &Submission<'_>, diag: &mut Diagnostics) {
    let expected = sub.reference.is_some_and(|r| {
        r.hashed_files.keys().any(|k| k.starts_with("extension/"))
    });
    let Some(summary) = extension::summarize(sub.root, expected) else {
        return;
    };
    match summary.status {
        ExtensionStatus::Flagged => {
            let details = summary
                .physics
                .iter()
                .take(EXTENSION_DETAIL_LIMIT)
                .map(|f| format!("{} ({})", f.file, f.reason))
                .collect::<Vec<_>>()
                .join("; ");
            diag.violation(format!("Extension folder contains potential physics overrides: {details}"));
        }
        ExtensionStatus::Missing => diag.violation("Expected extension config missing (extension/)"),
        ExtensionStatus::NeedsReview | ExtensionStatus::Cosmetic => {}
    }
    diag.info.extension = Some(summary);
}

fn check_root(car_root: &Path, reference: Option<&ReferenceCarSpec>, diag: &mut Diagnostics) {
    let (dirs, files) = entries(car_root);
    let mut inv = RootInventory {
        directories: dirs.iter().cloned().collect(),
        files: files.iter().cloned().collect(),
        ..RootInventory::default()
    };
    inv.suspicious_dirs = dirs
        .iter()
        .filter(|d| SUSPICIOUS_ROOT_DIRS.contains(&d.to_lowercase().as_str()))
        .cloned()
        .collect();
    inv.suspicious_files = files
        .iter()
        .filter(|f| SUSPICIOUS_ROOT_FILE_EXTS.contains(&extension_of(f).as_str()))
        .cloned()
        .collect();

    let mut messages = Vec::new();
    if !inv.suspicious_dirs.is_empty() {
        messages.push(format!("Suspicious root directories: {}", inv.suspicious_dirs.join(", ")));
    }
    if !inv.suspicious_files.is_empty() {
        messages.push(format!("Suspicious root files: {}", inv.suspicious_files.join(", ")));
    }

    let (ref_dirs, ref_files) = reference
        .map(|r| entries(&r.path))
        .unwrap_or_default();

    if !ref_dirs.is_empty() {
        let safe_extra = |d: &String| SAFE_EXTRA_ROOT_DIRS.contains(&d.to_lowercase().as_str());
        let safe_missing = |d: &String| SAFE_MISSING_ROOT_DIRS.contains(&d.to_lowercase().as_str());
        let (ignored, extra): (Vec<String>, Vec<String>) = dirs.difference(&ref_dirs).cloned().partition(safe_extra);
        inv.ignored_extra_dirs = ignored;
        inv.extra_dirs = extra;
        let (ignored, missing): (Vec<String>, Vec<String>) = ref_dirs.difference(&dirs).cloned().partition(safe_missing);
        inv.ignored_missing_dirs = ignored;
        inv.missing_dirs = missing;
        if !inv.extra_dirs.is_empty() {
            messages.push(format!("Unexpected root directories: {}", head(&inv.extra_dirs)));
        }
        if !inv.missing_dirs.is_empty() {
            messages.push(format!("Missing root directories vs reference: {}", head(&inv.missing_dirs)));
        }
    }
    if !ref_files.is_empty() {
        let safe = |f: &String| SAFE_ROOT_FILE_EXTS.contains(&extension_of(f).as_str());
        let (ignored, extra): (Vec<String>, Vec<String>) = files.difference(&ref_files).cloned().partition(safe);
        inv.ignored_extra_files = ignored;
        inv.extra_files = extra;
        let (ignored, missing): (Vec<String>, Vec<String>) = ref_files.difference(&files).cloned().partition(safe);
        inv.ignored_missing_files = ignored;
        inv.missing_files = missing;
        if !inv.extra_files.is_empty() {
            messages.push(format!("Unexpected root files: {}", head(&inv.extra_files)));
        }
        if !inv.missing_files.is_empty() {
            messages.push(format!("Missing root files vs reference: {}", head(&inv.missing_files)));
        }
    }

    for m in messages {
        diag.violation(m);
    }
    diag.info.root = inv;
}

fn head(items: &[String]) -> String {
    items
        .iter()
        .take(ROOT_LIST_LIMIT)
        .cloned()
        .collect::<Vec<_>>()
        .join(", ")
}
