//! Structured diff of a submitted INI against its reference copy.
//!
//! Each section/key change carries a severity; the file takes the highest.

use crate::domain::models::{FileModification, IniChange, Severity};
use crate::ini::ConfigDocument;
use std::collections::BTreeMap;

/// Absorbs float noise so values sitting on a band edge land inside it.
const BAND_EPSILON: f64 = 1e-9;

/// Relative bands when the reference is non-zero, absolute bands otherwise.
pub fn severity_from_delta(delta: f64, reference: f64) -> Severity {
    let (value, low, medium) = if reference.abs() > 1e-6 {
        (delta.abs() / reference.abs(), 0.02, 0.1)
    } else {
        (delta.abs(), 0.01, 0.05)
    };
    if !value.is_finite() {
        Severity::High
    } else if value <= low + BAND_EPSILON {
        Severity::Low
    } else if value <= medium + BAND_EPSILON {
        Severity::Medium
    } else {
        Severity::High
    }
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.trim()
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

fn lowered<'a, I: Iterator<Item = &'a str>>(names: I) -> BTreeMap<String, &'a str> {
    names.map(|n| (n.to_ascii_lowercase(), n)).collect()
}

/// Structured diff of two INI documents. `None` when nothing differs.
pub fn diff_documents(path: &str, submitted: &ConfigDocument, reference: &ConfigDocument) -> Option<FileModification> {
    let mut changes = Vec::new();
    let sub_secs = lowered(submitted.section_names());
    let ref_secs = lowered(reference.section_names());
    let mut all: Vec<&String> = sub_secs.keys().chain(ref_secs.keys()).collect();
    all.sort();
    all.dedup();

    let change = |section: &str, key: Option<&str>, severity, detail: &str| IniChange {
        section: section.to_string(),
        key: key.map(str::to_string),
        severity,
        detail: detail.to_string(),
        reference: None,
        value: None,
        delta: None,
    };

    for lower in all {
        let (sub_name, ref_name) = match (sub_secs.get(lower), ref_secs.get(lower)) {
            (None, Some(r)) => {
                changes.push(change(r, None, Severity::High, "Section removed"));
                continue;
            }
            (Some(s), None) => {
                changes.push(change(s, None, Severity::High, "New section added"));
                continue;
            }
            (Some(s), Some(r)) => (*s, *r),
            (None, None) => continue,
        };
        let (Some(sub_sec), Some(ref_sec)) = (submitted.section(sub_name), reference.section(ref_name)) else {
            continue;
        };
        let sub_keys = lowered(sub_sec.entries().map(|(k, _)| k));
        let ref_keys = lowered(ref_sec.entries().map(|(k, _)| k));
        let mut keys: Vec<&String> = sub_keys.keys().chain(ref_keys.keys()).collect();
        keys.sort();
        keys.dedup();

        for key_lower in keys {
            match (sub_keys.get(key_lower), ref_keys.get(key_lower)) {
                (None, Some(rk)) => changes.push(IniChange {
                    reference: ref_sec.get(rk).map(str::to_string),
                    ..change(sub_name, Some(rk), Severity::High, "Key removed")
                }),
                (Some(sk), None) => changes.push(IniChange {
                    value: sub_sec.get(sk).map(str::to_string),
                    ..change(sub_name, Some(sk), Severity::High, "Key added")
                }),
                (Some(sk), Some(rk)) => {
                    let sv = sub_sec.get(sk).unwrap_or_default();
                    let rv = ref_sec.get(rk).unwrap_or_default();
                    if sv == rv {
                        continue;
                    }
                    match (parse_number(sv), parse_number(rv)) {
                        (Some(a), Some(b)) => {
                            if a == b {
                                continue;
                            }
                            let delta = a - b;
                            changes.push(IniChange {
                                reference: Some(rv.to_string()),
                                value: Some(sv.to_string()),
                                delta: Some(delta),
                                ..change(sub_name, Some(sk), severity_from_delta(delta, b), "Value changed")
                            });
                        }
                        _ => {
                            if sv.eq_ignore_ascii_case(rv) {
                                continue;
                            }
                            changes.push(IniChange {
                                reference: Some(rv.to_string()),
                                value: Some(sv.to_string()),
                                ..change(sub_name, Some(sk), Severity::Medium, "String changed")
                            });
                        }
                    }
                }
                (None, None) => {}
            }
        }
    }

    let severity = changes.iter().map(|c| c.severity).max()?;
    Some(FileModification {
        path: path.to_string(),
        severity,
        changes,
    })
}
