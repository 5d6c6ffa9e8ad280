//! Exact physics fingerprinting.
//!
//! A fingerprint is the raw string value of every option in the eight
//! whitelisted physics files. Comparison is on normalized strings only:
//! no numeric coercion, so `1.0` and `1.00` differ. The sole relaxations
//! are two cosmetic mesh-offset fields (see [`graphics_offset_relaxed`]).

use crate::domain::constants::FINGERPRINT_FILES;
use crate::ini::ConfigDocument;
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::OnceLock;

/// file → section → option → raw value.
pub type Fingerprint = BTreeMap<String, BTreeMap<String, BTreeMap<String, String>>>;

const CAR_GRAPHICS_OFFSET_TOLERANCE: f64 = 0.12;
const SUSP_GRAPHICS_OFFSET_TOLERANCE: f64 = 0.05;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairComparison {
    pub exact: bool,
    pub mismatches: Vec<String>,
    pub equal: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct BestMatch {
    pub matched_key: Option<String>,
    pub exact: bool,
    pub mismatches: Vec<String>,
    pub scores: Vec<CandidateScore>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CandidateScore {
    pub key: String,
    pub equal: usize,
    pub total: usize,
}

/// Reads whichever whitelisted files exist under `car_root/data`.
pub fn collect(car_root: &Path) -> Fingerprint {
    let mut fp = Fingerprint::new();
    for name in FINGERPRINT_FILES {
        let path = car_root.join("data").join(name);
        match ConfigDocument::parse(&path) {
            Ok(doc) => {
                fp.insert(name.to_string(), from_document(&doc));
            }
            Err(e) if e.is_not_found() => {}
            Err(e) => tracing::warn!(error = %e, "fingerprint file unreadable"),
        }
    }
    fp
}

pub fn from_document(doc: &ConfigDocument) -> BTreeMap<String, BTreeMap<String, String>> {
    doc.sections()
        .map(|sec| {
            let opts = sec
                .entries()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            (sec.name().to_string(), opts)
        })
        .collect()
}

/// Cuts at the first `;`, trims, and collapses whitespace runs to one space.
pub fn normalize(value: &str) -> String {
    let head = value.split(';').next().unwrap_or_default();
    head.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn float_tokens(value: &str) -> Vec<f64> {
    static TOKEN: OnceLock<Option<Regex>> = OnceLock::new();
    let Some(re) = TOKEN
        .get_or_init(|| Regex::new(r"[-+]?\d*\.?\d+(?:[eE][-+]?\d+)?").ok())
        .as_ref()
    else {
        return Vec::new();
    };
    re.find_iter(value)
        .filter_map(|m| m.as_str().parse::<f64>().ok())
        .collect()
}

/// `car.ini[BASIC].GRAPHICS_OFFSET` tolerates 0.12 per axis and
/// `suspensions.ini[GRAPHICS_OFFSETS]` tolerates 0.05 on the first scalar.
pub fn graphics_offset_relaxed(file: &str, section: &str, option: &str, sub: &str, reference: &str) -> bool {
    if file.eq_ignore_ascii_case("car.ini")
        && section.eq_ignore_ascii_case("BASIC")
        && option.eq_ignore_ascii_case("GRAPHICS_OFFSET")
    {
        let a = float_tokens(sub);
        let b = float_tokens(reference);
        if a.len() < 3 || b.len() < 3 {
            return false;
        }
        return (0..3).all(|i| (a[i] - b[i]).abs() <= CAR_GRAPHICS_OFFSET_TOLERANCE);
    }
    if file.eq_ignore_ascii_case("suspensions.ini") && section.eq_ignore_ascii_case("GRAPHICS_OFFSETS") {
        let a = float_tokens(sub);
        let b = float_tokens(reference);
        return match (a.first(), b.first()) {
            (Some(x), Some(y)) => (x - y).abs() <= SUSP_GRAPHICS_OFFSET_TOLERANCE,
            _ => false,
        };
    }
    false
}

fn union<'a, V>(a: Option<&'a BTreeMap<String, V>>, b: Option<&'a BTreeMap<String, V>>) -> BTreeSet<&'a str> {
    a.into_iter()
        .chain(b)
        .flat_map(|m| m.keys().map(String::as_str))
        .collect()
}

/// Compares over the union of (file, section, option) keys. A key on one
/// side only counts as compared and unequal.
pub fn compare_pair(submitted: &Fingerprint, reference: &Fingerprint) -> PairComparison {
    let mut equal = 0;
    let mut total = 0;
    let mut mismatches = Vec::new();

    for file in union(Some(submitted), Some(reference)) {
        let sub_secs = submitted.get(file);
        let ref_secs = reference.get(file);
        for sec in union(sub_secs, ref_secs) {
            let sub_opts = sub_secs.and_then(|s| s.get(sec));
            let ref_opts = ref_secs.and_then(|s| s.get(sec));
            for opt in union(sub_opts, ref_opts) {
                total += 1;
                let a = sub_opts.and_then(|o| o.get(opt)).map(|v| normalize(v));
                let b = ref_opts.and_then(|o| o.get(opt)).map(|v| normalize(v));
                match (a, b) {
                    (Some(a), Some(b)) => {
                        if a == b || graphics_offset_relaxed(file, sec, opt, &a, &b) {
                            equal += 1;
                        } else {
                            mismatches.push(format!(
                                "{file}[{sec}] {opt}: submitted='{a}' != ref='{b}'"
                            ));
                        }
                    }
                    (a, b) => mismatches.push(format!(
                        "{file}[{sec}] {opt}: submitted={} ref={}",
                        a.as_deref().unwrap_or("None"),
                        b.as_deref().unwrap_or("None"),
                    )),
                }
            }
        }
    }

    PairComparison {
        exact: total > 0 && equal == total,
        mismatches,
        equal,
        total,
    }
}

/// Scores every reference by equal count, then total compared.
///
/// References are visited in ascending key order and a candidate only
/// replaces the current best when it scores strictly higher, so identical
/// scores resolve to the lexicographically smallest reference key.
pub fn compare_to_index(submitted: &Fingerprint, index: &BTreeMap<String, Fingerprint>) -> BestMatch {
    let mut best: Option<(&str, PairComparison)> = None;
    let mut scores = Vec::with_capacity(index.len());

    for (key, reference) in index {
        let cmp = compare_pair(submitted, reference);
        scores.push(CandidateScore {
            key: key.clone(),
            equal: cmp.equal,
            total: cmp.total,
        });
        let better = match &best {
            None => true,
            Some((_, b)) => cmp.equal > b.equal || (cmp.equal == b.equal && cmp.total > b.total),
        };
        if better {
            best = Some((key.as_str(), cmp));
        }
    }

    match best {
        Some((key, cmp)) => BestMatch {
            matched_key: Some(key.to_string()),
            exact: cmp.exact,
            mismatches: cmp.mismatches,
            scores,
        },
        None => BestMatch {
            matched_key: None,
            exact: false,
            mismatches: Vec::new(),
            scores,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fp(entries: &[(&str, &str, &str, &str)]) -> Fingerprint {
        let mut out = Fingerprint::new();
        for (f, s, o, v) in entries {
            out.entry(f.to_string())
                .or_default()
                .entry(s.to_string())
                .or_default()
                .insert(o.to_string(), v.to_string());
        }
        out
    }

    #[test]
    fn reflexive_match_is_exact() {
        let a = fp(&[("car.ini", "BASIC", "TOTALMASS", "1200"), ("engine.ini", "HEADER", "LIMITER", "8000")]);
        let mut index = BTreeMap::new();
        index.insert("ref_a".to_string(), a.clone());
        let best = compare_to_index(&a, &index);
        assert!(best.exact);
        assert_eq!(best.matched_key.as_deref(), Some("ref_a"));
        assert!(best.mismatches.is_empty());
    }

    #[test]
    fn empty_comparison_is_never_exact() {
        let cmp = compare_pair(&Fingerprint::new(), &Fingerprint::new());
        assert_eq!(cmp.total, 0);
        assert!(!cmp.exact);
    }

    #[test]
    fn near_equal_numbers_still_mismatch() {
        let a = fp(&[("car.ini", "BASIC", "TOTALMASS", "1200")]);
        let b = fp(&[("car.ini", "BASIC", "TOTALMASS", "1200.0001")]);
        let cmp = compare_pair(&a, &b);
        assert!(!cmp.exact);
        assert_eq!(
            cmp.mismatches,
            vec!["car.ini[BASIC] TOTALMASS: submitted='1200' != ref='1200.0001'".to_string()]
        );
    }

    #[test]
    fn one_sided_keys_count_as_mismatches() {
        let a = fp(&[("car.ini", "BASIC", "TOTALMASS", "1200")]);
        let b = fp(&[("car.ini", "BASIC", "TOTALMASS", "1200"), ("car.ini", "BASIC", "INERTIA", "1,2,3")]);
        let cmp = compare_pair(&a, &b);
        assert_eq!((cmp.equal, cmp.total), (1, 2));
        assert_eq!(cmp.mismatches, vec!["car.ini[BASIC] INERTIA: submitted=None ref=1,2,3".to_string()]);
    }

    #[test]
    fn graphics_offsets_are_relaxed_only_where_named() {
        let a = fp(&[
            ("car.ini", "BASIC", "GRAPHICS_OFFSET", "0.0, -0.10, 0.05"),
            ("suspensions.ini", "GRAPHICS_OFFSETS", "WHEEL_LF", "0.01"),
        ]);
        let b = fp(&[
            ("car.ini", "BASIC", "GRAPHICS_OFFSET", "0.1, -0.05, 0.0"),
            ("suspensions.ini", "GRAPHICS_OFFSETS", "WHEEL_LF", "-0.03"),
        ]);
        assert!(compare_pair(&a, &b).exact);

        let far = fp(&[
            ("car.ini", "BASIC", "GRAPHICS_OFFSET", "0.0, -0.10, 0.05"),
            ("suspensions.ini", "GRAPHICS_OFFSETS", "WHEEL_LF", "0.2"),
        ]);
        assert!(!compare_pair(&far, &b).exact);

        let other = fp(&[("car.ini", "BASIC", "GRAPHICS_OFFSET_X", "0.0")]);
        let other_ref = fp(&[("car.ini", "BASIC", "GRAPHICS_OFFSET_X", "0.01")]);
        assert!(!compare_pair(&other, &other_ref).exact);
    }

    #[test]
    fn normalization_strips_comments_and_whitespace() {
        assert_eq!(normalize("  1.0,\t 2.0   ; old"), "1.0, 2.0");
        let a = fp(&[("brakes.ini", "DATA", "MAX_TORQUE", "1800  ; tuned")]);
        let b = fp(&[("brakes.ini", "DATA", "MAX_TORQUE", "1800")]);
        assert!(compare_pair(&a, &b).exact);
    }

    #[test]
    fn ties_resolve_to_smallest_key() {
        let sub = fp(&[("car.ini", "BASIC", "TOTALMASS", "1200")]);
        let r = fp(&[("car.ini", "BASIC", "TOTALMASS", "1300")]);
        let mut index = BTreeMap::new();
        index.insert("zeta".to_string(), r.clone());
        index.insert("alpha".to_string(), r);
        let best = compare_to_index(&sub, &index);
        assert_eq!(best.matched_key.as_deref(), Some("alpha"));
        assert!(!best.exact);
        assert_eq!(best.scores.len(), 2);
    }
}
