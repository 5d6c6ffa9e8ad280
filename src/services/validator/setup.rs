use super::{Diagnostics, Submission};
use crate::domain::models::SetupRange;
use crate::services::reference_index::load_doc;
use std::collections::BTreeMap;

const TOE_SECTIONS: [&str; 4] = ["TOE_OUT_LF", "TOE_OUT_RF", "TOE_OUT_LR", "TOE_OUT_RR"];
const RANGE_TOLERANCE: f64 = 1e-6;
const MISSING_LIST_LIMIT: usize = 10;

fn reaches_zero(range: Option<&SetupRange>) -> Option<bool> {
    let r = range?;
    let (lo, hi) = (r.min.min(r.max), r.min.max(r.max));
    Some(lo - 1e-9 <= 0.0 && 0.0 <= hi + 1e-9)
}

pub(super) fn check(sub: &Submission<'_>, diag: &mut Diagnostics) {
    let Some(setup) = sub.docs.parsed("setup.ini") else {
        return;
    };
    let reference = sub
        .reference
        .map(|r| r.path.join("data").join("setup.ini"))
        .filter(|p| p.is_file())
        .map(|p| load_doc(&p));

    let mut locked = Vec::new();
    let mut toe_ranges = BTreeMap::new();
    let mut issues = Vec::new();

    for section in setup.sections() {
        let name = section.name();
        let ref_section = reference.as_ref().and_then(|r| r.section(name));
        if reference.is_some() && ref_section.is_none() {
            issues.push(format!("Unexpected setup section vs reference: [{name}]"));
        }
        let min = setup.get_float(name, "MIN");
        let max = setup.get_float(name, "MAX");
        if let (Some(min), Some(max)) = (min, max) {
            if (min - max).abs() < 1e-9 {
                locked.push(name.to_string());
            }
            let upper = name.to_uppercase();
            if TOE_SECTIONS.contains(&upper.as_str()) {
                toe_ranges.insert(upper, SetupRange { min, max });
            }
        }
        let Some(ref_section) = ref_section else {
            continue;
        };
        let ref_min = ref_section.get("MIN").and_then(crate::ini::parse_f64);
        let ref_max = ref_section.get("MAX").and_then(crate::ini::parse_f64);
        if let (Some(v), Some(r)) = (min, ref_min) {
            if v < r - RANGE_TOLERANCE {
                issues.push(format!("Setup [{name}] MIN {v} < reference {r}"));
            }
        }
        if let (Some(v), Some(r)) = (max, ref_max) {
            if v > r + RANGE_TOLERANCE {
                issues.push(format!("Setup [{name}] MAX {v} > reference {r}"));
            }
        }
    }

    if let Some(reference) = &reference {
        let missing: Vec<&str> = reference
            .section_names()
            .filter(|n| !setup.has_section(n))
            .collect();
        if !missing.is_empty() {
            let mut sorted = missing;
            sorted.sort_by_key(|n| n.to_lowercase());
            let shown: Vec<&str> = sorted.into_iter().take(MISSING_LIST_LIMIT).collect();
            issues.push(format!("Setup missing sections vs reference: {}", shown.join(", ")));
        }
    }

    let zero = match (
        reaches_zero(toe_ranges.get("TOE_OUT_LF")),
        reaches_zero(toe_ranges.get("TOE_OUT_RF")),
    ) {
        (Some(l), Some(r)) => Some(l && r),
        (l, r) => l.or(r),
    };

    for issue in &issues {
        diag.violation(issue.clone());
    }
    let info = &mut diag.info.setup;
    info.present = true;
    info.locked = locked;
    info.toe_ranges = toe_ranges;
    info.toe_zero_reachable = zero;
    info.range_issues = issues;
}
