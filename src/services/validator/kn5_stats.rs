use super::{Diagnostics, Submission};
use crate::domain::constants::{KN5_STATS_SIDECAR, UI_LODS_JSON};
use crate::domain::models::{Kn5Stats, Kn5StatsSource};
use crate::error::read_json;
use crate::services::external;
use crate::services::reference_index::read_lod_triangles;
use serde_json::Value;

fn as_count(v: &Value) -> Option<i64> {
    v.as_i64()
        .or_else(|| v.as_f64().map(|f| f as i64))
        .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
}

/// Totals from the sidecar, either top-level or summed over `files`.
pub(crate) fn stats_from_json(value: &Value) -> Option<Kn5Stats> {
    let obj = value.as_object()?;
    let mut triangles = obj.get("total_triangles").and_then(as_count);
    let mut objects = obj.get("total_objects").and_then(as_count);
    if triangles.is_none() && objects.is_none() {
        let files = obj.get("files")?.as_array()?;
        let sum = |key: &str| -> Option<i64> {
            let counts: Vec<i64> = files.iter().filter_map(|f| f.get(key).and_then(as_count)).collect();
            (!counts.is_empty()).then(|| counts.iter().sum())
        };
        triangles = sum("triangles");
        objects = sum("objects");
    }
    if triangles.is_none() && objects.is_none() {
        return None;
    }
    Some(Kn5Stats {
        total_triangles: triangles,
        total_objects: objects,
        source: Kn5StatsSource::External,
    })
}

pub(super) fn check(sub: &Submission<'_>, diag: &mut Diagnostics) {
    let rb = sub.rulebook;
    let sidecar = sub.root.join(KN5_STATS_SIDECAR);

    if !sidecar.is_file() {
        if let Some(template) = &rb.kn5_stats_cmd {
            if !external::run_template(template, sub.root, &sidecar, rb.external_timeout()).succeeded() {
                tracing::debug!("kn5 stats command produced no sidecar");
            }
        }
    }

    if sidecar.is_file() {
        let Some(stats) = read_json(&sidecar).ok().and_then(|v| stats_from_json(&v)) else {
            diag.violation("Failed to parse analysis/kn5_stats.json");
            return;
        };
        if let (Some(t), Some(max)) = (stats.total_triangles, rb.max_triangles) {
            if t > max {
                diag.violation(format!("Total triangles {t} (max {max}) (analysis/kn5_stats.json)"));
            }
        }
        if let (Some(o), Some(max)) = (stats.total_objects, rb.max_objects) {
            if o > max {
                diag.violation(format!("Total objects {o} (max {max}) (analysis/kn5_stats.json)"));
            }
        }
        diag.info.kn5_stats = Some(stats);
        return;
    }

    if !rb.require_kn5_stats {
        return;
    }
    let lods = read_lod_triangles(&sub.root.join(UI_LODS_JSON));
    let Some(estimate) = lods.values().copied().max() else {
        diag.violation("Missing analysis/kn5_stats.json for model validation (required)");
        return;
    };
    if let Some(max) = rb.max_triangles.filter(|max| estimate > *max) {
        diag.violation(format!("Total triangles {estimate} (max {max}) (ui estimate)"));
    }
    diag.info.kn5_stats = Some(Kn5Stats {
        total_triangles: Some(estimate),
        total_objects: None,
        source: Kn5StatsSource::UiLods,
    });
}
