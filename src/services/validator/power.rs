//! Power/torque extraction and drift performance heuristics (advisory only).

use super::{Diagnostics, Submission};
use crate::domain::constants::{DRIFT_HP_6500, DRIFT_TORQUE_4000_NM, DRIFT_TORQUE_5500_NM, WATTS_PER_HP};
use crate::domain::models::{PowerPeak, PowerSource};
use crate::lut::{self, Curve};

/// Torque in Nm from horsepower at `rpm`. Non-positive inputs give 0.
pub fn hp_to_torque(hp: f64, rpm: f64) -> f64 {
    if hp <= 0.0 || rpm <= 0.0 {
        return 0.0;
    }
    hp * WATTS_PER_HP / (2.0 * std::f64::consts::PI * (rpm / 60.0))
}

fn ui_curve_max(ui: &serde_json::Value, key: &str) -> Option<f64> {
    let points = ui.get(key)?.as_array()?;
    points
        .iter()
        .filter_map(|p| {
            let y = p.as_array()?.get(1)?;
            y.as_f64().or_else(|| y.as_str().and_then(|s| s.trim().parse().ok()))
        })
        .fold(None, |acc: Option<f64>, y| Some(acc.map_or(y, |a| a.max(y))))
}

fn torque_max(curve: &Curve) -> Option<f64> {
    curve
        .iter()
        .map(|&(rpm, hp)| hp_to_torque(hp, if rpm > 0.0 { rpm } else { 1.0 }))
        .fold(None, |acc: Option<f64>, t| Some(acc.map_or(t, |a| a.max(t))))
}

pub(super) fn check(sub: &Submission<'_>, diag: &mut Diagnostics) {
    let p = &mut diag.info.power;
    p.ui_power_max_hp = ui_curve_max(&sub.ui, "powerCurve");
    p.ui_torque_max_nm = ui_curve_max(&sub.ui, "torqueCurve");

    let lut_path = sub.root.join("data").join("power.lut");
    let curve = match lut::parse(&lut_path) {
        Ok(curve) => Some(curve),
        Err(e) if e.is_not_found() => None,
        Err(e) => {
            tracing::warn!(error = %e, "power.lut unreadable");
            None
        }
    };

    if let Some(curve) = curve.filter(|c| !c.is_empty()) {
        let (rpm, hp) = lut::peak(&curve);
        p.lut_peak = Some(PowerPeak { rpm, hp });
        p.lut_power_max_hp = Some(hp);
        p.lut_torque_max_nm = torque_max(&curve);

        let at = |rpm: f64| lut::interpolate(&curve, rpm).unwrap_or(0.0);
        let t4000 = hp_to_torque(at(4000.0), 4000.0);
        let t5500 = hp_to_torque(at(5500.0), 5500.0);
        let hp6500 = at(6500.0);
        p.torque_at_4000 = Some(t4000);
        p.torque_at_5500 = Some(t5500);
        p.hp_at_6500 = Some(hp6500);
        p.drift_torque_warn =
            Some(t4000 < DRIFT_TORQUE_4000_NM || t5500 < DRIFT_TORQUE_5500_NM || hp6500 < DRIFT_HP_6500);
    }

    (p.source, p.peak_hp) = match (p.ui_power_max_hp, p.lut_power_max_hp) {
        (Some(ui), _) => (Some(PowerSource::UiJson), Some(ui)),
        (None, Some(lut)) => (Some(PowerSource::PowerLut), Some(lut)),
        (None, None) => (None, None),
    };
}
