use super::{Diagnostics, Submission};
use crate::domain::constants::{STEER_SIDECAR, TOL_REFERENCE_STEER_DEG};
use crate::domain::models::SteeringProvenance;
use crate::error::read_json;
use crate::services::external;
use crate::services::steering::{self as solver, round2};

fn source_label(provenance: SteeringProvenance) -> &'static str {
    match provenance {
        SteeringProvenance::ExternalMeasured
        | SteeringProvenance::ExternalNormalized
        | SteeringProvenance::ExternalNormalizedLow => "analysis/cm_steer.json",
        SteeringProvenance::Geometry => "geometry estimate",
        SteeringProvenance::AckermannInner
        | SteeringProvenance::AckermannOuter
        | SteeringProvenance::IniRatio => "derived from car.ini",
    }
}

pub(super) fn check(sub: &Submission<'_>, diag: &mut Diagnostics) {
    let rb = sub.rulebook;
    let sidecar = sub.root.join(STEER_SIDECAR);

    if !sidecar.is_file() {
        if let Some(template) = &rb.steer_measurement_cmd {
            let outcome = external::run_template(template, sub.root, &sidecar, rb.external_timeout());
            diag.info.steering.measurement_generated = outcome.succeeded() && sidecar.is_file();
        }
    }

    let mut external_raw = None;
    if sidecar.is_file() {
        match read_json(&sidecar).ok().and_then(|v| solver::measurement_from_json(&v)) {
            Some(raw) => external_raw = Some(raw),
            None => diag.violation("Failed to parse analysis/cm_steer.json"),
        }
    }

    let resolution = solver::resolve(sub.docs.get("car.ini"), sub.docs.get("suspensions.ini"), external_raw);
    let steering = &mut diag.info.steering;
    steering.measured = resolution.measured;
    steering.geometry = resolution.geometry;
    steering.ackermann = resolution.ackermann;
    steering.effective = resolution.effective;

    let reference_angle = sub.reference.and_then(|r| {
        r.steer_solution
            .map(|s| s.max_angle())
            .or(r.steer_max_wheel_deg.map(round2))
    });
    if let (Some(angle), Some(reference)) = (steering.effective_angle(), reference_angle) {
        let delta = round2(angle - reference);
        steering.reference_angle_deg = Some(reference);
        steering.reference_delta_deg = Some(delta);
        steering.within_reference_tolerance = Some(delta.abs() <= TOL_REFERENCE_STEER_DEG);
    }

    let message = match (resolution.effective, rb.max_steer_angle_deg) {
        _ if rb.require_steer_measurement && resolution.measured.is_none() => {
            Some(match rb.max_steer_angle_deg {
                Some(max) => format!(
                    "Missing analysis/cm_steer.json for steering validation (required, max {max:.1}°)"
                ),
                None => "Missing analysis/cm_steer.json for steering validation (required)".to_string(),
            })
        }
        (Some(effective), Some(max)) if effective.max_angle() > max + 1e-6 => Some(format!(
            "Measured max wheel angle {:.1}° (max {max:.1}°) ({})",
            effective.max_angle(),
            source_label(effective.provenance)
        )),
        _ => None,
    };
    if let Some(message) = message {
        diag.violation(message);
    }
}
