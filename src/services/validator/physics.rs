//! Chassis, gearing and tyre extraction plus the rulebook and
//! reference-delta checks that apply to them.

use super::{Diagnostics, Submission};
use crate::domain::constants::{
    COLLIDER_LENGTH_MARGIN_M, COLLIDER_WIDTH_MARGIN_M, DRIFT_FINAL_DRIVE_BAND, DRIFT_THIRD_GEAR_BAND,
    FINAL_RATIO, FUEL_AXLE_CLEARANCE_M, TOL_FRONT_BIAS, TOL_FUEL_TANK_M, TOL_GEAR_RATIO, TOL_LENGTH_M,
    TOL_MASS_KG, TOL_RULEBOOK_FRONT_BIAS, TOL_STEER_LOCK_DEG, TOL_STEER_RATIO, TOL_TYRE_CONTACT_REF,
    TOL_TYRE_WIDTH_MM, TOL_WHEEL_ANGLE_DEG, WHEELBASE,
};
use crate::domain::models::SpecUnit;
use crate::ini::ConfigDocument;
use crate::services::reference_index::collider_boxes;
use crate::services::steering::round2;

fn display_opt(v: Option<f64>) -> String {
    v.map(|v| v.to_string()).unwrap_or_else(|| "missing".to_string())
}

/// Placement flags for `FUELTANK.POSITION`, deduplicated in order.
pub(crate) fn fuel_tank_flags(pos: [f64; 3], axles: Option<(f64, f64)>) -> Vec<String> {
    let [x, y, z] = pos;
    let mut flags = Vec::new();
    if x.abs() > 0.35 {
        flags.push(format!("lateral offset {x:+.2} m from centerline"));
    }
    if !(-0.45..=0.45).contains(&y) {
        flags.push(format!("vertical position {y:+.2} m outside -0.45 to 0.45 m window"));
    }
    if z > -0.5 {
        flags.push(format!("forward placement {z:+.2} m (should sit behind cockpit)"));
    }
    if z.abs() < 0.7 {
        flags.push(format!("too close to CG/driver zone (|z|={:.2} m)", z.abs()));
    }
    if z < -2.6 {
        flags.push(format!("very far rear placement {z:+.2} m from origin"));
    }
    if let Some((front, rear)) = axles {
        if front < FUEL_AXLE_CLEARANCE_M || rear < FUEL_AXLE_CLEARANCE_M {
            flags.push(format!(
                "too close to axle plane (front Δ={front:.2} m, rear Δ={rear:.2} m)"
            ));
        }
    }
    let mut seen = std::collections::HashSet::new();
    flags.retain(|f| seen.insert(f.clone()));
    flags
}

pub(super) fn check(sub: &Submission<'_>, diag: &mut Diagnostics) {
    let rb = sub.rulebook;
    let reference = sub.reference;
    let car = sub.docs.get("car.ini");
    let susp = sub.docs.get("suspensions.ini");
    let drive = sub.docs.get("drivetrain.ini");

    let dtype = drive
        .get_str("TRACTION", "TYPE")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    diag.info.physics.drivetrain = dtype.clone();
    if rb.require_rwd && !dtype.as_deref().is_some_and(|t| t.eq_ignore_ascii_case("RWD")) {
        diag.violation(format!(
            "Drivetrain TYPE={} (expected RWD) (data/drivetrain.ini:TRACTION)",
            dtype.as_deref().unwrap_or_default()
        ));
    }
    if let Some(ref_type) = reference.and_then(|r| r.drivetrain_type.clone()) {
        if let Some(t) = &dtype {
            if !t.eq_ignore_ascii_case(ref_type.trim()) {
                diag.violation(format!("Drivetrain TYPE differs from reference: {t} vs {ref_type}"));
            }
        }
        diag.info.physics.reference_drivetrain = Some(ref_type);
    }

    let total_mass = car.get_float("BASIC", "TOTALMASS");
    diag.info.physics.total_mass = total_mass;
    if let Some(min) = rb.min_total_mass_kg {
        if total_mass.unwrap_or(0.0) < min {
            diag.violation(format!(
                "TOTALMASS {} kg (min {min} kg) (data/car.ini:BASIC)",
                display_opt(total_mass)
            ));
        }
    }

    let steer_lock = car.get_float("CONTROLS", "STEER_LOCK");
    let steer_ratio = car.get_float("CONTROLS", "STEER_RATIO");
    diag.info.physics.steer_lock = steer_lock;
    diag.info.physics.steer_ratio = steer_ratio;
    diag.info.physics.linear_steer_rod_ratio = car.get_float("CONTROLS", "LINEAR_STEER_ROD_RATIO");
    let derived = match (steer_lock, steer_ratio) {
        (Some(l), Some(r)) if r > 0.0 => Some(round2(l / r)),
        _ => None,
    };
    diag.info.steering.derived_wheel_angle_deg = derived;

    let wheelbase = susp.first_float(WHEELBASE);
    let front_track = susp.get_float("FRONT", "TRACK");
    let rear_track = susp.get_float("REAR", "TRACK");
    let cg = susp.get_float("BASIC", "CG_LOCATION");
    {
        let p = &mut diag.info.physics;
        p.wheelbase = wheelbase;
        p.front_track = front_track;
        p.rear_track = rear_track;
        p.front_bias = cg;
        p.front_toe_out = susp.get_float("FRONT", "TOE_OUT");
    }
    if let (Some(cg), Some(target)) = (cg, rb.front_bias_target) {
        if (cg - target).abs() > TOL_RULEBOOK_FRONT_BIAS {
            diag.violation(format!(
                "Front bias CG_LOCATION={cg:.3} expected {target:.3} (data/suspensions.ini:BASIC)"
            ));
        }
    }

    let fuel = car.get_vec3("FUELTANK", "POSITION");
    if let Some(pos) = fuel {
        let axles = match (wheelbase, cg) {
            (Some(wb), Some(cg)) if wb > 0.0 => {
                let front_axle = wb * cg;
                let rear_axle = -wb * (1.0 - cg);
                Some(((pos[2] - front_axle).abs(), (pos[2] - rear_axle).abs()))
            }
            _ => None,
        };
        let flags = fuel_tank_flags(pos, axles);
        if !flags.is_empty() {
            diag.violation(format!(
                "Fuel tank POSITION={} flagged: {} (data/car.ini:FUELTANK)",
                car.get_str("FUELTANK", "POSITION").unwrap_or_default(),
                flags.join("; ")
            ));
        }
        let tank = &mut diag.info.physics.fuel_tank;
        tank.position = Some(pos);
        tank.distance_to_front_axle = axles.map(|a| a.0);
        tank.distance_to_rear_axle = axles.map(|a| a.1);
        tank.flags = flags;
    }

    check_colliders(sub.docs.get("colliders.ini"), wheelbase, front_track, rear_track, diag);

    let r = |f: fn(&crate::services::reference_index::ReferenceCarSpec) -> Option<f64>| reference.and_then(f);
    diag.compare_spec("total_mass", total_mass, r(|s| s.total_mass), "Total mass", SpecUnit::Kg, TOL_MASS_KG);
    diag.compare_spec("wheelbase", wheelbase, r(|s| s.wheelbase), "Wheelbase", SpecUnit::M, TOL_LENGTH_M);
    diag.compare_spec("front_track", front_track, r(|s| s.front_track), "Front track", SpecUnit::M, TOL_LENGTH_M);
    diag.compare_spec("rear_track", rear_track, r(|s| s.rear_track), "Rear track", SpecUnit::M, TOL_LENGTH_M);
    diag.compare_spec(
        "front_bias",
        cg,
        r(|s| s.cg_location),
        "Front bias (CG_LOCATION)",
        SpecUnit::Ratio,
        TOL_FRONT_BIAS,
    );
    diag.compare_spec("steer_lock", steer_lock, r(|s| s.steer_lock), "STEER_LOCK", SpecUnit::Deg, TOL_STEER_LOCK_DEG);
    diag.compare_spec("steer_ratio", steer_ratio, r(|s| s.steer_ratio), "STEER_RATIO", SpecUnit::Ratio, TOL_STEER_RATIO);
    diag.compare_spec(
        "steer_angle",
        derived,
        r(|s| s.steer_max_wheel_deg.map(round2)),
        "Max wheel angle",
        SpecUnit::Deg,
        TOL_WHEEL_ANGLE_DEG,
    );
    if let (Some(pos), Some(ref_pos)) = (fuel, reference.and_then(|s| s.fuel_tank_pos)) {
        for (i, axis) in ["x", "y", "z"].iter().enumerate() {
            diag.compare_spec(
                &format!("fuel_tank_{axis}"),
                Some(pos[i]),
                Some(ref_pos[i]),
                &format!("Fuel tank {} position", axis.to_uppercase()),
                SpecUnit::M,
                TOL_FUEL_TANK_M,
            );
        }
    }
}

fn check_colliders(
    colliders: &ConfigDocument,
    wheelbase: Option<f64>,
    front_track: Option<f64>,
    rear_track: Option<f64>,
    diag: &mut Diagnostics,
) {
    let max_width = match (front_track, rear_track) {
        (Some(f), Some(r)) => Some(f.max(r) + COLLIDER_WIDTH_MARGIN_M),
        _ => None,
    };
    let max_length = wheelbase.map(|wb| wb + COLLIDER_LENGTH_MARGIN_M);
    for (name, bx) in collider_boxes(colliders) {
        let [sx, _, sz] = bx.size;
        let mut out = false;
        if let Some(max) = max_width.filter(|m| sx > *m) {
            diag.violation(format!(
                "Collider {name} width {sx:.3} > track+0.2 (max {max:.3}) (data/colliders.ini)"
            ));
            out = true;
        }
        if let Some(max) = max_length.filter(|m| sz > *m) {
            diag.violation(format!(
                "Collider {name} length {sz:.3} > wheelbase+0.8 (max {max:.3}) (data/colliders.ini)"
            ));
            out = true;
        }
        if out {
            diag.info.physics.colliders_out_of_bounds.push(name);
        }
    }
}

fn gear_ratio(drive: &ConfigDocument, idx: i64) -> Option<f64> {
    drive
        .get_float("GEARS", &format!("GEAR_{idx}"))
        .or_else(|| drive.get_float("GEARS", &format!("GEAR{idx}")))
}

pub(super) fn check_gearing(sub: &Submission<'_>, diag: &mut Diagnostics) {
    let drive = sub.docs.get("drivetrain.ini");
    let final_drive = drive.first_float(FINAL_RATIO);
    let count = drive.get_int("GEARS", "COUNT").unwrap_or(0);

    let mut nominal = Vec::new();
    let mut overall = Vec::new();
    if let Some(fd) = final_drive.filter(|_| count > 0) {
        for idx in 1..=count {
            if let Some(g) = gear_ratio(drive, idx) {
                nominal.push(g);
                overall.push(g.abs() * fd.abs());
            }
        }
    }
    let third = overall.get(2).copied();
    let fourth = overall.get(3).copied();
    let reference_overall = sub.reference.map(|r| r.overall_ratios()).unwrap_or_default();

    diag.compare_spec(
        "final_drive_ratio",
        final_drive,
        sub.reference.and_then(|r| r.final_ratio),
        "Final drive ratio",
        SpecUnit::Ratio,
        TOL_GEAR_RATIO,
    );
    diag.compare_spec(
        "third_gear_overall",
        third,
        reference_overall.get(2).copied(),
        "3rd gear overall ratio",
        SpecUnit::Ratio,
        TOL_GEAR_RATIO,
    );
    diag.compare_spec(
        "fourth_gear_overall",
        fourth,
        reference_overall.get(3).copied(),
        "4th gear overall ratio",
        SpecUnit::Ratio,
        TOL_GEAR_RATIO,
    );

    let outside = |v: f64, (lo, hi): (f64, f64)| v < lo || v > hi;
    let g = &mut diag.info.gearing;
    g.drift_third_warn = third.map(|t| outside(t, DRIFT_THIRD_GEAR_BAND));
    g.drift_final_warn = final_drive.map(|f| outside(f, DRIFT_FINAL_DRIVE_BAND));
    g.nominal = nominal;
    g.overall = overall;
    g.final_drive = final_drive;
    g.third_overall = third;
    g.fourth_overall = fourth;
    g.reference_overall = reference_overall;
}

#[derive(Default)]
struct AxleTyre {
    width: Option<f64>,
    dx_ref: Option<f64>,
    dy_ref: Option<f64>,
}

impl AxleTyre {
    fn absorb(&mut self, doc: &ConfigDocument, section: &str) {
        if self.width.is_none() {
            self.width = doc.get_float(section, "WIDTH").filter(|w| *w != 0.0);
        }
        if self.dx_ref.is_none() {
            self.dx_ref = doc.get_float(section, "DX_REF");
        }
        if self.dy_ref.is_none() {
            self.dy_ref = doc.get_float(section, "DY_REF");
        }
    }
}

fn to_mm(width_m: f64) -> i64 {
    (width_m * 1000.0).round() as i64
}

pub(super) fn check_tyres(sub: &Submission<'_>, diag: &mut Diagnostics) {
    let tyres = sub.docs.get("tyres.ini");
    let mut front = AxleTyre::default();
    let mut rear = AxleTyre::default();
    for name in tyres.section_names() {
        let upper = name.to_uppercase();
        if upper.starts_with("FRONT") {
            front.absorb(tyres, name);
        }
        if upper.starts_with("REAR") {
            rear.absorb(tyres, name);
        }
    }

    let front_mm = front.width.map(to_mm);
    let rear_mm = rear.width.map(to_mm);
    {
        let t = &mut diag.info.tyres;
        t.front_width_mm = front_mm;
        t.rear_width_mm = rear_mm;
        t.front_dx_ref = front.dx_ref;
        t.rear_dx_ref = rear.dx_ref;
        t.front_dy_ref = front.dy_ref;
        t.rear_dy_ref = rear.dy_ref;
    }

    let compound = sub.reference.and_then(|r| r.tyre_compounds.first());
    diag.compare_spec(
        "front_tyre_width_mm",
        front_mm.map(|v| v as f64),
        compound.and_then(|c| c.width_front).map(|w| to_mm(w) as f64),
        "Front tyre width",
        SpecUnit::Mm,
        TOL_TYRE_WIDTH_MM,
    );
    diag.compare_spec(
        "rear_tyre_width_mm",
        rear_mm.map(|v| v as f64),
        compound.and_then(|c| c.width_rear).map(|w| to_mm(w) as f64),
        "Rear tyre width",
        SpecUnit::Mm,
        TOL_TYRE_WIDTH_MM,
    );

    if let Some(c) = compound {
        let pairs = [
            ("Front", "DX_REF", front.dx_ref, c.dx_ref_front),
            ("Rear", "DX_REF", rear.dx_ref, c.dx_ref_rear),
            ("Front", "DY_REF", front.dy_ref, c.dy_ref_front),
            ("Rear", "DY_REF", rear.dy_ref, c.dy_ref_rear),
        ];
        for (axle, field, value, reference) in pairs {
            if let (Some(v), Some(r)) = (value, reference) {
                if (v - r).abs() > TOL_TYRE_CONTACT_REF {
                    diag.violation(format!(
                        "{axle} tyre {field} {v:.4} differs from reference {r:.4} (data/tyres.ini)"
                    ));
                }
            }
        }
    }

    let rb = sub.rulebook;
    if let (Some(max), Some(w)) = (rb.rear_tyre_max_mm, rear.width) {
        if w * 1000.0 > max as f64 + 1e-6 {
            diag.violation(format!(
                "Rear tyre WIDTH {:.0}mm (max {max}mm) (data/tyres.ini)",
                w * 1000.0
            ));
        }
    }
    if let (Some((lo, hi)), Some(w)) = (rb.front_tyre_range_mm, front.width) {
        let mm = w * 1000.0;
        if mm < lo as f64 - 1e-6 || mm > hi as f64 + 1e-6 {
            diag.violation(format!("Front tyre WIDTH {mm:.0}mm (expected {lo}-{hi}mm) (data/tyres.ini)"));
        }
    }
}
