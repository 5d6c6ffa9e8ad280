//! Road-wheel steering angle resolution.
//!
//! The geometry solver rotates the hub-side tie-rod point about the
//! kingpin axis until the rod length matches the rack travel produced by
//! full steering lock. When geometry is unusable the resolver falls back
//! to an Ackermann approximation and finally to `STEER_LOCK / STEER_RATIO`.

use crate::domain::models::{MeasuredSteer, SteeringProvenance, SteeringSolution};
use crate::domain::constants::WHEELBASE;
use crate::ini::ConfigDocument;
use serde::Serialize;

type Vec3 = [f64; 3];

fn sub(a: Vec3, b: Vec3) -> Vec3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn add(a: Vec3, b: Vec3) -> Vec3 {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

fn scale(a: Vec3, s: f64) -> Vec3 {
    [a[0] * s, a[1] * s, a[2] * s]
}

fn dot(a: Vec3, b: Vec3) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn cross(a: Vec3, b: Vec3) -> Vec3 {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn length(a: Vec3) -> f64 {
    dot(a, a).sqrt()
}

fn unit(a: Vec3) -> Vec3 {
    let l = length(a);
    if l == 0.0 {
        [0.0; 3]
    } else {
        scale(a, 1.0 / l)
    }
}

/// Rodrigues rotation of `point` about the line through `p1` towards `p2`.
fn rotate_about_axis(point: Vec3, p1: Vec3, p2: Vec3, angle: f64) -> Vec3 {
    let p = sub(point, p1);
    let k = unit(sub(p2, p1));
    let (sin, cos) = angle.sin_cos();
    let rotated = add(
        add(scale(p, cos), scale(cross(k, p), sin)),
        scale(k, dot(k, p) * (1.0 - cos)),
    );
    add(rotated, p1)
}

pub(crate) fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

const BRACKET_MIN_DEG: f64 = 5.0;
const BRACKET_MAX_DEG: f64 = 90.0;
const BRACKET_GROWTH: f64 = 1.25;
const BRACKET_STEPS: usize = 10;
const BRACKET_CAP_DEG: f64 = 120.0;
const BISECT_ITERATIONS: usize = 50;
const BISECT_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq)]
pub struct SteeringGeometry {
    pub kingpin_a: Vec3,
    pub kingpin_b: Vec3,
    pub tie_car: Vec3,
    pub tie_hub: Vec3,
    pub steer_lock: f64,
    pub steer_ratio: f64,
    /// Rod travel in metres per radian of steering-wheel input.
    pub rod_ratio: f64,
}

impl SteeringGeometry {
    /// Front-axle geometry, or `None` when any input is missing or degenerate.
    pub fn from_docs(car: &ConfigDocument, susp: &ConfigDocument) -> Option<Self> {
        let kind = susp.get_str("FRONT", "TYPE").unwrap_or_default().to_ascii_uppercase();
        let strut = || {
            Some((
                susp.get_vec3("FRONT", "STRUT_CAR")?,
                susp.get_vec3("FRONT", "STRUT_TYRE")?,
            ))
        };
        let wishbone = || {
            Some((
                susp.get_vec3("FRONT", "WBTYRE_TOP")?,
                susp.get_vec3("FRONT", "WBTYRE_BOTTOM")?,
            ))
        };
        let kingpin = if kind.contains("STRUT") {
            strut()
        } else if kind.contains("DWB") || kind.contains("DOUBLE") || kind.contains("WISH") {
            wishbone().or_else(strut)
        } else {
            strut()
        };
        let (kingpin_a, kingpin_b) = kingpin?;
        let geometry = Self {
            kingpin_a,
            kingpin_b,
            tie_car: susp.get_vec3("FRONT", "WBCAR_STEER")?,
            tie_hub: susp.get_vec3("FRONT", "WBTYRE_STEER")?,
            steer_lock: car.get_float("CONTROLS", "STEER_LOCK")?,
            steer_ratio: car.get_float("CONTROLS", "STEER_RATIO")?,
            rod_ratio: car.get_float("CONTROLS", "LINEAR_STEER_ROD_RATIO")?,
        };
        if geometry.steer_lock <= 0.0 || geometry.steer_ratio <= 0.0 || geometry.rod_ratio == 0.0 {
            return None;
        }
        Some(geometry)
    }

    pub fn rod_length(&self, theta: f64) -> f64 {
        let hub = rotate_about_axis(self.tie_hub, self.kingpin_a, self.kingpin_b, theta);
        length(sub(self.tie_car, hub))
    }

    /// Wheel rotation (radians) at which the rod reaches `target` length.
    fn solve_for(&self, target: f64) -> Option<f64> {
        let f = |theta: f64| self.rod_length(theta) - target;
        let estimate = (self.steer_lock / self.steer_ratio * 1.5).clamp(BRACKET_MIN_DEG, BRACKET_MAX_DEG);
        let cap = BRACKET_CAP_DEG.to_radians();
        let (mut a, mut b) = (0.0_f64, estimate.to_radians());
        let mut fa = f(a);
        let mut fb = f(b);
        let mut steps = 0;
        while fa * fb > 0.0 && b < cap && steps < BRACKET_STEPS {
            b *= BRACKET_GROWTH;
            fb = f(b);
            steps += 1;
        }
        if fa * fb > 0.0 {
            return None;
        }
        for _ in 0..BISECT_ITERATIONS {
            let m = 0.5 * (a + b);
            let fm = f(m);
            if fm.abs() < BISECT_EPSILON {
                return Some(m);
            }
            if fa * fm <= 0.0 {
                b = m;
            } else {
                a = m;
                fa = fm;
            }
        }
        Some(0.5 * (a + b))
    }

    /// Solves both rod directions. A side without a bracket reports 0.0;
    /// `None` only when neither side solves.
    pub fn solve(&self) -> Option<SteeringSolution> {
        let l0 = self.rod_length(0.0);
        let dl = self.rod_ratio * self.steer_lock.to_radians();
        let inner = self.solve_for(l0 + dl);
        let outer = self.solve_for(l0 - dl);
        if inner.is_none() && outer.is_none() {
            return None;
        }
        let deg = |v: Option<f64>| v.map(|r| round2(r.to_degrees())).unwrap_or(0.0);
        Some(SteeringSolution {
            inner_deg: deg(inner),
            outer_deg: deg(outer),
            provenance: SteeringProvenance::Geometry,
        })
    }
}

/// `STEER_LOCK / STEER_RATIO` applied to both wheels.
pub fn naive(steer_lock: f64, steer_ratio: f64) -> Option<SteeringSolution> {
    if steer_ratio <= 0.0 {
        return None;
    }
    let angle = round2((steer_lock / steer_ratio).abs());
    Some(SteeringSolution {
        inner_deg: angle,
        outer_deg: angle,
        provenance: SteeringProvenance::IniRatio,
    })
}

/// Simplified Ackermann split of the ratio-derived angle. Reading the base
/// angle as the inner wheel is preferred; reading it as the outer wheel is
/// used when the first reading is degenerate.
pub fn ackermann(steer_lock: f64, steer_ratio: f64, wheelbase: f64, track: f64) -> Option<SteeringSolution> {
    if steer_ratio <= 0.0 || wheelbase <= 0.0 || track <= 0.0 {
        return None;
    }
    let base_deg = steer_lock / steer_ratio;
    if base_deg == 0.0 {
        return None;
    }
    let base = base_deg.to_radians();
    let half = track / 2.0;
    let pack = |inner: f64, outer: f64, provenance| SteeringSolution {
        inner_deg: round2(inner.abs()),
        outer_deg: round2(outer.abs()),
        provenance,
    };

    let r_inner = wheelbase / base.tan() + half;
    if r_inner > 0.0 {
        let outer = (wheelbase / (r_inner + half)).atan().to_degrees();
        if outer != 0.0 {
            return Some(pack(base_deg, outer, SteeringProvenance::AckermannInner));
        }
    }
    let r_outer = wheelbase / base.tan() - half;
    if r_outer > half {
        let inner = (wheelbase / (r_outer - half)).atan().to_degrees();
        return Some(pack(inner, base_deg, SteeringProvenance::AckermannOuter));
    }
    naive(steer_lock, steer_ratio)
}

/// Reconciles an external reading with the ratio-derived expectation.
/// Readings that echo `STEER_LOCK` or sit far from the expectation are
/// replaced by it.
pub fn normalize_measurement(raw: f64, steer_lock: Option<f64>, steer_ratio: Option<f64>) -> MeasuredSteer {
    let raw = raw.abs();
    let measured = MeasuredSteer {
        raw_deg: raw,
        angle_deg: round2(raw),
        provenance: SteeringProvenance::ExternalMeasured,
    };
    let (Some(lock), Some(ratio)) = (steer_lock, steer_ratio) else {
        return measured;
    };
    if lock == 0.0 || ratio == 0.0 {
        return measured;
    }
    let expected = (lock / ratio).abs();
    let looks_like_lock = raw > 90.0 || (raw - lock).abs() < 5.0;
    if looks_like_lock || raw > expected * 1.5 {
        MeasuredSteer {
            angle_deg: round2(expected),
            provenance: SteeringProvenance::ExternalNormalized,
            ..measured
        }
    } else if raw < expected * 0.75 {
        MeasuredSteer {
            angle_deg: round2(expected),
            provenance: SteeringProvenance::ExternalNormalizedLow,
            ..measured
        }
    } else {
        measured
    }
}

/// Reads `max_wheel_angle_deg`, or the larger of `left_max_deg`/`right_max_deg`.
pub fn measurement_from_json(value: &serde_json::Value) -> Option<f64> {
    let num = |key: &str| {
        let v = value.get(key)?;
        v.as_f64().or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
    };
    if let Some(angle) = num("max_wheel_angle_deg") {
        return Some(angle.abs());
    }
    Some(num("left_max_deg")?.abs().max(num("right_max_deg")?.abs()))
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SteeringResolution {
    pub derived_deg: Option<f64>,
    pub measured: Option<MeasuredSteer>,
    pub geometry: Option<SteeringSolution>,
    pub ackermann: Option<SteeringSolution>,
    pub effective: Option<SteeringSolution>,
}

/// Resolution order: external reading, geometry, Ackermann, ratio.
pub fn resolve(car: &ConfigDocument, susp: &ConfigDocument, external_raw: Option<f64>) -> SteeringResolution {
    let lock = car.get_float("CONTROLS", "STEER_LOCK");
    let ratio = car.get_float("CONTROLS", "STEER_RATIO");
    let derived_deg = match (lock, ratio) {
        (Some(l), Some(r)) if r > 0.0 => Some(round2(l / r)),
        _ => None,
    };
    let measured = external_raw.map(|raw| normalize_measurement(raw, lock, ratio));
    let geometry = SteeringGeometry::from_docs(car, susp).and_then(|g| g.solve());
    let wheelbase = susp.first_float(WHEELBASE);
    let track = susp.get_float("FRONT", "TRACK");
    let ackermann = match (lock, ratio, wheelbase, track) {
        (Some(l), Some(r), Some(wb), Some(t)) => ackermann(l, r, wb, t),
        _ => None,
    };
    let naive_solution = match (lock, ratio) {
        (Some(l), Some(r)) => naive(l, r),
        _ => None,
    };

    let effective = measured
        .map(|m| SteeringSolution {
            inner_deg: m.angle_deg,
            outer_deg: m.angle_deg,
            provenance: m.provenance,
        })
        .or(geometry.filter(|g| g.max_angle() > 0.0))
        .or(ackermann)
        .or(naive_solution);

    SteeringResolution {
        derived_deg,
        measured,
        geometry,
        ackermann,
        effective,
    }
}

impl SteeringSolution {
    pub fn max_angle(&self) -> f64 {
        self.inner_deg.max(self.outer_deg)
    }
}
