//! Fixed file sets, legacy key aliases and comparison tolerances.

use crate::ini::KeyPath;

/// Physics files that make up a fingerprint, relative to `data/`.
pub const FINGERPRINT_FILES: [&str; 8] = [
    "car.ini",
    "engine.ini",
    "drivetrain.ini",
    "suspensions.ini",
    "tyres.ini",
    "brakes.ini",
    "aero.ini",
    "setup.ini",
];

// Ordered alias candidates, first readable value wins.
pub const FINAL_RATIO: &[KeyPath] = &[("GEARS", "FINAL"), ("FINAL", "RATIO"), ("FINAL", "FINAL")];
pub const WHEELBASE: &[KeyPath] = &[
    ("BASIC", "WHEELBASE"),
    ("FRONT", "WHEELBASE"),
    ("REAR", "WHEELBASE"),
];
pub const ENGINE_INERTIA: &[KeyPath] = &[
    ("HEADER", "INERTIA"),
    ("ENGINE_DATA", "INERTIA"),
    ("ENGINE", "INERTIA"),
];
pub const ENGINE_LIMITER: &[KeyPath] = &[
    ("HEADER", "LIMITER"),
    ("ENGINE_DATA", "LIMITER"),
    ("ENGINE", "LIMITER"),
];
pub const WASTEGATE_PRIMARY: &[KeyPath] = &[("TURBO", "WASTEGATE"), ("HEADER", "WASTEGATE")];
pub const WASTEGATE_SECONDARY: &[KeyPath] = &[("TURBO_1", "WASTEGATE")];
pub const BRAKE_FRONT_SHARE: &[KeyPath] = &[("BRAKES", "FRONT_SHARE"), ("HEADER", "FRONT_SHARE")];
pub const AERO_CL: &[KeyPath] = &[("WING_0", "CL"), ("DATA", "CL")];

pub const TOL_MASS_KG: f64 = 0.5;
pub const TOL_LENGTH_M: f64 = 0.001;
pub const TOL_FRONT_BIAS: f64 = 0.0005;
pub const TOL_STEER_LOCK_DEG: f64 = 0.05;
pub const TOL_STEER_RATIO: f64 = 0.01;
pub const TOL_WHEEL_ANGLE_DEG: f64 = 0.3;
pub const TOL_TYRE_WIDTH_MM: f64 = 0.5;
pub const TOL_GEAR_RATIO: f64 = 0.003;
pub const TOL_FUEL_TANK_M: f64 = 0.01;
pub const TOL_TYRE_CONTACT_REF: f64 = 1e-4;
pub const TOL_REFERENCE_STEER_DEG: f64 = 0.5;
pub const TOL_RULEBOOK_FRONT_BIAS: f64 = 0.005;

pub const DRIFT_THIRD_GEAR_BAND: (f64, f64) = (2.4, 3.6);
pub const DRIFT_FINAL_DRIVE_BAND: (f64, f64) = (3.4, 4.6);
pub const DRIFT_TORQUE_4000_NM: f64 = 500.0;
pub const DRIFT_TORQUE_5500_NM: f64 = 450.0;
pub const DRIFT_HP_6500: f64 = 550.0;
pub const WATTS_PER_HP: f64 = 745.699872;

pub const MAX_TEXTURE_PX: u32 = 4096;
pub const COLLIDER_WIDTH_MARGIN_M: f64 = 0.2;
pub const COLLIDER_LENGTH_MARGIN_M: f64 = 0.8;
pub const FUEL_AXLE_CLEARANCE_M: f64 = 0.04;

pub const TEMP_FOLDER_PREFIXES: &[&str] = &["car_inspector_", "tmp", "temp"];
pub const NAME_PREFIX_EXEMPT_KN5: &[&str] = &["collider", "driver"];

pub const SAFE_EXTRA_ROOT_DIRS: &[&str] = &["analysis", "telemetry", "media", "logs", "screenshots"];
pub const SAFE_MISSING_ROOT_DIRS: &[&str] = &["extension"];
pub const SAFE_ROOT_FILE_EXTS: &[&str] = &["kn5"];
pub const SUSPICIOUS_ROOT_DIRS: &[&str] = &[
    "apps", "python", "python27", "scripts", "tools", "acstuff", "content", "system", "server",
    "mods", "bin",
];
pub const SUSPICIOUS_ROOT_FILE_EXTS: &[&str] = &[
    "bat", "ps1", "cmd", "exe", "dll", "vbs", "sh", "lua", "py", "jar",
];
pub const SCRIPT_FILE_EXTS: &[&str] = &[
    "bat", "ps1", "cmd", "exe", "dll", "vbs", "sh", "lua", "py", "pyc",
];
pub const ARCHIVE_EXTS: &[&str] = &["zip", "7z", "rar"];

pub const STEER_SIDECAR: &str = "analysis/cm_steer.json";
pub const KN5_STATS_SIDECAR: &str = "analysis/kn5_stats.json";
pub const UI_CAR_JSON: &str = "ui/ui_car.json";
pub const UI_LODS_JSON: &str = "ui/cm_lods_generation.json";
