//! Reference index: structured specs plus raw fingerprints of every approved car.
//!
//! Both documents are built from the same reference root and carry the
//! same `as_of` stamp. Nothing here detects staleness; callers rebuild with
//! [`ReferenceIndex::refresh`] whenever reference content may have changed.

use crate::domain::constants::{
    BRAKE_FRONT_SHARE, ENGINE_INERTIA, ENGINE_LIMITER, FINAL_RATIO, STEER_SIDECAR, UI_CAR_JSON,
    UI_LODS_JSON, WASTEGATE_PRIMARY, WASTEGATE_SECONDARY, WHEELBASE,
};
use crate::domain::models::SteeringSolution;
use crate::error::{read_json, InspectError, Result};
use crate::ini::ConfigDocument;
use crate::services::fingerprint::{self, Fingerprint};
use crate::services::{hashing, steering};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TyreCompound {
    pub name: String,
    pub short_name: Option<String>,
    pub width_front: Option<f64>,
    pub width_rear: Option<f64>,
    pub radius_front: Option<f64>,
    pub radius_rear: Option<f64>,
    pub dx_ref_front: Option<f64>,
    pub dx_ref_rear: Option<f64>,
    pub dy_ref_front: Option<f64>,
    pub dy_ref_rear: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColliderBox {
    pub centre: [f64; 3],
    pub size: [f64; 3],
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReferenceCarSpec {
    pub key: String,
    pub path: PathBuf,
    pub ui: serde_json::Value,
    pub steer_lock: Option<f64>,
    pub steer_ratio: Option<f64>,
    /// Ratio-derived wheel angle, `STEER_LOCK / STEER_RATIO`.
    pub steer_max_wheel_deg: Option<f64>,
    /// Angle resolved with the same chain the validator applies to submissions.
    pub steer_solution: Option<SteeringSolution>,
    pub total_mass: Option<f64>,
    pub inertia: Option<Vec<f64>>,
    pub wheelbase: Option<f64>,
    pub front_track: Option<f64>,
    pub rear_track: Option<f64>,
    pub cg_location: Option<f64>,
    pub fuel_tank_pos: Option<[f64; 3]>,
    pub drivetrain_type: Option<String>,
    pub gear_count: Option<i64>,
    pub gears: Vec<f64>,
    pub final_ratio: Option<f64>,
    pub engine_inertia: Option<f64>,
    pub engine_limiter: Option<f64>,
    pub wastegate_primary: Option<f64>,
    pub wastegate_secondary: Option<f64>,
    pub turbo_boost_threshold: Option<f64>,
    pub rpm_damage_threshold: Option<f64>,
    pub brake_front_share: Option<f64>,
    pub wings: Vec<String>,
    pub lods_ini_present: bool,
    pub cm_lods_triangles: BTreeMap<String, i64>,
    pub colliders: Vec<ColliderBox>,
    pub tyre_compounds: Vec<TyreCompound>,
    pub hashed_files: BTreeMap<String, String>,
}

impl ReferenceCarSpec {
    /// Overall ratios (`|gear| * |final|`) in gear order.
    pub fn overall_ratios(&self) -> Vec<f64> {
        match self.final_ratio {
            Some(fd) => self.gears.iter().map(|g| g.abs() * fd.abs()).collect(),
            None => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecDocument {
    pub as_of: DateTime<Utc>,
    pub root: PathBuf,
    pub cars: BTreeMap<String, ReferenceCarSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FingerprintDocument {
    pub as_of: DateTime<Utc>,
    pub root: PathBuf,
    pub cars: BTreeMap<String, Fingerprint>,
}

#[derive(Debug, Clone)]
pub struct ReferenceIndex {
    pub specs: SpecDocument,
    pub fingerprints: FingerprintDocument,
}

impl ReferenceIndex {
    pub fn build(root: &Path) -> Result<Self> {
        if !root.is_dir() {
            return Err(InspectError::ReferenceRoot(root.to_path_buf()));
        }
        let as_of = Utc::now();
        let mut specs = BTreeMap::new();
        let mut prints = BTreeMap::new();
        for car_dir in sorted_subdirs(root)? {
            let Some(key) = car_dir.file_name().map(|n| n.to_string_lossy().to_string()) else {
                continue;
            };
            specs.insert(key.clone(), build_spec(&key, &car_dir));
            let fp = fingerprint::collect(&car_dir);
            if !fp.is_empty() {
                prints.insert(key, fp);
            }
        }
        tracing::info!(
            root = %root.display(),
            cars = specs.len(),
            fingerprinted = prints.len(),
            "reference index built"
        );
        Ok(Self {
            specs: SpecDocument {
                as_of,
                root: root.to_path_buf(),
                cars: specs,
            },
            fingerprints: FingerprintDocument {
                as_of,
                root: root.to_path_buf(),
                cars: prints,
            },
        })
    }

    /// Rebuilds both documents from the recorded root.
    pub fn refresh(&mut self) -> Result<()> {
        *self = Self::build(&self.specs.root.clone())?;
        Ok(())
    }

    pub fn as_of(&self) -> DateTime<Utc> {
        self.specs.as_of
    }

    pub fn root(&self) -> &Path {
        &self.specs.root
    }

    pub fn spec(&self, key: &str) -> Option<&ReferenceCarSpec> {
        self.specs.cars.get(key)
    }

    pub fn fingerprint(&self, key: &str) -> Option<&Fingerprint> {
        self.fingerprints.cars.get(key)
    }

    /// `<dir>/<stem>.fingerprints.json` next to the spec document.
    pub fn fingerprints_path(spec_path: &Path) -> PathBuf {
        let stem = spec_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "reference_index".to_string());
        spec_path.with_file_name(format!("{stem}.fingerprints.json"))
    }

    pub fn save(&self, spec_path: &Path) -> Result<()> {
        write_json(spec_path, &self.specs)?;
        write_json(&Self::fingerprints_path(spec_path), &self.fingerprints)
    }

    pub fn load(spec_path: &Path) -> Result<Self> {
        let specs: SpecDocument = load_json(spec_path)?;
        let fingerprints: FingerprintDocument = load_json(&Self::fingerprints_path(spec_path))?;
        if specs.as_of != fingerprints.as_of {
            tracing::warn!(
                specs = %specs.as_of,
                fingerprints = %fingerprints.as_of,
                "reference documents were built at different times"
            );
        }
        Ok(Self { specs, fingerprints })
    }
}

fn sorted_subdirs(root: &Path) -> Result<Vec<PathBuf>> {
    let rd = std::fs::read_dir(root).map_err(|e| InspectError::io(root, e))?;
    let mut dirs: Vec<PathBuf> = rd
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    dirs.sort();
    Ok(dirs)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| InspectError::io(parent, e))?;
    }
    let raw = serde_json::to_string_pretty(value).map_err(|source| InspectError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, raw).map_err(|e| InspectError::io(path, e))
}

fn load_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let value = read_json(path)?;
    serde_json::from_value(value).map_err(|source| InspectError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Parses a file, treating a missing or unreadable one as empty.
pub(crate) fn load_doc(path: &Path) -> ConfigDocument {
    match ConfigDocument::parse(path) {
        Ok(doc) => doc,
        Err(e) if e.is_not_found() => ConfigDocument::default(),
        Err(e) => {
            tracing::warn!(error = %e, "unreadable ini, treating as empty");
            ConfigDocument::default()
        }
    }
}

fn build_spec(key: &str, car_dir: &Path) -> ReferenceCarSpec {
    let data = car_dir.join("data");
    let car = load_doc(&data.join("car.ini"));
    let susp = load_doc(&data.join("suspensions.ini"));
    let engine = load_doc(&data.join("engine.ini"));
    let drive = load_doc(&data.join("drivetrain.ini"));
    let brakes = load_doc(&data.join("brakes.ini"));
    let aero = load_doc(&data.join("aero.ini"));
    let colliders = load_doc(&data.join("colliders.ini"));
    let tyres = load_doc(&data.join("tyres.ini"));

    let steer_lock = car.get_float("CONTROLS", "STEER_LOCK");
    let steer_ratio = car.get_float("CONTROLS", "STEER_RATIO");
    let steer_max_wheel_deg = match (steer_lock, steer_ratio) {
        (Some(l), Some(r)) if l != 0.0 && r != 0.0 => Some(l / r),
        _ => None,
    };
    let sidecar = read_json(&car_dir.join(STEER_SIDECAR))
        .ok()
        .and_then(|v| steering::measurement_from_json(&v));
    let steer_solution = steering::resolve(&car, &susp, sidecar).effective;

    let gear_count = drive.get_int("GEARS", "COUNT");
    let gears = (1..=gear_count.unwrap_or(0).max(0))
        .filter_map(|i| drive.get_float("GEARS", &format!("GEAR_{i}")))
        .collect();

    ReferenceCarSpec {
        key: key.to_string(),
        path: car_dir.to_path_buf(),
        ui: read_json(&car_dir.join(UI_CAR_JSON)).unwrap_or(serde_json::Value::Null),
        steer_lock,
        steer_ratio,
        steer_max_wheel_deg,
        steer_solution,
        total_mass: car.get_float("BASIC", "TOTALMASS"),
        inertia: car.get_tuple_of_floats("BASIC", "INERTIA"),
        wheelbase: susp.first_float(WHEELBASE),
        front_track: susp.get_float("FRONT", "TRACK"),
        rear_track: susp.get_float("REAR", "TRACK"),
        cg_location: susp.get_float("BASIC", "CG_LOCATION"),
        fuel_tank_pos: car.get_vec3("FUELTANK", "POSITION"),
        drivetrain_type: drive.get_str("TRACTION", "TYPE").map(str::to_string),
        gear_count,
        gears,
        final_ratio: drive.first_float(FINAL_RATIO),
        engine_inertia: engine.first_float(ENGINE_INERTIA),
        engine_limiter: engine.first_float(ENGINE_LIMITER),
        wastegate_primary: engine.first_float(WASTEGATE_PRIMARY),
        wastegate_secondary: engine.first_float(WASTEGATE_SECONDARY),
        turbo_boost_threshold: engine.get_float("DAMAGE", "TURBO_BOOST_THRESHOLD"),
        rpm_damage_threshold: engine.get_float("DAMAGE", "RPM_THRESHOLD"),
        brake_front_share: brakes.first_float(BRAKE_FRONT_SHARE),
        wings: wing_names(&aero),
        lods_ini_present: data.join("lods.ini").is_file(),
        cm_lods_triangles: read_lod_triangles(&car_dir.join(UI_LODS_JSON)),
        colliders: collider_boxes(&colliders).into_iter().map(|(_, b)| b).collect(),
        tyre_compounds: tyre_compounds(&tyres),
        hashed_files: hashing::hash_car_content(car_dir),
    }
}

pub fn wing_names(aero: &ConfigDocument) -> Vec<String> {
    aero.sections()
        .filter(|s| s.name().starts_with("WING_"))
        .filter_map(|s| s.get("NAME"))
        .map(str::to_uppercase)
        .collect()
}

pub fn collider_boxes(doc: &ConfigDocument) -> Vec<(String, ColliderBox)> {
    doc.sections()
        .filter(|s| s.name().starts_with("COLLIDER_"))
        .filter_map(|s| {
            Some((
                s.name().to_string(),
                ColliderBox {
                    centre: doc.get_vec3(s.name(), "CENTRE")?,
                    size: doc.get_vec3(s.name(), "SIZE")?,
                },
            ))
        })
        .collect()
}

/// Per-stage triangle counts. Stage values may be JSON objects or
/// stringified JSON.
pub fn read_lod_triangles(path: &Path) -> BTreeMap<String, i64> {
    let Ok(raw) = read_json(path) else {
        return BTreeMap::new();
    };
    let Some(stages) = raw.get("Stages").and_then(|s| s.as_object()) else {
        return BTreeMap::new();
    };
    stages
        .iter()
        .filter_map(|(stage, v)| {
            let parsed;
            let obj = match v {
                serde_json::Value::String(s) => {
                    parsed = serde_json::from_str::<serde_json::Value>(s).ok()?;
                    &parsed
                }
                other => other,
            };
            let count = obj.get("trianglesCount")?;
            let n = count
                .as_i64()
                .or_else(|| count.as_f64().map(|f| f as i64))?;
            Some((stage.clone(), n))
        })
        .collect()
}

/// Sections carrying NAME/SHORT_NAME open a compound; that section and the
/// following FRONT*/REAR* sections fill it until the next name. The first
/// value seen per axle wins, matching how submissions are read.
pub fn tyre_compounds(doc: &ConfigDocument) -> Vec<TyreCompound> {
    #[derive(Default)]
    struct Side {
        width: Option<f64>,
        radius: Option<f64>,
        dx: Option<f64>,
        dy: Option<f64>,
    }
    fn fill(side: &mut Side, doc: &ConfigDocument, sec: &str) {
        let read = |key: &str| doc.get_float(sec, key);
        side.width = side.width.or_else(|| read("WIDTH"));
        side.radius = side.radius.or_else(|| read("RADIUS"));
        side.dx = side.dx.or_else(|| read("DX_REF"));
        side.dy = side.dy.or_else(|| read("DY_REF"));
    }
    fn flush(out: &mut Vec<TyreCompound>, name: &Option<String>, short: &Option<String>, front: &Side, rear: &Side) {
        if let Some(name) = name.as_ref().filter(|n| !n.is_empty()) {
            out.push(TyreCompound {
                name: name.clone(),
                short_name: short.clone(),
                width_front: front.width,
                width_rear: rear.width,
                radius_front: front.radius,
                radius_rear: rear.radius,
                dx_ref_front: front.dx,
                dx_ref_rear: rear.dx,
                dy_ref_front: front.dy,
                dy_ref_rear: rear.dy,
            });
        }
    }

    let mut out = Vec::new();
    let mut name: Option<String> = None;
    let mut short: Option<String> = None;
    let mut front = Side::default();
    let mut rear = Side::default();

    for sec in doc.sections() {
        if sec.contains_key("NAME") || sec.contains_key("SHORT_NAME") {
            flush(&mut out, &name, &short, &front, &rear);
            front = Side::default();
            rear = Side::default();
            if let Some(n) = sec.get("NAME").filter(|n| !n.is_empty()) {
                name = Some(n.to_string());
            }
            if let Some(s) = sec.get("SHORT_NAME").filter(|s| !s.is_empty()) {
                short = Some(s.to_string());
            }
        }
        let upper = sec.name().to_ascii_uppercase();
        if upper.starts_with("FRONT") {
            fill(&mut front, doc, sec.name());
        }
        if upper.starts_with("REAR") {
            fill(&mut rear, doc, sec.name());
        }
    }
    flush(&mut out, &name, &short, &front, &rear);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compounds_are_read_as_repeating_records() {
        let doc = ConfigDocument::parse_str(
            "[HEADER]\nVERSION=10\n[COMPOUND_DEFAULT]\nINDEX=0\n\
             [FRONT]\nNAME=Semislicks\nSHORT_NAME=SM\nWIDTH=0.245\nRADIUS=0.32\nDX_REF=1.21\nDY_REF=1.19\n\
             [REAR]\nWIDTH=0.265\nRADIUS=0.33\n\
             [FRONT_1]\nNAME=Street\nSHORT_NAME=ST\nWIDTH=0.225\n\
             [REAR_1]\nWIDTH=0.245\nDX_REF=1.05\n",
        );
        let compounds = tyre_compounds(&doc);
        assert_eq!(compounds.len(), 2);
        assert_eq!(compounds[0].name, "Semislicks");
        assert_eq!(compounds[0].short_name.as_deref(), Some("SM"));
        assert_eq!(compounds[0].width_front, Some(0.245));
        assert_eq!(compounds[0].width_rear, Some(0.265));
        assert_eq!(compounds[0].dx_ref_front, Some(1.21));
        assert_eq!(compounds[0].dx_ref_rear, None);
        assert_eq!(compounds[1].name, "Street");
        assert_eq!(compounds[1].width_front, Some(0.225));
        assert_eq!(compounds[1].width_rear, Some(0.245));
        assert_eq!(compounds[1].dx_ref_front, None);
        assert_eq!(compounds[1].dx_ref_rear, Some(1.05));
    }

    #[test]
    fn axles_keep_their_own_contact_references() {
        let doc = ConfigDocument::parse_str(
            "[FRONT]\nNAME=Street\nWIDTH=0.245\nDX_REF=1.20\nDY_REF=1.18\n\
             [REAR]\nWIDTH=0.265\nDX_REF=1.25\nDY_REF=1.22\n\
             [FRONT_EXTRA]\nDX_REF=9.9\n",
        );
        let compounds = tyre_compounds(&doc);
        assert_eq!(compounds.len(), 1);
        let c = &compounds[0];
        assert_eq!((c.dx_ref_front, c.dy_ref_front), (Some(1.20), Some(1.18)));
        assert_eq!((c.dx_ref_rear, c.dy_ref_rear), (Some(1.25), Some(1.22)));
    }

    #[test]
    fn lod_stages_accept_stringified_json() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("cm_lods_generation.json");
        std::fs::write(
            &path,
            r#"{"Stages":{"LodA":"{\"trianglesCount\": 120000}","LodB":{"trianglesCount":40000},"Bad":"nope"}}"#,
        )
        .expect("write");
        let tris = read_lod_triangles(&path);
        assert_eq!(tris.get("LodA"), Some(&120000));
        assert_eq!(tris.get("LodB"), Some(&40000));
        assert!(!tris.contains_key("Bad"));
    }

    #[test]
    fn missing_root_is_fatal() {
        let err = ReferenceIndex::build(Path::new("/no/such/reference/root")).expect_err("fatal");
        assert!(matches!(err, InspectError::ReferenceRoot(_)));
    }

    #[test]
    fn fingerprints_path_sits_next_to_spec_document() {
        assert_eq!(
            ReferenceIndex::fingerprints_path(Path::new("/tmp/idx/reference_index.json")),
            PathBuf::from("/tmp/idx/reference_index.fingerprints.json")
        );
    }
}
