use crate::domain::rulebook::RulebookConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Serialize)]
pub struct JsonOut<T: Serialize> {
    pub ok: bool,
    pub data: T,
}

/// Outcome of one inspection run. Built once by the validator and never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub matched_reference: Option<String>,
    pub exact_physics_match: bool,
    pub physics_mismatches: Vec<String>,
    pub rule_violations: Vec<String>,
    pub info: InspectionInfo,
}

impl ValidationResult {
    /// Overall verdict. Every consumer must use this instead of re-deriving it.
    pub fn passed(&self) -> bool {
        self.exact_physics_match && self.rule_violations.is_empty()
    }

    pub fn verdict(&self) -> Verdict {
        if self.passed() {
            Verdict::Pass
        } else {
            Verdict::Fail
        }
    }

    pub fn anti_cheat(&self, code: &str) -> Option<&AntiCheatCheck> {
        self.info.anti_cheat.iter().find(|c| c.code == code)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Pass,
    Fail,
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Pass => write!(f, "PASS"),
            Verdict::Fail => write!(f, "FAIL"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InspectionInfo {
    pub car: String,
    pub naming: NamingInfo,
    pub metadata: MetadataInfo,
    pub physics: PhysicsInfo,
    pub gearing: GearingInfo,
    pub tyres: TyreInfo,
    pub spec_compare: BTreeMap<String, SpecComparison>,
    pub assets: AssetInfo,
    pub data_files: DataFilesInfo,
    pub extension: Option<ExtensionSummary>,
    pub root: RootInventory,
    pub setup: SetupInfo,
    pub power: PowerInfo,
    pub steering: SteeringInfo,
    pub kn5_stats: Option<Kn5Stats>,
    pub fallback: FallbackInfo,
    pub anti_cheat: Vec<AntiCheatCheck>,
    pub duplicate_sections: Vec<DuplicateSection>,
    /// Thresholds the run was evaluated against.
    pub rulebook: RulebookConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NamingInfo {
    pub expected_prefix: Option<String>,
    pub folder_name: String,
    pub folder_valid: Option<bool>,
    pub folder_looks_temporary: bool,
    pub ui_name: Option<String>,
    pub ui_name_valid: Option<bool>,
    pub screen_name: Option<String>,
    pub screen_name_valid: Option<bool>,
    pub kn5_checked: Vec<String>,
    pub kn5_prefix_violations: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetadataInfo {
    pub ui_present: bool,
    pub year: Option<i64>,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PhysicsInfo {
    pub drivetrain: Option<String>,
    pub reference_drivetrain: Option<String>,
    pub total_mass: Option<f64>,
    pub wheelbase: Option<f64>,
    pub front_track: Option<f64>,
    pub rear_track: Option<f64>,
    pub front_bias: Option<f64>,
    pub front_toe_out: Option<f64>,
    pub steer_lock: Option<f64>,
    pub steer_ratio: Option<f64>,
    pub linear_steer_rod_ratio: Option<f64>,
    pub fuel_tank: FuelTankInfo,
    pub colliders_out_of_bounds: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FuelTankInfo {
    pub position: Option<[f64; 3]>,
    pub flags: Vec<String>,
    pub distance_to_front_axle: Option<f64>,
    pub distance_to_rear_axle: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GearingInfo {
    pub nominal: Vec<f64>,
    pub overall: Vec<f64>,
    pub final_drive: Option<f64>,
    pub third_overall: Option<f64>,
    pub fourth_overall: Option<f64>,
    pub reference_overall: Vec<f64>,
    pub drift_third_warn: Option<bool>,
    pub drift_final_warn: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TyreInfo {
    pub front_width_mm: Option<i64>,
    pub rear_width_mm: Option<i64>,
    pub front_dx_ref: Option<f64>,
    pub rear_dx_ref: Option<f64>,
    pub front_dy_ref: Option<f64>,
    pub rear_dy_ref: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpecUnit {
    Kg,
    M,
    Mm,
    Deg,
    Ratio,
}

impl SpecUnit {
    pub fn format(self, value: f64, signed: bool) -> String {
        match (self, signed) {
            (SpecUnit::Kg, false) => format!("{value:.2} kg"),
            (SpecUnit::Kg, true) => format!("{value:+.2} kg"),
            (SpecUnit::M, false) => format!("{value:.3} m"),
            (SpecUnit::M, true) => format!("{value:+.3} m"),
            (SpecUnit::Mm, false) => format!("{value:.0} mm"),
            (SpecUnit::Mm, true) => format!("{value:+.0} mm"),
            (SpecUnit::Deg, false) => format!("{value:.2}°"),
            (SpecUnit::Deg, true) => format!("{value:+.2}°"),
            (SpecUnit::Ratio, false) => format!("{value:.4}"),
            (SpecUnit::Ratio, true) => format!("{value:+.4}"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecComparison {
    pub label: String,
    pub unit: SpecUnit,
    pub submitted: f64,
    pub reference: f64,
    pub delta: f64,
    pub tolerance: f64,
    pub within_tolerance: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssetInfo {
    pub kn5_files: Vec<String>,
    pub kn5_sizes_mb: BTreeMap<String, f64>,
    pub skins: Vec<String>,
    pub skins_count: Option<usize>,
    pub skin_sizes_mb: BTreeMap<String, f64>,
    pub largest_skin: Option<LargestSkin>,
    pub textures: Vec<TextureInfo>,
    pub textures_unchecked: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LargestSkin {
    pub name: String,
    pub size_mb: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextureInfo {
    pub file: String,
    pub width: u32,
    pub height: u32,
    pub size_mb: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataFilesInfo {
    /// `None` when there was no reference `data/` to compare against.
    pub whitelist_ok: Option<bool>,
    pub extra: Vec<String>,
    pub missing: Vec<String>,
    pub hash_mismatches: Vec<HashMismatch>,
    pub modifications: Vec<FileModification>,
    pub collider_hash_mismatch: bool,
    pub extension_hash_mismatches: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HashMismatch {
    pub path: String,
    pub expected: String,
    pub actual: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileModification {
    pub path: String,
    pub severity: Severity,
    pub changes: Vec<IniChange>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IniChange {
    pub section: String,
    pub key: Option<String>,
    pub severity: Severity,
    pub detail: String,
    pub reference: Option<String>,
    pub value: Option<String>,
    pub delta: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtensionStatus {
    Flagged,
    NeedsReview,
    Cosmetic,
    Missing,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtensionSummary {
    pub status: ExtensionStatus,
    /// Whether the matched reference ships its own `extension/` files.
    pub expected: bool,
    pub files: Vec<String>,
    pub physics: Vec<ExtensionFinding>,
    pub cosmetic_count: usize,
    pub unknown: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtensionFinding {
    pub file: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RootInventory {
    pub directories: Vec<String>,
    pub files: Vec<String>,
    pub suspicious_dirs: Vec<String>,
    pub suspicious_files: Vec<String>,
    pub extra_dirs: Vec<String>,
    pub missing_dirs: Vec<String>,
    pub extra_files: Vec<String>,
    pub missing_files: Vec<String>,
    pub ignored_extra_dirs: Vec<String>,
    pub ignored_missing_dirs: Vec<String>,
    pub ignored_extra_files: Vec<String>,
    pub ignored_missing_files: Vec<String>,
}

impl RootInventory {
    pub fn has_differences(&self) -> bool {
        !(self.extra_dirs.is_empty()
            && self.missing_dirs.is_empty()
            && self.extra_files.is_empty()
            && self.missing_files.is_empty()
            && self.suspicious_dirs.is_empty()
            && self.suspicious_files.is_empty())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SetupInfo {
    pub present: bool,
    pub locked: Vec<String>,
    pub toe_ranges: BTreeMap<String, SetupRange>,
    pub toe_zero_reachable: Option<bool>,
    pub range_issues: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SetupRange {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerSource {
    UiJson,
    PowerLut,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PowerInfo {
    pub source: Option<PowerSource>,
    pub peak_hp: Option<f64>,
    pub lut_peak: Option<PowerPeak>,
    pub lut_power_max_hp: Option<f64>,
    pub lut_torque_max_nm: Option<f64>,
    pub ui_power_max_hp: Option<f64>,
    pub ui_torque_max_nm: Option<f64>,
    pub torque_at_4000: Option<f64>,
    pub torque_at_5500: Option<f64>,
    pub hp_at_6500: Option<f64>,
    pub drift_torque_warn: Option<bool>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PowerPeak {
    pub rpm: f64,
    pub hp: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SteeringProvenance {
    ExternalMeasured,
    ExternalNormalized,
    ExternalNormalizedLow,
    Geometry,
    AckermannInner,
    AckermannOuter,
    IniRatio,
}

impl SteeringProvenance {
    pub fn is_external(self) -> bool {
        matches!(
            self,
            SteeringProvenance::ExternalMeasured
                | SteeringProvenance::ExternalNormalized
                | SteeringProvenance::ExternalNormalizedLow
        )
    }
}

/// Inner/outer maximum road-wheel angles in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SteeringSolution {
    pub inner_deg: f64,
    pub outer_deg: f64,
    pub provenance: SteeringProvenance,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MeasuredSteer {
    pub raw_deg: f64,
    pub angle_deg: f64,
    pub provenance: SteeringProvenance,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SteeringInfo {
    /// `STEER_LOCK / STEER_RATIO`, rounded to 2 decimals.
    pub derived_wheel_angle_deg: Option<f64>,
    pub measured: Option<MeasuredSteer>,
    pub geometry: Option<SteeringSolution>,
    pub ackermann: Option<SteeringSolution>,
    pub effective: Option<SteeringSolution>,
    pub measurement_generated: bool,
    pub reference_angle_deg: Option<f64>,
    pub reference_delta_deg: Option<f64>,
    pub within_reference_tolerance: Option<bool>,
}

impl SteeringInfo {
    pub fn effective_angle(&self) -> Option<f64> {
        self.effective.map(|s| s.max_angle())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Kn5StatsSource {
    External,
    UiLods,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Kn5Stats {
    pub total_triangles: Option<i64>,
    pub total_objects: Option<i64>,
    pub source: Kn5StatsSource,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FallbackInfo {
    pub configured: Option<String>,
    pub used: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateSection {
    pub file: String,
    pub section: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AntiCheatCheck {
    pub code: String,
    pub label: String,
    pub status: CheckStatus,
    pub detail: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<String>>,
}

/// One line of `inspect-batch` output.
#[derive(Debug, Clone, Serialize)]
pub struct BatchRow {
    pub car: String,
    pub verdict: Verdict,
    pub matched_reference: Option<String>,
    pub violations: usize,
    pub anti_cheat_failures: usize,
}
