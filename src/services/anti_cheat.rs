//! Advisory tamper/anomaly diagnostics.
//!
//! Every check has a stable `AC0xx` code and a fixed remediation hint. A
//! check reads the already-populated [`InspectionInfo`] plus a few files the
//! validator does not parse itself (`power.lut`, `aero.ini`, turbo
//! controllers) and a single hygiene walk of the car folder. Checks never
//! abort the run: unreadable inputs degrade to a pass or a skipped code.

use crate::domain::constants::{AERO_CL, ARCHIVE_EXTS, SCRIPT_FILE_EXTS};
use crate::domain::models::{AntiCheatCheck, CheckStatus, InspectionInfo, Severity, SteeringProvenance};
use crate::domain::rulebook::RulebookConfig;
use crate::ini::ConfigDocument;
use crate::lut;
use crate::services::hashing::relative_slash;
use std::collections::HashMap;
use std::path::Path;
use walkdir::WalkDir;

const SPIKE_THRESHOLD: f64 = 0.35;
const UI_POWER_TOLERANCE: f64 = 0.15;
const AERO_CL_LIMIT: f64 = 4.0;
const TURBO_PRESSURE_LIMIT: f64 = 2.0;
const HYGIENE_ITEM_LIMIT: usize = 200;
const SAMPLE_LIMIT: usize = 50;

/// Everything a check may look at.
pub struct CheckContext<'a> {
    pub car_root: &'a Path,
    pub info: &'a InspectionInfo,
    pub rulebook: &'a RulebookConfig,
    pub matched_reference: Option<&'a str>,
    pub exact_physics_match: bool,
}

struct Finding {
    status: CheckStatus,
    detail: String,
    items: Vec<String>,
}

impl Finding {
    fn new(status: CheckStatus, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
            items: Vec::new(),
        }
    }

    fn pass() -> Self {
        Self::new(CheckStatus::Pass, "")
    }

    fn pass_or(ok: bool, failing: CheckStatus, detail: impl Into<String>) -> Self {
        Self::new(if ok { CheckStatus::Pass } else { failing }, detail)
    }

    fn with_items(mut self, items: Vec<String>) -> Self {
        self.items = items;
        self
    }
}

/// Results of one recursive walk over the car folder.
#[derive(Default)]
struct Hygiene {
    hidden_files: Vec<String>,
    hidden_dirs: Vec<String>,
    odd_names: Vec<String>,
    archives: Vec<String>,
    case_collisions: Vec<String>,
    scripts: Vec<String>,
    zero_sized: Vec<String>,
}

fn is_hidden_name(name: &str) -> bool {
    name.starts_with('.') || name.eq_ignore_ascii_case("thumbs.db")
}

fn has_suspicious_chars(name: &str) -> bool {
    name.chars()
        .any(|c| (c as u32) < 32 || matches!(c, '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{FEFF}'))
}

impl Hygiene {
    fn scan(car_root: &Path) -> Self {
        let mut out = Hygiene::default();
        let mut seen: HashMap<String, String> = HashMap::new();
        for entry in WalkDir::new(car_root)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let rel = relative_slash(car_root, entry.path());
            let name = entry.file_name().to_string_lossy();
            let is_file = entry.file_type().is_file();
            if is_hidden_name(&name) {
                if entry.file_type().is_dir() {
                    out.hidden_dirs.push(rel.clone());
                } else {
                    out.hidden_files.push(rel.clone());
                }
            }
            if has_suspicious_chars(&name) {
                out.odd_names.push(rel.clone());
            }
            if !is_file {
                continue;
            }
            let ext = entry
                .path()
                .extension()
                .map(|e| e.to_string_lossy().to_ascii_lowercase())
                .unwrap_or_default();
            if ARCHIVE_EXTS.contains(&ext.as_str()) {
                out.archives.push(rel.clone());
            }
            if SCRIPT_FILE_EXTS.contains(&ext.as_str()) {
                out.scripts.push(rel.clone());
            }
            if entry.metadata().map(|m| m.len() == 0).unwrap_or(false) {
                out.zero_sized.push(rel.clone());
            }
            let key = rel.to_lowercase();
            match seen.get(&key) {
                Some(first) if *first != rel => out.case_collisions.push(rel),
                Some(_) => {}
                None => {
                    seen.insert(key, rel);
                }
            }
        }
        out
    }
}

struct Inputs<'a> {
    ctx: &'a CheckContext<'a>,
    hygiene: Hygiene,
}

type CheckFn = fn(&Inputs<'_>) -> Option<Finding>;

const REGISTRY: &[(&str, &str, CheckFn)] = &[
    ("AC001", "data/ folder present", data_present),
    ("AC002", "data.acd overlay", acd_overlay),
    ("AC003", "Exact physics match to reference", exact_match),
    ("AC004", "Data files whitelist", data_whitelist),
    ("AC007", "Drivetrain RWD", drivetrain_rwd),
    ("AC008", "Front tyre width within range", front_tyre_range),
    ("AC009", "Rear tyre width <= max", rear_tyre_max),
    ("AC010", "Power curve smoothness", power_spikes),
    ("AC011", "UI vs data power peak", ui_power_peak),
    ("AC012", "CSP extension scripts present", extension_scripts),
    ("AC030", "Extension configs review", extension_review),
    ("AC013", "KN5 present", kn5_present),
    ("AC014", "Collider KN5 present", collider_present),
    ("AC015", "Colliders within body extents", colliders_in_bounds),
    ("AC031", "Data file changes vs reference", data_changes),
    ("AC032", "Collider.kn5 hash matches reference", collider_hash),
    ("AC033", "Root folder contents match reference", root_inventory),
    ("AC016", "Model caps (triangles/objects)", model_caps),
    ("AC017", "KN5 file sizes", kn5_sizes),
    ("AC018", "Skins count == 1", skin_count),
    ("AC019", "Aero CL reasonable", aero_cl),
    ("AC020", "Turbo reference pressure reasonable", turbo_pressure),
    ("AC021", "Hidden files present", hidden_files),
    ("AC022", "Hidden directories present", hidden_dirs),
    ("AC023", "Suspicious filename characters", odd_names),
    ("AC024", "Nested archives present", archives),
    ("AC025", "Case-insensitive filename duplicates", case_collisions),
    ("AC026", "Executable/script files present", scripts),
    ("AC027", "Zero-sized files present", zero_sized),
    ("AC028", "Steering measurement source", steering_source),
    ("AC029", "Steering angle matches reference", steering_reference),
];

/// Remediation text shown when a non-passing check carries no detail.
pub fn hint(code: &str) -> Option<&'static str> {
    let text = match code {
        "AC001" => "Missing data/ folder prevents validating and running the submitted physics.",
        "AC002" => "Having data.acd alongside data/ can mask alternate physics; remove the archive or data/ overlay.",
        "AC003" => "Car must fingerprint-match an approved reference to qualify for the competition.",
        "AC004" => "data/ must include exactly the files from the matched reference; no extras or missing files.",
        "AC007" => "Competition rules require a rear-wheel-drive drivetrain.",
        "AC008" => "Front tyre width is outside the allowed competition range.",
        "AC009" => "Rear tyre width exceeds the allowed maximum.",
        "AC010" => "Large spikes in power.lut indicate an unrealistic or tampered power curve.",
        "AC011" => "UI horsepower should match physics output within 15%; update UI or physics data.",
        "AC012" => "CSP extension scripts can override physics; review or remove extension overrides.",
        "AC013" => "At least one .kn5 model must be present in the car folder.",
        "AC014" => "Collider.kn5 is missing; accurate collision geometry is required.",
        "AC015" => "Collider extends beyond body bounds; adjust collider dimensions.",
        "AC016" => "Model triangles or object count exceeds competition caps; optimise the mesh.",
        "AC017" => "KN5 file size exceeds the allowed limit; reduce textures or geometry.",
        "AC018" => "Only one skin is permitted; remove additional skins.",
        "AC019" => "Aero CL values are out of realistic range; review aero.ini.",
        "AC020" => "Turbo reference pressure is excessive; verify boost tune.",
        "AC021" => "Hidden files found; remove hidden assets before submission.",
        "AC022" => "Hidden directories detected; they can mask alternate content.",
        "AC023" => "Suspicious characters in filenames can conceal files; rename cleanly.",
        "AC024" => "Nested archives may hide alternate physics; unpack or remove them.",
        "AC025" => "Case-insensitive duplicate filenames break servers; ensure unique names.",
        "AC026" => "Executable or script files are not allowed inside the submission.",
        "AC027" => "Zero-sized files indicate broken or placeholder assets; remove or replace them.",
        "AC028" => "Steering lock should be measured externally; geometry or INI estimates are only provisional.",
        "AC029" => "Submitted steering angle must match the reference physics; large deltas suggest altered steering geometry.",
        "AC030" => "CSP extension configs can mask behaviour; disable or ship only approved visuals.",
        "AC031" => "Core data files must match the sanctioned reference hashes.",
        "AC032" => "Collider KN5 must match the reference to avoid collision exploits.",
        "AC033" => "Unexpected folders/files at car root can hide tools or scripts; keep submission minimal.",
        _ => return None,
    };
    Some(text)
}

/// Runs every registered check in registry order.
pub fn run(ctx: &CheckContext<'_>) -> Vec<AntiCheatCheck> {
    let inputs = Inputs {
        ctx,
        hygiene: Hygiene::scan(ctx.car_root),
    };
    let checks: Vec<AntiCheatCheck> = REGISTRY
        .iter()
        .filter_map(|(code, label, check)| {
            let finding = check(&inputs)?;
            let detail = match (finding.detail.is_empty(), finding.status) {
                (true, CheckStatus::Warn | CheckStatus::Fail) => {
                    hint(code).unwrap_or_default().to_string()
                }
                _ => finding.detail,
            };
            Some(AntiCheatCheck {
                code: code.to_string(),
                label: label.to_string(),
                status: finding.status,
                detail,
                items: (!finding.items.is_empty()).then_some(finding.items),
            })
        })
        .collect();
    tracing::debug!(
        total = checks.len(),
        failed = checks.iter().filter(|c| c.status == CheckStatus::Fail).count(),
        "anti-cheat checks complete"
    );
    checks
}

fn data_present(i: &Inputs<'_>) -> Option<Finding> {
    let ok = i.ctx.car_root.join("data").is_dir();
    Some(Finding::pass_or(ok, CheckStatus::Fail, ""))
}

fn acd_overlay(i: &Inputs<'_>) -> Option<Finding> {
    let root = i.ctx.car_root;
    if root.join("data.acd").is_file() && root.join("data").is_dir() {
        return Some(Finding::new(CheckStatus::Warn, "AC will prefer data/ over data.acd"));
    }
    Some(Finding::pass())
}

fn exact_match(i: &Inputs<'_>) -> Option<Finding> {
    Some(match i.ctx.matched_reference {
        Some(key) => Finding::pass_or(i.ctx.exact_physics_match, CheckStatus::Fail, key),
        None => Finding::new(CheckStatus::Fail, "No match found"),
    })
}

fn data_whitelist(i: &Inputs<'_>) -> Option<Finding> {
    let files = &i.ctx.info.data_files;
    Some(match files.whitelist_ok? {
        true => Finding::pass(),
        false => Finding::new(
            CheckStatus::Fail,
            format!("extra={} missing={}", files.extra.len(), files.missing.len()),
        ),
    })
}

fn drivetrain_rwd(i: &Inputs<'_>) -> Option<Finding> {
    if !i.ctx.rulebook.require_rwd {
        return None;
    }
    let dt = i.ctx.info.physics.drivetrain.as_deref()?.to_uppercase();
    Some(Finding::pass_or(dt == "RWD", CheckStatus::Fail, dt))
}

fn front_tyre_range(i: &Inputs<'_>) -> Option<Finding> {
    let (lo, hi) = i.ctx.rulebook.front_tyre_range_mm?;
    let width = i.ctx.info.tyres.front_width_mm?;
    Some(Finding::pass_or(
        (lo..=hi).contains(&width),
        CheckStatus::Fail,
        format!("{width} mm (exp {lo}-{hi})"),
    ))
}

fn rear_tyre_max(i: &Inputs<'_>) -> Option<Finding> {
    let max = i.ctx.rulebook.rear_tyre_max_mm?;
    let width = i.ctx.info.tyres.rear_width_mm?;
    Some(Finding::pass_or(width <= max, CheckStatus::Fail, format!("{width} mm (max {max})")))
}

/// Steps between consecutive `power.lut` rows that jump more than 35%.
fn power_spikes_in(curve: &[(f64, f64)]) -> Vec<String> {
    curve
        .windows(2)
        .filter_map(|w| {
            let (_, prev) = w[0];
            let (rpm, cur) = w[1];
            if prev <= 0.0 {
                return None;
            }
            let delta = cur - prev;
            let pct = delta / prev;
            (pct.abs() > SPIKE_THRESHOLD).then(|| {
                let direction = if delta > 0.0 { "up" } else { "down" };
                format!("{} rpm {direction} {:.1}% (Δ {delta:+.1} hp)", rpm as i64, pct * 100.0)
            })
        })
        .collect()
}

fn power_spikes(i: &Inputs<'_>) -> Option<Finding> {
    let curve = lut::parse(&i.ctx.car_root.join("data").join("power.lut")).ok()?;
    let spikes = power_spikes_in(&curve);
    if spikes.is_empty() {
        return Some(Finding::new(CheckStatus::Pass, "spikes=0"));
    }
    let head: Vec<&str> = spikes.iter().take(5).map(String::as_str).collect();
    let detail = format!("spikes={} | {}", spikes.len(), head.join("; "));
    Some(Finding::new(CheckStatus::Warn, detail).with_items(spikes.into_iter().take(20).collect()))
}

fn ui_power_peak(i: &Inputs<'_>) -> Option<Finding> {
    let power = &i.ctx.info.power;
    let ui = power.ui_power_max_hp.filter(|v| *v > 0.0)?;
    let data = power.lut_power_max_hp.filter(|v| *v > 0.0)?;
    let rel = (ui - data).abs() / data.max(1.0);
    Some(Finding::pass_or(
        rel <= UI_POWER_TOLERANCE,
        CheckStatus::Warn,
        format!("ui={ui} data={data}"),
    ))
}

fn extension_scripts(i: &Inputs<'_>) -> Option<Finding> {
    let ext = i.ctx.car_root.join("extension");
    if !ext.is_dir() {
        return Some(Finding::pass());
    }
    let has_config = ext.join("ext_config.ini").is_file();
    let lua_files = WalkDir::new(&ext)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .is_some_and(|x| x.eq_ignore_ascii_case("lua"))
        })
        .count();
    if !has_config && lua_files == 0 {
        return Some(Finding::pass());
    }
    Some(Finding::new(
        CheckStatus::Warn,
        format!("ext_config={has_config} lua_files={lua_files}"),
    ))
}

fn extension_review(i: &Inputs<'_>) -> Option<Finding> {
    use crate::domain::models::ExtensionStatus;

    let Some(summary) = &i.ctx.info.extension else {
        return Some(Finding::new(CheckStatus::Pass, "No extension folder present."));
    };
    let mut parts = Vec::new();
    if summary.expected {
        parts.push("reference whitelist defined".to_string());
    }
    if !summary.files.is_empty() {
        parts.push(format!("files={}", summary.files.len()));
    }
    if !summary.physics.is_empty() {
        parts.push(format!("physics={}", summary.physics.len()));
    }
    if !summary.unknown.is_empty() {
        parts.push(format!("unknown={}", summary.unknown.len()));
    }
    let changed = &i.ctx.info.data_files.extension_hash_mismatches;
    if !changed.is_empty() {
        parts.push(format!("changed={}", changed.len()));
    }
    let detail = parts.join(" | ");
    let or = |fallback: &str| {
        if detail.is_empty() {
            fallback.to_string()
        } else {
            detail.clone()
        }
    };
    Some(match summary.status {
        ExtensionStatus::Flagged => {
            let items = summary
                .physics
                .iter()
                .take(SAMPLE_LIMIT)
                .map(|f| f.file.clone())
                .collect();
            Finding::new(CheckStatus::Fail, or("Extension configs contain physics overrides.")).with_items(items)
        }
        ExtensionStatus::NeedsReview => Finding::new(CheckStatus::Warn, or("extension/ contains unclassified files."))
            .with_items(changed.iter().take(SAMPLE_LIMIT).cloned().collect()),
        // Changed extension files never fail on their own.
        ExtensionStatus::Cosmetic => Finding::new(CheckStatus::Warn, or("Cosmetic configs only; review visuals."))
            .with_items(changed.iter().take(SAMPLE_LIMIT).cloned().collect()),
        ExtensionStatus::Missing => Finding::new(CheckStatus::Warn, or("Expected extension configs missing.")),
    })
}

fn kn5_present(i: &Inputs<'_>) -> Option<Finding> {
    let count = i.ctx.info.assets.kn5_files.len();
    Some(Finding::pass_or(count > 0, CheckStatus::Fail, format!("count={count}")))
}

fn collider_present(i: &Inputs<'_>) -> Option<Finding> {
    let found = i
        .ctx
        .info
        .assets
        .kn5_files
        .iter()
        .any(|n| n.to_lowercase().contains("collider"));
    Some(Finding::pass_or(found, CheckStatus::Warn, ""))
}

fn colliders_in_bounds(i: &Inputs<'_>) -> Option<Finding> {
    let out = &i.ctx.info.physics.colliders_out_of_bounds;
    if out.is_empty() {
        return Some(Finding::pass());
    }
    Some(Finding::new(CheckStatus::Fail, "").with_items(out.clone()))
}

fn data_changes(i: &Inputs<'_>) -> Option<Finding> {
    let mods = &i.ctx.info.data_files.modifications;
    if mods.is_empty() {
        return Some(Finding::pass());
    }
    let count = |s: Severity| mods.iter().filter(|m| m.severity == s).count();
    let parts: Vec<String> = [("high", Severity::High), ("medium", Severity::Medium), ("low", Severity::Low)]
        .into_iter()
        .map(|(name, s)| (name, count(s)))
        .filter(|(_, n)| *n > 0)
        .map(|(name, n)| format!("{name}={n}"))
        .collect();
    let detail = if parts.is_empty() {
        format!("changes={}", mods.len())
    } else {
        parts.join(" | ")
    };
    let paths = mods.iter().take(SAMPLE_LIMIT).map(|m| m.path.clone()).collect();
    Some(Finding::new(CheckStatus::Fail, detail).with_items(paths))
}

fn collider_hash(i: &Inputs<'_>) -> Option<Finding> {
    if i.ctx.info.data_files.collider_hash_mismatch {
        return Some(Finding::new(CheckStatus::Fail, "Hash mismatch on collider.kn5"));
    }
    Some(Finding::pass())
}

fn root_inventory(i: &Inputs<'_>) -> Option<Finding> {
    let root = &i.ctx.info.root;
    if !root.has_differences() {
        return Some(Finding::pass());
    }
    let groups: [(&str, &Vec<String>); 6] = [
        ("extra_dirs", &root.extra_dirs),
        ("missing_dirs", &root.missing_dirs),
        ("extra_files", &root.extra_files),
        ("missing_files", &root.missing_files),
        ("suspicious_dirs", &root.suspicious_dirs),
        ("suspicious_files", &root.suspicious_files),
    ];
    let detail = groups
        .iter()
        .filter(|(_, v)| !v.is_empty())
        .map(|(name, v)| format!("{name}={}", v.len()))
        .collect::<Vec<_>>()
        .join(" | ");
    let sample = groups
        .iter()
        .flat_map(|(_, v)| v.iter().cloned())
        .take(SAMPLE_LIMIT)
        .collect();
    let suspicious = !root.suspicious_dirs.is_empty() || !root.suspicious_files.is_empty();
    let status = if suspicious { CheckStatus::Fail } else { CheckStatus::Warn };
    Some(Finding::new(status, detail).with_items(sample))
}

fn model_caps(i: &Inputs<'_>) -> Option<Finding> {
    let stats = i.ctx.info.kn5_stats.as_ref()?;
    let rb = i.ctx.rulebook;
    let mut over = Vec::new();
    if let (Some(t), Some(max)) = (stats.total_triangles, rb.max_triangles) {
        if t > max {
            over.push(format!("tri={t}>{max}"));
        }
    }
    if let (Some(o), Some(max)) = (stats.total_objects, rb.max_objects) {
        if o > max {
            over.push(format!("obj={o}>{max}"));
        }
    }
    Some(Finding::pass_or(over.is_empty(), CheckStatus::Fail, over.join(" ")))
}

fn kn5_sizes(i: &Inputs<'_>) -> Option<Finding> {
    let max = i.ctx.rulebook.max_kn5_mb?;
    let sizes = &i.ctx.info.assets.kn5_sizes_mb;
    if sizes.is_empty() {
        return None;
    }
    let over: Vec<&String> = sizes.iter().filter(|(_, mb)| **mb > max).map(|(n, _)| n).collect();
    Some(Finding::pass_or(over.is_empty(), CheckStatus::Fail, format!("over={over:?}")))
}

fn skin_count(i: &Inputs<'_>) -> Option<Finding> {
    let count = i.ctx.info.assets.skins_count?;
    Some(Finding::pass_or(count == 1, CheckStatus::Fail, format!("count={count}")))
}

fn aero_cl(i: &Inputs<'_>) -> Option<Finding> {
    let path = i.ctx.car_root.join("data").join("aero.ini");
    if !path.is_file() {
        return Some(Finding::new(CheckStatus::Pass, "no aero.ini"));
    }
    let doc = match ConfigDocument::parse(&path) {
        Ok(doc) => doc,
        Err(_) => return Some(Finding::new(CheckStatus::Warn, "parse error")),
    };
    Some(match doc.first_float(AERO_CL) {
        Some(cl) => Finding::pass_or(cl.abs() < AERO_CL_LIMIT, CheckStatus::Warn, format!("CL={cl}")),
        None => Finding::pass(),
    })
}

fn turbo_pressure(i: &Inputs<'_>) -> Option<Finding> {
    let data = i.ctx.car_root.join("data");
    let controllers: Vec<_> = std::fs::read_dir(&data)
        .map(|rd| {
            rd.filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| {
                    p.file_name()
                        .map(|n| n.to_string_lossy().to_lowercase())
                        .is_some_and(|n| n.starts_with("ctrl_turbo") && n.ends_with(".ini"))
                })
                .collect()
        })
        .unwrap_or_default();
    if controllers.is_empty() {
        return Some(Finding::new(CheckStatus::Pass, "no turbo ctrl"));
    }
    let high = controllers.iter().any(|p| {
        ConfigDocument::parse(p)
            .ok()
            .and_then(|doc| doc.get_float("TURBO", "REFERENCE_PRESSURE"))
            .is_some_and(|v| v > TURBO_PRESSURE_LIMIT)
    });
    Some(Finding::pass_or(!high, CheckStatus::Warn, ""))
}

fn hygiene(items: &[String]) -> Option<Finding> {
    Some(
        Finding::pass_or(items.is_empty(), CheckStatus::Warn, format!("count={}", items.len()))
            .with_items(items.iter().take(HYGIENE_ITEM_LIMIT).cloned().collect()),
    )
}

fn hidden_files(i: &Inputs<'_>) -> Option<Finding> {
    hygiene(&i.hygiene.hidden_files)
}

fn hidden_dirs(i: &Inputs<'_>) -> Option<Finding> {
    hygiene(&i.hygiene.hidden_dirs)
}

fn odd_names(i: &Inputs<'_>) -> Option<Finding> {
    hygiene(&i.hygiene.odd_names)
}

fn archives(i: &Inputs<'_>) -> Option<Finding> {
    hygiene(&i.hygiene.archives)
}

fn case_collisions(i: &Inputs<'_>) -> Option<Finding> {
    hygiene(&i.hygiene.case_collisions)
}

fn scripts(i: &Inputs<'_>) -> Option<Finding> {
    hygiene(&i.hygiene.scripts)
}

fn zero_sized(i: &Inputs<'_>) -> Option<Finding> {
    hygiene(&i.hygiene.zero_sized)
}

fn steering_source(i: &Inputs<'_>) -> Option<Finding> {
    let steering = &i.ctx.info.steering;
    if steering.measured.is_some() {
        return Some(Finding::new(CheckStatus::Pass, "CM measured"));
    }
    Some(match steering.effective.map(|s| s.provenance) {
        Some(SteeringProvenance::Geometry) => Finding::new(CheckStatus::Warn, "Geometry simulated"),
        Some(_) => Finding::new(CheckStatus::Warn, "INI ratio estimated"),
        None => Finding::new(CheckStatus::Warn, "Unavailable"),
    })
}

fn steering_reference(i: &Inputs<'_>) -> Option<Finding> {
    let diff = i.ctx.info.steering.reference_delta_deg?.abs();
    let status = if diff <= 0.5 {
        CheckStatus::Pass
    } else if diff <= 2.0 {
        CheckStatus::Warn
    } else {
        CheckStatus::Fail
    };
    Some(Finding::new(status, format!("Δ={diff:.2}°")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{Kn5Stats, Kn5StatsSource, SteeringSolution};
    use tempfile::TempDir;

    fn run_on(root: &Path, info: &InspectionInfo, rulebook: &RulebookConfig) -> Vec<AntiCheatCheck> {
        run(&CheckContext {
            car_root: root,
            info,
            rulebook,
            matched_reference: Some("ref_a"),
            exact_physics_match: true,
        })
    }

    fn find<'a>(checks: &'a [AntiCheatCheck], code: &str) -> Option<&'a AntiCheatCheck> {
        checks.iter().find(|c| c.code == code)
    }

    #[test]
    fn hidden_file_is_reported_with_its_path() {
        let dir = TempDir::new().expect("tempdir");
        std::fs::create_dir_all(dir.path().join("data")).expect("mkdir");
        std::fs::write(dir.path().join(".hidden"), b"x").expect("write");
        let checks = run_on(dir.path(), &InspectionInfo::default(), &RulebookConfig::default());

        let ac021 = find(&checks, "AC021").expect("AC021");
        assert_eq!(ac021.status, CheckStatus::Warn);
        assert_eq!(ac021.detail, "count=1");
        assert_eq!(ac021.items.as_deref(), Some(&[".hidden".to_string()][..]));
        assert_eq!(find(&checks, "AC001").map(|c| c.status), Some(CheckStatus::Pass));
        assert_eq!(find(&checks, "AC003").map(|c| c.detail.as_str()), Some("ref_a"));
    }

    #[test]
    fn hygiene_walk_finds_archives_scripts_and_empty_files() {
        let dir = TempDir::new().expect("tempdir");
        let root = dir.path();
        std::fs::create_dir_all(root.join("skins/a")).expect("mkdir");
        std::fs::write(root.join("skins/a/bundle.ZIP"), b"pk").expect("write");
        std::fs::write(root.join("tool.py"), b"print()").expect("write");
        std::fs::write(root.join("empty.txt"), b"").expect("write");
        let h = Hygiene::scan(root);
        assert_eq!(h.archives, vec!["skins/a/bundle.ZIP"]);
        assert_eq!(h.scripts, vec!["tool.py"]);
        assert_eq!(h.zero_sized, vec!["empty.txt"]);
        assert!(h.hidden_files.is_empty());
    }

    #[test]
    fn changed_extension_file_warns_without_failing() {
        use crate::domain::models::{ExtensionStatus, ExtensionSummary};

        let dir = TempDir::new().expect("tempdir");
        let mut info = InspectionInfo::default();
        info.extension = Some(ExtensionSummary {
            status: ExtensionStatus::Cosmetic,
            expected: true,
            files: vec!["extension/lights.ini".to_string()],
            physics: Vec::new(),
            cosmetic_count: 1,
            unknown: Vec::new(),
        });
        info.data_files.extension_hash_mismatches = vec!["extension/lights.ini".to_string()];
        let checks = run_on(dir.path(), &info, &RulebookConfig::default());

        let ac030 = find(&checks, "AC030").expect("AC030");
        assert_eq!(ac030.status, CheckStatus::Warn);
        assert_eq!(ac030.detail, "reference whitelist defined | files=1 | changed=1");
        assert_eq!(ac030.items.as_deref(), Some(&["extension/lights.ini".to_string()][..]));
    }

    #[test]
    fn suspicious_names_and_zero_width_characters() {
        assert!(has_suspicious_chars("skin\u{200B}.dds"));
        assert!(has_suspicious_chars("a\tb"));
        assert!(!has_suspicious_chars("livery_01.dds"));
        assert!(is_hidden_name("Thumbs.db"));
        assert!(is_hidden_name(".git"));
    }

    #[test]
    fn power_spikes_are_described() {
        let spikes = power_spikes_in(&[(1000.0, 100.0), (2000.0, 150.0), (3000.0, 160.0), (4000.0, 88.0)]);
        assert_eq!(
            spikes,
            vec![
                "2000 rpm up 50.0% (Δ +50.0 hp)".to_string(),
                "4000 rpm down -45.0% (Δ -72.0 hp)".to_string(),
            ]
        );
    }

    #[test]
    fn threshold_mirrors_only_run_when_configured() {
        let dir = TempDir::new().expect("tempdir");
        let mut info = InspectionInfo::default();
        info.physics.drivetrain = Some("AWD".to_string());
        info.tyres.front_width_mm = Some(275);
        info.kn5_stats = Some(Kn5Stats {
            total_triangles: Some(600_000),
            total_objects: Some(10),
            source: Kn5StatsSource::External,
        });

        let open = run_on(dir.path(), &info, &RulebookConfig::default());
        assert!(find(&open, "AC007").is_none());
        assert!(find(&open, "AC008").is_none());
        assert_eq!(find(&open, "AC016").map(|c| c.status), Some(CheckStatus::Pass));

        let comp = run_on(dir.path(), &info, &RulebookConfig::competition());
        assert_eq!(find(&comp, "AC007").map(|c| c.detail.as_str()), Some("AWD"));
        assert_eq!(
            find(&comp, "AC008").map(|c| c.detail.as_str()),
            Some("275 mm (exp 225-265)")
        );
        assert_eq!(find(&comp, "AC016").map(|c| c.detail.as_str()), Some("tri=600000>500000"));
    }

    #[test]
    fn steering_reference_delta_bands() {
        let dir = TempDir::new().expect("tempdir");
        let mut info = InspectionInfo::default();
        info.steering.effective = Some(SteeringSolution {
            inner_deg: 33.0,
            outer_deg: 31.0,
            provenance: SteeringProvenance::Geometry,
        });
        info.steering.reference_delta_deg = Some(-1.25);
        let checks = run_on(dir.path(), &info, &RulebookConfig::default());
        let ac029 = find(&checks, "AC029").expect("AC029");
        assert_eq!(ac029.status, CheckStatus::Warn);
        assert_eq!(ac029.detail, "Δ=1.25°");
        assert_eq!(find(&checks, "AC028").map(|c| c.detail.as_str()), Some("Geometry simulated"));
    }

    #[test]
    fn empty_detail_falls_back_to_hint() {
        let dir = TempDir::new().expect("tempdir");
        let checks = run_on(dir.path(), &InspectionInfo::default(), &RulebookConfig::default());
        let ac001 = find(&checks, "AC001").expect("AC001");
        assert_eq!(ac001.status, CheckStatus::Fail);
        assert_eq!(ac001.detail, hint("AC001").unwrap_or_default());
        assert!(hint("AC999").is_none());
    }
}
