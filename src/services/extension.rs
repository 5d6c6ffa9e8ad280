//! Triage of files under a submission's `extension/` folder.
//!
//! Classification is keyword and path based. A "physics" hit means the
//! file could plausibly override vehicle behaviour, not that it does.

use crate::domain::models::{ExtensionFinding, ExtensionStatus, ExtensionSummary};
use crate::services::hashing::relative_slash;
use std::path::Path;
use walkdir::WalkDir;

const SCRIPT_SUFFIXES: &[&str] = &[".lua", ".py", ".dll", ".exe", ".bat", ".ps1"];
const TEXT_SUFFIXES: &[&str] = &[".ini", ".cfg", ".txt", ".json", ".ini.disabled"];
const COSMETIC_SUFFIXES: &[&str] = &[
    ".dds", ".png", ".jpg", ".jpeg", ".bmp", ".tga", ".gif", ".wav", ".ogg", ".mp3", ".bank",
    ".kn5.json",
];

const CONFIG_KEYWORDS: &[&str] = &[
    "[physics",
    "extended_physics",
    "enable_extended_physics",
    "use_extended_physics",
    "physics_extension",
    "extra_physics",
    "physics.lr",
    "physics_override",
    "[tyres",
    "[drivetrain",
    "[engine",
    "[suspensions",
    "[aero",
    "torque_curve",
    "power_curve",
    "wheel_rate",
    "inertia=",
    "final_ratio",
    "gear_",
    "steer_lock",
    "cg_location",
    "tyre_pressure",
    "wing_",
];

const LUA_HOOKS: &[&str] = &[
    "require(\"physics",
    "ac.setcarphysics",
    "ac.onphysicsstep",
    "ac.ext_patch.physics",
    "applyextendedphysics",
    "setextendedphysics",
    "setcarparam",
    "settyre",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Physics(String),
    Cosmetic,
    Unknown,
}

fn suffix_of(name_lower: &str) -> String {
    if name_lower.ends_with(".ini.disabled") {
        return ".ini.disabled".to_string();
    }
    if name_lower.ends_with(".kn5.json") {
        return ".kn5.json".to_string();
    }
    match name_lower.rfind('.') {
        Some(i) if i > 0 => name_lower[i..].to_string(),
        _ => String::new(),
    }
}

/// A directory segment named `data` or `lua`, or any segment under
/// `extension/` starting with `physics`.
fn physics_path(rel_lower: &str) -> bool {
    let segments: Vec<&str> = rel_lower.split('/').collect();
    let dirs = &segments[..segments.len().saturating_sub(1)];
    dirs.iter().any(|s| *s == "data" || *s == "lua")
        || segments.iter().skip(1).any(|s| s.starts_with("physics"))
}

fn read_lower(path: &Path) -> String {
    std::fs::read(path)
        .map(|bytes| String::from_utf8_lossy(&bytes).to_lowercase())
        .unwrap_or_default()
}

/// Classifies one file given its car-relative slash path.
pub fn classify(rel: &str, path: &Path) -> Classification {
    let rel_lower = rel.to_lowercase();
    let name_lower = rel_lower.rsplit('/').next().unwrap_or_default();
    let suffix = suffix_of(name_lower);

    if physics_path(&rel_lower) {
        return Classification::Physics("data/physics path".to_string());
    }
    if SCRIPT_SUFFIXES.contains(&suffix.as_str()) {
        if suffix == ".lua" {
            let text = read_lower(path);
            return if LUA_HOOKS.iter().any(|k| text.contains(k)) {
                Classification::Physics("lua physics hook".to_string())
            } else {
                Classification::Unknown
            };
        }
        return Classification::Physics(format!("script file ({suffix})"));
    }
    if TEXT_SUFFIXES.contains(&suffix.as_str()) {
        let text = read_lower(path);
        return match CONFIG_KEYWORDS.iter().find(|k| text.contains(*k)) {
            Some(k) => Classification::Physics(format!("keyword '{k}'")),
            None => Classification::Cosmetic,
        };
    }
    if COSMETIC_SUFFIXES.contains(&suffix.as_str()) {
        return Classification::Cosmetic;
    }
    Classification::Unknown
}

/// `None` when there is no `extension/` folder and the reference ships none.
pub fn summarize(car_root: &Path, reference_has_extension: bool) -> Option<ExtensionSummary> {
    let ext_dir = car_root.join("extension");
    if !ext_dir.is_dir() {
        return reference_has_extension.then(|| ExtensionSummary {
            status: ExtensionStatus::Missing,
            expected: true,
            files: Vec::new(),
            physics: Vec::new(),
            cosmetic_count: 0,
            unknown: Vec::new(),
        });
    }

    let mut files = Vec::new();
    let mut physics = Vec::new();
    let mut unknown = Vec::new();
    let mut cosmetic_count = 0;
    for entry in WalkDir::new(&ext_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let rel = relative_slash(car_root, entry.path());
        match classify(&rel, entry.path()) {
            Classification::Physics(reason) => physics.push(ExtensionFinding {
                file: rel.clone(),
                reason,
            }),
            Classification::Cosmetic => cosmetic_count += 1,
            Classification::Unknown => unknown.push(rel.clone()),
        }
        files.push(rel);
    }
    files.sort();
    physics.sort_by(|a, b| a.file.cmp(&b.file));
    unknown.sort();

    let status = if !physics.is_empty() {
        ExtensionStatus::Flagged
    } else if !unknown.is_empty() {
        ExtensionStatus::NeedsReview
    } else {
        ExtensionStatus::Cosmetic
    };
    tracing::debug!(files = files.len(), ?status, "extension folder classified");
    Some(ExtensionSummary {
        status,
        expected: reference_has_extension,
        files,
        physics,
        cosmetic_count,
        unknown,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(root: &Path, rel: &str, body: &str) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("mkdir");
        }
        std::fs::write(path, body).expect("write");
    }

    #[test]
    fn classifies_by_path_script_keyword_and_suffix() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path();
        write(root, "extension/data/car.ini", "[BASIC]");
        write(root, "extension/tool.dll", "bin");
        write(root, "extension/visual.lua", "ac.debug('hi')");
        write(root, "extension/hook.lua", "ac.setCarPhysics(1)");
        write(root, "extension/ext_config.ini", "[LIGHTS]\nCOLOR=1");
        write(root, "extension/tune.ini", "[TYRES_OVERRIDE]\nx=1");
        write(root, "extension/decal.dds", "x");
        write(root, "extension/readme.md", "x");

        let c = |rel: &str| classify(rel, &root.join(rel));
        assert_eq!(c("extension/data/car.ini"), Classification::Physics("data/physics path".into()));
        assert_eq!(c("extension/tool.dll"), Classification::Physics("script file (.dll)".into()));
        assert_eq!(c("extension/visual.lua"), Classification::Unknown);
        assert_eq!(c("extension/hook.lua"), Classification::Physics("lua physics hook".into()));
        assert_eq!(c("extension/ext_config.ini"), Classification::Cosmetic);
        assert_eq!(c("extension/tune.ini"), Classification::Physics("keyword '[tyres'".into()));
        assert_eq!(c("extension/decal.dds"), Classification::Cosmetic);
        assert_eq!(c("extension/readme.md"), Classification::Unknown);
    }

    #[test]
    fn summary_status_follows_worst_finding() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path();
        write(root, "extension/skin.png", "x");
        let s = summarize(root, false).expect("summary");
        assert_eq!(s.status, ExtensionStatus::Cosmetic);
        assert_eq!(s.cosmetic_count, 1);

        write(root, "extension/notes.bin", "x");
        assert_eq!(summarize(root, false).expect("summary").status, ExtensionStatus::NeedsReview);

        write(root, "extension/physics_tweak.cfg", "x");
        let s = summarize(root, true).expect("summary");
        assert_eq!(s.status, ExtensionStatus::Flagged);
        assert!(s.expected);
        assert_eq!(s.physics[0].file, "extension/physics_tweak.cfg");
    }

    #[test]
    fn missing_folder_only_reported_when_reference_has_one() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(summarize(dir.path(), false).is_none());
        let s = summarize(dir.path(), true).expect("summary");
        assert_eq!(s.status, ExtensionStatus::Missing);
    }
}
