use super::{has_prefix, Diagnostics, Submission};
use crate::domain::constants::{NAME_PREFIX_EXEMPT_KN5, TEMP_FOLDER_PREFIXES};
use std::path::Path;

const KN5_LIST_LIMIT: usize = 5;

/// Top-level `*.kn5` file names, sorted.
pub(crate) fn list_kn5(car_root: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(car_root)
        .map(|rd| {
            rd.filter_map(|e| e.ok())
                .filter(|e| e.path().is_file())
                .map(|e| e.file_name().to_string_lossy().to_string())
                .filter(|n| {
                    Path::new(n)
                        .extension()
                        .is_some_and(|ext| ext.eq_ignore_ascii_case("kn5"))
                })
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

pub(super) fn check(sub: &Submission<'_>, diag: &mut Diagnostics) {
    let naming = &mut diag.info.naming;
    naming.folder_name = diag.info.car.clone();
    let folder_lower = naming.folder_name.to_lowercase();
    naming.folder_looks_temporary = TEMP_FOLDER_PREFIXES.iter().any(|p| folder_lower.starts_with(p));
    naming.ui_name = sub.ui.get("name").and_then(|v| v.as_str()).map(str::to_string);
    naming.screen_name = sub
        .docs
        .get("car.ini")
        .get_str("INFO", "SCREEN_NAME")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    naming.kn5_checked = list_kn5(sub.root)
        .into_iter()
        .filter(|name| {
            let stem = Path::new(name)
                .file_stem()
                .map(|s| s.to_string_lossy().to_lowercase())
                .unwrap_or_default();
            !NAME_PREFIX_EXEMPT_KN5.contains(&stem.as_str())
        })
        .collect();

    let Some(prefix) = sub.rulebook.name_prefix.clone() else {
        return;
    };
    let display = prefix.to_uppercase();
    naming.expected_prefix = Some(display.clone());

    let mut messages = Vec::new();
    let folder_ok = has_prefix(&naming.folder_name, &prefix);
    naming.folder_valid = Some(folder_ok);
    if !folder_ok {
        messages.push(if naming.folder_looks_temporary {
            format!(
                "Submission folder '{}' appears temporary; ensure the archive root folder is renamed to begin with '{display}'.",
                naming.folder_name
            )
        } else {
            format!("Car folder name '{}' must begin with '{display}'", naming.folder_name)
        });
    }

    match &naming.ui_name {
        Some(name) => {
            let ok = has_prefix(name, &prefix);
            naming.ui_name_valid = Some(ok);
            if !ok {
                messages.push(format!("ui/ui_car.json name '{name}' must begin with '{display}'"));
            }
        }
        None if sub.root.join(crate::domain::constants::UI_CAR_JSON).is_file() => {
            naming.ui_name_valid = Some(false);
        }
        None => {}
    }

    if let Some(name) = &naming.screen_name {
        let ok = has_prefix(name, &prefix);
        naming.screen_name_valid = Some(ok);
        if !ok {
            messages.push(format!("data/car.ini SCREEN_NAME '{name}' must begin with '{display}'"));
        }
    }

    naming.kn5_prefix_violations = naming
        .kn5_checked
        .iter()
        .filter(|name| !has_prefix(name, &prefix))
        .cloned()
        .collect();
    let bad = &naming.kn5_prefix_violations;
    if !bad.is_empty() {
        let shown = bad.iter().take(KN5_LIST_LIMIT).cloned().collect::<Vec<_>>().join(", ");
        let more = if bad.len() > KN5_LIST_LIMIT {
            format!(", ... (+{} more)", bad.len() - KN5_LIST_LIMIT)
        } else {
            String::new()
        };
        messages.push(format!(
            "KN5 filenames must begin with '{display}' (excluding collider/driver): {shown}{more}"
        ));
    }

    for m in messages {
        diag.violation(m);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kn5_listing_matches_ascii_extension_only() {
        let dir = tempfile::tempdir().expect("tempdir");
        for name in ["efvd_body.KN5", "collider.kn5", "efvd_body.\u{212A}N5", "notes.txt"] {
            std::fs::write(dir.path().join(name), b"x").expect("write");
        }
        assert_eq!(list_kn5(dir.path()), vec!["collider.kn5", "efvd_body.KN5"]);
    }
}
