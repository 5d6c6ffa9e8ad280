use super::naming::list_kn5;
use super::{bytes_to_mb, Diagnostics, Submission};
use crate::domain::constants::MAX_TEXTURE_PX;
use crate::domain::models::{LargestSkin, TextureInfo};
use crate::services::hashing::relative_slash;
use crate::services::textures::{self, TextureKind};
use std::path::Path;
use walkdir::WalkDir;

fn file_size(path: &Path) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

fn folder_size(dir: &Path) -> u64 {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.metadata().ok())
        .map(|m| m.len())
        .sum()
}

pub(super) fn check(sub: &Submission<'_>, diag: &mut Diagnostics) {
    let rb = sub.rulebook;

    for name in list_kn5(sub.root) {
        let mb = bytes_to_mb(file_size(&sub.root.join(&name)));
        if let Some(max) = rb.max_kn5_mb.filter(|max| mb > *max) {
            diag.violation(format!("KN5 file {name} size {mb:.1}MB (max {max}MB)"));
        }
        diag.info.assets.kn5_sizes_mb.insert(name.clone(), mb);
        diag.info.assets.kn5_files.push(name);
    }

    let skins_dir = sub.root.join("skins");
    if !skins_dir.is_dir() {
        return;
    }
    let mut skins: Vec<_> = std::fs::read_dir(&skins_dir)
        .map(|rd| rd.filter_map(|e| e.ok()).map(|e| e.path()).filter(|p| p.is_dir()).collect())
        .unwrap_or_default();
    skins.sort();

    let mut largest: Option<LargestSkin> = None;
    for skin in &skins {
        let name = skin
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let mb = bytes_to_mb(folder_size(skin));
        if largest.as_ref().map_or(true, |l| mb > l.size_mb) {
            largest = Some(LargestSkin {
                name: name.clone(),
                size_mb: mb,
            });
        }
        diag.info.assets.skin_sizes_mb.insert(name.clone(), mb);
        diag.info.assets.skins.push(name);
        audit_textures(sub.root, skin, diag);
    }

    if let (Some(l), Some(max)) = (&largest, rb.max_skin_mb) {
        if l.size_mb > max {
            diag.violation(format!("Largest skin '{}' is {:.1}MB (max {max}MB)", l.name, l.size_mb));
        }
    }
    diag.info.assets.largest_skin = largest;
    diag.info.assets.skins_count = Some(skins.len());
    if skins.len() != 1 {
        diag.violation(format!("Skins count {} (expected 1)", skins.len()));
    }
}

fn audit_textures(car_root: &Path, skin: &Path, diag: &mut Diagnostics) {
    for entry in WalkDir::new(skin)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let path = entry.path();
        let rel = relative_slash(car_root, path);
        match textures::kind_of(path) {
            TextureKind::Png | TextureKind::Jpeg => {}
            TextureKind::Unchecked => {
                diag.info.assets.textures_unchecked.push(rel);
                continue;
            }
            TextureKind::Other => continue,
        }
        let (width, height) = textures::dimensions(path).unwrap_or((0, 0));
        if width > MAX_TEXTURE_PX || height > MAX_TEXTURE_PX {
            let file = entry.file_name().to_string_lossy();
            diag.violation(format!("Large texture dimensions {width}x{height} in {file} (>{MAX_TEXTURE_PX})"));
        }
        diag.info.assets.textures.push(TextureInfo {
            file: rel,
            width,
            height,
            size_mb: bytes_to_mb(file_size(path)),
        });
    }
}
