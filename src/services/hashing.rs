use crate::error::{InspectError, Result};
use sha1::{Digest, Sha1};
use std::collections::BTreeMap;
use std::path::Path;
use walkdir::WalkDir;

pub fn sha1_file(path: &Path) -> Result<String> {
    let mut file = std::fs::File::open(path).map_err(|e| InspectError::io(path, e))?;
    let mut hasher = Sha1::new();
    std::io::copy(&mut file, &mut hasher).map_err(|e| InspectError::io(path, e))?;
    Ok(hex::encode(hasher.finalize()))
}

/// Car-root-relative path with forward slashes.
pub fn relative_slash(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Hashes every file under `data/` and `extension/` plus `collider.kn5`.
/// Unreadable files are skipped.
pub fn hash_car_content(car_root: &Path) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    for dir in ["data", "extension"] {
        let base = car_root.join(dir);
        if !base.is_dir() {
            continue;
        }
        for entry in WalkDir::new(&base)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            record(car_root, entry.path(), &mut out);
        }
    }
    let collider = car_root.join("collider.kn5");
    if collider.is_file() {
        record(car_root, &collider, &mut out);
    }
    out
}

fn record(car_root: &Path, path: &Path, out: &mut BTreeMap<String, String>) {
    match sha1_file(path) {
        Ok(digest) => {
            out.insert(relative_slash(car_root, path), digest);
        }
        Err(e) => tracing::warn!(error = %e, "skipping unhashable file"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_known_content_and_scopes_to_data_extension_collider() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path();
        std::fs::create_dir_all(root.join("data")).expect("mkdir");
        std::fs::create_dir_all(root.join("skins/a")).expect("mkdir");
        std::fs::write(root.join("data/car.ini"), "abc").expect("write");
        std::fs::write(root.join("collider.kn5"), "abc").expect("write");
        std::fs::write(root.join("skins/a/livery.png"), "abc").expect("write");

        let hashes = hash_car_content(root);
        let sha_abc = "a9993e364706816aba3e25717850c26c9cd0d89d";
        assert_eq!(hashes.get("data/car.ini").map(String::as_str), Some(sha_abc));
        assert_eq!(hashes.get("collider.kn5").map(String::as_str), Some(sha_abc));
        assert_eq!(hashes.len(), 2);
    }
}
