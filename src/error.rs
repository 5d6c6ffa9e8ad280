use std::path::{Path, PathBuf};

#[derive(thiserror::Error, Debug)]
pub enum InspectError {
    #[error("file not found: {0}")]
    NotFound(PathBuf),
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid json in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid rulebook {path}: {source}")]
    Rulebook {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("reference root not found: {0}")]
    ReferenceRoot(PathBuf),
    #[error("reference not present in index: {0}")]
    UnknownReference(String),
}

impl InspectError {
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            InspectError::NotFound(path.to_path_buf())
        } else {
            InspectError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, InspectError::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, InspectError>;

/// Reads a text file, dropping a UTF-8 BOM and replacing invalid bytes.
pub fn read_text_lossy(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).map_err(|e| InspectError::io(path, e))?;
    let text = String::from_utf8_lossy(&bytes);
    Ok(text.trim_start_matches('\u{feff}').to_string())
}

/// Reads and parses a JSON file.
pub fn read_json(path: &Path) -> Result<serde_json::Value> {
    let raw = read_text_lossy(path)?;
    serde_json::from_str(&raw).map_err(|source| InspectError::Json {
        path: path.to_path_buf(),
        source,
    })
}
