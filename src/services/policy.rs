use crate::domain::rulebook::RulebookConfig;
use crate::error::{read_text_lossy, InspectError, Result};
use std::path::Path;

/// Named rulebook bases selectable from the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Preset {
    #[default]
    None,
    Competition,
}

impl Preset {
    pub fn rulebook(self) -> RulebookConfig {
        match self {
            Preset::None => RulebookConfig::default(),
            Preset::Competition => RulebookConfig::competition(),
        }
    }
}

/// Loads a TOML rulebook. Fields it leaves out stay unconstrained.
pub fn load_rulebook(path: &Path) -> Result<RulebookConfig> {
    let raw = read_text_lossy(path)?;
    toml::from_str(&raw).map_err(|source| InspectError::Rulebook {
        path: path.to_path_buf(),
        source,
    })
}

/// Per-run overrides applied on top of the preset or file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub fallback_reference: Option<String>,
    pub steer_cmd: Option<String>,
    pub kn5_stats_cmd: Option<String>,
}

/// Preset, then the file (replacing it wholesale), then the overrides.
pub fn resolve_rulebook(preset: Preset, file: Option<&Path>, overrides: Overrides) -> Result<RulebookConfig> {
    let mut rb = match file {
        Some(path) => load_rulebook(path)?,
        None => preset.rulebook(),
    };
    if overrides.fallback_reference.is_some() {
        rb.fallback_reference_key = overrides.fallback_reference;
    }
    if overrides.steer_cmd.is_some() {
        rb.steer_measurement_cmd = overrides.steer_cmd;
    }
    if overrides.kn5_stats_cmd.is_some() {
        rb.kn5_stats_cmd = overrides.kn5_stats_cmd;
    }
    Ok(rb)
}
