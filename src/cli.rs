use car_inspector::services::policy::{Overrides, Preset};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "car-inspector", version, about = "Vehicle physics submission inspector")]
pub struct Cli {
    #[arg(long, global = true, help = "Output machine-readable JSON")]
    pub json: bool,
    #[arg(short, long, global = true, help = "Debug logging on stderr")]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Hash and index every reference car under a root folder.
    BuildIndex {
        #[arg(long)]
        reference_root: PathBuf,
        #[arg(long, help = "Spec index path; fingerprints land next to it")]
        out: PathBuf,
    },
    /// Rebuild an existing index from the reference root it records.
    RefreshIndex {
        #[arg(long)]
        index: PathBuf,
    },
    /// Inspect one submitted car folder.
    Inspect {
        car: PathBuf,
        #[arg(long)]
        index: PathBuf,
        #[command(flatten)]
        rules: RulebookArgs,
        #[arg(long, help = "Append a JSON line per inspection to this file")]
        history: Option<PathBuf>,
    },
    /// Inspect every car folder under a root.
    InspectBatch {
        root: PathBuf,
        #[arg(long)]
        index: PathBuf,
        #[command(flatten)]
        rules: RulebookArgs,
        #[arg(long)]
        history: Option<PathBuf>,
    },
    /// Produce the steering measurement sidecar for a car.
    GenSteer {
        car: PathBuf,
        #[arg(long, help = "Command template with {car} and {out} placeholders")]
        cmd: Option<String>,
        #[arg(long, help = "Defaults to <car>/analysis/cm_steer.json")]
        out: Option<PathBuf>,
        #[arg(long, help = "Command timeout in seconds")]
        timeout: Option<u64>,
    },
}

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum Ruleset {
    #[default]
    None,
    Competition,
}

impl From<Ruleset> for Preset {
    fn from(r: Ruleset) -> Self {
        match r {
            Ruleset::None => Preset::None,
            Ruleset::Competition => Preset::Competition,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct RulebookArgs {
    #[arg(long, value_enum, default_value_t = Ruleset::None)]
    pub ruleset: Ruleset,
    #[arg(long, help = "TOML rulebook; replaces the ruleset preset")]
    pub rulebook: Option<PathBuf>,
    #[arg(long)]
    pub fallback_reference: Option<String>,
    #[arg(long)]
    pub steer_cmd: Option<String>,
    #[arg(long)]
    pub kn5_stats_cmd: Option<String>,
}

impl RulebookArgs {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            fallback_reference: self.fallback_reference.clone(),
            steer_cmd: self.steer_cmd.clone(),
            kn5_stats_cmd: self.kn5_stats_cmd.clone(),
        }
    }
}
