use crate::cli::{Cli, Commands};
use anyhow::Context;
use car_inspector::services::output::print_one;
use car_inspector::services::reference_index::ReferenceIndex;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize)]
struct IndexSummary {
    spec_path: PathBuf,
    fingerprints_path: PathBuf,
    root: PathBuf,
    cars: usize,
    as_of: DateTime<Utc>,
}

fn summary(index: &ReferenceIndex, spec_path: &Path) -> IndexSummary {
    IndexSummary {
        spec_path: spec_path.to_path_buf(),
        fingerprints_path: ReferenceIndex::fingerprints_path(spec_path),
        root: index.root().to_path_buf(),
        cars: index.specs.cars.len(),
        as_of: index.as_of(),
    }
}

fn text(s: &IndexSummary) -> String {
    format!(
        "indexed {} reference cars from {}\nspec: {}\nfingerprints: {}",
        s.cars,
        s.root.display(),
        s.spec_path.display(),
        s.fingerprints_path.display()
    )
}

pub fn handle_index_commands(cli: &Cli) -> anyhow::Result<()> {
    match &cli.command {
        Commands::BuildIndex {
            reference_root,
            out,
        } => {
            let index = ReferenceIndex::build(reference_root)
                .with_context(|| format!("build index from {}", reference_root.display()))?;
            index.save(out)?;
            print_one(cli.json, summary(&index, out), text)?;
        }
        Commands::RefreshIndex { index: path } => {
            let mut index = ReferenceIndex::load(path)
                .with_context(|| format!("load index {}", path.display()))?;
            index.refresh()?;
            index.save(path)?;
            print_one(cli.json, summary(&index, path), text)?;
        }
        _ => {}
    }
    Ok(())
}
