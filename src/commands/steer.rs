use crate::cli::{Cli, Commands};
use car_inspector::domain::constants::STEER_SIDECAR;
use car_inspector::domain::rulebook::DEFAULT_EXTERNAL_TIMEOUT_SECS;
use car_inspector::error::read_json;
use car_inspector::ini::ConfigDocument;
use car_inspector::services::output::print_one;
use car_inspector::services::{external, steering, storage};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Serialize)]
struct SteerSidecar {
    path: PathBuf,
    source: &'static str,
    max_wheel_angle_deg: f64,
}

fn measured(template: &str, car: &Path, out: &Path, timeout: Duration) -> Option<f64> {
    if !external::run_template(template, car, out, timeout).succeeded() {
        return None;
    }
    let value = read_json(out).ok()?;
    steering::measurement_from_json(&value)
}

fn derived(car: &Path, out: &Path) -> anyhow::Result<f64> {
    let doc = ConfigDocument::parse(&car.join("data").join("car.ini"))?;
    let lock = doc.get_float("CONTROLS", "STEER_LOCK");
    let ratio = doc.get_float("CONTROLS", "STEER_RATIO");
    let Some(solution) = lock.zip(ratio).and_then(|(l, r)| steering::naive(l, r)) else {
        anyhow::bail!("car.ini has no usable [CONTROLS] STEER_LOCK/STEER_RATIO");
    };
    let angle = solution.max_angle();
    storage::write_json(
        out,
        &serde_json::json!({ "max_wheel_angle_deg": angle, "source": "derived" }),
    )?;
    Ok(angle)
}

pub fn handle_steer_command(cli: &Cli) -> anyhow::Result<()> {
    let Commands::GenSteer {
        car,
        cmd,
        out,
        timeout,
    } = &cli.command
    else {
        return Ok(());
    };
    let out = out.clone().unwrap_or_else(|| car.join(STEER_SIDECAR));
    let timeout = Duration::from_secs(timeout.unwrap_or(DEFAULT_EXTERNAL_TIMEOUT_SECS));

    let from_command = cmd
        .as_deref()
        .and_then(|template| measured(template, car, &out, timeout));
    let sidecar = match from_command {
        Some(angle) => SteerSidecar {
            path: out,
            source: "external",
            max_wheel_angle_deg: angle,
        },
        None => {
            if cmd.is_some() {
                tracing::warn!("steering command produced no reading; writing derived value");
            }
            let angle = derived(car, &out)?;
            SteerSidecar {
                path: out,
                source: "derived",
                max_wheel_angle_deg: angle,
            }
        }
    };
    print_one(cli.json, sidecar, |s| {
        format!(
            "{} max wheel angle {:.2}° -> {}",
            s.source,
            s.max_wheel_angle_deg,
            s.path.display()
        )
    })
}
