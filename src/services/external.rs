//! Timeout-bounded shell commands that produce sidecar JSON files.
//!
//! Failures never propagate: callers inspect [`ExternalOutcome`] and fall
//! back to derived values.

use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug)]
pub enum ExternalOutcome {
    Completed(ExitStatus),
    TimedOut,
    SpawnFailed(std::io::Error),
}

impl ExternalOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(self, ExternalOutcome::Completed(status) if status.success())
    }
}

/// Replaces `{car}` and `{out}` in a command template.
pub fn render(template: &str, car: &Path, out: &Path) -> String {
    template
        .replace("{car}", &car.display().to_string())
        .replace("{out}", &out.display().to_string())
}

fn shell(command_line: &str) -> Command {
    if cfg!(windows) {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", command_line]);
        cmd
    } else {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", command_line]);
        cmd
    }
}

/// Runs the rendered template, killing it once `timeout` elapses.
/// The parent directory of `out` is created first.
pub fn run_template(template: &str, car: &Path, out: &Path, timeout: Duration) -> ExternalOutcome {
    if let Some(parent) = out.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            tracing::warn!(error = %e, dir = %parent.display(), "cannot create sidecar directory");
        }
    }
    let command_line = render(template, car, out);
    tracing::debug!(command = %command_line, timeout_secs = timeout.as_secs(), "running external command");

    let mut child = match shell(&command_line)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
    {
        Ok(child) => child,
        Err(e) => {
            tracing::warn!(error = %e, "external command failed to start");
            return ExternalOutcome::SpawnFailed(e);
        }
    };

    let start = Instant::now();
    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                if !status.success() {
                    tracing::warn!(%status, "external command exited unsuccessfully");
                }
                return ExternalOutcome::Completed(status);
            }
            Ok(None) if start.elapsed() >= timeout => {
                let _ = child.kill();
                let _ = child.wait();
                tracing::warn!(timeout_secs = timeout.as_secs(), "external command timed out");
                return ExternalOutcome::TimedOut;
            }
            Ok(None) => std::thread::sleep(POLL_INTERVAL),
            Err(e) => {
                let _ = child.kill();
                tracing::warn!(error = %e, "lost track of external command");
                return ExternalOutcome::SpawnFailed(e);
            }
        }
    }
}
