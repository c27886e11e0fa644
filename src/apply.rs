//! Write rendered artifacts, run syntax checkers, restart the service.
//!
//! One routine serves both services. Every step lands in the report even
//! when it fails; only a restart failure (or a failed write) turns the
//! aggregate result into a failure.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::time::Duration;
use tracing::{info, info_span, warn};

use crate::exec::{CommandOutcome, CommandRunner};
use crate::service::{control_service, ServiceAction};
use crate::{Artifact, OperationReport};

/// An external syntax checker and the exit codes it may return on valid input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckSpec {
    pub label: String,
    pub program: String,
    pub args: Vec<String>,
    pub accepted_codes: Vec<i32>,
}

impl CheckSpec {
    /// Build from an already expanded command template; `None` when empty.
    pub fn from_command(label: &str, command: Vec<String>, accepted_codes: &[i32]) -> Option<Self> {
        let mut parts = command.into_iter();
        let program = parts.next()?;
        Some(Self {
            label: label.to_string(),
            program,
            args: parts.collect(),
            accepted_codes: accepted_codes.to_vec(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct ApplyJob {
    pub artifacts: Vec<Artifact>,
    pub checks: Vec<CheckSpec>,
    /// systemd unit restarted at the end
    pub unit: String,
    pub systemctl: String,
    pub timeout: Duration,
}

fn service_lock(unit: &str) -> Arc<Mutex<()>> {
    static LOCKS: OnceLock<Mutex<HashMap<String, Arc<Mutex<()>>>>> = OnceLock::new();
    let mut locks = LOCKS
        .get_or_init(Default::default)
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    locks.entry(unit.to_string()).or_default().clone()
}

/// Replace `path` with `content` in one step: temp file, fsync, rename.
pub fn write_artifact(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(format!(".tmp.{}", std::process::id()));
    let tmp_path = std::path::PathBuf::from(tmp_name);
    let result = (|| -> Result<()> {
        let mut tmp_file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&tmp_path)
            .with_context(|| format!("Failed to create temporary file: {}", tmp_path.display()))?;
        tmp_file
            .write_all(content.as_bytes())
            .with_context(|| format!("Failed to write temporary file: {}", tmp_path.display()))?;
        tmp_file
            .sync_all()
            .with_context(|| format!("Failed to sync temporary file: {}", tmp_path.display()))?;
        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("Failed to replace file: {}", path.display()))
    })();

    if result.is_err() {
        let _ = std::fs::remove_file(&tmp_path);
    }
    result
}

fn outcome_body(outcome: &CommandOutcome, verdict: Option<&str>) -> String {
    let mut body = format!("$ {}\n{}", outcome.command, outcome.status);
    if let Some(verdict) = verdict {
        body.push_str(&format!(" ({})", verdict));
    }
    body.push('\n');
    if !outcome.output.is_empty() {
        body.push_str(&outcome.output);
        body.push('\n');
    }
    body
}

/// Run the write, check and restart steps, appending one section per step.
/// Sets `report.success` to whether the restart exited 0.
pub fn apply(job: &ApplyJob, runner: &dyn CommandRunner, report: &mut OperationReport) {
    let _span = info_span!("apply", unit = %job.unit, operation = %report.operation_id).entered();
    let lock = service_lock(&job.unit);
    let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

    let mut written = String::new();
    for artifact in &job.artifacts {
        match write_artifact(&artifact.path, &artifact.content) {
            Ok(()) => {
                info!("Wrote {} to {}", artifact.kind, artifact.path.display());
                written.push_str(&format!(
                    "{} -> {} ({} bytes)\n",
                    artifact.kind,
                    artifact.path.display(),
                    artifact.content.len()
                ));
            }
            Err(e) => {
                warn!("Writing {} failed: {:#}", artifact.path.display(), e);
                written.push_str(&format!("FAILED: {:#}\n", e));
                report.push("Write", written);
                report.push(
                    "Skipped",
                    "Checks and restart skipped because not every file could be written.",
                );
                report.success = false;
                return;
            }
        }
    }
    report.push("Write", written);

    for check in &job.checks {
        let outcome = runner.run(&check.program, &check.args, job.timeout);
        let verdict = match outcome.exit_code() {
            Some(code) if check.accepted_codes.contains(&code) => "accepted",
            _ => {
                warn!("Checker `{}` did not pass: {}", outcome.command, outcome.status);
                "rejected"
            }
        };
        report.push(
            format!("Check: {}", check.label),
            outcome_body(&outcome, Some(verdict)),
        );
    }

    let restart = control_service(
        runner,
        &job.systemctl,
        &job.unit,
        ServiceAction::Restart,
        job.timeout,
    );
    if restart.succeeded() {
        info!("Restarted {}", job.unit);
    } else {
        warn!("Restart of {} failed: {}", job.unit, restart.status);
    }
    report.push(format!("Restart: {}", job.unit), outcome_body(&restart, None));
    report.success = restart.succeeded();
}
