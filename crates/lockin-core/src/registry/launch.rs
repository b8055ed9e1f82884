//! Spawning and launcher handoff.

use chrono::Utc;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::thread;
use tracing::{debug, info, warn};

use crate::config::TimingConfig;
use crate::process::operations::wait_until;
use crate::process::{self, Pid};
use crate::registry::errors::RegistryError;
use crate::registry::types::LaunchRequest;

#[cfg(windows)]
const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
#[cfg(windows)]
const DETACHED_PROCESS: u32 = 0x0000_0008;

/// A process that survived the launch grace period.
#[derive(Debug)]
pub(crate) struct LaunchOutcome {
    pub pid: Pid,
    pub launcher_pid: Option<Pid>,
    /// The spawned child when it is also the tracked process.
    pub child: Option<Child>,
    pub resolved: PathBuf,
    pub start_time: Option<u64>,
}

/// Resolve a bare name on PATH, or check that a path names an executable.
pub fn resolve_binary(path: &str) -> Result<PathBuf, RegistryError> {
    which::which(path).map_err(|e| {
        debug!(
            event = "core.registry.resolve_failed",
            path = path,
            error = %e,
        );
        RegistryError::BinaryNotFound {
            path: path.to_string(),
        }
    })
}

/// Spawn `request` detached and wait out the launch grace period.
///
/// A launcher that exits 0 is followed to the same-named process it started;
/// `exclude` lists pids already tracked so two launches never claim the same
/// child.
pub(crate) fn spawn_and_settle(
    request: &LaunchRequest,
    timing: &TimingConfig,
    exclude: &[Pid],
) -> Result<LaunchOutcome, RegistryError> {
    let resolved = resolve_binary(&request.path)?;

    let mut command = Command::new(&resolved);
    command
        .args(&request.args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    #[cfg(windows)]
    {
        use std::os::windows::process::CommandExt;
        command.creation_flags(CREATE_NEW_PROCESS_GROUP | DETACHED_PROCESS);
    }

    let spawned_at = u64::try_from(Utc::now().timestamp()).unwrap_or(0);
    let mut child = command
        .spawn()
        .map_err(|source| RegistryError::SpawnFailed {
            path: request.path.clone(),
            source,
        })?;
    let launcher = Pid::from_raw(child.id());

    info!(
        event = "core.registry.spawned",
        path = %resolved.display(),
        pid = launcher.as_u32(),
    );

    thread::sleep(timing.launch_grace());

    match child.try_wait() {
        Ok(None) => Ok(LaunchOutcome {
            pid: launcher,
            launcher_pid: None,
            start_time: process::get_process_info(launcher)
                .ok()
                .map(|info| info.start_time),
            child: Some(child),
            resolved,
        }),
        Ok(Some(status)) if status.success() => {
            let executable = resolved
                .file_name()
                .map(|name| name.to_string_lossy().to_string())
                .unwrap_or_else(|| request.path.clone());

            let mut handoff = None;
            wait_until(timing.handoff_window(), || {
                handoff = process::find_handoff_child(launcher, &executable, spawned_at, exclude);
                handoff.is_some()
            });

            match handoff {
                Some(target) => {
                    info!(
                        event = "core.registry.handoff_detected",
                        launcher_pid = launcher.as_u32(),
                        pid = target.pid.as_u32(),
                        name = %target.name,
                    );
                    Ok(LaunchOutcome {
                        pid: target.pid,
                        launcher_pid: Some(launcher),
                        child: None,
                        resolved,
                        start_time: Some(target.start_time),
                    })
                }
                None => {
                    warn!(
                        event = "core.registry.handoff_not_found",
                        launcher_pid = launcher.as_u32(),
                        executable = %executable,
                    );
                    Err(RegistryError::ExitedWithoutHandoff {
                        path: request.path.clone(),
                    })
                }
            }
        }
        Ok(Some(status)) => Err(RegistryError::ExitedImmediately {
            path: request.path.clone(),
            code: status.code(),
        }),
        Err(source) => Err(RegistryError::SpawnFailed {
            path: request.path.clone(),
            source,
        }),
    }
}
