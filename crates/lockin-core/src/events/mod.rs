//! Session-level lifecycle events shared by every front end.

use tracing::{error, info, warn};

use crate::desktop::IsolationMode;
use crate::errors::LockinError;
use crate::shutdown::ShutdownReport;

pub fn log_session_started(
    preset: Option<&str>,
    mode: Option<IsolationMode>,
    launched: usize,
    failed: usize,
) {
    info!(
        event = "core.session.started",
        version = env!("CARGO_PKG_VERSION"),
        preset = preset,
        mode = ?mode,
        launched = launched,
        failed = failed,
    );
}

/// User errors (bad path, app that quit at once) log as warnings.
pub fn log_launch_failed(name: &str, error: &dyn LockinError) {
    if error.is_user_error() {
        warn!(
            event = "core.session.launch_failed",
            name = name,
            error_code = error.error_code(),
            error = %error,
        );
    } else {
        error!(
            event = "core.session.launch_failed",
            name = name,
            error_code = error.error_code(),
            error = %error,
        );
    }
}

pub fn log_session_ended(report: &ShutdownReport, managed_before: usize) {
    let survivors = report.close_all.as_ref().map_or(0, |r| r.survivors);
    let mode = report.teardown.as_ref().and_then(|t| t.mode);
    let desktop_removed = report.teardown.as_ref().is_some_and(|t| t.desktop_removed);

    if survivors > 0 || (mode == Some(IsolationMode::Real) && !desktop_removed) {
        error!(
            event = "core.session.ended_dirty",
            mode = ?mode,
            managed = managed_before,
            survivors = survivors,
            desktop_removed = desktop_removed,
            unmigrated_windows = report.unmigrated_windows,
        );
        return;
    }

    info!(
        event = "core.session.ended",
        mode = ?mode,
        managed = managed_before,
        forced_terminations = report.forced_terminations(),
        unmigrated_windows = report.unmigrated_windows,
        vetoed = report.vetoed,
    );
}

pub fn log_session_input_failed(error: &std::io::Error) {
    error!(
        event = "core.session.input_failed",
        error = %error,
        error_kind = ?error.kind(),
    );
}
