use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Child;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::process::{self, Pid};
use crate::registry::errors::RegistryError;
use crate::window::{AppFamily, WindowSet};

/// What to launch. Produced by the config resolver or built directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchRequest {
    /// Executable path or a bare name looked up on PATH
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
}

impl LaunchRequest {
    pub fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
            display_name: None,
            args: Vec::new(),
        }
    }

    pub fn with_display_name(mut self, name: &str) -> Self {
        self.display_name = Some(name.to_string());
        self
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    /// The explicit display name, else the executable's file stem.
    pub fn resolved_display_name(&self) -> String {
        if let Some(name) = &self.display_name {
            return name.clone();
        }
        let base = crate::process::operations::extract_base_name(&self.path);
        Path::new(base)
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_else(|| self.path.clone())
    }
}

/// Lifecycle of a managed process. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessState {
    Launching,
    WindowsFound,
    Windowless,
    Closing,
    Terminated,
}

impl ProcessState {
    pub fn can_transition_to(self, next: ProcessState) -> bool {
        use ProcessState::*;
        matches!(
            (self, next),
            (Launching, WindowsFound | Windowless | Closing | Terminated)
                | (WindowsFound | Windowless, Closing | Terminated)
                | (Closing, Terminated)
        )
    }

    /// Whether focus, minimize and restore have a window to act on.
    pub fn has_windows(self) -> bool {
        matches!(self, ProcessState::WindowsFound | ProcessState::Closing)
    }
}

/// One launched application instance.
#[derive(Debug)]
pub struct ManagedProcess {
    pub pid: Pid,
    pub name: String,
    pub path: PathBuf,
    pub args: Vec<String>,
    /// Set when the spawned launcher handed off to this process.
    pub launcher_pid: Option<Pid>,
    /// OS start time in Unix seconds, used to reject PID reuse when killing.
    pub start_time: Option<u64>,
    pub launched_at: DateTime<Utc>,
    pub windows: WindowSet,
    launched: Instant,
    state: ProcessState,
    child: Option<Child>,
}

impl ManagedProcess {
    pub fn new(pid: Pid, name: String, path: PathBuf, args: Vec<String>) -> Self {
        Self {
            pid,
            name,
            path,
            args,
            launcher_pid: None,
            start_time: None,
            launched_at: Utc::now(),
            windows: WindowSet::new(),
            launched: Instant::now(),
            state: ProcessState::Launching,
            child: None,
        }
    }

    /// Keep the spawned child so it is reaped and polled without PID reuse ambiguity.
    pub fn with_child(mut self, child: Child) -> Self {
        self.child = Some(child);
        self
    }

    /// Display key, `"<name>_<pid>"`.
    pub fn id(&self) -> String {
        format!("{}_{}", self.name, self.pid)
    }

    pub fn state(&self) -> ProcessState {
        self.state
    }

    pub fn family(&self) -> AppFamily {
        AppFamily::from_executable(&self.path.to_string_lossy())
    }

    pub fn age(&self) -> Duration {
        self.launched.elapsed()
    }

    pub fn transition(&mut self, next: ProcessState) -> Result<(), RegistryError> {
        if !self.state.can_transition_to(next) {
            return Err(RegistryError::InvalidTransition {
                pid: self.pid.as_u32(),
                from: self.state,
                to: next,
            });
        }
        debug!(
            event = "core.registry.state_changed",
            pid = self.pid.as_u32(),
            from = ?self.state,
            to = ?next,
        );
        self.state = next;
        Ok(())
    }

    /// Whether the OS process is alive. Reaps the child if it exited.
    pub fn is_running(&mut self) -> bool {
        if let Some(child) = self.child.as_mut() {
            match child.try_wait() {
                Ok(Some(_)) => return false,
                Ok(None) => return true,
                Err(e) => debug!(
                    event = "core.registry.try_wait_failed",
                    pid = self.pid.as_u32(),
                    error = %e,
                ),
            }
        }
        process::is_process_running(self.pid).unwrap_or(false)
    }

    pub fn summary(&self) -> ProcessSummary {
        ProcessSummary {
            id: self.id(),
            pid: self.pid.as_u32(),
            launcher_pid: self.launcher_pid.map(|pid| pid.as_u32()),
            name: self.name.clone(),
            state: self.state,
            window_count: self.windows.len(),
            main_window_title: self.windows.main_info().map(|w| w.title.clone()),
            uptime_secs: self.age().as_secs(),
            launched_at: self.launched_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessSummary {
    pub id: String,
    pub pid: u32,
    /// Launcher that handed off to `pid`, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub launcher_pid: Option<u32>,
    pub name: String,
    pub state: ProcessState,
    pub window_count: usize,
    pub main_window_title: Option<String>,
    pub uptime_secs: u64,
    pub launched_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseAllReport {
    pub requested: usize,
    pub exited_gracefully: usize,
    pub terminated: usize,
    pub killed: usize,
    /// Processes verified alive after the kill pass; they stay registered.
    pub survivors: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileReport {
    pub removed: usize,
    pub marked_terminated: usize,
    pub stale_windows_dropped: usize,
    pub new_windows: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_defaults_to_file_stem() {
        assert_eq!(
            LaunchRequest::new("C:\\Windows\\notepad.exe").resolved_display_name(),
            "notepad"
        );
        assert_eq!(LaunchRequest::new("/bin/sleep").resolved_display_name(), "sleep");
        assert_eq!(
            LaunchRequest::new("calc.exe")
                .with_display_name("Calculator")
                .resolved_display_name(),
            "Calculator"
        );
    }

    #[test]
    fn test_forward_transitions_only() {
        use ProcessState::*;
        assert!(Launching.can_transition_to(WindowsFound));
        assert!(Launching.can_transition_to(Windowless));
        assert!(Launching.can_transition_to(Terminated));
        assert!(WindowsFound.can_transition_to(Closing));
        assert!(Windowless.can_transition_to(Terminated));
        assert!(Closing.can_transition_to(Terminated));

        assert!(!WindowsFound.can_transition_to(Launching));
        assert!(!Windowless.can_transition_to(WindowsFound));
        assert!(!Terminated.can_transition_to(Closing));
        assert!(!Closing.can_transition_to(WindowsFound));
        assert!(!Terminated.can_transition_to(Terminated));
    }

    #[test]
    fn test_transition_rejects_backwards_move() {
        let mut entry = ManagedProcess::new(
            Pid::from_raw(4321),
            "notepad".to_string(),
            PathBuf::from("notepad.exe"),
            Vec::new(),
        );
        entry.transition(ProcessState::Windowless).unwrap();
        let err = entry.transition(ProcessState::Launching).unwrap_err();
        assert!(matches!(
            err,
            RegistryError::InvalidTransition {
                pid: 4321,
                from: ProcessState::Windowless,
                to: ProcessState::Launching
            }
        ));
        assert_eq!(entry.state(), ProcessState::Windowless);
    }

    #[test]
    fn test_summary_id_format() {
        let entry = ManagedProcess::new(
            Pid::from_raw(77),
            "Notepad".to_string(),
            PathBuf::from("notepad.exe"),
            Vec::new(),
        );
        let summary = entry.summary();
        assert_eq!(summary.id, "Notepad_77");
        assert_eq!(summary.state, ProcessState::Launching);
        assert_eq!(summary.window_count, 0);
        assert!(summary.main_window_title.is_none());
    }
}
