//! Configuration type definitions for LockIn.
//!
//! These types are serialized/deserialized from TOML config files.
//!
//! # Example Configuration
//!
//! ```toml
//! [desktop]
//! hide_taskbar = true
//! hide_desktop_icons = true
//! blank_wallpaper = false
//!
//! [timing]
//! launch_grace_ms = 500
//! discovery_attempts = 15
//!
//! [[applications]]
//! name = "Notepad"
//! path = "notepad.exe"
//! category = "Text Editors"
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::registry::types::LaunchRequest;

/// Main configuration loaded from TOML config files.
///
/// Loaded from `~/.lockin/config.toml` then `./.lockin/config.toml`;
/// project values override user values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockinConfig {
    /// Isolated desktop behaviour
    #[serde(default)]
    pub desktop: DesktopConfig,

    /// Grace periods, timeouts and retry budgets
    #[serde(default)]
    pub timing: TimingConfig,

    /// Application catalog used to resolve launch requests by name
    #[serde(default)]
    pub applications: Vec<AppEntry>,

    /// Named groups of applications launched together
    #[serde(default)]
    pub presets: BTreeMap<String, Preset>,
}

/// Isolated desktop configuration.
///
/// Controls which shared shell surfaces are hidden while a session is active
/// and where the virtual desktop accessor library lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DesktopConfig {
    /// Hide the main and secondary taskbars plus the start button.
    #[serde(default = "super::defaults::default_true")]
    pub hide_taskbar: bool,

    /// Hide desktop icons.
    #[serde(default = "super::defaults::default_true")]
    pub hide_desktop_icons: bool,

    /// Replace the wallpaper with a solid colour for the session.
    #[serde(default = "super::defaults::default_true")]
    pub blank_wallpaper: bool,

    /// Explicit path to `VirtualDesktopAccessor.dll`.
    /// Default: next to the executable, then the DLL search path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accessor_dll: Option<PathBuf>,
}

/// Timing configuration.
///
/// Every wait in the launch, discovery and shutdown paths is bounded by one
/// of these values, so the worst-case shutdown duration is their sum.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Delay after spawning before checking the process is still alive.
    #[serde(default = "super::defaults::default_launch_grace_ms")]
    pub launch_grace_ms: u64,

    /// How long to look for a same-named child after a launcher exits with 0.
    #[serde(default = "super::defaults::default_handoff_window_ms")]
    pub handoff_window_ms: u64,

    /// Window discovery attempts before the broadened title search.
    #[serde(default = "super::defaults::default_discovery_attempts")]
    pub discovery_attempts: u32,

    /// Delay before each window discovery attempt.
    #[serde(default = "super::defaults::default_discovery_interval_ms")]
    pub discovery_interval_ms: u64,

    /// Wait after posting close to a single application.
    #[serde(default = "super::defaults::default_close_grace_ms")]
    pub close_grace_ms: u64,

    /// Wait for a terminated process to exit before killing it.
    #[serde(default = "super::defaults::default_terminate_timeout_ms")]
    pub terminate_timeout_ms: u64,

    /// Wait after posting close to every application (save dialogs).
    #[serde(default = "super::defaults::default_close_all_grace_ms")]
    pub close_all_grace_ms: u64,

    /// Wait between terminate and kill during close-all.
    #[serde(default = "super::defaults::default_kill_timeout_ms")]
    pub kill_timeout_ms: u64,

    /// Minimum entry age before reconciliation may prune it.
    #[serde(default = "super::defaults::default_reconcile_min_age_secs")]
    pub reconcile_min_age_secs: u64,

    /// Interval of the background reconciler.
    #[serde(default = "super::defaults::default_reconcile_interval_secs")]
    pub reconcile_interval_secs: u64,

    /// Wait after a desktop switch before acting on the new desktop.
    #[serde(default = "super::defaults::default_desktop_settle_ms")]
    pub desktop_settle_ms: u64,

    /// Wait after posting close to a residue window at teardown.
    #[serde(default = "super::defaults::default_residue_wait_ms")]
    pub residue_wait_ms: u64,
}

/// An application the user can launch by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppEntry {
    /// Display name, also the lookup key
    pub name: String,
    /// Executable path or bare binary name
    pub path: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// A named set of applications launched together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preset {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub apps: Vec<AppEntry>,
}

impl AppEntry {
    pub fn new(name: &str, path: &str, category: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            path: path.to_string(),
            args: Vec::new(),
            category: category.map(str::to_string),
        }
    }

    pub fn to_launch_request(&self) -> LaunchRequest {
        LaunchRequest::new(&self.path)
            .with_display_name(&self.name)
            .with_args(self.args.clone())
    }
}

impl TimingConfig {
    pub fn launch_grace(&self) -> Duration {
        Duration::from_millis(self.launch_grace_ms)
    }

    pub fn handoff_window(&self) -> Duration {
        Duration::from_millis(self.handoff_window_ms)
    }

    pub fn discovery_interval(&self) -> Duration {
        Duration::from_millis(self.discovery_interval_ms)
    }

    pub fn close_grace(&self) -> Duration {
        Duration::from_millis(self.close_grace_ms)
    }

    pub fn terminate_timeout(&self) -> Duration {
        Duration::from_millis(self.terminate_timeout_ms)
    }

    pub fn close_all_grace(&self) -> Duration {
        Duration::from_millis(self.close_all_grace_ms)
    }

    pub fn kill_timeout(&self) -> Duration {
        Duration::from_millis(self.kill_timeout_ms)
    }

    pub fn reconcile_min_age(&self) -> Duration {
        Duration::from_secs(self.reconcile_min_age_secs)
    }

    pub fn reconcile_interval(&self) -> Duration {
        Duration::from_secs(self.reconcile_interval_secs)
    }

    pub fn desktop_settle(&self) -> Duration {
        Duration::from_millis(self.desktop_settle_ms)
    }

    pub fn residue_wait(&self) -> Duration {
        Duration::from_millis(self.residue_wait_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lockin_config_serialization() {
        let config = LockinConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: LockinConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(config.applications, parsed.applications);
        assert_eq!(config.presets, parsed.presets);
    }

    #[test]
    fn test_app_entry_deserialize_without_optional_fields() {
        let toml_str = r#"
name = "Terminal"
path = "wt.exe"
"#;
        let entry: AppEntry = toml::from_str(toml_str).unwrap();
        assert_eq!(entry.name, "Terminal");
        assert!(entry.args.is_empty());
        assert!(entry.category.is_none());
    }

    #[test]
    fn test_app_entry_to_launch_request() {
        let mut entry = AppEntry::new("Edge", "msedge.exe", Some("Web Browsers"));
        entry.args = vec!["--new-window".to_string()];
        let request = entry.to_launch_request();
        assert_eq!(request.path, "msedge.exe");
        assert_eq!(request.display_name.as_deref(), Some("Edge"));
        assert_eq!(request.args, vec!["--new-window".to_string()]);
    }

    #[test]
    fn test_timing_durations() {
        let timing = TimingConfig::default();
        assert_eq!(timing.launch_grace(), Duration::from_millis(500));
        assert_eq!(timing.reconcile_min_age(), Duration::from_secs(30));
    }
}
