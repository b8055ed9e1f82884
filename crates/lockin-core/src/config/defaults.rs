//! Default implementations for configuration types.
//!
//! This module contains all `Default` implementations and helper functions
//! for providing default values in serde deserialization.

use crate::config::types::{AppEntry, DesktopConfig, LockinConfig, Preset, TimingConfig};
use std::collections::BTreeMap;

/// Used by serde `#[serde(default = "...")]` attribute.
pub fn default_true() -> bool {
    true
}

/// Returns the post-spawn grace period in milliseconds (500ms).
pub fn default_launch_grace_ms() -> u64 {
    500
}

/// Returns the launcher handoff search window in milliseconds (5000ms).
pub fn default_handoff_window_ms() -> u64 {
    5000
}

/// Returns the number of window discovery attempts (15).
///
/// With the default one second interval this gives an application fifteen
/// seconds to show its first top-level window.
pub fn default_discovery_attempts() -> u32 {
    15
}

pub fn default_discovery_interval_ms() -> u64 {
    1000
}

pub fn default_close_grace_ms() -> u64 {
    3000
}

pub fn default_terminate_timeout_ms() -> u64 {
    5000
}

/// Returns the close-all grace period in milliseconds (5000ms).
///
/// Longer than the single close grace so save dialogs can be answered.
pub fn default_close_all_grace_ms() -> u64 {
    5000
}

pub fn default_kill_timeout_ms() -> u64 {
    3000
}

/// Returns the minimum entry age before reconciliation prunes it (30s).
pub fn default_reconcile_min_age_secs() -> u64 {
    30
}

pub fn default_reconcile_interval_secs() -> u64 {
    5
}

pub fn default_desktop_settle_ms() -> u64 {
    500
}

pub fn default_residue_wait_ms() -> u64 {
    500
}

/// Built-in application catalog.
pub fn default_applications() -> Vec<AppEntry> {
    vec![
        AppEntry::new("Notepad", "notepad.exe", Some("Text Editors")),
        AppEntry::new("Calculator", "calc.exe", Some("Utilities")),
        AppEntry::new("Paint", "mspaint.exe", Some("Graphics")),
        AppEntry::new("Task Manager", "taskmgr.exe", Some("System")),
    ]
}

/// Built-in presets.
pub fn default_presets() -> BTreeMap<String, Preset> {
    let mut presets = BTreeMap::new();
    presets.insert(
        "Coding".to_string(),
        Preset {
            description: Some("Shell and scratch editor".to_string()),
            apps: vec![
                AppEntry::new("PowerShell", "powershell.exe", Some("Development")),
                AppEntry::new("Notepad", "notepad.exe", Some("Text Editors")),
            ],
        },
    );
    presets.insert(
        "Writing".to_string(),
        Preset {
            description: Some("A single plain text editor".to_string()),
            apps: vec![AppEntry::new("Notepad", "notepad.exe", Some("Text Editors"))],
        },
    );
    presets
}

impl Default for LockinConfig {
    fn default() -> Self {
        Self {
            desktop: DesktopConfig::default(),
            timing: TimingConfig::default(),
            applications: default_applications(),
            presets: default_presets(),
        }
    }
}

impl Default for DesktopConfig {
    fn default() -> Self {
        Self {
            hide_taskbar: true,
            hide_desktop_icons: true,
            blank_wallpaper: true,
            accessor_dll: None,
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            launch_grace_ms: default_launch_grace_ms(),
            handoff_window_ms: default_handoff_window_ms(),
            discovery_attempts: default_discovery_attempts(),
            discovery_interval_ms: default_discovery_interval_ms(),
            close_grace_ms: default_close_grace_ms(),
            terminate_timeout_ms: default_terminate_timeout_ms(),
            close_all_grace_ms: default_close_all_grace_ms(),
            kill_timeout_ms: default_kill_timeout_ms(),
            reconcile_min_age_secs: default_reconcile_min_age_secs(),
            reconcile_interval_secs: default_reconcile_interval_secs(),
            desktop_settle_ms: default_desktop_settle_ms(),
            residue_wait_ms: default_residue_wait_ms(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog() {
        let config = LockinConfig::default();
        let names: Vec<&str> = config.applications.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["Notepad", "Calculator", "Paint", "Task Manager"]);
        assert!(config.presets.contains_key("Coding"));
        assert!(config.presets.contains_key("Writing"));
    }

    #[test]
    fn test_serde_defaults_match_default_impl() {
        let parsed: TimingConfig = toml::from_str("").unwrap();
        let default = TimingConfig::default();
        assert_eq!(parsed.launch_grace_ms, default.launch_grace_ms);
        assert_eq!(parsed.discovery_attempts, default.discovery_attempts);
        assert_eq!(parsed.close_all_grace_ms, default.close_all_grace_ms);
        assert_eq!(parsed.residue_wait_ms, default.residue_wait_ms);
    }

    #[test]
    fn test_desktop_defaults_hide_everything() {
        let desktop: DesktopConfig = toml::from_str("").unwrap();
        assert!(desktop.hide_taskbar);
        assert!(desktop.hide_desktop_icons);
        assert!(desktop.blank_wallpaper);
        assert!(desktop.accessor_dll.is_none());
    }
}
