//! Configuration loading and merging logic.
//!
//! This module handles loading configuration from files and merging
//! configurations from different sources (user config, project config).
//!
//! # Configuration Hierarchy
//!
//! 1. **Hardcoded defaults** - Built-in catalog, presets and timings
//! 2. **User config** - `~/.lockin/config.toml`
//! 3. **Project config** - `./.lockin/config.toml`

use crate::config::types::{AppEntry, DesktopConfig, LockinConfig, TimingConfig};
use crate::config::validation::validate_config;
use std::fs;
use std::path::Path;

/// Check if an error is a "file not found" error.
fn is_file_not_found(e: &(dyn std::error::Error + 'static)) -> bool {
    if let Some(io_err) = e.downcast_ref::<std::io::Error>() {
        return io_err.kind() == std::io::ErrorKind::NotFound;
    }

    let err_str = e.to_string();
    err_str.contains("No such file or directory") || err_str.contains("cannot find the path")
}

/// Load configuration from the hierarchy of config files.
///
/// # Errors
///
/// Returns an error if a config file fails to parse or the merged
/// configuration fails validation. Missing config files are not errors.
pub fn load_hierarchy() -> Result<LockinConfig, Box<dyn std::error::Error>> {
    let mut config = LockinConfig::default();

    match load_user_config() {
        Ok(user_config) => config = merge_configs(config, user_config),
        Err(e) if !is_file_not_found(e.as_ref()) => return Err(e),
        Err(_) => {}
    }

    match load_project_config() {
        Ok(project_config) => config = merge_configs(config, project_config),
        Err(e) if !is_file_not_found(e.as_ref()) => return Err(e),
        Err(_) => {}
    }

    validate_config(&config)?;

    Ok(config)
}

fn load_user_config() -> Result<LockinConfig, Box<dyn std::error::Error>> {
    let home_dir = dirs::home_dir().ok_or("Could not find home directory")?;
    let config_path = home_dir.join(".lockin").join("config.toml");
    load_config_file(&config_path)
}

fn load_project_config() -> Result<LockinConfig, Box<dyn std::error::Error>> {
    let config_path = std::env::current_dir()?.join(".lockin").join("config.toml");
    load_config_file(&config_path)
}

/// Load a single configuration file.
///
/// Sections missing from the file take their serde defaults; a missing
/// `[[applications]]` list parses as empty so merging keeps the base catalog.
pub fn load_config_file(path: &Path) -> Result<LockinConfig, Box<dyn std::error::Error>> {
    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Box::new(e) as Box<dyn std::error::Error>
        } else {
            format!("Failed to read config file '{}': {}", path.display(), e).into()
        }
    })?;
    let config: LockinConfig = toml::from_str(&content)
        .map_err(|e| format!("Failed to parse config file '{}': {}", path.display(), e))?;
    Ok(config)
}

/// Keep the base value when the override only carries the default.
fn pick<T: PartialEq>(base: T, over: T, default: T) -> T {
    if over == default { base } else { over }
}

/// Merge two configurations, with override_config taking precedence.
///
/// Applications merge by case-insensitive name, override entries replacing
/// base entries in place and new entries appended. Presets merge by key.
/// Scalar settings take the override value unless it equals the built-in
/// default, so a project file without a `[timing]` section keeps user timings.
pub fn merge_configs(base: LockinConfig, override_config: LockinConfig) -> LockinConfig {
    let desktop_default = DesktopConfig::default();
    let timing_default = TimingConfig::default();
    let (b, o) = (base.timing, override_config.timing);

    LockinConfig {
        desktop: DesktopConfig {
            hide_taskbar: pick(
                base.desktop.hide_taskbar,
                override_config.desktop.hide_taskbar,
                desktop_default.hide_taskbar,
            ),
            hide_desktop_icons: pick(
                base.desktop.hide_desktop_icons,
                override_config.desktop.hide_desktop_icons,
                desktop_default.hide_desktop_icons,
            ),
            blank_wallpaper: pick(
                base.desktop.blank_wallpaper,
                override_config.desktop.blank_wallpaper,
                desktop_default.blank_wallpaper,
            ),
            accessor_dll: override_config
                .desktop
                .accessor_dll
                .or(base.desktop.accessor_dll),
        },
        timing: TimingConfig {
            launch_grace_ms: pick(b.launch_grace_ms, o.launch_grace_ms, timing_default.launch_grace_ms),
            handoff_window_ms: pick(
                b.handoff_window_ms,
                o.handoff_window_ms,
                timing_default.handoff_window_ms,
            ),
            discovery_attempts: pick(
                b.discovery_attempts,
                o.discovery_attempts,
                timing_default.discovery_attempts,
            ),
            discovery_interval_ms: pick(
                b.discovery_interval_ms,
                o.discovery_interval_ms,
                timing_default.discovery_interval_ms,
            ),
            close_grace_ms: pick(b.close_grace_ms, o.close_grace_ms, timing_default.close_grace_ms),
            terminate_timeout_ms: pick(
                b.terminate_timeout_ms,
                o.terminate_timeout_ms,
                timing_default.terminate_timeout_ms,
            ),
            close_all_grace_ms: pick(
                b.close_all_grace_ms,
                o.close_all_grace_ms,
                timing_default.close_all_grace_ms,
            ),
            kill_timeout_ms: pick(b.kill_timeout_ms, o.kill_timeout_ms, timing_default.kill_timeout_ms),
            reconcile_min_age_secs: pick(
                b.reconcile_min_age_secs,
                o.reconcile_min_age_secs,
                timing_default.reconcile_min_age_secs,
            ),
            reconcile_interval_secs: pick(
                b.reconcile_interval_secs,
                o.reconcile_interval_secs,
                timing_default.reconcile_interval_secs,
            ),
            desktop_settle_ms: pick(
                b.desktop_settle_ms,
                o.desktop_settle_ms,
                timing_default.desktop_settle_ms,
            ),
            residue_wait_ms: pick(b.residue_wait_ms, o.residue_wait_ms, timing_default.residue_wait_ms),
        },
        applications: merge_applications(base.applications, override_config.applications),
        presets: {
            let mut merged = base.presets;
            for (key, value) in override_config.presets {
                merged.insert(key, value);
            }
            merged
        },
    }
}

fn merge_applications(base: Vec<AppEntry>, overrides: Vec<AppEntry>) -> Vec<AppEntry> {
    let mut merged = base;
    for entry in overrides {
        match merged
            .iter_mut()
            .find(|existing| existing.name.eq_ignore_ascii_case(&entry.name))
        {
            Some(existing) => *existing = entry,
            None => merged.push(entry),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_config_hierarchy_integration() {
        let temp_dir = tempfile::tempdir().unwrap();
        let user_path = temp_dir.path().join("user.toml");
        let project_path = temp_dir.path().join("project.toml");

        fs::write(
            &user_path,
            r#"
[desktop]
blank_wallpaper = false

[timing]
discovery_attempts = 20
close_grace_ms = 1000

[[applications]]
name = "Terminal"
path = "wt.exe"
"#,
        )
        .unwrap();

        fs::write(
            &project_path,
            r#"
[timing]
close_grace_ms = 2000

[[applications]]
name = "notepad"
path = "C:/tools/notepad++.exe"
"#,
        )
        .unwrap();

        let user = load_config_file(&user_path).unwrap();
        let project = load_config_file(&project_path).unwrap();
        let merged = merge_configs(merge_configs(LockinConfig::default(), user), project);

        assert!(!merged.desktop.blank_wallpaper);
        assert_eq!(merged.timing.discovery_attempts, 20);
        assert_eq!(merged.timing.close_grace_ms, 2000);

        // Base catalog kept, user entry appended, project entry replaced in place
        let notepad = merged.find_application("Notepad").unwrap();
        assert_eq!(notepad.path, "C:/tools/notepad++.exe");
        assert_eq!(merged.applications[0].name, "notepad");
        assert!(merged.find_application("Terminal").is_some());
        assert!(merged.find_application("Calculator").is_some());
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let temp_dir = tempfile::tempdir().unwrap();
        let err = load_config_file(&temp_dir.path().join("absent.toml")).unwrap_err();
        assert!(is_file_not_found(err.as_ref()));
    }

    #[test]
    fn test_parse_error_is_reported() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("broken.toml");
        fs::write(&path, "invalid toml [[[").unwrap();

        let err = load_config_file(&path).unwrap_err();
        assert!(!is_file_not_found(err.as_ref()));
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_empty_project_config_keeps_user_values() {
        let user: LockinConfig = toml::from_str(
            r#"
[timing]
terminate_timeout_ms = 9000
"#,
        )
        .unwrap();
        let project: LockinConfig = toml::from_str("").unwrap();

        let merged = merge_configs(user, project);
        assert_eq!(merged.timing.terminate_timeout_ms, 9000);
    }

    #[test]
    fn test_presets_merge_by_key() {
        let project: LockinConfig = toml::from_str(
            r#"
[presets.Writing]
apps = [{ name = "WordPad", path = "wordpad.exe" }]
"#,
        )
        .unwrap();

        let merged = merge_configs(LockinConfig::default(), project);
        assert_eq!(merged.presets["Writing"].apps[0].path, "wordpad.exe");
        assert!(merged.presets.contains_key("Coding"));
    }
}
