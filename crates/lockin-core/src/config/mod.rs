//! # Configuration System
//!
//! Hierarchical TOML configuration for LockIn.
//!
//! ## Configuration Hierarchy
//!
//! Configuration is loaded in the following order (later sources override earlier ones):
//! 1. **Hardcoded defaults** - Built-in application catalog, presets and timings
//! 2. **User config** - `~/.lockin/config.toml` (global user preferences)
//! 3. **Project config** - `./.lockin/config.toml` (directory-specific overrides)
//!
//! ## Usage Example
//!
//! ```toml
//! # ~/.lockin/config.toml
//! [desktop]
//! hide_taskbar = true
//! accessor_dll = "C:/tools/VirtualDesktopAccessor.dll"
//!
//! [timing]
//! discovery_attempts = 20
//!
//! [[applications]]
//! name = "Terminal"
//! path = "wt.exe"
//! category = "Development"
//!
//! [presets.Reading]
//! description = "Distraction-free reading"
//! apps = [{ name = "Edge", path = "msedge.exe", args = ["--new-window"] }]
//! ```
//!
//! ## Loading Configuration
//!
//! ```rust,no_run
//! use lockin_core::config::LockinConfig;
//!
//! fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = LockinConfig::load_hierarchy()?;
//!     let request = config.resolve_app("notepad");
//!     println!("{}", request.path);
//!     Ok(())
//! }
//! ```

pub mod defaults;
pub mod loading;
pub mod types;
pub mod validation;

pub use types::{AppEntry, DesktopConfig, LockinConfig, Preset, TimingConfig};
pub use validation::validate_config;

use crate::registry::types::LaunchRequest;

impl LockinConfig {
    /// Load configuration from the hierarchy of config files.
    ///
    /// See [`loading::load_hierarchy`] for details.
    pub fn load_hierarchy() -> Result<Self, Box<dyn std::error::Error>> {
        loading::load_hierarchy()
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), crate::errors::ConfigError> {
        validation::validate_config(self)
    }

    /// Find a configured application by display name (case-insensitive).
    pub fn find_application(&self, name: &str) -> Option<&AppEntry> {
        self.applications
            .iter()
            .find(|app| app.name.eq_ignore_ascii_case(name))
    }

    /// Resolve a name or path into a launch request.
    ///
    /// A configured application name wins; anything else is treated as an
    /// executable path or a bare binary name to look up on PATH.
    pub fn resolve_app(&self, name_or_path: &str) -> LaunchRequest {
        match self.find_application(name_or_path) {
            Some(app) => app.to_launch_request(),
            None => LaunchRequest::new(name_or_path),
        }
    }

    /// Launch requests for every application in a preset, in declaration order.
    pub fn preset_requests(&self, preset_name: &str) -> Option<Vec<LaunchRequest>> {
        let preset = self
            .presets
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(preset_name))
            .map(|(_, preset)| preset)?;

        Some(preset.apps.iter().map(AppEntry::to_launch_request).collect())
    }
}
