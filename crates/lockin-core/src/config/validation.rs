//! Configuration validation.

use crate::config::types::{AppEntry, LockinConfig};
use crate::errors::ConfigError;

/// Validate a merged configuration.
///
/// # Errors
///
/// Returns `InvalidApplication` for catalog or preset entries with an empty
/// name or path, and `InvalidConfiguration` for a zero discovery budget.
pub fn validate_config(config: &LockinConfig) -> Result<(), ConfigError> {
    for app in &config.applications {
        validate_app(app)?;
    }

    for (preset_name, preset) in &config.presets {
        if preset_name.trim().is_empty() {
            return Err(ConfigError::InvalidConfiguration {
                message: "preset names cannot be empty".to_string(),
            });
        }
        for app in &preset.apps {
            validate_app(app)?;
        }
    }

    if config.timing.discovery_attempts == 0 {
        return Err(ConfigError::InvalidConfiguration {
            message: "timing.discovery_attempts must be at least 1".to_string(),
        });
    }

    Ok(())
}

fn validate_app(app: &AppEntry) -> Result<(), ConfigError> {
    if app.name.trim().is_empty() {
        return Err(ConfigError::InvalidApplication {
            name: app.path.clone(),
            message: "name cannot be empty".to_string(),
        });
    }
    if app.path.trim().is_empty() {
        return Err(ConfigError::InvalidApplication {
            name: app.name.clone(),
            message: "path cannot be empty".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::Preset;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&LockinConfig::default()).is_ok());
    }

    #[test]
    fn test_empty_app_path_rejected() {
        let mut config = LockinConfig::default();
        config.applications.push(AppEntry::new("Broken", "  ", None));

        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidApplication { ref name, .. } if name == "Broken"));
    }

    #[test]
    fn test_empty_preset_app_name_rejected() {
        let mut config = LockinConfig::default();
        config.presets.insert(
            "Broken".to_string(),
            Preset {
                description: None,
                apps: vec![AppEntry::new("", "notepad.exe", None)],
            },
        );

        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_zero_discovery_attempts_rejected() {
        let mut config = LockinConfig::default();
        config.timing.discovery_attempts = 0;

        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("discovery_attempts"));
    }
}
