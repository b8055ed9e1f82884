use clap::ArgMatches;
use tracing::{info, warn};

use lockin_core::config::LockinConfig;
use lockin_core::{AppEntry, Preset, VirtualDesktopController};

mod session;

/// Load configuration with warning on errors.
///
/// Falls back to defaults if config loading fails, but notifies the user via:
/// - stderr message for immediate visibility
/// - structured log event `cli.config.load_failed` for debugging
pub(crate) fn load_config_with_warning() -> LockinConfig {
    match LockinConfig::load_hierarchy() {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Could not load config: {}. Using defaults.\n\
                 Tip: Check ~/.lockin/config.toml and ./.lockin/config.toml for syntax errors.",
                e
            );
            warn!(
                event = "cli.config.load_failed",
                error = %e,
                "Config load failed, using defaults"
            );
            LockinConfig::default()
        }
    }
}

pub fn run_command(matches: &ArgMatches) -> Result<(), Box<dyn std::error::Error>> {
    match matches.subcommand() {
        Some(("session", sub_matches)) => session::handle_session_command(sub_matches),
        Some(("status", sub_matches)) => handle_status_command(sub_matches),
        Some(("apps", sub_matches)) => handle_apps_command(sub_matches),
        _ => {
            warn!(event = "cli.command_unknown");
            Err("Unknown command".into())
        }
    }
}

fn handle_status_command(matches: &ArgMatches) -> Result<(), Box<dyn std::error::Error>> {
    let json_output = matches.get_flag("json");
    info!(event = "cli.status_started", json_output = json_output);

    let config = load_config_with_warning();
    let controller = VirtualDesktopController::from_config(&config);
    let status = controller.status();

    if json_output {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else if status.binding_available {
        println!("Virtual desktop accessor: available");
        println!(
            "Current desktop: {}",
            status
                .current_desktop
                .map_or("unknown".to_string(), |n| (n + 1).to_string())
        );
        println!(
            "Desktops: {}",
            status
                .total_desktops
                .map_or("unknown".to_string(), |n| n.to_string())
        );
    } else {
        println!("Virtual desktop accessor: unavailable");
        println!("Sessions will run in kiosk mode (shell surfaces hidden on this desktop).");
        if let Some(path) = &config.desktop.accessor_dll {
            println!("Configured accessor: {}", path.display());
        }
    }

    info!(
        event = "cli.status_completed",
        binding_available = status.binding_available,
    );
    Ok(())
}

fn handle_apps_command(matches: &ArgMatches) -> Result<(), Box<dyn std::error::Error>> {
    let json_output = matches.get_flag("json");
    info!(event = "cli.apps_started", json_output = json_output);

    let config = load_config_with_warning();

    if json_output {
        #[derive(serde::Serialize)]
        struct Catalog<'a> {
            applications: &'a [AppEntry],
            presets: &'a std::collections::BTreeMap<String, Preset>,
        }

        let catalog = Catalog {
            applications: &config.applications,
            presets: &config.presets,
        };
        println!("{}", serde_json::to_string_pretty(&catalog)?);
    } else {
        if config.applications.is_empty() {
            println!("No applications configured.");
        } else {
            println!("Applications:");
            for app in &config.applications {
                match &app.category {
                    Some(category) => println!("  {:<20} {} ({})", app.name, app.path, category),
                    None => println!("  {:<20} {}", app.name, app.path),
                }
            }
        }

        if !config.presets.is_empty() {
            println!();
            println!("Presets:");
            for (name, preset) in &config.presets {
                let apps: Vec<&str> = preset.apps.iter().map(|a| a.name.as_str()).collect();
                println!("  {:<20} {}", name, apps.join(", "));
                if let Some(description) = &preset.description {
                    println!("  {:<20} {}", "", description);
                }
            }
        }
    }

    info!(
        event = "cli.apps_completed",
        applications = config.applications.len(),
        presets = config.presets.len(),
    );
    Ok(())
}
