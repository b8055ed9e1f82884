use std::io::{self, BufRead};
use std::sync::Arc;

use clap::ArgMatches;
use tracing::{error, info, warn};

use lockin_core::config::LockinConfig;
use lockin_core::events;
use lockin_core::window::default_window_system;
use lockin_core::{
    IsolationMode, LaunchRequest, Pid, ProcessRegistry, RegistryError, ShutdownOrchestrator,
    ShutdownReport, VirtualDesktopController,
};

use super::load_config_with_warning;

const HELP: &str = "Commands:
  list                       show managed applications
  launch <name|path> [args]  launch an application
  focus <pid>                bring an application to the front
  minimize <pid>             minimize an application
  restore <pid>              restore a minimized application
  close <pid>                close an application
  status                     show isolation status
  quit                       close everything and end the session";

#[derive(Debug, Clone, PartialEq, Eq)]
enum SessionCommand {
    List,
    Launch { target: String, args: Vec<String> },
    Focus(Pid),
    Minimize(Pid),
    Restore(Pid),
    Close(Pid),
    Status,
    Help,
    Quit,
}

/// Parse one line of session input; blank lines yield `None`.
fn parse_session_command(line: &str) -> Result<Option<SessionCommand>, String> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let rest: Vec<String> = words.map(str::to_string).collect();

    let pid_arg = |rest: &[String]| -> Result<Pid, String> {
        let [pid] = rest else {
            return Err(format!("Usage: {} <pid>", verb));
        };
        let raw: u32 = pid
            .parse()
            .map_err(|_| format!("Invalid pid '{}'", pid))?;
        Pid::new(raw).map_err(|e| e.to_string())
    };

    let command = match verb.to_lowercase().as_str() {
        "list" | "ls" => SessionCommand::List,
        "launch" | "open" => {
            let Some((target, args)) = rest.split_first() else {
                return Err("Usage: launch <name|path> [args..]".to_string());
            };
            SessionCommand::Launch {
                target: target.clone(),
                args: args.to_vec(),
            }
        }
        "focus" => SessionCommand::Focus(pid_arg(&rest)?),
        "minimize" => SessionCommand::Minimize(pid_arg(&rest)?),
        "restore" => SessionCommand::Restore(pid_arg(&rest)?),
        "close" => SessionCommand::Close(pid_arg(&rest)?),
        "status" => SessionCommand::Status,
        "help" | "?" => SessionCommand::Help,
        "quit" | "exit" => SessionCommand::Quit,
        other => return Err(format!("Unknown command '{}'. Type 'help' for commands.", other)),
    };
    Ok(Some(command))
}

struct Session {
    config: LockinConfig,
    registry: ProcessRegistry,
    controller: Arc<VirtualDesktopController>,
}

impl Session {
    fn launch(&self, request: LaunchRequest) -> bool {
        let name = request.resolved_display_name();
        match self.registry.launch(request) {
            Ok(pid) => {
                println!("✅ Launched {} (pid {})", name, pid);
                true
            }
            Err(e) => {
                eprintln!("❌ Failed to launch {}: {}", name, e);
                events::log_launch_failed(&name, &e);
                false
            }
        }
    }

    fn window_action(
        &self,
        verb: &str,
        pid: Pid,
        action: impl FnOnce(Pid) -> Result<bool, RegistryError>,
    ) {
        match action(pid) {
            Ok(true) => println!("✅ {} {}", verb, pid),
            Ok(false) => println!("{} has no window yet", pid),
            Err(e) => {
                eprintln!("❌ {}", e);
                warn!(
                    event = "cli.session.window_action_failed",
                    action = verb,
                    pid = pid.as_u32(),
                    error = %e,
                );
            }
        }
    }

    fn list(&self) {
        let processes = self.registry.enumerate();
        if processes.is_empty() {
            println!("No managed applications.");
        } else {
            crate::table::TableFormatter::new(&processes).print_table(&processes);
        }
    }

    fn status(&self) {
        let status = self.controller.status();
        let mode = match status.mode {
            Some(IsolationMode::Real) => "isolated desktop",
            Some(IsolationMode::KioskFallback) => "kiosk fallback",
            None => "no isolation",
        };
        println!("Mode: {}", mode);
        if let Some(number) = status.desktop_number {
            println!("Session desktop: {}", number + 1);
        }
        if let Some(number) = status.original_desktop {
            println!("Original desktop: {}", number + 1);
        }
        println!(
            "Applications: {} ({} windows)",
            self.registry.len(),
            self.registry.managed_windows().len()
        );
    }

    fn execute(&self, command: SessionCommand) {
        match command {
            SessionCommand::List => self.list(),
            SessionCommand::Launch { target, args } => {
                let mut request = self.config.resolve_app(&target);
                if !args.is_empty() {
                    request = request.with_args(args);
                }
                self.launch(request);
            }
            SessionCommand::Focus(pid) => {
                self.window_action("Focused", pid, |pid| self.registry.focus(pid))
            }
            SessionCommand::Minimize(pid) => {
                self.window_action("Minimized", pid, |pid| self.registry.minimize(pid))
            }
            SessionCommand::Restore(pid) => {
                self.window_action("Restored", pid, |pid| self.registry.restore(pid))
            }
            SessionCommand::Close(pid) => match self.registry.close(pid) {
                Ok(true) => println!("✅ Closed {}", pid),
                Ok(false) => println!("⚠️  {} is still running", pid),
                Err(e) => eprintln!("❌ {}", e),
            },
            SessionCommand::Status => self.status(),
            SessionCommand::Help => println!("{}", HELP),
            SessionCommand::Quit => {}
        }
    }

    /// Read commands until `quit` or end of input.
    fn run(&self, input: impl BufRead) -> io::Result<()> {
        for line in input.lines() {
            let line = line?;
            match parse_session_command(&line) {
                Ok(None) => continue,
                Ok(Some(SessionCommand::Quit)) => break,
                Ok(Some(command)) => self.execute(command),
                Err(message) => eprintln!("{}", message),
            }
        }
        Ok(())
    }
}

pub(crate) fn handle_session_command(
    matches: &ArgMatches,
) -> Result<(), Box<dyn std::error::Error>> {
    let preset = matches.get_one::<String>("preset");
    let apps: Vec<&String> = matches
        .get_many::<String>("app")
        .map(|values| values.collect())
        .unwrap_or_default();
    let isolate = !matches.get_flag("no-isolation");

    info!(
        event = "cli.session_started",
        preset = ?preset,
        apps = apps.len(),
        isolate = isolate,
    );

    let config = load_config_with_warning();

    let mut requests = Vec::new();
    if let Some(preset) = preset {
        let Some(preset_requests) = config.preset_requests(preset) else {
            eprintln!("❌ Unknown preset '{}'", preset);
            error!(event = "cli.session.preset_not_found", preset = %preset);
            return Err(format!("Unknown preset '{}'", preset).into());
        };
        requests.extend(preset_requests);
    }
    requests.extend(apps.iter().map(|app| config.resolve_app(app)));

    let controller = Arc::new(VirtualDesktopController::from_config(&config));
    if isolate {
        let status = controller.create();
        match status.mode {
            Some(IsolationMode::Real) => println!(
                "🔒 Session desktop {} created",
                status.desktop_number.map_or(0, |n| n + 1)
            ),
            Some(IsolationMode::KioskFallback) => {
                println!("🔒 Virtual desktops unavailable, running in kiosk mode")
            }
            None => {}
        }
    }

    let registry = ProcessRegistry::new(default_window_system(), config.timing.clone())
        .with_migrator(controller.clone());

    let session = Session {
        config,
        registry,
        controller,
    };

    let requested = requests.len();
    let launched = requests
        .into_iter()
        .map(|request| session.launch(request))
        .filter(|launched| *launched)
        .count();
    events::log_session_started(
        preset.map(String::as_str),
        session.controller.status().mode,
        launched,
        requested - launched,
    );

    let reconciler = session
        .registry
        .spawn_reconciler(session.config.timing.reconcile_interval());

    println!("Type 'help' for commands, 'quit' to end the session.");
    let loop_result = session.run(io::stdin().lock());
    if let Err(e) = &loop_result {
        events::log_session_input_failed(e);
    }

    reconciler.stop();

    let managed_before = session.registry.len();
    let orchestrator =
        ShutdownOrchestrator::new(session.registry.clone(), session.controller.clone(), || true);
    let report = orchestrator.shutdown();
    events::log_session_ended(&report, managed_before);
    print_shutdown_report(&report);

    info!(
        event = "cli.session_completed",
        forced_terminations = report.forced_terminations(),
    );

    loop_result?;
    Ok(())
}

fn print_shutdown_report(report: &ShutdownReport) {
    if let Some(close_all) = &report.close_all
        && close_all.requested > 0
    {
        println!(
            "Closed {} application(s): {} exited, {} terminated, {} killed",
            close_all.requested,
            close_all.exited_gracefully,
            close_all.terminated,
            close_all.killed
        );
        if close_all.survivors > 0 {
            println!("⚠️  {} application(s) could not be stopped", close_all.survivors);
        }
    }
    if report.unmigrated_windows > 0 {
        println!(
            "⚠️  {} window(s) could not be moved to the session desktop and were closed there",
            report.unmigrated_windows
        );
    }
    if report.residue_terminations > 0 {
        println!(
            "Force-closed {} process(es) left on the session desktop",
            report.residue_terminations
        );
    }
    if let Some(teardown) = &report.teardown
        && teardown.mode.is_some()
    {
        if teardown.desktop_removed {
            println!("🔓 Session desktop removed");
        } else if teardown.mode == Some(IsolationMode::Real) {
            println!("⚠️  Session desktop could not be removed");
        }
        if teardown.shell_restored {
            println!("Taskbar, icons and wallpaper restored");
        }
    }
    println!("Session ended.");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_blank_line() {
        assert_eq!(parse_session_command("   "), Ok(None));
    }

    #[test]
    fn test_parse_launch_with_args() {
        assert_eq!(
            parse_session_command("launch notepad C:/notes.txt"),
            Ok(Some(SessionCommand::Launch {
                target: "notepad".to_string(),
                args: vec!["C:/notes.txt".to_string()],
            }))
        );
        assert!(parse_session_command("launch").is_err());
    }

    #[test]
    fn test_parse_pid_commands() {
        assert_eq!(
            parse_session_command("FOCUS 1234"),
            Ok(Some(SessionCommand::Focus(Pid::from_raw(1234))))
        );
        assert_eq!(
            parse_session_command("close 42"),
            Ok(Some(SessionCommand::Close(Pid::from_raw(42))))
        );
        assert!(parse_session_command("minimize").is_err());
        assert!(parse_session_command("restore abc").is_err());
        assert!(parse_session_command("focus 1 2").is_err());
    }

    #[test]
    fn test_parse_quit_aliases() {
        assert_eq!(parse_session_command("quit"), Ok(Some(SessionCommand::Quit)));
        assert_eq!(parse_session_command("exit"), Ok(Some(SessionCommand::Quit)));
    }

    #[test]
    fn test_parse_unknown_command() {
        let err = parse_session_command("dance").unwrap_err();
        assert!(err.contains("dance"));
    }
}
