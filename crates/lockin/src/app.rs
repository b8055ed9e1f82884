use clap::{Arg, ArgAction, Command};

pub fn build_cli() -> Command {
    Command::new("lockin")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Run focused work sessions on an isolated virtual desktop")
        .long_about("LockIn creates a dedicated virtual desktop for a work session, launches your applications onto it and tracks their windows. When the session ends every application is closed, the desktop is removed and your taskbar, icons and wallpaper are restored.")
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging output")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("session")
                .about("Start an interactive session, reading commands from stdin")
                .arg(
                    Arg::new("preset")
                        .long("preset")
                        .short('p')
                        .help("Launch every application of a configured preset")
                )
                .arg(
                    Arg::new("app")
                        .long("app")
                        .short('a')
                        .help("Application name from config, or an executable path (repeatable)")
                        .action(ArgAction::Append)
                )
                .arg(
                    Arg::new("no-isolation")
                        .long("no-isolation")
                        .help("Track applications without creating an isolated desktop")
                        .action(ArgAction::SetTrue)
                )
        )
        .subcommand(
            Command::new("status")
                .about("Check the virtual desktop accessor and show desktop numbers")
                .arg(
                    Arg::new("json")
                        .long("json")
                        .help("Output in JSON format")
                        .action(ArgAction::SetTrue)
                )
        )
        .subcommand(
            Command::new("apps")
                .about("List configured applications and presets")
                .arg(
                    Arg::new("json")
                        .long("json")
                        .help("Output in JSON format")
                        .action(ArgAction::SetTrue)
                )
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_build() {
        let app = build_cli();
        assert_eq!(app.get_name(), "lockin");
    }

    #[test]
    fn test_cli_session_command() {
        let app = build_cli();
        let matches = app.try_get_matches_from(vec![
            "lockin",
            "session",
            "--preset",
            "Coding",
            "--app",
            "notepad",
            "-a",
            "calc.exe",
        ]);
        assert!(matches.is_ok());

        let matches = matches.unwrap();
        let session_matches = matches.subcommand_matches("session").unwrap();
        assert_eq!(
            session_matches.get_one::<String>("preset").unwrap(),
            "Coding"
        );
        let apps: Vec<&String> = session_matches.get_many::<String>("app").unwrap().collect();
        assert_eq!(apps, vec!["notepad", "calc.exe"]);
        assert!(!session_matches.get_flag("no-isolation"));
    }

    #[test]
    fn test_cli_session_no_isolation() {
        let app = build_cli();
        let matches = app
            .try_get_matches_from(vec!["lockin", "session", "--no-isolation"])
            .unwrap();
        let session_matches = matches.subcommand_matches("session").unwrap();
        assert!(session_matches.get_flag("no-isolation"));
        assert!(session_matches.get_many::<String>("app").is_none());
    }

    #[test]
    fn test_cli_status_json_flag() {
        let app = build_cli();
        let matches = app
            .try_get_matches_from(vec!["lockin", "status", "--json"])
            .unwrap();
        assert!(matches.subcommand_matches("status").unwrap().get_flag("json"));
    }

    #[test]
    fn test_cli_verbose_is_global() {
        let app = build_cli();
        let matches = app
            .try_get_matches_from(vec!["lockin", "apps", "-v"])
            .unwrap();
        assert!(matches.get_flag("verbose"));
    }

    #[test]
    fn test_cli_requires_subcommand() {
        let app = build_cli();
        assert!(app.try_get_matches_from(vec!["lockin"]).is_err());
    }
}
