//! Registry lifecycle against real child processes.
//!
//! Windows come from the in-memory window table, owned by the pids of real
//! `sleep` processes, so discovery, closing and escalation run end to end.

#![cfg(unix)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use lockin_core::config::TimingConfig;
use lockin_core::process;
use lockin_core::registry::{LaunchRequest, ProcessRegistry, ProcessState, RegistryError};
use lockin_core::testing::FakeWindowSystem;

fn fast_timing() -> TimingConfig {
    TimingConfig {
        launch_grace_ms: 100,
        handoff_window_ms: 2000,
        discovery_attempts: 20,
        discovery_interval_ms: 50,
        close_grace_ms: 300,
        terminate_timeout_ms: 1000,
        close_all_grace_ms: 300,
        kill_timeout_ms: 1000,
        ..TimingConfig::default()
    }
}

fn wait_for(timeout: Duration, mut done: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if done() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    done()
}

fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn timing_handoff_secs() -> u64 {
    fast_timing().handoff_window().as_secs()
}

fn sleep_request(secs: &str) -> LaunchRequest {
    LaunchRequest::new("sleep").with_args(vec![secs.to_string()])
}

#[test]
fn test_launch_discovers_window_and_close_all_empties_registry() {
    let windows = FakeWindowSystem::new();
    let registry = ProcessRegistry::new(Arc::new(windows.clone()), fast_timing());

    let pid = registry.launch(sleep_request("30")).unwrap();
    let handle = windows.add_window(pid.as_u32(), "Scratch - Editor", "EditorWindow");

    assert!(wait_for(Duration::from_secs(3), || {
        registry.state_of(pid) == Some(ProcessState::WindowsFound)
    }));

    let summary = registry.get(pid).unwrap();
    assert_eq!(summary.id, format!("sleep_{}", pid));
    assert_eq!(summary.window_count, 1);
    assert_eq!(summary.main_window_title.as_deref(), Some("Scratch - Editor"));
    assert!(registry.is_window_managed(handle));
    assert!(registry.focus(pid).unwrap());
    assert_eq!(windows.foreground(), Some(handle));

    windows.set_close_kills_owner(true);
    let report = registry.close_all();
    assert_eq!(report.requested, 1);
    assert_eq!(report.exited_gracefully, 1);
    assert_eq!(report.survivors, 0);
    assert!(registry.enumerate().is_empty());
    assert!(!process::is_process_running(pid).unwrap_or(false));
}

#[test]
fn test_process_without_windows_becomes_windowless() {
    let windows = FakeWindowSystem::new();
    let timing = TimingConfig {
        discovery_attempts: 3,
        ..fast_timing()
    };
    let registry = ProcessRegistry::new(Arc::new(windows), timing);

    let pid = registry.launch(sleep_request("30")).unwrap();
    assert!(wait_for(Duration::from_secs(3), || {
        registry.state_of(pid) == Some(ProcessState::Windowless)
    }));

    assert!(!registry.focus(pid).unwrap());
    assert!(!registry.minimize(pid).unwrap());

    // No window to close, so the close escalates to terminate
    assert!(registry.close(pid).unwrap());
    assert!(registry.is_empty());
}

#[test]
fn test_process_exiting_during_discovery_is_terminated() {
    let timing = TimingConfig {
        discovery_attempts: 200,
        ..fast_timing()
    };
    let registry = ProcessRegistry::new(Arc::new(FakeWindowSystem::new()), timing);

    let pid = registry.launch(sleep_request("1")).unwrap();
    assert!(wait_for(Duration::from_secs(4), || {
        registry.state_of(pid) == Some(ProcessState::Terminated)
    }));

    // Younger than the reconcile minimum age, so still listed
    let listed = registry.enumerate();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].state, ProcessState::Terminated);

    assert!(registry.close(pid).unwrap());
    assert!(registry.is_empty());
}

#[test]
fn test_failed_launches_register_nothing() {
    let registry = ProcessRegistry::new(Arc::new(FakeWindowSystem::new()), fast_timing());

    let err = registry
        .launch(LaunchRequest::new("definitely-not-a-real-binary-xyz"))
        .unwrap_err();
    assert!(matches!(err, RegistryError::BinaryNotFound { .. }));

    let err = registry.launch(LaunchRequest::new("false")).unwrap_err();
    assert!(matches!(err, RegistryError::ExitedImmediately { .. }));

    assert!(registry.is_empty());
}

#[test]
fn test_close_escalates_past_window_that_ignores_close() {
    let windows = FakeWindowSystem::new();
    let registry = ProcessRegistry::new(Arc::new(windows.clone()), fast_timing());

    let pid = registry.launch(sleep_request("30")).unwrap();
    let handle = windows.add_window(pid.as_u32(), "Unsaved changes", "EditorWindow");
    windows.set_stubborn(handle, true);
    assert!(wait_for(Duration::from_secs(3), || {
        registry.state_of(pid) == Some(ProcessState::WindowsFound)
    }));

    assert!(registry.close(pid).unwrap());
    assert_eq!(windows.close_requests(), vec![handle]);
    assert!(registry.is_empty());
}

#[test]
fn test_close_all_kills_process_that_ignores_terminate() {
    let registry = ProcessRegistry::new(Arc::new(FakeWindowSystem::new()), fast_timing());

    // An ignored SIGTERM survives exec, so the tracked pid is the sleep itself
    let request = LaunchRequest::new("sh").with_args(vec![
        "-c".to_string(),
        "trap '' TERM; exec sleep 30".to_string(),
    ]);
    let pid = registry.launch(request).unwrap();

    let report = registry.close_all();
    assert_eq!(report.requested, 1);
    assert_eq!(report.exited_gracefully, 0);
    assert_eq!(report.terminated, 0);
    assert_eq!(report.killed, 1);
    assert_eq!(report.survivors, 0);
    assert!(registry.is_empty());
    assert!(!process::is_process_running(pid).unwrap_or(false));
}

#[test]
fn test_reconcile_adopts_windows_opened_later() {
    let windows = FakeWindowSystem::new();
    let registry = ProcessRegistry::new(Arc::new(windows.clone()), fast_timing());

    let pid = registry.launch(sleep_request("30")).unwrap();
    windows.add_window(pid.as_u32(), "Main", "EditorWindow");
    assert!(wait_for(Duration::from_secs(3), || {
        registry.state_of(pid) == Some(ProcessState::WindowsFound)
    }));

    let later = windows.add_window(pid.as_u32(), "Preferences", "#32770");
    let report = registry.reconcile();
    assert_eq!(report.new_windows, 1);
    assert!(registry.is_window_managed(later));
    assert_eq!(registry.get(pid).unwrap().window_count, 2);

    windows.set_close_kills_owner(true);
    assert_eq!(registry.close_all().survivors, 0);
}

#[test]
fn test_launcher_handoff_tracks_the_child() {
    let dir = env!("CARGO_TARGET_TMPDIR");
    let name = format!("lk{:08x}.sh", std::process::id());
    let script = std::path::Path::new(dir).join(&name);
    std::fs::write(
        &script,
        "#!/bin/sh\n\
         if [ -z \"$LOCKIN_HANDOFF_CHILD\" ]; then\n\
         LOCKIN_HANDOFF_CHILD=1 \"$0\" &\n\
         exit 0\n\
         fi\n\
         sleep 5\n",
    )
    .unwrap();
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    let timing = TimingConfig {
        launch_grace_ms: 500,
        ..fast_timing()
    };
    let registry = ProcessRegistry::new(Arc::new(FakeWindowSystem::new()), timing);
    let request = LaunchRequest::new(&script.to_string_lossy());

    let spawned_at = unix_now();
    let pid = registry.launch(request).unwrap();
    let info = process::get_process_info(pid).unwrap();
    assert!(info.name.starts_with("lk"), "tracked {:?}", info);

    let summary = registry.get(pid).unwrap();
    assert_eq!(summary.name, name.trim_end_matches(".sh"));

    // The tracked process is the child, not the launcher that exited
    let launcher = summary.launcher_pid.expect("handoff records the launcher");
    assert_ne!(pid.as_u32(), launcher);
    assert!(!process::is_process_running(process::Pid::from_raw(launcher)).unwrap_or(false));

    // Start times have one-second resolution
    let handoff_secs = timing_handoff_secs();
    assert!(info.start_time + 1 >= spawned_at, "child started before the launch");
    assert!(
        info.start_time <= spawned_at + handoff_secs + 1,
        "child started {}s after the launch",
        info.start_time - spawned_at
    );

    let _ = process::kill_process(pid, None, None);
    let _ = std::fs::remove_file(&script);
}

#[test]
fn test_kill_is_refused_for_reused_pid() {
    let registry = ProcessRegistry::new(Arc::new(FakeWindowSystem::new()), fast_timing());
    let pid = registry.launch(sleep_request("30")).unwrap();

    let info = process::get_process_info(pid).unwrap();
    let err = process::kill_process(pid, None, Some(info.start_time + 1000)).unwrap_err();
    assert!(matches!(err, process::ProcessError::PidReused { .. }));

    assert!(registry.close(pid).unwrap());
    assert!(!process::is_process_running(pid).unwrap_or(false));
}
