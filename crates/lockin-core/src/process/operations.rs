use std::collections::HashSet;
use std::thread;
use std::time::{Duration, Instant};
use sysinfo::{Pid as SysinfoPid, ProcessesToUpdate, Signal, System};
use tracing::{debug, warn};

use crate::process::errors::ProcessError;
use crate::process::types::{Pid, ProcessInfo, ProcessStatus};

const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// sysinfo reports start times in whole seconds, so allow one second of skew
/// when comparing against a spawn timestamp.
const START_TIME_TOLERANCE_SECS: u64 = 1;

fn refreshed_system(pid: Pid) -> System {
    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::Some(&[pid.to_sysinfo_pid()]), true);
    system
}

fn process_info(pid: SysinfoPid, process: &sysinfo::Process) -> ProcessInfo {
    ProcessInfo {
        pid: Pid::from_raw(pid.as_u32()),
        parent: process.parent().map(|p| Pid::from_raw(p.as_u32())),
        name: process.name().to_string_lossy().to_string(),
        status: ProcessStatus::from(process.status()),
        start_time: process.start_time(),
    }
}

/// Check if a process with the given PID is currently running.
///
/// Zombies count as not running: they have exited and only wait to be reaped.
pub fn is_process_running(pid: Pid) -> Result<bool, ProcessError> {
    let system = refreshed_system(pid);
    Ok(system
        .process(pid.to_sysinfo_pid())
        .map(|process| ProcessStatus::from(process.status()).is_alive())
        .unwrap_or(false))
}

/// Get basic information about a process
pub fn get_process_info(pid: Pid) -> Result<ProcessInfo, ProcessError> {
    let system = refreshed_system(pid);
    match system.process(pid.to_sysinfo_pid()) {
        Some(process) => Ok(process_info(pid.to_sysinfo_pid(), process)),
        None => Err(ProcessError::NotFound { pid: pid.as_u32() }),
    }
}

/// Minimum length required for prefix matching to prevent false positives
/// with short names like "sh", "vi", "go"
const MIN_PREFIX_MATCH_LENGTH: usize = 5;

/// Extract the base name from a path, handling both Unix (/) and Windows (\) separators
pub(crate) fn extract_base_name(name: &str) -> &str {
    name.rsplit(['/', '\\']).next().unwrap_or(name)
}

/// Check if a process name matches an expected name
///
/// Uses strict matching to prevent PID reuse accidents:
/// 1. Exact match
/// 2. Base name match after stripping paths (case-insensitive, for Windows executables)
/// 3. Prefix match only for names >= 5 characters (to avoid "sh" matching "bash")
fn process_name_matches(actual_name: &str, expected_name: &str) -> bool {
    if actual_name == expected_name {
        return true;
    }

    let actual_base = extract_base_name(actual_name);
    let expected_base = extract_base_name(expected_name);

    if actual_base.eq_ignore_ascii_case(expected_base) {
        return true;
    }

    if expected_base.len() >= MIN_PREFIX_MATCH_LENGTH && actual_base.starts_with(expected_base) {
        debug!(
            event = "core.process.prefix_match",
            actual = actual_name,
            expected = expected_name,
        );
        return true;
    }

    false
}

/// The tracked pid followed by all of its descendants.
///
/// Window discovery treats every process in the family as a window owner,
/// which covers applications whose real window belongs to a helper child.
pub fn process_family(root: Pid) -> Vec<Pid> {
    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::All, true);

    let mut family = vec![root];
    let mut seen: HashSet<Pid> = HashSet::from([root]);
    let mut index = 0;

    while index < family.len() {
        let parent = family[index].to_sysinfo_pid();
        for (pid, process) in system.processes() {
            if process.parent() != Some(parent) {
                continue;
            }
            let child = Pid::from_raw(pid.as_u32());
            if seen.insert(child) {
                family.push(child);
            }
        }
        index += 1;
    }

    family
}

/// Find the process a launcher handed off to before exiting.
///
/// Candidates share the launcher's executable base name, started no earlier
/// than `spawned_at` (Unix seconds), and are neither the launcher itself nor
/// in `exclude`. A candidate whose parent is still the launcher is preferred;
/// otherwise the earliest-started candidate wins.
pub fn find_handoff_child(
    launcher: Pid,
    executable: &str,
    spawned_at: u64,
    exclude: &[Pid],
) -> Option<ProcessInfo> {
    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::All, true);

    let launcher_sys = launcher.to_sysinfo_pid();
    let earliest = spawned_at.saturating_sub(START_TIME_TOLERANCE_SECS);

    let mut candidates: Vec<ProcessInfo> = system
        .processes()
        .iter()
        .filter(|(pid, _)| **pid != launcher_sys)
        .filter(|(pid, _)| !exclude.contains(&Pid::from_raw(pid.as_u32())))
        .filter(|(_, process)| process.start_time() >= earliest)
        .filter(|(_, process)| ProcessStatus::from(process.status()).is_alive())
        .filter(|(_, process)| {
            process_name_matches(&process.name().to_string_lossy(), executable)
        })
        .map(|(pid, process)| process_info(*pid, process))
        .collect();

    candidates.sort_by_key(|info| (info.parent != Some(launcher), info.start_time, info.pid));

    let found = candidates.into_iter().next();
    debug!(
        event = "core.process.handoff_search_completed",
        launcher = launcher.as_u32(),
        executable = executable,
        found = found.as_ref().map(|info| info.pid.as_u32()),
    );
    found
}

/// Ask a process to exit.
///
/// Sends SIGTERM where the platform supports it; elsewhere (Windows) this
/// falls back to the platform's terminate primitive.
pub fn terminate_process(pid: Pid) -> Result<(), ProcessError> {
    let system = refreshed_system(pid);
    let process = system
        .process(pid.to_sysinfo_pid())
        .ok_or(ProcessError::NotFound { pid: pid.as_u32() })?;

    let delivered = match process.kill_with(Signal::Term) {
        Some(delivered) => delivered,
        None => process.kill(),
    };

    if delivered {
        Ok(())
    } else {
        Err(ProcessError::TerminateFailed {
            pid: pid.as_u32(),
            message: "terminate signal was not delivered".to_string(),
        })
    }
}

/// Kill a process with the given PID, validating it matches expected metadata
pub fn kill_process(
    pid: Pid,
    expected_name: Option<&str>,
    expected_start_time: Option<u64>,
) -> Result<(), ProcessError> {
    let system = refreshed_system(pid);

    match system.process(pid.to_sysinfo_pid()) {
        Some(process) => {
            if let Some(name) = expected_name {
                let actual_name = process.name().to_string_lossy().to_string();
                if !process_name_matches(&actual_name, name) {
                    return Err(ProcessError::PidReused {
                        pid: pid.as_u32(),
                        expected: name.to_string(),
                        actual: actual_name,
                    });
                }
            }

            if let Some(start_time) = expected_start_time
                && process.start_time() != start_time
            {
                return Err(ProcessError::PidReused {
                    pid: pid.as_u32(),
                    expected: format!("start_time={}", start_time),
                    actual: format!("start_time={}", process.start_time()),
                });
            }

            if process.kill() {
                Ok(())
            } else {
                Err(ProcessError::KillFailed {
                    pid: pid.as_u32(),
                    message: "Process kill signal failed".to_string(),
                })
            }
        }
        None => Err(ProcessError::NotFound { pid: pid.as_u32() }),
    }
}

/// Poll until the process is gone or `timeout` elapses.
///
/// Returns `true` when the process exited within the timeout.
pub fn wait_for_exit(pid: Pid, timeout: Duration) -> bool {
    wait_until(timeout, || match is_process_running(pid) {
        Ok(running) => !running,
        Err(e) => {
            warn!(
                event = "core.process.liveness_check_failed",
                pid = pid.as_u32(),
                error = %e,
            );
            false
        }
    })
}

/// Poll `done` every 50ms until it returns true or `timeout` elapses.
pub(crate) fn wait_until(timeout: Duration, mut done: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if done() {
            return true;
        }
        let now = Instant::now();
        if now >= deadline {
            return false;
        }
        thread::sleep(EXIT_POLL_INTERVAL.min(deadline - now));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::{Command, Stdio};

    fn spawn_sleep() -> std::process::Child {
        Command::new("sleep")
            .arg("10")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .expect("Failed to spawn test process")
    }

    #[test]
    fn test_is_process_running_with_invalid_pid() {
        let result = is_process_running(Pid::from_raw(999_999));
        assert!(result.is_ok());
        assert!(!result.unwrap());
    }

    #[test]
    fn test_get_process_info_with_invalid_pid() {
        let result = get_process_info(Pid::from_raw(999_999));
        assert!(matches!(
            result,
            Err(ProcessError::NotFound { pid: 999_999 })
        ));
    }

    #[test]
    fn test_kill_process_with_invalid_pid() {
        let result = kill_process(Pid::from_raw(999_999), None, None);
        assert!(matches!(
            result,
            Err(ProcessError::NotFound { pid: 999_999 })
        ));
    }

    #[test]
    fn test_terminate_process_with_invalid_pid() {
        let result = terminate_process(Pid::from_raw(999_999));
        assert!(matches!(
            result,
            Err(ProcessError::NotFound { pid: 999_999 })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_process_lifecycle() {
        let mut child = spawn_sleep();
        let pid = Pid::from_raw(child.id());

        assert!(is_process_running(pid).unwrap());

        let info = get_process_info(pid).unwrap();
        assert_eq!(info.pid, pid);
        assert!(info.name.contains("sleep"));

        assert!(kill_process(pid, Some(&info.name), Some(info.start_time)).is_ok());

        // Killed but not yet reaped: a zombie is not running
        assert!(wait_for_exit(pid, Duration::from_secs(5)));

        let _ = child.wait();
    }

    #[cfg(unix)]
    #[test]
    fn test_terminate_then_wait() {
        let mut child = spawn_sleep();
        let pid = Pid::from_raw(child.id());

        terminate_process(pid).unwrap();
        let _ = child.wait();
        assert!(wait_for_exit(pid, Duration::from_secs(5)));
    }

    #[test]
    fn test_wait_for_exit_times_out_for_live_process() {
        let mut child = spawn_sleep();
        let pid = Pid::from_raw(child.id());

        let started = Instant::now();
        assert!(!wait_for_exit(pid, Duration::from_millis(200)));
        assert!(started.elapsed() >= Duration::from_millis(200));

        let _ = child.kill();
        let _ = child.wait();
    }

    #[cfg(unix)]
    #[test]
    fn test_process_family_includes_children() {
        let mut parent = Command::new("sh")
            .arg("-c")
            .arg("sleep 10 & wait")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .unwrap();
        let root = Pid::from_raw(parent.id());

        let found = wait_until(Duration::from_secs(5), || process_family(root).len() >= 2);
        assert!(found, "child sleep never appeared in the family");
        assert_eq!(process_family(root)[0], root);

        for pid in process_family(root).into_iter().skip(1) {
            let _ = kill_process(pid, None, None);
        }
        let _ = parent.kill();
        let _ = parent.wait();
    }

    #[test]
    fn test_find_handoff_child_ignores_launcher_and_excluded() {
        let mut child = spawn_sleep();
        let pid = Pid::from_raw(child.id());
        let info = get_process_info(pid).unwrap();

        // The only matching process is the launcher itself
        assert!(find_handoff_child(pid, "definitely-not-a-binary", 0, &[]).is_none());
        let found = find_handoff_child(Pid::from_raw(999_999), &info.name, info.start_time, &[pid]);
        assert!(found.is_none_or(|found| found.pid != pid));

        let _ = child.kill();
        let _ = child.wait();
    }

    #[test]
    fn test_process_name_matches() {
        assert!(process_name_matches("notepad.exe", "notepad.exe"));
        assert!(process_name_matches("Notepad.exe", "C:\\Windows\\notepad.exe"));
        assert!(process_name_matches("/usr/bin/sleep", "sleep"));
        assert!(process_name_matches("sleep", "/usr/bin/sleep"));
        assert!(process_name_matches("powershell_ise", "powershell"));

        assert!(!process_name_matches("gemini", "kiro"));
    }

    #[test]
    fn test_process_name_matches_security() {
        assert!(!process_name_matches("bash", "sh"));
        assert!(!process_name_matches("vim", "vi"));
        assert!(!process_name_matches("sh", "bash"));
        assert!(!process_name_matches("my-calc-daemon", "calc"));
    }

    #[test]
    fn test_extract_base_name() {
        assert_eq!(extract_base_name("/usr/bin/sleep"), "sleep");
        assert_eq!(
            extract_base_name("C:\\Program Files\\app\\test.exe"),
            "test.exe"
        );
        assert_eq!(extract_base_name("C:\\bin/sleep"), "sleep");
        assert_eq!(extract_base_name("simple"), "simple");
        assert_eq!(extract_base_name(""), "");
    }

    #[test]
    fn test_wait_until_returns_early() {
        let started = Instant::now();
        assert!(wait_until(Duration::from_secs(5), || true));
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
