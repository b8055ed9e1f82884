//! Lifecycle of the single isolated desktop of a run.

use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;

use tracing::{debug, error, info, warn};

use crate::config::{DesktopConfig, LockinConfig, TimingConfig};
use crate::desktop::binding::DesktopBinding;
use crate::desktop::types::{
    ControllerState, IsolationMode, IsolationStatus, TeardownReport, VirtualDesktopSession,
};
use crate::process::{self, Pid};
use crate::registry::WindowMigrator;
use crate::shell::{ShellEnvironment, default_shell};
use crate::window::discovery::is_candidate;
use crate::window::{WindowHandle, WindowInfo, WindowSystem, default_window_system};

/// Shell surfaces this controller actually changed.
#[derive(Debug, Default, Clone)]
struct HiddenSurfaces {
    taskbars: bool,
    desktop_icons: bool,
    /// Wallpaper in place before blanking.
    wallpaper: Option<String>,
}

impl HiddenSurfaces {
    fn any(&self) -> bool {
        self.taskbars || self.desktop_icons || self.wallpaper.is_some()
    }
}

#[derive(Debug)]
struct ControllerInner {
    state: ControllerState,
    session: Option<VirtualDesktopSession>,
    hidden: HiddenSurfaces,
    /// Windows whose move failed; they stayed on their original desktop.
    unmigrated: Vec<WindowHandle>,
    last_teardown: Option<TeardownReport>,
}

/// Owns at most one isolated desktop per run.
///
/// Internally synchronized; share it as `Arc<VirtualDesktopController>`.
/// The state lock is never held across OS calls that wait.
pub struct VirtualDesktopController {
    binding: DesktopBinding,
    windows: Arc<dyn WindowSystem>,
    shell: Arc<dyn ShellEnvironment>,
    desktop: DesktopConfig,
    timing: TimingConfig,
    inner: Mutex<ControllerInner>,
}

impl VirtualDesktopController {
    pub fn new(
        binding: DesktopBinding,
        windows: Arc<dyn WindowSystem>,
        shell: Arc<dyn ShellEnvironment>,
        config: &LockinConfig,
    ) -> Self {
        Self {
            binding,
            windows,
            shell,
            desktop: config.desktop.clone(),
            timing: config.timing.clone(),
            inner: Mutex::new(ControllerInner {
                state: ControllerState::Uninitialized,
                session: None,
                hidden: HiddenSurfaces::default(),
                unmigrated: Vec::new(),
                last_teardown: None,
            }),
        }
    }

    /// Controller wired to the platform accessor, window system and shell.
    pub fn from_config(config: &LockinConfig) -> Self {
        Self::new(
            DesktopBinding::load(&config.desktop),
            default_window_system(),
            default_shell(),
            config,
        )
    }

    fn lock(&self) -> MutexGuard<'_, ControllerInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn state(&self) -> ControllerState {
        self.lock().state
    }

    pub fn session(&self) -> Option<VirtualDesktopSession> {
        self.lock().session.clone()
    }

    /// Create the isolated desktop, falling back to kiosk mode.
    ///
    /// Never fails: primitive failures are logged and degrade to
    /// [`IsolationMode::KioskFallback`]. A second call while a session
    /// exists reports that session without creating another.
    pub fn create(&self) -> IsolationStatus {
        {
            let mut inner = self.lock();
            if inner.state != ControllerState::Uninitialized {
                info!(
                    event = "core.desktop.create_skipped",
                    state = ?inner.state,
                    "Isolation already created for this run"
                );
                drop(inner);
                return self.status();
            }
            inner.state = ControllerState::Creating;
        }

        info!(event = "core.desktop.create_started");

        let session = self.create_real_desktop().unwrap_or_else(|| {
            warn!(
                event = "core.desktop.kiosk_fallback",
                "Virtual desktop isolation unavailable, hiding shell surfaces on the current desktop"
            );
            VirtualDesktopSession {
                mode: IsolationMode::KioskFallback,
                desktop_number: None,
                original_desktop: self.binding.current_desktop().ok(),
                active: true,
            }
        });

        let hidden = self.clean_environment();
        let mode = session.mode;

        {
            let mut inner = self.lock();
            inner.state = ControllerState::Active(mode);
            inner.session = Some(session.clone());
            inner.hidden = hidden;
        }

        info!(
            event = "core.desktop.create_completed",
            mode = ?mode,
            desktop_number = session.desktop_number,
            original_desktop = session.original_desktop,
        );

        self.status()
    }

    fn create_real_desktop(&self) -> Option<VirtualDesktopSession> {
        if !self.binding.self_test_passed() {
            return None;
        }

        let original = self
            .binding
            .current_desktop()
            .map_err(|e| warn!(event = "core.desktop.query_failed", error = %e))
            .ok()?;
        let count_before = self
            .binding
            .desktop_count()
            .map_err(|e| warn!(event = "core.desktop.query_failed", error = %e))
            .ok()?;

        let number = match self.binding.create_desktop() {
            Ok(number) => number,
            Err(e) => {
                warn!(event = "core.desktop.create_failed", error = %e);
                return None;
            }
        };

        if let Err(e) = self.binding.go_to_desktop(number) {
            warn!(event = "core.desktop.switch_failed", desktop_number = number, error = %e);
            self.discard_desktop(number, original);
            return None;
        }

        thread::sleep(self.timing.desktop_settle());

        let current = self.binding.current_desktop().ok();
        let count = self.binding.desktop_count().ok();
        if current != Some(number) || count.is_none_or(|count| count <= count_before) {
            warn!(
                event = "core.desktop.verify_failed",
                desktop_number = number,
                current_desktop = current,
                count_before = count_before,
                count_after = count,
            );
            self.discard_desktop(number, original);
            return None;
        }

        Some(VirtualDesktopSession {
            mode: IsolationMode::Real,
            desktop_number: Some(number),
            original_desktop: Some(original),
            active: true,
        })
    }

    fn discard_desktop(&self, number: u32, original: u32) {
        if let Err(e) = self.binding.remove_desktop(number, original) {
            warn!(
                event = "core.desktop.discard_failed",
                desktop_number = number,
                error = %e,
            );
        }
    }

    fn clean_environment(&self) -> HiddenSurfaces {
        let mut hidden = HiddenSurfaces::default();

        if self.desktop.hide_taskbar {
            match self.shell.hide_taskbars() {
                Ok(changed) => hidden.taskbars = changed,
                Err(e) => warn!(event = "core.shell.hide_taskbar_failed", error = %e),
            }
        }

        if self.desktop.hide_desktop_icons {
            match self.shell.hide_desktop_icons() {
                Ok(changed) => hidden.desktop_icons = changed,
                Err(e) => warn!(event = "core.shell.hide_icons_failed", error = %e),
            }
        }

        if self.desktop.blank_wallpaper {
            match self.shell.wallpaper() {
                Ok(Some(previous)) if !previous.is_empty() => match self.shell.set_wallpaper("") {
                    Ok(()) => hidden.wallpaper = Some(previous),
                    Err(e) => warn!(event = "core.shell.blank_wallpaper_failed", error = %e),
                },
                Ok(_) => debug!(event = "core.shell.wallpaper_already_blank"),
                Err(e) => warn!(event = "core.shell.read_wallpaper_failed", error = %e),
            }
        }

        debug!(
            event = "core.shell.hidden",
            taskbars = hidden.taskbars,
            desktop_icons = hidden.desktop_icons,
            wallpaper = hidden.wallpaper.is_some(),
        );

        hidden
    }

    /// Undo exactly what `clean_environment` changed. Returns `false` if any
    /// surface could not be restored.
    fn restore_shell(&self, hidden: &HiddenSurfaces) -> bool {
        let mut restored = true;

        if hidden.taskbars
            && let Err(e) = self.shell.show_taskbars()
        {
            error!(event = "core.shell.restore_taskbar_failed", error = %e);
            restored = false;
        }

        if hidden.desktop_icons
            && let Err(e) = self.shell.show_desktop_icons()
        {
            error!(event = "core.shell.restore_icons_failed", error = %e);
            restored = false;
        }

        if let Some(previous) = &hidden.wallpaper
            && let Err(e) = self.shell.set_wallpaper(previous)
        {
            error!(event = "core.shell.restore_wallpaper_failed", error = %e);
            restored = false;
        }

        restored
    }

    fn isolated_desktop(&self) -> Option<u32> {
        let inner = self.lock();
        match inner.state {
            ControllerState::Active(IsolationMode::Real) | ControllerState::TearingDown => inner
                .session
                .as_ref()
                .filter(|s| s.mode == IsolationMode::Real)
                .and_then(|s| s.desktop_number),
            _ => None,
        }
    }

    /// Move a window onto the isolated desktop.
    ///
    /// Only meaningful in real mode. A failed move is logged, reported as
    /// `false` and remembered for [`Self::sweep_unmigrated`].
    pub fn migrate(&self, window: WindowHandle) -> bool {
        let Some(number) = self.isolated_desktop() else {
            return false;
        };

        match self.binding.move_window_to_desktop(window, number) {
            Ok(()) => {
                self.lock().unmigrated.retain(|h| *h != window);
                debug!(
                    event = "core.desktop.window_migrated",
                    window = %window,
                    desktop_number = number,
                );
                true
            }
            Err(e) => {
                warn!(
                    event = "core.desktop.migrate_failed",
                    window = %window,
                    desktop_number = number,
                    error = %e,
                );
                let mut inner = self.lock();
                if !inner.unmigrated.contains(&window) {
                    inner.unmigrated.push(window);
                }
                false
            }
        }
    }

    /// Windows that could not be moved onto the isolated desktop.
    pub fn unmigrated_windows(&self) -> Vec<WindowHandle> {
        self.lock().unmigrated.clone()
    }

    /// Fresh query of application windows on the isolated desktop.
    ///
    /// Always empty in kiosk mode.
    pub fn windows_on_isolated_desktop(&self) -> Vec<WindowInfo> {
        match self.isolated_desktop() {
            Some(number) => self.windows_on_desktop(number),
            None => Vec::new(),
        }
    }

    fn windows_on_desktop(&self, number: u32) -> Vec<WindowInfo> {
        let windows = match self.windows.top_level_windows() {
            Ok(windows) => windows,
            Err(e) => {
                warn!(event = "core.desktop.window_query_failed", error = %e);
                return Vec::new();
            }
        };

        windows
            .into_iter()
            .filter(is_candidate)
            .filter(|w| self.binding.window_desktop_number(w.handle).ok() == Some(number))
            .collect()
    }

    /// Close whatever is still on the isolated desktop.
    ///
    /// Posts close to every residue window, waits the residue wait, then
    /// terminates (and if needed kills) the owners of windows that survived.
    /// Returns the number of processes forcibly terminated.
    pub fn sweep_residue(&self) -> usize {
        let residue = self.windows_on_isolated_desktop();
        if residue.is_empty() {
            return 0;
        }

        warn!(
            event = "core.desktop.residue_found",
            count = residue.len(),
            titles = ?residue.iter().map(|w| w.title.as_str()).collect::<Vec<_>>(),
        );

        let forced = self.force_close(&residue);
        if forced > 0 {
            warn!(event = "core.desktop.residue_terminated", forced_terminations = forced);
        }
        forced
    }

    /// Close windows that failed to migrate and are still open.
    ///
    /// They sit on the user's own desktop, so the isolated-desktop query
    /// never sees them. Same close-then-force procedure as
    /// [`Self::sweep_residue`]; returns the number of processes forcibly
    /// terminated.
    pub fn sweep_unmigrated(&self) -> usize {
        let unmigrated = self.unmigrated_windows();
        if unmigrated.is_empty() {
            return 0;
        }

        let windows = match self.windows.top_level_windows() {
            Ok(windows) => windows,
            Err(e) => {
                warn!(event = "core.desktop.window_query_failed", error = %e);
                return 0;
            }
        };
        let leftover: Vec<WindowInfo> = windows
            .into_iter()
            .filter(|w| unmigrated.contains(&w.handle))
            .collect();
        if leftover.is_empty() {
            return 0;
        }

        warn!(
            event = "core.desktop.unmigrated_found",
            count = leftover.len(),
            titles = ?leftover.iter().map(|w| w.title.as_str()).collect::<Vec<_>>(),
        );

        let forced = self.force_close(&leftover);
        if forced > 0 {
            warn!(event = "core.desktop.unmigrated_terminated", forced_terminations = forced);
        }
        forced
    }

    /// Post close to `windows`, wait the residue wait, then terminate the
    /// owners of windows that are still there.
    fn force_close(&self, windows: &[WindowInfo]) -> usize {
        for window in windows {
            if let Err(e) = self.windows.post_close(window.handle) {
                debug!(
                    event = "core.desktop.close_failed",
                    window = %window.handle,
                    error = %e,
                );
            }
        }

        thread::sleep(self.timing.residue_wait());

        let own_pid = Pid::from_raw(std::process::id());
        let mut owners: Vec<Pid> = windows
            .iter()
            .filter(|w| self.windows.is_window(w.handle))
            .map(|w| self.windows.window_pid(w.handle).unwrap_or(w.pid))
            .filter(|pid| *pid != own_pid)
            .collect();
        owners.sort();
        owners.dedup();

        owners
            .into_iter()
            .filter(|pid| self.force_terminate(*pid))
            .count()
    }

    fn force_terminate(&self, pid: Pid) -> bool {
        match process::terminate_process(pid) {
            Ok(()) => {
                if process::wait_for_exit(pid, self.timing.terminate_timeout()) {
                    return true;
                }
            }
            Err(process::ProcessError::NotFound { .. }) => return false,
            Err(e) => warn!(
                event = "core.desktop.residue_terminate_failed",
                pid = pid.as_u32(),
                error = %e,
            ),
        }

        match process::kill_process(pid, None, None) {
            Ok(()) => {
                process::wait_for_exit(pid, self.timing.kill_timeout());
                true
            }
            Err(e) => {
                error!(
                    event = "core.desktop.residue_kill_failed",
                    pid = pid.as_u32(),
                    error = %e,
                );
                false
            }
        }
    }

    /// Tear the isolation down and restore the user's environment.
    ///
    /// Idempotent: once restored, further calls return the first report.
    pub fn teardown(&self) -> TeardownReport {
        let (session, hidden) = {
            let mut inner = self.lock();
            match inner.state {
                ControllerState::Uninitialized => {
                    debug!(event = "core.desktop.teardown_skipped", reason = "never_created");
                    return TeardownReport::noop();
                }
                ControllerState::Restored => {
                    debug!(event = "core.desktop.teardown_skipped", reason = "already_restored");
                    return inner.last_teardown.clone().unwrap_or_else(TeardownReport::noop);
                }
                ControllerState::Creating | ControllerState::TearingDown => {
                    warn!(
                        event = "core.desktop.teardown_skipped",
                        reason = "transition_in_progress",
                        state = ?inner.state,
                    );
                    return TeardownReport::noop();
                }
                ControllerState::Active(_) => {}
            }
            inner.state = ControllerState::TearingDown;
            (inner.session.clone(), std::mem::take(&mut inner.hidden))
        };

        info!(event = "core.desktop.teardown_started", mode = ?session.as_ref().map(|s| s.mode));

        let mut report = TeardownReport {
            mode: session.as_ref().map(|s| s.mode),
            ..TeardownReport::noop()
        };

        if let Some(VirtualDesktopSession {
            mode: IsolationMode::Real,
            desktop_number: Some(number),
            original_desktop: Some(original),
            ..
        }) = session
        {
            report.forced_terminations = self.sweep_residue();

            match self.binding.go_to_desktop(original) {
                Ok(()) => report.switched_back = true,
                Err(e) => error!(
                    event = "core.desktop.switch_back_failed",
                    original_desktop = original,
                    error = %e,
                ),
            }

            thread::sleep(self.timing.desktop_settle());

            let residue = self.windows_on_desktop(number);
            if residue.is_empty() {
                match self.binding.remove_desktop(number, original) {
                    Ok(()) => report.desktop_removed = true,
                    Err(e) => error!(
                        event = "core.desktop.remove_failed",
                        desktop_number = number,
                        error = %e,
                    ),
                }
            } else {
                error!(
                    event = "core.desktop.remove_skipped",
                    desktop_number = number,
                    residue = residue.len(),
                    "Windows survived teardown, leaving the isolated desktop in place"
                );
            }
        }

        report.shell_restored = self.restore_shell(&hidden);

        {
            let mut inner = self.lock();
            inner.state = ControllerState::Restored;
            if let Some(session) = inner.session.as_mut() {
                session.active = false;
            }
            inner.last_teardown = Some(report.clone());
        }

        info!(
            event = "core.desktop.teardown_completed",
            switched_back = report.switched_back,
            desktop_removed = report.desktop_removed,
            forced_terminations = report.forced_terminations,
            shell_restored = report.shell_restored,
        );

        report
    }

    pub fn status(&self) -> IsolationStatus {
        let (state, session, shell_hidden) = {
            let inner = self.lock();
            (inner.state, inner.session.clone(), inner.hidden.any())
        };

        let binding_available = self.binding.self_test_passed();
        let (current_desktop, total_desktops) = if binding_available {
            (
                self.binding.current_desktop().ok(),
                self.binding.desktop_count().ok(),
            )
        } else {
            (None, None)
        };

        IsolationStatus {
            active: matches!(state, ControllerState::Active(_)),
            mode: session.as_ref().map(|s| s.mode),
            desktop_number: session.as_ref().and_then(|s| s.desktop_number),
            original_desktop: session.as_ref().and_then(|s| s.original_desktop),
            current_desktop,
            total_desktops,
            binding_available,
            shell_hidden,
        }
    }
}

impl WindowMigrator for VirtualDesktopController {
    fn is_isolating(&self) -> bool {
        self.state() == ControllerState::Active(IsolationMode::Real)
    }

    fn migrate(&self, window: WindowHandle) -> bool {
        VirtualDesktopController::migrate(self, window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeDesktopAccessor, FakeShell, FakeWindowSystem, UNUSED_PID};

    fn fast_config() -> LockinConfig {
        let mut config = LockinConfig::default();
        config.timing.desktop_settle_ms = 0;
        config.timing.residue_wait_ms = 10;
        config.timing.terminate_timeout_ms = 200;
        config.timing.kill_timeout_ms = 200;
        config
    }

    fn controller(
        accessor: &FakeDesktopAccessor,
        windows: &FakeWindowSystem,
        shell: &FakeShell,
    ) -> VirtualDesktopController {
        VirtualDesktopController::new(
            DesktopBinding::new(Box::new(accessor.clone())),
            Arc::new(windows.clone()),
            Arc::new(shell.clone()),
            &fast_config(),
        )
    }

    #[test]
    fn test_create_real_desktop() {
        let accessor = FakeDesktopAccessor::new(2, 0);
        let windows = FakeWindowSystem::new();
        let shell = FakeShell::new("C:/wallpaper.jpg");
        let controller = controller(&accessor, &windows, &shell);

        let status = controller.create();
        assert!(status.active);
        assert_eq!(status.mode, Some(IsolationMode::Real));
        assert_eq!(status.desktop_number, Some(2));
        assert_eq!(status.original_desktop, Some(0));
        assert_eq!(status.current_desktop, Some(2));
        assert_eq!(status.total_desktops, Some(3));
        assert!(status.shell_hidden);
        assert!(!shell.taskbar_visible());
        assert!(!shell.icons_visible());
        assert_eq!(shell.current_wallpaper(), "");
    }

    #[test]
    fn test_second_create_is_noop() {
        let accessor = FakeDesktopAccessor::new(1, 0);
        let windows = FakeWindowSystem::new();
        let shell = FakeShell::new("");
        let controller = controller(&accessor, &windows, &shell);

        let first = controller.create();
        let second = controller.create();
        assert_eq!(first.desktop_number, second.desktop_number);
        assert_eq!(accessor.count(), 2);
    }

    #[test]
    fn test_failed_switch_discards_desktop_and_falls_back() {
        let accessor = FakeDesktopAccessor::new(1, 0);
        accessor.fail_switch(true);
        let windows = FakeWindowSystem::new();
        let shell = FakeShell::new("C:/wallpaper.jpg");
        let controller = controller(&accessor, &windows, &shell);

        let status = controller.create();
        assert_eq!(status.mode, Some(IsolationMode::KioskFallback));
        assert_eq!(accessor.count(), 1);
        assert!(!shell.taskbar_visible());
    }

    #[test]
    fn test_failed_create_falls_back() {
        let accessor = FakeDesktopAccessor::new(1, 0);
        accessor.fail_create(true);
        let controller = controller(&accessor, &FakeWindowSystem::new(), &FakeShell::new(""));

        assert_eq!(controller.create().mode, Some(IsolationMode::KioskFallback));
        assert!(!controller.is_isolating());
    }

    #[test]
    fn test_config_gates_shell_cleaning() {
        let accessor = FakeDesktopAccessor::unavailable();
        let shell = FakeShell::new("C:/wallpaper.jpg");
        let mut config = fast_config();
        config.desktop.hide_taskbar = false;
        config.desktop.blank_wallpaper = false;
        let controller = VirtualDesktopController::new(
            DesktopBinding::new(Box::new(accessor)),
            Arc::new(FakeWindowSystem::new()),
            Arc::new(shell.clone()),
            &config,
        );

        controller.create();
        assert!(shell.taskbar_visible());
        assert!(!shell.icons_visible());
        assert_eq!(shell.current_wallpaper(), "C:/wallpaper.jpg");
    }

    #[test]
    fn test_migrate_moves_window_in_real_mode() {
        let accessor = FakeDesktopAccessor::new(1, 0);
        let windows = FakeWindowSystem::new();
        let handle = windows.add_window(UNUSED_PID, "Untitled - Notepad", "Notepad");
        let controller = controller(&accessor, &windows, &FakeShell::new(""));

        assert!(!controller.migrate(handle));
        controller.create();
        assert!(controller.migrate(handle));
        assert_eq!(accessor.window_desktop(handle), Some(1));
        assert_eq!(controller.windows_on_isolated_desktop().len(), 1);
    }

    #[test]
    fn test_failed_move_is_remembered_until_a_retry_succeeds() {
        let accessor = FakeDesktopAccessor::new(1, 0);
        let windows = FakeWindowSystem::new();
        let handle = windows.add_window(UNUSED_PID, "Untitled - Notepad", "Notepad");
        let controller = controller(&accessor, &windows, &FakeShell::new(""));
        controller.create();

        accessor.fail_moves(true);
        assert!(!controller.migrate(handle));
        assert!(!controller.migrate(handle));
        assert_eq!(controller.unmigrated_windows(), vec![handle]);
        assert!(controller.windows_on_isolated_desktop().is_empty());

        accessor.fail_moves(false);
        assert!(controller.migrate(handle));
        assert!(controller.unmigrated_windows().is_empty());
    }

    #[test]
    fn test_sweep_unmigrated_closes_windows_left_behind() {
        let accessor = FakeDesktopAccessor::new(1, 0);
        let windows = FakeWindowSystem::new();
        let stranded = windows.add_window(UNUSED_PID, "Stranded", "AppWindow");
        let closed = windows.add_window(UNUSED_PID, "Already closed", "AppWindow");
        let controller = controller(&accessor, &windows, &FakeShell::new(""));
        controller.create();

        accessor.fail_moves(true);
        controller.migrate(stranded);
        controller.migrate(closed);
        windows.remove_window(closed);

        assert_eq!(controller.sweep_unmigrated(), 0);
        assert!(!windows.is_window(stranded));
        assert_eq!(windows.close_requests(), vec![stranded]);
    }

    #[test]
    fn test_kiosk_mode_has_no_isolated_windows() {
        let accessor = FakeDesktopAccessor::unavailable();
        let windows = FakeWindowSystem::new();
        let handle = windows.add_window(UNUSED_PID, "Untitled - Notepad", "Notepad");
        let controller = controller(&accessor, &windows, &FakeShell::new(""));

        controller.create();
        assert!(!controller.migrate(handle));
        assert!(controller.windows_on_isolated_desktop().is_empty());
    }

    #[test]
    fn test_teardown_removes_empty_desktop_and_restores_shell() {
        let accessor = FakeDesktopAccessor::new(1, 0);
        let shell = FakeShell::new("C:/wallpaper.jpg");
        let controller = controller(&accessor, &FakeWindowSystem::new(), &shell);
        controller.create();

        let report = controller.teardown();
        assert_eq!(report.mode, Some(IsolationMode::Real));
        assert!(report.switched_back);
        assert!(report.desktop_removed);
        assert!(report.shell_restored);
        assert_eq!(accessor.current(), 0);
        assert_eq!(accessor.count(), 1);
        assert!(shell.taskbar_visible());
        assert!(shell.icons_visible());
        assert_eq!(shell.current_wallpaper(), "C:/wallpaper.jpg");
        assert_eq!(controller.state(), ControllerState::Restored);
    }

    #[test]
    fn test_teardown_closes_cooperative_residue() {
        let accessor = FakeDesktopAccessor::new(1, 0);
        let windows = FakeWindowSystem::new();
        let controller = controller(&accessor, &windows, &FakeShell::new(""));
        controller.create();

        let handle = windows.add_window(UNUSED_PID, "Leftover", "Leftover");
        accessor.place_window(handle, 1);

        let report = controller.teardown();
        assert!(report.desktop_removed);
        assert_eq!(report.forced_terminations, 0);
        assert!(!windows.is_window(handle));
    }

    #[test]
    fn test_teardown_skips_removal_when_residue_persists() {
        let accessor = FakeDesktopAccessor::new(1, 0);
        let windows = FakeWindowSystem::new();
        let controller = controller(&accessor, &windows, &FakeShell::new(""));
        controller.create();

        let handle = windows.add_window(UNUSED_PID, "Stubborn", "Stubborn");
        windows.set_stubborn(handle, true);
        accessor.place_window(handle, 1);

        let report = controller.teardown();
        assert!(report.switched_back);
        assert!(!report.desktop_removed);
        assert_eq!(accessor.count(), 2);
        assert_eq!(accessor.current(), 0);
    }

    #[test]
    fn test_teardown_is_idempotent() {
        let accessor = FakeDesktopAccessor::new(1, 0);
        let shell = FakeShell::new("C:/wallpaper.jpg");
        let controller = controller(&accessor, &FakeWindowSystem::new(), &shell);

        assert_eq!(controller.teardown(), TeardownReport::noop());

        controller.create();
        let first = controller.teardown();
        let second = controller.teardown();
        assert_eq!(first, second);
        assert_eq!(accessor.count(), 1);
        assert_eq!(shell.restore_calls(), 3);
    }

    #[test]
    fn test_kiosk_teardown_never_removes() {
        let accessor = FakeDesktopAccessor::unavailable();
        let shell = FakeShell::new("C:/wallpaper.jpg");
        let controller = controller(&accessor, &FakeWindowSystem::new(), &shell);
        controller.create();

        let report = controller.teardown();
        assert_eq!(report.mode, Some(IsolationMode::KioskFallback));
        assert!(!report.switched_back);
        assert!(!report.desktop_removed);
        assert!(report.shell_restored);
        assert!(shell.taskbar_visible());
    }
}
