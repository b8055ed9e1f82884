use std::sync::{Arc, Mutex};

use tracing::{info, warn};

use crate::desktop::VirtualDesktopController;
use crate::registry::ProcessRegistry;
use crate::shutdown::types::ShutdownReport;

/// Runs the session shutdown exactly once.
///
/// Order: ask `may_close`, close every registered application, close
/// windows that never made it onto the isolated desktop, sweep windows left
/// on the isolated desktop, then tear the controller down (switch back,
/// remove the desktop, restore the shell).
pub struct ShutdownOrchestrator<F>
where
    F: Fn() -> bool,
{
    registry: ProcessRegistry,
    controller: Arc<VirtualDesktopController>,
    may_close: F,
    /// Held for the whole sequence so a concurrent caller waits for the
    /// first report.
    completed: Mutex<Option<ShutdownReport>>,
}

impl<F> ShutdownOrchestrator<F>
where
    F: Fn() -> bool,
{
    pub fn new(
        registry: ProcessRegistry,
        controller: Arc<VirtualDesktopController>,
        may_close: F,
    ) -> Self {
        Self {
            registry,
            controller,
            may_close,
            completed: Mutex::new(None),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.completed
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .is_some()
    }

    pub fn shutdown(&self) -> ShutdownReport {
        let mut completed = self
            .completed
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(report) = completed.as_ref() {
            info!(event = "core.shutdown.already_completed");
            return ShutdownReport {
                already_completed: true,
                ..report.clone()
            };
        }

        if !(self.may_close)() {
            info!(event = "core.shutdown.vetoed");
            return ShutdownReport::vetoed();
        }

        info!(
            event = "core.shutdown.started",
            managed = self.registry.len(),
        );

        let close_all = self.registry.close_all();

        let unmigrated_windows = self.controller.unmigrated_windows().len();
        let unmigrated_terminations = self.controller.sweep_unmigrated();
        if unmigrated_windows > 0 {
            warn!(
                event = "core.shutdown.unmigrated_windows",
                count = unmigrated_windows,
                forced_terminations = unmigrated_terminations,
            );
        }

        let residue_terminations = self.controller.sweep_residue();
        if residue_terminations > 0 {
            warn!(
                event = "core.shutdown.residue_terminated",
                forced_terminations = residue_terminations,
            );
        }

        let teardown = self.controller.teardown();

        let report = ShutdownReport {
            vetoed: false,
            already_completed: false,
            close_all: Some(close_all),
            residue_terminations,
            unmigrated_windows,
            unmigrated_terminations,
            teardown: Some(teardown),
        };

        info!(
            event = "core.shutdown.completed",
            survivors = report.close_all.as_ref().map(|r| r.survivors).unwrap_or(0),
            unmigrated_windows = report.unmigrated_windows,
            forced_terminations = report.forced_terminations(),
            desktop_removed = report.teardown.as_ref().is_some_and(|t| t.desktop_removed),
            shell_restored = report.teardown.as_ref().is_some_and(|t| t.shell_restored),
        );

        *completed = Some(report.clone());
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LockinConfig;
    use crate::desktop::{DesktopBinding, IsolationMode};
    use crate::testing::{FakeDesktopAccessor, FakeShell, FakeWindowSystem};
    use std::cell::Cell;

    fn session(
        accessor: &FakeDesktopAccessor,
        windows: &FakeWindowSystem,
        shell: &FakeShell,
    ) -> (ProcessRegistry, Arc<VirtualDesktopController>) {
        let mut config = LockinConfig::default();
        config.timing.desktop_settle_ms = 0;
        config.timing.residue_wait_ms = 10;
        let controller = Arc::new(VirtualDesktopController::new(
            DesktopBinding::new(Box::new(accessor.clone())),
            Arc::new(windows.clone()),
            Arc::new(shell.clone()),
            &config,
        ));
        let registry = ProcessRegistry::new(Arc::new(windows.clone()), config.timing.clone())
            .with_migrator(controller.clone());
        (registry, controller)
    }

    #[test]
    fn test_veto_touches_nothing() {
        let accessor = FakeDesktopAccessor::new(1, 0);
        let windows = FakeWindowSystem::new();
        let shell = FakeShell::new("C:/wallpaper.jpg");
        let (registry, controller) = session(&accessor, &windows, &shell);
        controller.create();

        let asked = Cell::new(0);
        let orchestrator = ShutdownOrchestrator::new(registry, controller.clone(), || {
            asked.set(asked.get() + 1);
            false
        });

        let report = orchestrator.shutdown();
        assert!(report.vetoed);
        assert!(!orchestrator.is_completed());
        assert_eq!(asked.get(), 1);
        assert_eq!(accessor.count(), 2);
        assert!(!shell.taskbar_visible());
        assert!(controller.status().active);
    }

    #[test]
    fn test_shutdown_runs_once() {
        let accessor = FakeDesktopAccessor::new(1, 0);
        let windows = FakeWindowSystem::new();
        let shell = FakeShell::new("C:/wallpaper.jpg");
        let (registry, controller) = session(&accessor, &windows, &shell);
        controller.create();

        let orchestrator = ShutdownOrchestrator::new(registry, controller, || true);
        let first = orchestrator.shutdown();
        assert!(!first.vetoed);
        assert!(!first.already_completed);
        let teardown = first.teardown.clone().unwrap();
        assert_eq!(teardown.mode, Some(IsolationMode::Real));
        assert!(teardown.switched_back);
        assert!(teardown.desktop_removed);
        assert!(teardown.shell_restored);
        assert_eq!(accessor.count(), 1);
        assert_eq!(accessor.current(), 0);
        assert_eq!(shell.current_wallpaper(), "C:/wallpaper.jpg");

        let restores = shell.restore_calls();
        let second = orchestrator.shutdown();
        assert!(second.already_completed);
        assert_eq!(second.teardown, first.teardown);
        assert_eq!(shell.restore_calls(), restores);
    }
}
