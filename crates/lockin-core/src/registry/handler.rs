use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::config::TimingConfig;
use crate::process::operations::wait_until;
use crate::process::{self, Pid, ProcessError};
use crate::registry::WindowMigrator;
use crate::registry::discovery::{self, DiscoveryObservation};
use crate::registry::errors::RegistryError;
use crate::registry::launch;
use crate::registry::types::{
    CloseAllReport, LaunchRequest, ManagedProcess, ProcessState, ProcessSummary,
};
use crate::window::discovery::{owned_windows, select_main_window, title_fallback};
use crate::window::{WindowHandle, WindowInfo, WindowSystem};

/// Table of launched applications.
///
/// Cheap to clone: clones share the table, which is how discovery threads
/// and the reconciler reach it. The table lock is never held across a sleep.
#[derive(Clone)]
pub struct ProcessRegistry {
    table: Arc<Mutex<HashMap<Pid, ManagedProcess>>>,
    windows: Arc<dyn WindowSystem>,
    migrator: Option<Arc<dyn WindowMigrator>>,
    timing: TimingConfig,
}

impl ProcessRegistry {
    pub fn new(windows: Arc<dyn WindowSystem>, timing: TimingConfig) -> Self {
        Self {
            table: Arc::new(Mutex::new(HashMap::new())),
            windows,
            migrator: None,
            timing,
        }
    }

    /// Offer newly discovered windows to `migrator` while it is isolating.
    pub fn with_migrator(mut self, migrator: Arc<dyn WindowMigrator>) -> Self {
        self.migrator = Some(migrator);
        self
    }

    pub fn timing(&self) -> &TimingConfig {
        &self.timing
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, HashMap<Pid, ManagedProcess>> {
        self.table
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn window_system(&self) -> &Arc<dyn WindowSystem> {
        &self.windows
    }

    pub(crate) fn query_windows(&self) -> Vec<WindowInfo> {
        match self.windows.top_level_windows() {
            Ok(windows) => windows,
            Err(e) => {
                warn!(event = "core.registry.window_query_failed", error = %e);
                Vec::new()
            }
        }
    }

    /// Launch an application and start discovering its windows.
    ///
    /// Blocks for the launch grace period (and the handoff window when the
    /// launcher exits 0), never for window discovery.
    ///
    /// # Errors
    ///
    /// Nothing is registered when the binary is missing, the spawn fails, or
    /// the process exits before the grace period ends without a handoff.
    pub fn launch(&self, request: LaunchRequest) -> Result<Pid, RegistryError> {
        let name = request.resolved_display_name();
        info!(
            event = "core.registry.launch_started",
            path = %request.path,
            name = %name,
            args = ?request.args,
        );

        let tracked: Vec<Pid> = self.lock().keys().copied().collect();
        let outcome = launch::spawn_and_settle(&request, &self.timing, &tracked).inspect_err(
            |e| {
                error!(
                    event = "core.registry.launch_failed",
                    path = %request.path,
                    error = %e,
                )
            },
        )?;

        let pid = outcome.pid;
        let mut entry = ManagedProcess::new(pid, name, outcome.resolved, request.args);
        entry.launcher_pid = outcome.launcher_pid;
        entry.start_time = outcome.start_time;
        if let Some(child) = outcome.child {
            entry = entry.with_child(child);
        }
        let id = entry.id();

        self.lock().insert(pid, entry);

        let registry = self.clone();
        if let Err(e) = thread::Builder::new()
            .name(format!("lockin-discovery-{}", pid))
            .spawn(move || discovery::run_discovery(&registry, pid))
        {
            error!(
                event = "core.registry.discovery_spawn_failed",
                pid = pid.as_u32(),
                error = %e,
            );
            self.mark_windowless(pid);
        }

        info!(event = "core.registry.launch_completed", pid = pid.as_u32(), id = %id);
        Ok(pid)
    }

    /// Snapshot for one discovery attempt; `None` once the entry is no
    /// longer launching.
    pub(crate) fn observe(&self, pid: Pid) -> Option<DiscoveryObservation> {
        let alive = {
            let mut table = self.lock();
            let entry = table.get_mut(&pid)?;
            if entry.state() != ProcessState::Launching {
                return None;
            }
            entry.is_running()
        };

        if !alive {
            return Some(DiscoveryObservation {
                alive: false,
                windows: Vec::new(),
            });
        }

        let owners = process::process_family(pid);
        let windows = self.query_windows();
        Some(DiscoveryObservation {
            alive: true,
            windows: owned_windows(&windows, &owners),
        })
    }

    /// Add windows to an entry, pick a main window and move it to
    /// `WindowsFound`. New windows are offered for migration.
    pub(crate) fn record_windows(&self, pid: Pid, windows: Vec<WindowInfo>) -> usize {
        let added = {
            let mut table = self.lock();
            let Some(entry) = table.get_mut(&pid) else {
                return 0;
            };
            if !matches!(
                entry.state(),
                ProcessState::Launching | ProcessState::WindowsFound
            ) {
                return 0;
            }

            let added: Vec<WindowHandle> = windows
                .into_iter()
                .filter_map(|window| {
                    let handle = window.handle;
                    entry.windows.add(window).then_some(handle)
                })
                .collect();

            if entry.windows.main().is_none() {
                let known: Vec<WindowInfo> = entry.windows.iter().cloned().collect();
                if let Some(main) = select_main_window(&known, entry.family()) {
                    entry.windows.set_main(main);
                }
            }

            if entry.state() == ProcessState::Launching
                && let Err(e) = entry.transition(ProcessState::WindowsFound)
            {
                warn!(event = "core.registry.transition_failed", error = %e);
            }

            added
        };

        self.offer_for_migration(&added);
        added.len()
    }

    pub(crate) fn offer_for_migration(&self, handles: &[WindowHandle]) {
        let Some(migrator) = &self.migrator else {
            return;
        };
        if handles.is_empty() || !migrator.is_isolating() {
            return;
        }
        for handle in handles {
            if !migrator.migrate(*handle) {
                debug!(event = "core.registry.migration_declined", window = %handle);
            }
        }
    }

    /// Windows matching the entry's display name that nobody manages yet.
    pub(crate) fn fallback_windows(&self, pid: Pid) -> Vec<WindowInfo> {
        let (name, family, managed) = {
            let table = self.lock();
            let Some(entry) = table.get(&pid) else {
                return Vec::new();
            };
            if entry.state() != ProcessState::Launching {
                return Vec::new();
            }
            let managed: Vec<WindowHandle> =
                table.values().flat_map(|e| e.windows.handles()).collect();
            (entry.name.clone(), entry.family(), managed)
        };

        let windows = self.query_windows();
        title_fallback(&windows, &name, family)
            .into_iter()
            .filter(|w| !managed.contains(&w.handle))
            .collect()
    }

    pub(crate) fn mark_windowless(&self, pid: Pid) {
        let mut table = self.lock();
        if let Some(entry) = table.get_mut(&pid)
            && entry.state() == ProcessState::Launching
            && let Err(e) = entry.transition(ProcessState::Windowless)
        {
            warn!(event = "core.registry.transition_failed", error = %e);
        }
    }

    pub(crate) fn mark_terminated(&self, pid: Pid) {
        let mut table = self.lock();
        if let Some(entry) = table.get_mut(&pid)
            && entry.state() != ProcessState::Terminated
            && let Err(e) = entry.transition(ProcessState::Terminated)
        {
            warn!(event = "core.registry.transition_failed", error = %e);
        }
    }

    fn entry_running(&self, pid: Pid) -> bool {
        self.lock()
            .get_mut(&pid)
            .map(|entry| entry.is_running())
            .unwrap_or(false)
    }

    fn wait_for_exit(&self, pid: Pid, timeout: Duration) -> bool {
        wait_until(timeout, || !self.entry_running(pid))
    }

    /// Wait until every pid exited or `timeout` elapses; returns the survivors.
    fn wait_for_all(&self, pids: &[Pid], timeout: Duration) -> Vec<Pid> {
        if pids.is_empty() {
            return Vec::new();
        }
        wait_until(timeout, || pids.iter().all(|pid| !self.entry_running(*pid)));
        pids.iter()
            .copied()
            .filter(|pid| self.entry_running(*pid))
            .collect()
    }

    fn post_close_all(&self, handles: &[WindowHandle]) {
        for handle in handles {
            if !self.windows.is_window(*handle) {
                continue;
            }
            if let Err(e) = self.windows.post_close(*handle) {
                debug!(event = "core.registry.post_close_failed", window = %handle, error = %e);
            }
        }
    }

    fn terminate(&self, pid: Pid) {
        match process::terminate_process(pid) {
            Ok(()) => debug!(event = "core.registry.terminate_sent", pid = pid.as_u32()),
            Err(ProcessError::NotFound { .. }) => {}
            Err(e) => warn!(
                event = "core.registry.terminate_failed",
                pid = pid.as_u32(),
                error = %e,
            ),
        }
    }

    fn kill(&self, pid: Pid) {
        let start_time = self.lock().get(&pid).and_then(|entry| entry.start_time);
        match process::kill_process(pid, None, start_time) {
            Ok(()) => warn!(event = "core.registry.killed", pid = pid.as_u32()),
            Err(ProcessError::NotFound { .. }) => {}
            Err(e) => error!(
                event = "core.registry.kill_failed",
                pid = pid.as_u32(),
                error = %e,
            ),
        }
    }

    /// Remove entries whose process has exited.
    fn remove_exited(&self, pids: &[Pid]) {
        let mut table = self.lock();
        for pid in pids {
            if let Some(mut entry) = table.remove(pid) {
                if entry.state() != ProcessState::Terminated {
                    let _ = entry.transition(ProcessState::Terminated);
                }
                debug!(event = "core.registry.removed", pid = pid.as_u32(), id = %entry.id());
            }
        }
    }

    /// Close one application: polite close, then terminate, then kill.
    ///
    /// Returns whether the entry was removed, which happens only once the
    /// process is confirmed gone.
    pub fn close(&self, pid: Pid) -> Result<bool, RegistryError> {
        let handles = {
            let mut table = self.lock();
            let entry = table
                .get_mut(&pid)
                .ok_or(RegistryError::NotFound { pid: pid.as_u32() })?;

            match entry.state() {
                ProcessState::Closing => {}
                ProcessState::Terminated => {
                    if !entry.is_running() {
                        table.remove(&pid);
                        return Ok(true);
                    }
                }
                _ => entry.transition(ProcessState::Closing)?,
            }
            entry.windows.handles()
        };

        info!(
            event = "core.registry.close_started",
            pid = pid.as_u32(),
            windows = handles.len(),
        );

        self.post_close_all(&handles);

        let exited = self.wait_for_exit(pid, self.timing.close_grace()) || {
            self.terminate(pid);
            self.wait_for_exit(pid, self.timing.terminate_timeout())
        } || {
            self.kill(pid);
            self.wait_for_exit(pid, self.timing.kill_timeout())
        };

        if exited {
            self.remove_exited(&[pid]);
            info!(event = "core.registry.close_completed", pid = pid.as_u32());
        } else {
            error!(event = "core.registry.close_survived", pid = pid.as_u32());
        }
        Ok(exited)
    }

    /// Close every application in three passes.
    ///
    /// 1. Mark all `Closing` and post close to every valid window.
    /// 2. Wait the close-all grace, drop the exited, terminate the rest.
    /// 3. Wait the kill timeout, kill what remains and confirm.
    ///
    /// Processes that survive the kill stay registered.
    pub fn close_all(&self) -> CloseAllReport {
        let targets: Vec<(Pid, Vec<WindowHandle>)> = {
            let mut table = self.lock();
            table
                .iter_mut()
                .map(|(pid, entry)| {
                    if !matches!(
                        entry.state(),
                        ProcessState::Closing | ProcessState::Terminated
                    ) && let Err(e) = entry.transition(ProcessState::Closing)
                    {
                        warn!(event = "core.registry.transition_failed", error = %e);
                    }
                    (*pid, entry.windows.handles())
                })
                .collect()
        };

        let mut report = CloseAllReport {
            requested: targets.len(),
            ..CloseAllReport::default()
        };
        if targets.is_empty() {
            return report;
        }

        info!(event = "core.registry.close_all_started", count = targets.len());

        for (_, handles) in &targets {
            self.post_close_all(handles);
        }

        let pids: Vec<Pid> = targets.iter().map(|(pid, _)| *pid).collect();
        let after_grace = self.wait_for_all(&pids, self.timing.close_all_grace());
        report.exited_gracefully = pids.len() - after_grace.len();
        self.remove_exited(&exited(&pids, &after_grace));

        for pid in &after_grace {
            self.terminate(*pid);
        }
        let after_terminate = self.wait_for_all(&after_grace, self.timing.kill_timeout());
        report.terminated = after_grace.len() - after_terminate.len();
        self.remove_exited(&exited(&after_grace, &after_terminate));

        for pid in &after_terminate {
            self.kill(*pid);
        }
        let after_kill = self.wait_for_all(&after_terminate, self.timing.kill_timeout());
        report.killed = after_terminate.len() - after_kill.len();
        self.remove_exited(&exited(&after_terminate, &after_kill));

        report.survivors = after_kill.len();
        if report.survivors > 0 {
            error!(
                event = "core.registry.close_all_survivors",
                pids = ?after_kill.iter().map(|p| p.as_u32()).collect::<Vec<_>>(),
            );
        }

        info!(
            event = "core.registry.close_all_completed",
            requested = report.requested,
            exited_gracefully = report.exited_gracefully,
            terminated = report.terminated,
            killed = report.killed,
            survivors = report.survivors,
        );

        report
    }

    /// The window focus/minimize/restore act on, if the entry has one.
    fn target_window(&self, pid: Pid) -> Result<Option<WindowHandle>, RegistryError> {
        let table = self.lock();
        let entry = table
            .get(&pid)
            .ok_or(RegistryError::NotFound { pid: pid.as_u32() })?;
        if !entry.state().has_windows() {
            return Ok(None);
        }
        Ok(entry
            .windows
            .main_or_fallback(|handle| self.windows.is_window(handle)))
    }

    /// Bring an application's main window to the front, restoring it first
    /// if minimized.
    pub fn focus(&self, pid: Pid) -> Result<bool, RegistryError> {
        let Some(handle) = self.target_window(pid)? else {
            return Ok(false);
        };
        if self.windows.is_minimized(handle) {
            self.windows.restore(handle)?;
        }
        self.windows.set_foreground(handle)?;
        debug!(event = "core.registry.focused", pid = pid.as_u32(), window = %handle);
        Ok(true)
    }

    pub fn minimize(&self, pid: Pid) -> Result<bool, RegistryError> {
        let Some(handle) = self.target_window(pid)? else {
            return Ok(false);
        };
        self.windows.minimize(handle)?;
        Ok(true)
    }

    pub fn restore(&self, pid: Pid) -> Result<bool, RegistryError> {
        let Some(handle) = self.target_window(pid)? else {
            return Ok(false);
        };
        self.windows.restore(handle)?;
        Ok(true)
    }

    /// Live entries sorted by launch time, after pruning dead ones.
    pub fn enumerate(&self) -> Vec<ProcessSummary> {
        self.prune();
        let mut summaries: Vec<ProcessSummary> =
            self.lock().values().map(ManagedProcess::summary).collect();
        summaries.sort_by(|a, b| a.launched_at.cmp(&b.launched_at).then(a.pid.cmp(&b.pid)));
        summaries
    }

    pub fn get(&self, pid: Pid) -> Option<ProcessSummary> {
        self.lock().get(&pid).map(ManagedProcess::summary)
    }

    pub fn state_of(&self, pid: Pid) -> Option<ProcessState> {
        self.lock().get(&pid).map(ManagedProcess::state)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn is_window_managed(&self, handle: WindowHandle) -> bool {
        self.lock()
            .values()
            .any(|entry| entry.windows.contains(handle))
    }

    pub fn managed_windows(&self) -> Vec<WindowHandle> {
        self.lock()
            .values()
            .flat_map(|entry| entry.windows.handles())
            .collect()
    }
}

fn exited(all: &[Pid], survivors: &[Pid]) -> Vec<Pid> {
    all.iter()
        .copied()
        .filter(|pid| !survivors.contains(pid))
        .collect()
}
