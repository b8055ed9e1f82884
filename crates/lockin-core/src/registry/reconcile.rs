//! Periodic cleanup of the registry.
//!
//! Dead processes are removed once they are old enough that a slow window
//! handoff can no longer be mistaken for an exit, stale window handles are
//! dropped, and windows opened after discovery finished are adopted.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, error, info};

use crate::process::operations::wait_until;
use crate::process::{self, Pid};
use crate::registry::handler::ProcessRegistry;
use crate::registry::types::{ProcessState, ReconcileReport};
use crate::window::WindowInfo;
use crate::window::discovery::{owned_windows, select_main_window};

impl ProcessRegistry {
    /// Drop dead entries past the minimum age; mark younger dead entries
    /// `Terminated`. Returns `(removed, marked_terminated)`.
    pub fn prune(&self) -> (usize, usize) {
        let min_age = self.timing().reconcile_min_age();
        let mut removed = 0;
        let mut marked = 0;

        self.lock().retain(|pid, entry| {
            if entry.is_running() {
                return true;
            }
            if entry.age() >= min_age {
                info!(
                    event = "core.registry.pruned",
                    pid = pid.as_u32(),
                    id = %entry.id(),
                );
                removed += 1;
                return false;
            }
            if entry.state() != ProcessState::Terminated
                && entry.transition(ProcessState::Terminated).is_ok()
            {
                marked += 1;
            }
            true
        });

        (removed, marked)
    }

    /// One reconciliation pass.
    pub fn reconcile(&self) -> ReconcileReport {
        let (removed, marked_terminated) = self.prune();
        let mut report = ReconcileReport {
            removed,
            marked_terminated,
            ..ReconcileReport::default()
        };

        let windows = self.window_system().clone();
        let live: Vec<Pid> = {
            let mut table = self.lock();
            let mut live = Vec::new();
            for (pid, entry) in table.iter_mut() {
                report.stale_windows_dropped +=
                    entry.windows.retain_valid(|handle| windows.is_window(handle));
                if entry.windows.main().is_none() && !entry.windows.is_empty() {
                    let known: Vec<WindowInfo> = entry.windows.iter().cloned().collect();
                    if let Some(main) = select_main_window(&known, entry.family()) {
                        entry.windows.set_main(main);
                    }
                }
                if entry.state() == ProcessState::WindowsFound {
                    live.push(*pid);
                }
            }
            live
        };

        if !live.is_empty() {
            let all = self.query_windows();
            for pid in live {
                let owners = process::process_family(pid);
                let owned = owned_windows(&all, &owners);
                if owned.is_empty() {
                    continue;
                }
                let added = {
                    let mut table = self.lock();
                    let Some(entry) = table.get_mut(&pid) else {
                        continue;
                    };
                    if entry.state() != ProcessState::WindowsFound {
                        continue;
                    }
                    owned
                        .into_iter()
                        .filter_map(|window| {
                            let handle = window.handle;
                            entry.windows.add(window).then_some(handle)
                        })
                        .collect::<Vec<_>>()
                };
                if !added.is_empty() {
                    debug!(
                        event = "core.registry.windows_adopted",
                        pid = pid.as_u32(),
                        count = added.len(),
                    );
                    report.new_windows += added.len();
                    self.offer_for_migration(&added);
                }
            }
        }

        report
    }

    /// Run [`ProcessRegistry::reconcile`] every `interval` on a background
    /// thread until the handle is stopped or dropped.
    pub fn spawn_reconciler(&self, interval: Duration) -> ReconcilerHandle {
        let registry = self.clone();
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);

        let thread = thread::Builder::new()
            .name("lockin-reconciler".to_string())
            .spawn(move || {
                debug!(
                    event = "core.registry.reconciler_started",
                    interval_secs = interval.as_secs(),
                );
                loop {
                    if wait_until(interval, || flag.load(Ordering::SeqCst)) {
                        break;
                    }
                    let report = registry.reconcile();
                    if report != ReconcileReport::default() {
                        info!(
                            event = "core.registry.reconciled",
                            removed = report.removed,
                            marked_terminated = report.marked_terminated,
                            stale_windows_dropped = report.stale_windows_dropped,
                            new_windows = report.new_windows,
                        );
                    }
                }
                debug!(event = "core.registry.reconciler_stopped");
            });

        let thread = match thread {
            Ok(handle) => Some(handle),
            Err(e) => {
                error!(event = "core.registry.reconciler_spawn_failed", error = %e);
                None
            }
        };

        ReconcilerHandle { stop, thread }
    }
}

/// Owner of the reconciler thread. Stops and joins it on drop.
#[derive(Debug)]
pub struct ReconcilerHandle {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl ReconcilerHandle {
    pub fn is_running(&self) -> bool {
        self.thread
            .as_ref()
            .is_some_and(|thread| !thread.is_finished())
    }

    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(thread) = self.thread.take()
            && thread.join().is_err()
        {
            error!(event = "core.registry.reconciler_panicked");
        }
    }
}

impl Drop for ReconcilerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
