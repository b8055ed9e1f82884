//! Per-process window discovery.
//!
//! A launched process may take seconds to show its first window, or show it
//! from a helper child. Each process gets one background thread driving a
//! [`WindowDiscovery`] until windows are found, the process dies, or the
//! attempt budget runs out.

use std::thread;
use tracing::{debug, info};

use crate::process::Pid;
use crate::registry::handler::ProcessRegistry;
use crate::window::WindowInfo;

/// What one discovery attempt saw.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryObservation {
    pub alive: bool,
    /// Candidate windows owned by the process or its descendants
    pub windows: Vec<WindowInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryStep {
    Found(Vec<WindowInfo>),
    Retry,
    ProcessGone,
    /// Attempts used up without a window; the title fallback runs next.
    Exhausted,
}

#[derive(Debug, Clone)]
pub struct WindowDiscovery {
    attempt: u32,
    max_attempts: u32,
}

impl WindowDiscovery {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            attempt: 0,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn step(&mut self, observation: DiscoveryObservation) -> DiscoveryStep {
        self.attempt += 1;

        if !observation.alive {
            return DiscoveryStep::ProcessGone;
        }
        if !observation.windows.is_empty() {
            return DiscoveryStep::Found(observation.windows);
        }
        if self.attempt >= self.max_attempts {
            return DiscoveryStep::Exhausted;
        }
        DiscoveryStep::Retry
    }
}

/// Body of a discovery thread.
///
/// Exits as soon as the entry leaves `Launching` or disappears, so threads
/// for closed processes are abandoned rather than cancelled.
pub(crate) fn run_discovery(registry: &ProcessRegistry, pid: Pid) {
    let timing = registry.timing().clone();
    let mut discovery = WindowDiscovery::new(timing.discovery_attempts);

    loop {
        thread::sleep(timing.discovery_interval());

        let Some(observation) = registry.observe(pid) else {
            debug!(
                event = "core.registry.discovery_abandoned",
                pid = pid.as_u32(),
                attempt = discovery.attempt(),
            );
            return;
        };

        match discovery.step(observation) {
            DiscoveryStep::Retry => {
                debug!(
                    event = "core.registry.discovery_retry",
                    pid = pid.as_u32(),
                    attempt = discovery.attempt(),
                    max_attempts = discovery.max_attempts(),
                );
            }
            DiscoveryStep::Found(windows) => {
                info!(
                    event = "core.registry.windows_found",
                    pid = pid.as_u32(),
                    count = windows.len(),
                    attempt = discovery.attempt(),
                );
                registry.record_windows(pid, windows);
                return;
            }
            DiscoveryStep::ProcessGone => {
                info!(event = "core.registry.process_gone", pid = pid.as_u32());
                registry.mark_terminated(pid);
                return;
            }
            DiscoveryStep::Exhausted => {
                let fallback = registry.fallback_windows(pid);
                if fallback.is_empty() {
                    info!(event = "core.registry.windowless", pid = pid.as_u32());
                    registry.mark_windowless(pid);
                } else {
                    info!(
                        event = "core.registry.windows_found_by_title",
                        pid = pid.as_u32(),
                        count = fallback.len(),
                    );
                    registry.record_windows(pid, fallback);
                }
                return;
            }
        }
    }
}
