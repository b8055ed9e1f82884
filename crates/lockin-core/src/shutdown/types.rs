use serde::{Deserialize, Serialize};

use crate::desktop::TeardownReport;
use crate::registry::CloseAllReport;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShutdownReport {
    /// `may_close` refused; nothing was touched.
    pub vetoed: bool,
    /// A previous call already ran the sequence; this is its report.
    pub already_completed: bool,
    pub close_all: Option<CloseAllReport>,
    /// Processes force-terminated for windows left on the isolated desktop.
    pub residue_terminations: usize,
    /// Windows that never reached the isolated desktop.
    pub unmigrated_windows: usize,
    /// Processes force-terminated for unmigrated windows still open after
    /// `close_all`.
    pub unmigrated_terminations: usize,
    pub teardown: Option<TeardownReport>,
}

impl ShutdownReport {
    pub fn vetoed() -> Self {
        Self {
            vetoed: true,
            ..Self::default()
        }
    }

    /// Forced terminations across every stage.
    pub fn forced_terminations(&self) -> usize {
        let close_all = self
            .close_all
            .as_ref()
            .map(|r| r.terminated + r.killed)
            .unwrap_or(0);
        let teardown = self
            .teardown
            .as_ref()
            .map(|r| r.forced_terminations)
            .unwrap_or(0);
        close_all + self.residue_terminations + self.unmigrated_terminations + teardown
    }
}
