use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IsolationMode {
    /// A dedicated virtual desktop was created and switched to.
    Real,
    /// Shell surfaces are hidden on the user's existing desktop.
    KioskFallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Uninitialized,
    Creating,
    Active(IsolationMode),
    TearingDown,
    Restored,
}

/// The isolated surface of the current run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualDesktopSession {
    pub mode: IsolationMode,
    /// Zero-based number of the isolated desktop; `None` in kiosk mode.
    pub desktop_number: Option<u32>,
    pub original_desktop: Option<u32>,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IsolationStatus {
    pub active: bool,
    pub mode: Option<IsolationMode>,
    pub desktop_number: Option<u32>,
    pub original_desktop: Option<u32>,
    pub current_desktop: Option<u32>,
    pub total_desktops: Option<u32>,
    pub binding_available: bool,
    pub shell_hidden: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeardownReport {
    pub mode: Option<IsolationMode>,
    pub switched_back: bool,
    pub desktop_removed: bool,
    pub forced_terminations: usize,
    pub shell_restored: bool,
}

impl TeardownReport {
    /// Report for a teardown that had nothing to do.
    pub fn noop() -> Self {
        Self {
            mode: None,
            switched_back: false,
            desktop_removed: false,
            forced_terminations: 0,
            shell_restored: false,
        }
    }
}
