use serde::{Deserialize, Serialize};
use std::fmt;

use crate::process::Pid;
use crate::window::errors::WindowError;

pub type WindowQueryResult<T> = Result<T, WindowError>;

/// Opaque OS window identifier.
///
/// Stored as an integer so it can cross threads; the registry never owns the
/// window behind it and re-validates before every use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowHandle(isize);

impl WindowHandle {
    pub fn from_raw(raw: isize) -> Self {
        Self(raw)
    }

    pub fn as_raw(&self) -> isize {
        self.0
    }
}

impl fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:X}", self.0)
    }
}

/// Snapshot of a top-level window taken at enumeration time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowInfo {
    pub handle: WindowHandle,
    pub pid: Pid,
    pub title: String,
    pub class_name: String,
    pub visible: bool,
}

/// Known windows of one managed process plus its designated main window.
#[derive(Debug, Clone, Default)]
pub struct WindowSet {
    windows: Vec<WindowInfo>,
    main: Option<WindowHandle>,
}

impl WindowSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &WindowInfo> {
        self.windows.iter()
    }

    pub fn handles(&self) -> Vec<WindowHandle> {
        self.windows.iter().map(|w| w.handle).collect()
    }

    pub fn contains(&self, handle: WindowHandle) -> bool {
        self.windows.iter().any(|w| w.handle == handle)
    }

    /// Add a window; returns `false` if the handle was already known.
    pub fn add(&mut self, window: WindowInfo) -> bool {
        if self.contains(window.handle) {
            return false;
        }
        self.windows.push(window);
        true
    }

    pub fn main(&self) -> Option<WindowHandle> {
        self.main
    }

    pub fn main_info(&self) -> Option<&WindowInfo> {
        let main = self.main?;
        self.windows.iter().find(|w| w.handle == main)
    }

    /// Designate a known window as main. Unknown handles are ignored.
    pub fn set_main(&mut self, handle: WindowHandle) {
        if self.contains(handle) {
            self.main = Some(handle);
        }
    }

    /// Drop windows for which `is_valid` is false; returns how many were dropped.
    pub fn retain_valid(&mut self, mut is_valid: impl FnMut(WindowHandle) -> bool) -> usize {
        let before = self.windows.len();
        self.windows.retain(|w| is_valid(w.handle));
        if let Some(main) = self.main
            && !self.contains(main)
        {
            self.main = None;
        }
        before - self.windows.len()
    }

    /// The main window if still valid, else the first other valid window.
    pub fn main_or_fallback(
        &self,
        mut is_valid: impl FnMut(WindowHandle) -> bool,
    ) -> Option<WindowHandle> {
        if let Some(main) = self.main
            && is_valid(main)
        {
            return Some(main);
        }
        self.windows
            .iter()
            .map(|w| w.handle)
            .filter(|handle| Some(*handle) != self.main)
            .find(|handle| is_valid(*handle))
    }
}
