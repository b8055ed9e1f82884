//! Window classification heuristics used during discovery.
//!
//! All functions here are pure: they take window snapshots and return
//! decisions, leaving OS queries to the caller.

use crate::process::Pid;
use crate::window::types::{WindowHandle, WindowInfo};

/// IME and tooltip helpers that every GUI process owns.
pub const SKIP_CLASSES: &[&str] = &["IME", "MSCTFIME UI", "Default IME", "tooltips_class32"];

/// Shell surfaces that are never application windows.
pub const SHELL_CLASSES: &[&str] = &[
    "Shell_TrayWnd",
    "Shell_SecondaryTrayWnd",
    "Progman",
    "WorkerW",
    "DV2ControlHost",
    "ForegroundStaging",
];

pub const SYSTEM_TITLES: &[&str] = &["Program Manager", "Desktop Window Manager"];

/// Application families with a recognisable main-window class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppFamily {
    Terminal,
    Notepad,
    Browser,
    Other,
}

impl AppFamily {
    /// Classify by executable base name.
    pub fn from_executable(path: &str) -> Self {
        let base = crate::process::operations::extract_base_name(path).to_ascii_lowercase();
        let stem = base.strip_suffix(".exe").unwrap_or(&base);
        match stem {
            "cmd" | "powershell" | "pwsh" | "wt" | "windowsterminal" | "conhost" => {
                AppFamily::Terminal
            }
            "notepad" => AppFamily::Notepad,
            "chrome" | "msedge" | "firefox" | "brave" | "vivaldi" | "opera" => AppFamily::Browser,
            _ => AppFamily::Other,
        }
    }

    pub fn main_window_classes(&self) -> &'static [&'static str] {
        match self {
            AppFamily::Terminal => &["ConsoleWindowClass", "CASCADIA_HOSTING_WINDOW_CLASS"],
            AppFamily::Notepad => &["Notepad"],
            AppFamily::Browser => &["Chrome_WidgetWin_1", "MozillaWindowClass"],
            AppFamily::Other => &[],
        }
    }
}

pub fn is_skipped_class(class_name: &str) -> bool {
    SKIP_CLASSES.contains(&class_name) || SHELL_CLASSES.contains(&class_name)
}

pub fn is_shell_class(class_name: &str) -> bool {
    SHELL_CLASSES.contains(&class_name)
}

fn is_system_title(title: &str) -> bool {
    title.trim().is_empty() || SYSTEM_TITLES.contains(&title)
}

/// Visible, titled, non-helper window.
pub fn is_candidate(window: &WindowInfo) -> bool {
    window.visible && !is_skipped_class(&window.class_name) && !is_system_title(&window.title)
}

/// Candidate windows owned by any of `owners`, preserving enumeration order.
pub fn owned_windows(windows: &[WindowInfo], owners: &[Pid]) -> Vec<WindowInfo> {
    windows
        .iter()
        .filter(|w| owners.contains(&w.pid))
        .filter(|w| is_candidate(w))
        .cloned()
        .collect()
}

/// Pick the main window.
///
/// Priority: a class characteristic of the family, then the first window
/// whose title is longer than one character, then the first window.
pub fn select_main_window(windows: &[WindowInfo], family: AppFamily) -> Option<WindowHandle> {
    let classes = family.main_window_classes();
    windows
        .iter()
        .find(|w| classes.contains(&w.class_name.as_str()))
        .or_else(|| windows.iter().find(|w| w.title.chars().count() > 1))
        .or_else(|| windows.first())
        .map(|w| w.handle)
}

/// Broadened search used once the per-pid attempts are exhausted.
///
/// Matches any candidate window whose title contains `display_name`
/// (case-insensitive); notepad-family processes also match their class. This
/// catches applications whose window belongs to a broker process outside the
/// launched process tree.
pub fn title_fallback(
    windows: &[WindowInfo],
    display_name: &str,
    family: AppFamily,
) -> Vec<WindowInfo> {
    let needle = display_name.to_lowercase();
    if needle.trim().is_empty() {
        return Vec::new();
    }

    windows
        .iter()
        .filter(|w| is_candidate(w))
        .filter(|w| {
            w.title.to_lowercase().contains(&needle)
                || (family == AppFamily::Notepad && w.class_name == "Notepad")
        })
        .cloned()
        .collect()
}
