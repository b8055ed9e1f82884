//! In-memory stand-ins for the OS-facing traits.
//!
//! Only built for unit tests and with the `test-utils` feature, which the
//! integration suites enable through a dev-dependency. They drive the
//! controller, registry and shutdown sequence without a Windows desktop.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::desktop::RawDesktopAccessor;
use crate::process::{self, Pid};
use crate::shell::{ShellEnvironment, ShellResult};
use crate::window::{WindowError, WindowHandle, WindowInfo, WindowQueryResult, WindowSystem};

/// A pid no platform hands out, for windows whose owner must never resolve
/// to a real process.
pub const UNUSED_PID: u32 = 4_000_000_001;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug, Default)]
struct FakeDesktops {
    available: bool,
    count: i32,
    current: i32,
    fail_create: bool,
    fail_switch: bool,
    fail_moves: bool,
    window_desktops: HashMap<isize, i32>,
}

/// Virtual desktop accessor backed by a desktop counter and a window map.
///
/// Clones share state, so a test can keep one handle while the binding owns
/// another.
#[derive(Debug, Clone)]
pub struct FakeDesktopAccessor {
    state: Arc<Mutex<FakeDesktops>>,
}

impl FakeDesktopAccessor {
    pub fn new(count: i32, current: i32) -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeDesktops {
                available: true,
                count,
                current,
                ..FakeDesktops::default()
            })),
        }
    }

    /// Every primitive returns the failure sentinel.
    pub fn unavailable() -> Self {
        let accessor = Self::new(1, 0);
        lock(&accessor.state).available = false;
        accessor
    }

    pub fn fail_create(&self, fail: bool) {
        lock(&self.state).fail_create = fail;
    }

    pub fn fail_switch(&self, fail: bool) {
        lock(&self.state).fail_switch = fail;
    }

    /// Window moves fail and leave the window where it was.
    pub fn fail_moves(&self, fail: bool) {
        lock(&self.state).fail_moves = fail;
    }

    pub fn count(&self) -> i32 {
        lock(&self.state).count
    }

    pub fn current(&self) -> i32 {
        lock(&self.state).current
    }

    pub fn place_window(&self, handle: WindowHandle, desktop: i32) {
        lock(&self.state)
            .window_desktops
            .insert(handle.as_raw(), desktop);
    }

    pub fn window_desktop(&self, handle: WindowHandle) -> Option<i32> {
        lock(&self.state)
            .window_desktops
            .get(&handle.as_raw())
            .copied()
    }
}

impl RawDesktopAccessor for FakeDesktopAccessor {
    fn current_desktop_number(&self) -> i32 {
        let state = lock(&self.state);
        if state.available { state.current } else { -1 }
    }

    fn desktop_count(&self) -> i32 {
        let state = lock(&self.state);
        if state.available { state.count } else { -1 }
    }

    fn create_desktop(&self) -> i32 {
        let mut state = lock(&self.state);
        if !state.available || state.fail_create {
            return -1;
        }
        state.count += 1;
        state.count - 1
    }

    fn remove_desktop(&self, target: i32, fallback: i32) -> i32 {
        let mut state = lock(&self.state);
        let valid = |n: i32| n >= 0 && n < state.count;
        if !state.available || state.count <= 1 || !valid(target) || !valid(fallback) {
            return -1;
        }
        if target == fallback {
            return -1;
        }

        // Desktops above the removed one shift down by one
        let shift = |n: i32| if n > target { n - 1 } else { n };
        let landing = shift(fallback);
        for desktop in state.window_desktops.values_mut() {
            *desktop = if *desktop == target { landing } else { shift(*desktop) };
        }
        state.current = if state.current == target {
            landing
        } else {
            shift(state.current)
        };
        state.count -= 1;
        0
    }

    fn go_to_desktop(&self, number: i32) -> i32 {
        let mut state = lock(&self.state);
        if !state.available || state.fail_switch || number < 0 || number >= state.count {
            return -1;
        }
        state.current = number;
        0
    }

    fn move_window_to_desktop(&self, hwnd: isize, number: i32) -> i32 {
        let mut state = lock(&self.state);
        if !state.available || state.fail_moves || number < 0 || number >= state.count {
            return -1;
        }
        state.window_desktops.insert(hwnd, number);
        0
    }

    fn window_desktop_number(&self, hwnd: isize) -> i32 {
        let state = lock(&self.state);
        if !state.available {
            return -1;
        }
        state.window_desktops.get(&hwnd).copied().unwrap_or(-1)
    }
}

#[derive(Debug, Clone)]
struct FakeWindow {
    info: WindowInfo,
    minimized: bool,
    stubborn: bool,
}

#[derive(Debug, Default)]
struct FakeWindows {
    windows: Vec<FakeWindow>,
    next_handle: isize,
    foreground: Option<WindowHandle>,
    close_requests: Vec<WindowHandle>,
    close_kills_owner: bool,
}

/// Window table driven by the test.
///
/// A close request removes the window unless it is marked stubborn. With
/// [`FakeWindowSystem::set_close_kills_owner`] a close request also kills
/// the owning process, imitating an application that exits when its last
/// window closes.
#[derive(Debug, Clone, Default)]
pub struct FakeWindowSystem {
    state: Arc<Mutex<FakeWindows>>,
}

impl FakeWindowSystem {
    pub fn new() -> Self {
        let system = Self::default();
        lock(&system.state).next_handle = 0x1000;
        system
    }

    pub fn add_window(&self, pid: u32, title: &str, class_name: &str) -> WindowHandle {
        let mut state = lock(&self.state);
        let handle = WindowHandle::from_raw(state.next_handle);
        state.next_handle += 0x10;
        state.windows.push(FakeWindow {
            info: WindowInfo {
                handle,
                pid: Pid::from_raw(pid),
                title: title.to_string(),
                class_name: class_name.to_string(),
                visible: true,
            },
            minimized: false,
            stubborn: false,
        });
        handle
    }

    pub fn remove_window(&self, handle: WindowHandle) {
        lock(&self.state)
            .windows
            .retain(|w| w.info.handle != handle);
    }

    pub fn set_stubborn(&self, handle: WindowHandle, stubborn: bool) {
        let mut state = lock(&self.state);
        if let Some(window) = state.windows.iter_mut().find(|w| w.info.handle == handle) {
            window.stubborn = stubborn;
        }
    }

    pub fn set_close_kills_owner(&self, enabled: bool) {
        lock(&self.state).close_kills_owner = enabled;
    }

    pub fn foreground(&self) -> Option<WindowHandle> {
        lock(&self.state).foreground
    }

    pub fn close_requests(&self) -> Vec<WindowHandle> {
        lock(&self.state).close_requests.clone()
    }

    fn with_window<T>(
        &self,
        handle: WindowHandle,
        f: impl FnOnce(&mut FakeWindow) -> T,
    ) -> WindowQueryResult<T> {
        let mut state = lock(&self.state);
        state
            .windows
            .iter_mut()
            .find(|w| w.info.handle == handle)
            .map(f)
            .ok_or(WindowError::InvalidHandle { handle })
    }
}

impl WindowSystem for FakeWindowSystem {
    fn top_level_windows(&self) -> WindowQueryResult<Vec<WindowInfo>> {
        Ok(lock(&self.state)
            .windows
            .iter()
            .map(|w| w.info.clone())
            .collect())
    }

    fn is_window(&self, handle: WindowHandle) -> bool {
        lock(&self.state)
            .windows
            .iter()
            .any(|w| w.info.handle == handle)
    }

    fn window_pid(&self, handle: WindowHandle) -> Option<Pid> {
        self.with_window(handle, |w| w.info.pid).ok()
    }

    fn is_minimized(&self, handle: WindowHandle) -> bool {
        self.with_window(handle, |w| w.minimized).unwrap_or(false)
    }

    fn post_close(&self, handle: WindowHandle) -> WindowQueryResult<()> {
        let (owner, stubborn, kills_owner) = {
            let mut state = lock(&self.state);
            let Some(window) = state.windows.iter().find(|w| w.info.handle == handle) else {
                return Err(WindowError::InvalidHandle { handle });
            };
            let (owner, stubborn) = (window.info.pid, window.stubborn);
            state.close_requests.push(handle);
            if !stubborn {
                state.windows.retain(|w| w.info.handle != handle);
            }
            (owner, stubborn, state.close_kills_owner)
        };

        if kills_owner && !stubborn {
            let _ = process::kill_process(owner, None, None);
        }
        Ok(())
    }

    fn minimize(&self, handle: WindowHandle) -> WindowQueryResult<()> {
        self.with_window(handle, |w| w.minimized = true)
    }

    fn restore(&self, handle: WindowHandle) -> WindowQueryResult<()> {
        self.with_window(handle, |w| w.minimized = false)
    }

    fn set_foreground(&self, handle: WindowHandle) -> WindowQueryResult<()> {
        self.with_window(handle, |_| ())?;
        lock(&self.state).foreground = Some(handle);
        Ok(())
    }
}

#[derive(Debug)]
struct FakeShellState {
    taskbar_visible: bool,
    icons_visible: bool,
    wallpaper: String,
    restore_calls: usize,
}

/// Shell whose surfaces are booleans and a wallpaper string.
#[derive(Debug, Clone)]
pub struct FakeShell {
    state: Arc<Mutex<FakeShellState>>,
}

impl FakeShell {
    pub fn new(wallpaper: &str) -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeShellState {
                taskbar_visible: true,
                icons_visible: true,
                wallpaper: wallpaper.to_string(),
                restore_calls: 0,
            })),
        }
    }

    pub fn taskbar_visible(&self) -> bool {
        lock(&self.state).taskbar_visible
    }

    pub fn icons_visible(&self) -> bool {
        lock(&self.state).icons_visible
    }

    pub fn current_wallpaper(&self) -> String {
        lock(&self.state).wallpaper.clone()
    }

    /// Calls that showed a surface or set a non-blank wallpaper.
    pub fn restore_calls(&self) -> usize {
        lock(&self.state).restore_calls
    }
}

impl ShellEnvironment for FakeShell {
    fn hide_taskbars(&self) -> ShellResult<bool> {
        let mut state = lock(&self.state);
        let changed = state.taskbar_visible;
        state.taskbar_visible = false;
        Ok(changed)
    }

    fn show_taskbars(&self) -> ShellResult<()> {
        let mut state = lock(&self.state);
        state.taskbar_visible = true;
        state.restore_calls += 1;
        Ok(())
    }

    fn hide_desktop_icons(&self) -> ShellResult<bool> {
        let mut state = lock(&self.state);
        let changed = state.icons_visible;
        state.icons_visible = false;
        Ok(changed)
    }

    fn show_desktop_icons(&self) -> ShellResult<()> {
        let mut state = lock(&self.state);
        state.icons_visible = true;
        state.restore_calls += 1;
        Ok(())
    }

    fn wallpaper(&self) -> ShellResult<Option<String>> {
        Ok(Some(lock(&self.state).wallpaper.clone()))
    }

    fn set_wallpaper(&self, path: &str) -> ShellResult<()> {
        let mut state = lock(&self.state);
        if !path.is_empty() {
            state.restore_calls += 1;
        }
        state.wallpaper = path.to_string();
        Ok(())
    }
}
