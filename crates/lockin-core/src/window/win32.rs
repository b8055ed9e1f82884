//! Win32 implementation of [`WindowSystem`].

use windows::Win32::Foundation::{HWND, LPARAM, WPARAM};
use windows::Win32::UI::WindowsAndMessaging::{
    EnumWindows, GetClassNameW, GetWindowTextW, GetWindowThreadProcessId, IsIconic, IsWindow,
    IsWindowVisible, PostMessageW, SW_MINIMIZE, SW_RESTORE, SetForegroundWindow, ShowWindow,
    WM_CLOSE,
};
use windows::core::BOOL;

use crate::process::Pid;
use crate::window::errors::WindowError;
use crate::window::system::WindowSystem;
use crate::window::types::{WindowHandle, WindowInfo, WindowQueryResult};

pub(crate) fn hwnd(handle: WindowHandle) -> HWND {
    HWND(handle.as_raw() as *mut _)
}

unsafe extern "system" fn collect_handle(hwnd: HWND, lparam: LPARAM) -> BOOL {
    // SAFETY: lparam carries the &mut Vec<isize> passed to EnumWindows below,
    // which outlives the enumeration.
    let handles = unsafe { &mut *(lparam.0 as *mut Vec<isize>) };
    handles.push(hwnd.0 as isize);
    BOOL(1)
}

fn utf16_text(read: impl FnOnce(&mut [u16]) -> i32) -> String {
    let mut buf = [0u16; 512];
    let len = read(&mut buf);
    if len <= 0 {
        return String::new();
    }
    String::from_utf16_lossy(&buf[..len as usize])
}

fn describe(handle: WindowHandle) -> Option<WindowInfo> {
    let hwnd = hwnd(handle);
    let mut pid: u32 = 0;
    // SAFETY: all calls tolerate stale handles and only write into our buffers.
    unsafe {
        GetWindowThreadProcessId(hwnd, Some(&mut pid));
        if pid == 0 {
            return None;
        }
        Some(WindowInfo {
            handle,
            pid: Pid::from_raw(pid),
            title: utf16_text(|buf| GetWindowTextW(hwnd, buf)),
            class_name: utf16_text(|buf| GetClassNameW(hwnd, buf)),
            visible: IsWindowVisible(hwnd).as_bool(),
        })
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Win32WindowSystem;

impl Win32WindowSystem {
    fn ensure_window(&self, handle: WindowHandle) -> WindowQueryResult<HWND> {
        if !self.is_window(handle) {
            return Err(WindowError::InvalidHandle { handle });
        }
        Ok(hwnd(handle))
    }
}

impl WindowSystem for Win32WindowSystem {
    fn top_level_windows(&self) -> WindowQueryResult<Vec<WindowInfo>> {
        let mut handles: Vec<isize> = Vec::new();
        // SAFETY: the callback only pushes into `handles`, which lives for the call.
        unsafe {
            EnumWindows(
                Some(collect_handle),
                LPARAM(&mut handles as *mut Vec<isize> as isize),
            )
        }
        .map_err(|e| WindowError::EnumerationFailed {
            message: e.to_string(),
        })?;

        Ok(handles
            .into_iter()
            .map(WindowHandle::from_raw)
            .filter_map(describe)
            .collect())
    }

    fn is_window(&self, handle: WindowHandle) -> bool {
        // SAFETY: IsWindow accepts any value.
        unsafe { IsWindow(Some(hwnd(handle))).as_bool() }
    }

    fn window_pid(&self, handle: WindowHandle) -> Option<Pid> {
        if !self.is_window(handle) {
            return None;
        }
        let mut pid: u32 = 0;
        // SAFETY: writes only into `pid`.
        unsafe { GetWindowThreadProcessId(hwnd(handle), Some(&mut pid)) };
        (pid != 0).then(|| Pid::from_raw(pid))
    }

    fn is_minimized(&self, handle: WindowHandle) -> bool {
        // SAFETY: IsIconic tolerates stale handles.
        unsafe { IsIconic(hwnd(handle)).as_bool() }
    }

    fn post_close(&self, handle: WindowHandle) -> WindowQueryResult<()> {
        let hwnd = self.ensure_window(handle)?;
        // SAFETY: posting WM_CLOSE never dereferences our memory.
        unsafe { PostMessageW(Some(hwnd), WM_CLOSE, WPARAM(0), LPARAM(0)) }.map_err(|e| {
            WindowError::CommandFailed {
                operation: "close",
                handle,
                message: e.to_string(),
            }
        })
    }

    fn minimize(&self, handle: WindowHandle) -> WindowQueryResult<()> {
        let hwnd = self.ensure_window(handle)?;
        // SAFETY: ShowWindow's return is the previous visibility, not an error.
        let _ = unsafe { ShowWindow(hwnd, SW_MINIMIZE) };
        Ok(())
    }

    fn restore(&self, handle: WindowHandle) -> WindowQueryResult<()> {
        let hwnd = self.ensure_window(handle)?;
        // SAFETY: as above.
        let _ = unsafe { ShowWindow(hwnd, SW_RESTORE) };
        Ok(())
    }

    fn set_foreground(&self, handle: WindowHandle) -> WindowQueryResult<()> {
        let hwnd = self.ensure_window(handle)?;
        // SAFETY: SetForegroundWindow only reads the handle.
        if unsafe { SetForegroundWindow(hwnd) }.as_bool() {
            Ok(())
        } else {
            Err(WindowError::CommandFailed {
                operation: "focus",
                handle,
                message: "the system refused to change the foreground window".to_string(),
            })
        }
    }
}
