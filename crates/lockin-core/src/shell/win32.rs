//! Win32 shell surfaces.

use std::ffi::c_void;

use windows::Win32::Foundation::{HWND, LPARAM, WPARAM};
use windows::Win32::UI::WindowsAndMessaging::{
    FindWindowExW, FindWindowW, IsWindowVisible, SPI_GETDESKWALLPAPER, SPI_SETDESKWALLPAPER,
    SPIF_SENDCHANGE, SW_HIDE, SW_SHOW, SYSTEM_PARAMETERS_INFO_UPDATE_FLAGS, SendMessageW,
    ShowWindow, SystemParametersInfoW, WM_COMMAND,
};
use windows::core::{HSTRING, PCWSTR, w};

use crate::shell::{ShellEnvironment, ShellError, ShellResult};

/// Progman command that toggles desktop icon visibility.
const TOGGLE_DESKTOP_ICONS: usize = 0x7402;

const MAX_WALLPAPER_PATH: usize = 260;

fn taskbar_windows() -> Vec<HWND> {
    let mut found = Vec::new();
    // SAFETY: FindWindow* only read the class/title strings.
    unsafe {
        if let Ok(primary) = FindWindowW(w!("Shell_TrayWnd"), PCWSTR::null()) {
            found.push(primary);
        }
        let mut after: Option<HWND> = None;
        while let Ok(secondary) =
            FindWindowExW(None, after, w!("Shell_SecondaryTrayWnd"), PCWSTR::null())
        {
            found.push(secondary);
            after = Some(secondary);
        }
        if let Ok(start) = FindWindowExW(None, None, w!("Button"), w!("Start")) {
            found.push(start);
        }
    }
    found
}

/// The desktop icon list view lives under Progman or, once the wallpaper
/// has been animated, under one of the WorkerW windows.
fn desktop_icon_view() -> Option<HWND> {
    // SAFETY: lookups only.
    unsafe {
        let progman = FindWindowW(w!("Progman"), PCWSTR::null()).ok()?;
        let mut host = FindWindowExW(Some(progman), None, w!("SHELLDLL_DefView"), PCWSTR::null());
        let mut worker: Option<HWND> = None;
        while host.is_err() {
            let next = FindWindowExW(None, worker, w!("WorkerW"), PCWSTR::null()).ok()?;
            host = FindWindowExW(Some(next), None, w!("SHELLDLL_DefView"), PCWSTR::null());
            worker = Some(next);
        }
        FindWindowExW(host.ok(), None, w!("SysListView32"), PCWSTR::null()).ok()
    }
}

fn toggle_desktop_icons() -> ShellResult<()> {
    // SAFETY: WM_COMMAND to Progman carries no pointers.
    unsafe {
        let progman = FindWindowW(w!("Progman"), PCWSTR::null())
            .map_err(|_| ShellError::SurfaceNotFound { surface: "Progman" })?;
        SendMessageW(
            progman,
            WM_COMMAND,
            Some(WPARAM(TOGGLE_DESKTOP_ICONS)),
            Some(LPARAM(0)),
        );
    }
    Ok(())
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Win32Shell;

impl ShellEnvironment for Win32Shell {
    fn hide_taskbars(&self) -> ShellResult<bool> {
        let mut hidden = false;
        for hwnd in taskbar_windows() {
            // SAFETY: ShowWindow only reads the handle.
            unsafe {
                if IsWindowVisible(hwnd).as_bool() {
                    let _ = ShowWindow(hwnd, SW_HIDE);
                    hidden = true;
                }
            }
        }
        Ok(hidden)
    }

    fn show_taskbars(&self) -> ShellResult<()> {
        let taskbars = taskbar_windows();
        if taskbars.is_empty() {
            return Err(ShellError::SurfaceNotFound {
                surface: "Shell_TrayWnd",
            });
        }
        for hwnd in taskbars {
            // SAFETY: as above.
            let _ = unsafe { ShowWindow(hwnd, SW_SHOW) };
        }
        Ok(())
    }

    fn hide_desktop_icons(&self) -> ShellResult<bool> {
        let Some(view) = desktop_icon_view() else {
            return Err(ShellError::SurfaceNotFound {
                surface: "SysListView32",
            });
        };
        // SAFETY: visibility query only.
        if unsafe { IsWindowVisible(view) }.as_bool() {
            toggle_desktop_icons()?;
            return Ok(true);
        }
        Ok(false)
    }

    fn show_desktop_icons(&self) -> ShellResult<()> {
        let Some(view) = desktop_icon_view() else {
            return Err(ShellError::SurfaceNotFound {
                surface: "SysListView32",
            });
        };
        // SAFETY: visibility query only.
        if !unsafe { IsWindowVisible(view) }.as_bool() {
            toggle_desktop_icons()?;
        }
        Ok(())
    }

    fn wallpaper(&self) -> ShellResult<Option<String>> {
        let mut buf = [0u16; MAX_WALLPAPER_PATH];
        // SAFETY: the buffer is MAX_WALLPAPER_PATH u16s as declared in uiparam.
        unsafe {
            SystemParametersInfoW(
                SPI_GETDESKWALLPAPER,
                MAX_WALLPAPER_PATH as u32,
                Some(buf.as_mut_ptr() as *mut c_void),
                SYSTEM_PARAMETERS_INFO_UPDATE_FLAGS(0),
            )
        }
        .map_err(|e| ShellError::CommandFailed {
            operation: "get_wallpaper",
            message: e.to_string(),
        })?;
        let len = buf.iter().position(|c| *c == 0).unwrap_or(buf.len());
        Ok(Some(String::from_utf16_lossy(&buf[..len])))
    }

    fn set_wallpaper(&self, path: &str) -> ShellResult<()> {
        let path = HSTRING::from(path);
        // SAFETY: the HSTRING outlives the call; the change is not persisted
        // to the user profile.
        unsafe {
            SystemParametersInfoW(
                SPI_SETDESKWALLPAPER,
                0,
                Some(path.as_ptr() as *mut c_void),
                SPIF_SENDCHANGE,
            )
        }
        .map_err(|e| ShellError::CommandFailed {
            operation: "set_wallpaper",
            message: e.to_string(),
        })
    }
}
