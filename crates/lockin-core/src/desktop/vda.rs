//! Runtime binding to `VirtualDesktopAccessor.dll`.

use std::ffi::{CStr, c_void};
use std::path::{Path, PathBuf};

use tracing::info;
use windows::Win32::Foundation::{FreeLibrary, HMODULE};
use windows::Win32::System::LibraryLoader::{GetProcAddress, LoadLibraryW};
use windows::core::{HSTRING, PCSTR};

use crate::desktop::binding::RawDesktopAccessor;
use crate::desktop::errors::{DesktopError, DesktopResult};

pub const DLL_NAME: &str = "VirtualDesktopAccessor.dll";

type QueryFn = unsafe extern "C" fn() -> i32;
type DesktopFn = unsafe extern "C" fn(i32) -> i32;
type RemoveFn = unsafe extern "C" fn(i32, i32) -> i32;
type WindowQueryFn = unsafe extern "C" fn(isize) -> i32;
type MoveWindowFn = unsafe extern "C" fn(isize, i32) -> i32;

type RawProc = unsafe extern "system" fn() -> isize;

pub struct VdaLibrary {
    module: isize,
    get_current_desktop_number: QueryFn,
    get_desktop_count: QueryFn,
    create_desktop: QueryFn,
    remove_desktop: RemoveFn,
    go_to_desktop_number: DesktopFn,
    move_window_to_desktop_number: MoveWindowFn,
    get_window_desktop_number: WindowQueryFn,
}

fn candidate_paths(configured: Option<&Path>) -> Vec<PathBuf> {
    if let Some(path) = configured {
        return vec![path.to_path_buf()];
    }
    let mut candidates = Vec::new();
    if let Ok(exe) = std::env::current_exe()
        && let Some(dir) = exe.parent()
    {
        candidates.push(dir.join(DLL_NAME));
    }
    // Bare name: resolved through the DLL search path
    candidates.push(PathBuf::from(DLL_NAME));
    candidates
}

fn symbol(module: HMODULE, name: &'static CStr) -> DesktopResult<RawProc> {
    // SAFETY: `name` is NUL-terminated and `module` is a live library handle.
    unsafe { GetProcAddress(module, PCSTR(name.as_ptr() as *const u8)) }.ok_or(
        DesktopError::SymbolMissing {
            symbol: name.to_str().unwrap_or("?"),
        },
    )
}

impl VdaLibrary {
    /// Load the accessor from the configured path, or next to the executable,
    /// or from the DLL search path.
    pub fn load(configured: Option<&Path>) -> DesktopResult<Self> {
        let mut last_error = DesktopError::Unavailable;

        for path in candidate_paths(configured) {
            // SAFETY: loading a library runs its DllMain; the accessor has no
            // initialisation side effects beyond COM setup.
            match unsafe { LoadLibraryW(&HSTRING::from(path.as_os_str())) } {
                Ok(module) => match Self::bind(module) {
                    Ok(library) => {
                        info!(
                            event = "core.desktop.accessor_loaded",
                            path = %path.display(),
                        );
                        return Ok(library);
                    }
                    Err(e) => {
                        // SAFETY: nothing bound from this module survives.
                        let _ = unsafe { FreeLibrary(module) };
                        last_error = e;
                    }
                },
                Err(e) => {
                    last_error = DesktopError::LibraryLoad {
                        path,
                        message: e.to_string(),
                    };
                }
            }
        }

        Err(last_error)
    }

    fn bind(module: HMODULE) -> DesktopResult<Self> {
        // SAFETY: each symbol is transmuted to the signature the accessor
        // exports for it.
        unsafe {
            Ok(Self {
                module: module.0 as isize,
                get_current_desktop_number: std::mem::transmute::<RawProc, QueryFn>(symbol(
                    module,
                    c"GetCurrentDesktopNumber",
                )?),
                get_desktop_count: std::mem::transmute::<RawProc, QueryFn>(symbol(
                    module,
                    c"GetDesktopCount",
                )?),
                create_desktop: std::mem::transmute::<RawProc, QueryFn>(symbol(
                    module,
                    c"CreateDesktop",
                )?),
                remove_desktop: std::mem::transmute::<RawProc, RemoveFn>(symbol(
                    module,
                    c"RemoveDesktop",
                )?),
                go_to_desktop_number: std::mem::transmute::<RawProc, DesktopFn>(symbol(
                    module,
                    c"GoToDesktopNumber",
                )?),
                move_window_to_desktop_number: std::mem::transmute::<RawProc, MoveWindowFn>(
                    symbol(module, c"MoveWindowToDesktopNumber")?,
                ),
                get_window_desktop_number: std::mem::transmute::<RawProc, WindowQueryFn>(symbol(
                    module,
                    c"GetWindowDesktopNumber",
                )?),
            })
        }
    }
}

impl Drop for VdaLibrary {
    fn drop(&mut self) {
        // SAFETY: the function pointers die with `self`.
        let _ = unsafe { FreeLibrary(HMODULE(self.module as *mut c_void)) };
    }
}

// SAFETY (all methods): the pointers were resolved from the loaded module,
// which stays loaded for the lifetime of `self`.
impl RawDesktopAccessor for VdaLibrary {
    fn current_desktop_number(&self) -> i32 {
        unsafe { (self.get_current_desktop_number)() }
    }

    fn desktop_count(&self) -> i32 {
        unsafe { (self.get_desktop_count)() }
    }

    fn create_desktop(&self) -> i32 {
        unsafe { (self.create_desktop)() }
    }

    fn remove_desktop(&self, target: i32, fallback: i32) -> i32 {
        unsafe { (self.remove_desktop)(target, fallback) }
    }

    fn go_to_desktop(&self, number: i32) -> i32 {
        unsafe { (self.go_to_desktop_number)(number) }
    }

    fn move_window_to_desktop(&self, hwnd: isize, number: i32) -> i32 {
        unsafe { (self.move_window_to_desktop_number)(hwnd, number) }
    }

    fn window_desktop_number(&self, hwnd: isize) -> i32 {
        unsafe { (self.get_window_desktop_number)(hwnd) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configured_path_is_exclusive() {
        let configured = PathBuf::from("C:/tools/VirtualDesktopAccessor.dll");
        assert_eq!(candidate_paths(Some(&configured)), vec![configured]);
    }

    #[test]
    fn test_missing_library_is_load_error() {
        let result = VdaLibrary::load(Some(Path::new("Z:/definitely/missing.dll")));
        assert!(matches!(result, Err(DesktopError::LibraryLoad { .. })));
    }
}
