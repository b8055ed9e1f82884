use std::sync::Arc;

use crate::process::Pid;
use crate::window::errors::WindowError;
use crate::window::types::{WindowHandle, WindowInfo, WindowQueryResult};

/// Queries and commands over top-level windows.
///
/// Implementations must tolerate handles that vanished between calls:
/// queries on a dead handle report absence rather than erroring.
pub trait WindowSystem: Send + Sync {
    /// All top-level windows, visible or not, in z-order.
    fn top_level_windows(&self) -> WindowQueryResult<Vec<WindowInfo>>;

    fn is_window(&self, handle: WindowHandle) -> bool;

    /// Owning process of a window, if it still exists.
    fn window_pid(&self, handle: WindowHandle) -> Option<Pid>;

    fn is_minimized(&self, handle: WindowHandle) -> bool;

    /// Post a close request without waiting for the window to act on it.
    fn post_close(&self, handle: WindowHandle) -> WindowQueryResult<()>;

    fn minimize(&self, handle: WindowHandle) -> WindowQueryResult<()>;

    fn restore(&self, handle: WindowHandle) -> WindowQueryResult<()>;

    fn set_foreground(&self, handle: WindowHandle) -> WindowQueryResult<()>;
}

/// Window system for hosts without a supported window manager.
///
/// Reports no windows and rejects commands.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullWindowSystem;

impl WindowSystem for NullWindowSystem {
    fn top_level_windows(&self) -> WindowQueryResult<Vec<WindowInfo>> {
        Ok(Vec::new())
    }

    fn is_window(&self, _handle: WindowHandle) -> bool {
        false
    }

    fn window_pid(&self, _handle: WindowHandle) -> Option<Pid> {
        None
    }

    fn is_minimized(&self, _handle: WindowHandle) -> bool {
        false
    }

    fn post_close(&self, _handle: WindowHandle) -> WindowQueryResult<()> {
        Err(WindowError::Unsupported)
    }

    fn minimize(&self, _handle: WindowHandle) -> WindowQueryResult<()> {
        Err(WindowError::Unsupported)
    }

    fn restore(&self, _handle: WindowHandle) -> WindowQueryResult<()> {
        Err(WindowError::Unsupported)
    }

    fn set_foreground(&self, _handle: WindowHandle) -> WindowQueryResult<()> {
        Err(WindowError::Unsupported)
    }
}

/// The window system for the current platform.
pub fn default_window_system() -> Arc<dyn WindowSystem> {
    #[cfg(windows)]
    {
        Arc::new(crate::window::win32::Win32WindowSystem)
    }
    #[cfg(not(windows))]
    {
        Arc::new(NullWindowSystem)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_window_system_is_inert() {
        let system = NullWindowSystem;
        let handle = WindowHandle::from_raw(1);
        assert!(system.top_level_windows().unwrap().is_empty());
        assert!(!system.is_window(handle));
        assert!(system.window_pid(handle).is_none());
        assert!(matches!(
            system.post_close(handle),
            Err(WindowError::Unsupported)
        ));
    }
}
