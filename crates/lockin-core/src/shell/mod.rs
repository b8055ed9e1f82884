//! Shared shell surfaces: taskbars, desktop icons and wallpaper.
//!
//! The desktop controller hides these while a session is active. Every
//! operation reports whether it changed anything so restore can undo exactly
//! what was done.

pub mod errors;

#[cfg(windows)]
pub mod win32;

use std::sync::Arc;

pub use errors::ShellError;

pub type ShellResult<T> = Result<T, ShellError>;

pub trait ShellEnvironment: Send + Sync {
    /// Hide the primary and secondary taskbars and the start button.
    /// Returns `true` if anything was visible and is now hidden.
    fn hide_taskbars(&self) -> ShellResult<bool>;

    fn show_taskbars(&self) -> ShellResult<()>;

    /// Returns `true` if the icons were visible and are now hidden.
    fn hide_desktop_icons(&self) -> ShellResult<bool>;

    fn show_desktop_icons(&self) -> ShellResult<()>;

    /// Current wallpaper path; `Some("")` means a solid colour.
    fn wallpaper(&self) -> ShellResult<Option<String>>;

    /// Apply a wallpaper for this session; an empty path blanks it.
    fn set_wallpaper(&self, path: &str) -> ShellResult<()>;
}

/// Shell environment for hosts without a Windows shell. Hides nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullShell;

impl ShellEnvironment for NullShell {
    fn hide_taskbars(&self) -> ShellResult<bool> {
        Ok(false)
    }

    fn show_taskbars(&self) -> ShellResult<()> {
        Ok(())
    }

    fn hide_desktop_icons(&self) -> ShellResult<bool> {
        Ok(false)
    }

    fn show_desktop_icons(&self) -> ShellResult<()> {
        Ok(())
    }

    fn wallpaper(&self) -> ShellResult<Option<String>> {
        Ok(None)
    }

    fn set_wallpaper(&self, _path: &str) -> ShellResult<()> {
        Err(ShellError::Unsupported)
    }
}

/// The shell environment for the current platform.
pub fn default_shell() -> Arc<dyn ShellEnvironment> {
    #[cfg(windows)]
    {
        Arc::new(win32::Win32Shell)
    }
    #[cfg(not(windows))]
    {
        Arc::new(NullShell)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_shell_hides_nothing() {
        let shell = NullShell;
        assert!(!shell.hide_taskbars().unwrap());
        assert!(!shell.hide_desktop_icons().unwrap());
        assert!(shell.wallpaper().unwrap().is_none());
        assert!(shell.set_wallpaper("").is_err());
    }
}
