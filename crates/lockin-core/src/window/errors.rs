use crate::errors::LockinError;
use crate::window::types::WindowHandle;

#[derive(Debug, thiserror::Error)]
pub enum WindowError {
    #[error("Window enumeration failed: {message}")]
    EnumerationFailed { message: String },

    #[error("Window {handle} no longer exists")]
    InvalidHandle { handle: WindowHandle },

    #[error("Window command '{operation}' failed for {handle}: {message}")]
    CommandFailed {
        operation: &'static str,
        handle: WindowHandle,
        message: String,
    },

    #[error("Window management is not supported on this platform")]
    Unsupported,
}

impl LockinError for WindowError {
    fn error_code(&self) -> &'static str {
        match self {
            WindowError::EnumerationFailed { .. } => "WINDOW_ENUMERATION_FAILED",
            WindowError::InvalidHandle { .. } => "WINDOW_INVALID_HANDLE",
            WindowError::CommandFailed { .. } => "WINDOW_COMMAND_FAILED",
            WindowError::Unsupported => "WINDOW_UNSUPPORTED",
        }
    }
}
