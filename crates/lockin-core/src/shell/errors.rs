use crate::errors::LockinError;

#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    #[error("Shell surface '{surface}' not found")]
    SurfaceNotFound { surface: &'static str },

    #[error("Shell operation '{operation}' failed: {message}")]
    CommandFailed {
        operation: &'static str,
        message: String,
    },

    #[error("Shell customisation is not supported on this platform")]
    Unsupported,
}

impl LockinError for ShellError {
    fn error_code(&self) -> &'static str {
        match self {
            ShellError::SurfaceNotFound { .. } => "SHELL_SURFACE_NOT_FOUND",
            ShellError::CommandFailed { .. } => "SHELL_COMMAND_FAILED",
            ShellError::Unsupported => "SHELL_UNSUPPORTED",
        }
    }
}
