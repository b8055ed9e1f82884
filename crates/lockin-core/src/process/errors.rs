use crate::errors::LockinError;

#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("Process '{pid}' not found")]
    NotFound { pid: u32 },

    #[error("Failed to terminate process '{pid}': {message}")]
    TerminateFailed { pid: u32, message: String },

    #[error("Failed to kill process '{pid}': {message}")]
    KillFailed { pid: u32, message: String },

    #[error("Invalid PID: {pid}")]
    InvalidPid { pid: u32 },

    #[error("PID '{pid}' has been reused (expected: {expected}, actual: {actual})")]
    PidReused {
        pid: u32,
        expected: String,
        actual: String,
    },
}

impl LockinError for ProcessError {
    fn error_code(&self) -> &'static str {
        match self {
            ProcessError::NotFound { .. } => "PROCESS_NOT_FOUND",
            ProcessError::TerminateFailed { .. } => "PROCESS_TERMINATE_FAILED",
            ProcessError::KillFailed { .. } => "PROCESS_KILL_FAILED",
            ProcessError::InvalidPid { .. } => "PROCESS_INVALID_PID",
            ProcessError::PidReused { .. } => "PROCESS_PID_REUSED",
        }
    }

    fn is_user_error(&self) -> bool {
        matches!(
            self,
            ProcessError::NotFound { .. } | ProcessError::InvalidPid { .. }
        )
    }
}
