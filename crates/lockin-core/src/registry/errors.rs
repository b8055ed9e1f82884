use crate::errors::LockinError;
use crate::process::ProcessError;
use crate::registry::types::ProcessState;
use crate::window::WindowError;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Executable '{path}' not found")]
    BinaryNotFound { path: String },

    #[error("Failed to spawn '{path}': {source}")]
    SpawnFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{path}' exited immediately with {}", describe_code(.code))]
    ExitedImmediately { path: String, code: Option<i32> },

    #[error("'{path}' exited successfully but no process took over from it")]
    ExitedWithoutHandoff { path: String },

    #[error("No managed process with pid {pid}")]
    NotFound { pid: u32 },

    #[error("Process {pid} cannot move from {from:?} to {to:?}")]
    InvalidTransition {
        pid: u32,
        from: ProcessState,
        to: ProcessState,
    },

    #[error("Process error: {source}")]
    ProcessError {
        #[from]
        source: ProcessError,
    },

    #[error("Window error: {source}")]
    WindowError {
        #[from]
        source: WindowError,
    },
}

fn describe_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "no exit code (terminated by signal)".to_string(),
    }
}

impl LockinError for RegistryError {
    fn error_code(&self) -> &'static str {
        match self {
            RegistryError::BinaryNotFound { .. } => "BINARY_NOT_FOUND",
            RegistryError::SpawnFailed { .. } => "SPAWN_FAILED",
            RegistryError::ExitedImmediately { .. } => "EXITED_IMMEDIATELY",
            RegistryError::ExitedWithoutHandoff { .. } => "EXITED_WITHOUT_HANDOFF",
            RegistryError::NotFound { .. } => "MANAGED_PROCESS_NOT_FOUND",
            RegistryError::InvalidTransition { .. } => "INVALID_STATE_TRANSITION",
            RegistryError::ProcessError { source } => source.error_code(),
            RegistryError::WindowError { source } => source.error_code(),
        }
    }

    fn is_user_error(&self) -> bool {
        matches!(
            self,
            RegistryError::BinaryNotFound { .. }
                | RegistryError::ExitedImmediately { .. }
                | RegistryError::ExitedWithoutHandoff { .. }
                | RegistryError::NotFound { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exited_immediately_display() {
        let error = RegistryError::ExitedImmediately {
            path: "false".to_string(),
            code: Some(1),
        };
        assert_eq!(error.to_string(), "'false' exited immediately with exit code 1");
        assert!(error.is_user_error());
    }

    #[test]
    fn test_wrapped_error_code_passes_through() {
        let error = RegistryError::from(ProcessError::NotFound { pid: 7 });
        assert_eq!(error.error_code(), "PROCESS_NOT_FOUND");
        assert!(!error.is_user_error());
    }
}
