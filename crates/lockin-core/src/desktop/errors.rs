use std::path::PathBuf;

use crate::errors::LockinError;

pub type DesktopResult<T> = Result<T, DesktopError>;

#[derive(Debug, thiserror::Error)]
pub enum DesktopError {
    #[error("Failed to load virtual desktop accessor from '{}': {message}", path.display())]
    LibraryLoad { path: PathBuf, message: String },

    #[error("Virtual desktop accessor is missing symbol '{symbol}'")]
    SymbolMissing { symbol: &'static str },

    #[error("Virtual desktop primitive '{operation}' failed with code {code}")]
    PrimitiveFailed { operation: &'static str, code: i32 },

    #[error("Virtual desktop accessor is unavailable")]
    Unavailable,
}

impl LockinError for DesktopError {
    fn error_code(&self) -> &'static str {
        match self {
            DesktopError::LibraryLoad { .. } => "DESKTOP_LIBRARY_LOAD_FAILED",
            DesktopError::SymbolMissing { .. } => "DESKTOP_SYMBOL_MISSING",
            DesktopError::PrimitiveFailed { .. } => "DESKTOP_PRIMITIVE_FAILED",
            DesktopError::Unavailable => "DESKTOP_UNAVAILABLE",
        }
    }

    fn is_user_error(&self) -> bool {
        matches!(self, DesktopError::LibraryLoad { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitive_failed_display() {
        let error = DesktopError::PrimitiveFailed {
            operation: "create_desktop",
            code: -1,
        };
        assert_eq!(
            error.to_string(),
            "Virtual desktop primitive 'create_desktop' failed with code -1"
        );
        assert_eq!(error.error_code(), "DESKTOP_PRIMITIVE_FAILED");
        assert!(!error.is_user_error());
    }
}
