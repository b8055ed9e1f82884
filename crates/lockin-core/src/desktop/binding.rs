//! Typed binding over the virtual desktop accessor primitives.

use std::sync::OnceLock;

use tracing::{info, warn};

use crate::config::DesktopConfig;
use crate::desktop::errors::{DesktopError, DesktopResult};
use crate::window::WindowHandle;

/// Raw virtual desktop primitives.
///
/// Desktop numbers are zero-based. A non-negative return is a valid result;
/// a negative return is the failure sentinel. Implementations never panic
/// and never cache: every call reaches the OS.
pub trait RawDesktopAccessor: Send + Sync {
    fn current_desktop_number(&self) -> i32;
    fn desktop_count(&self) -> i32;
    /// Returns the number of the new desktop.
    fn create_desktop(&self) -> i32;
    fn remove_desktop(&self, target: i32, fallback: i32) -> i32;
    fn go_to_desktop(&self, number: i32) -> i32;
    fn move_window_to_desktop(&self, hwnd: isize, number: i32) -> i32;
    fn window_desktop_number(&self, hwnd: isize) -> i32;
}

/// Accessor used when no platform implementation could be loaded.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableAccessor;

impl RawDesktopAccessor for UnavailableAccessor {
    fn current_desktop_number(&self) -> i32 {
        -1
    }

    fn desktop_count(&self) -> i32 {
        -1
    }

    fn create_desktop(&self) -> i32 {
        -1
    }

    fn remove_desktop(&self, _target: i32, _fallback: i32) -> i32 {
        -1
    }

    fn go_to_desktop(&self, _number: i32) -> i32 {
        -1
    }

    fn move_window_to_desktop(&self, _hwnd: isize, _number: i32) -> i32 {
        -1
    }

    fn window_desktop_number(&self, _hwnd: isize) -> i32 {
        -1
    }
}

fn checked(operation: &'static str, code: i32) -> DesktopResult<u32> {
    u32::try_from(code).map_err(|_| DesktopError::PrimitiveFailed { operation, code })
}

fn to_raw(number: u32) -> i32 {
    i32::try_from(number).unwrap_or(i32::MAX)
}

pub struct DesktopBinding {
    raw: Box<dyn RawDesktopAccessor>,
    self_test: OnceLock<bool>,
}

impl std::fmt::Debug for DesktopBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DesktopBinding")
            .field("self_test", &self.self_test.get())
            .finish()
    }
}

impl DesktopBinding {
    pub fn new(raw: Box<dyn RawDesktopAccessor>) -> Self {
        Self {
            raw,
            self_test: OnceLock::new(),
        }
    }

    pub fn unavailable() -> Self {
        Self::new(Box::new(UnavailableAccessor))
    }

    /// Load the platform accessor, falling back to [`UnavailableAccessor`].
    pub fn load(config: &DesktopConfig) -> Self {
        #[cfg(windows)]
        {
            match crate::desktop::vda::VdaLibrary::load(config.accessor_dll.as_deref()) {
                Ok(library) => Self::new(Box::new(library)),
                Err(e) => {
                    warn!(
                        event = "core.desktop.accessor_load_failed",
                        error = %e,
                        "Virtual desktop accessor unavailable, isolation will use kiosk mode"
                    );
                    Self::unavailable()
                }
            }
        }
        #[cfg(not(windows))]
        {
            tracing::debug!(
                event = "core.desktop.accessor_unsupported",
                configured_path = ?config.accessor_dll,
            );
            Self::unavailable()
        }
    }

    /// Whether the accessor answered its basic queries sanely.
    ///
    /// Runs once per binding; the verdict is cached.
    pub fn self_test_passed(&self) -> bool {
        *self.self_test.get_or_init(|| {
            let current = self.raw.current_desktop_number();
            let count = self.raw.desktop_count();
            let passed = current >= 0 && count > 0;
            if passed {
                info!(
                    event = "core.desktop.self_test_passed",
                    current_desktop = current,
                    desktop_count = count,
                );
            } else {
                warn!(
                    event = "core.desktop.self_test_failed",
                    current_desktop = current,
                    desktop_count = count,
                );
            }
            passed
        })
    }

    pub fn current_desktop(&self) -> DesktopResult<u32> {
        checked("current_desktop_number", self.raw.current_desktop_number())
    }

    pub fn desktop_count(&self) -> DesktopResult<u32> {
        checked("desktop_count", self.raw.desktop_count())
    }

    pub fn create_desktop(&self) -> DesktopResult<u32> {
        checked("create_desktop", self.raw.create_desktop())
    }

    pub fn remove_desktop(&self, target: u32, fallback: u32) -> DesktopResult<()> {
        checked(
            "remove_desktop",
            self.raw.remove_desktop(to_raw(target), to_raw(fallback)),
        )
        .map(|_| ())
    }

    pub fn go_to_desktop(&self, number: u32) -> DesktopResult<()> {
        checked("go_to_desktop", self.raw.go_to_desktop(to_raw(number))).map(|_| ())
    }

    pub fn move_window_to_desktop(&self, window: WindowHandle, number: u32) -> DesktopResult<()> {
        checked(
            "move_window_to_desktop",
            self.raw
                .move_window_to_desktop(window.as_raw(), to_raw(number)),
        )
        .map(|_| ())
    }

    pub fn window_desktop_number(&self, window: WindowHandle) -> DesktopResult<u32> {
        checked(
            "window_desktop_number",
            self.raw.window_desktop_number(window.as_raw()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingAccessor {
        queries: Arc<AtomicUsize>,
    }

    impl RawDesktopAccessor for CountingAccessor {
        fn current_desktop_number(&self) -> i32 {
            self.queries.fetch_add(1, Ordering::SeqCst);
            0
        }
        fn desktop_count(&self) -> i32 {
            1
        }
        fn create_desktop(&self) -> i32 {
            1
        }
        fn remove_desktop(&self, _target: i32, _fallback: i32) -> i32 {
            0
        }
        fn go_to_desktop(&self, _number: i32) -> i32 {
            0
        }
        fn move_window_to_desktop(&self, _hwnd: isize, _number: i32) -> i32 {
            -2
        }
        fn window_desktop_number(&self, _hwnd: isize) -> i32 {
            0
        }
    }

    #[test]
    fn test_unavailable_accessor_fails_self_test() {
        let binding = DesktopBinding::unavailable();
        assert!(!binding.self_test_passed());
        assert!(matches!(
            binding.current_desktop(),
            Err(DesktopError::PrimitiveFailed {
                operation: "current_desktop_number",
                code: -1
            })
        ));
    }

    #[test]
    fn test_self_test_verdict_is_cached() {
        let queries = Arc::new(AtomicUsize::new(0));
        let binding = DesktopBinding::new(Box::new(CountingAccessor {
            queries: queries.clone(),
        }));

        assert!(binding.self_test_passed());
        assert!(binding.self_test_passed());
        assert_eq!(queries.load(Ordering::SeqCst), 1);

        // Regular calls are never cached
        binding.current_desktop().unwrap();
        binding.current_desktop().unwrap();
        assert_eq!(queries.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_negative_sentinel_becomes_typed_error() {
        let binding = DesktopBinding::new(Box::new(CountingAccessor {
            queries: Arc::new(AtomicUsize::new(0)),
        }));
        let err = binding
            .move_window_to_desktop(WindowHandle::from_raw(7), 1)
            .unwrap_err();
        assert!(matches!(
            err,
            DesktopError::PrimitiveFailed {
                operation: "move_window_to_desktop",
                code: -2
            }
        ));
        assert_eq!(binding.create_desktop().unwrap(), 1);
    }

    #[cfg(not(windows))]
    #[test]
    fn test_load_is_unavailable_off_windows() {
        let binding = DesktopBinding::load(&DesktopConfig::default());
        assert!(!binding.self_test_passed());
    }
}
