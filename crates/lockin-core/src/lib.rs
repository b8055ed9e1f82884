//! lockin-core: Core library for isolated virtual desktop work sessions
//!
//! This library creates a dedicated virtual desktop for a work session,
//! launches and tracks applications on it, and tears everything down in
//! order when the session ends. It is used by the `lockin` CLI.
//!
//! # Main Entry Points
//!
//! - [`desktop`] - Create, inspect and tear down the isolated desktop
//! - [`registry`] - Launch applications and track their windows
//! - [`shutdown`] - Close everything and restore the user's desktop
//! - [`config`] - Configuration management

pub mod config;
pub mod desktop;
pub mod errors;
pub mod events;
pub mod logging;
pub mod process;
pub mod registry;
pub mod shell;
pub mod shutdown;
#[cfg(any(test, feature = "test-utils"))]
pub mod testing;
pub mod window;

// Re-export commonly used types at crate root for convenience
pub use config::{AppEntry, LockinConfig, Preset, TimingConfig};
pub use desktop::{
    DesktopBinding, IsolationMode, IsolationStatus, TeardownReport, VirtualDesktopController,
};
pub use errors::LockinError;
pub use process::Pid;
pub use registry::{
    CloseAllReport, LaunchRequest, ProcessRegistry, ProcessState, ProcessSummary,
    ReconcilerHandle, RegistryError, WindowMigrator,
};
pub use shutdown::{ShutdownOrchestrator, ShutdownReport};
pub use window::{WindowHandle, WindowInfo, WindowSystem};

// Re-export logging initialization
pub use logging::init_logging;
