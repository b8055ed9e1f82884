//! Launched applications and the windows they own.
//!
//! [`ProcessRegistry`] spawns processes, runs one discovery thread per
//! process and keeps the live table that focus, close and enumeration work
//! from.

pub mod discovery;
pub mod errors;
pub mod handler;
pub mod launch;
pub mod reconcile;
pub mod types;

pub use discovery::{DiscoveryObservation, DiscoveryStep, WindowDiscovery};
pub use errors::RegistryError;
pub use handler::ProcessRegistry;
pub use reconcile::ReconcilerHandle;
pub use types::{
    CloseAllReport, LaunchRequest, ManagedProcess, ProcessState, ProcessSummary, ReconcileReport,
};

use crate::window::WindowHandle;

/// Receives newly discovered windows while isolation is active.
pub trait WindowMigrator: Send + Sync {
    /// Whether windows should currently be offered for migration.
    fn is_isolating(&self) -> bool;

    /// Move a window onto the isolated surface; `false` on failure.
    fn migrate(&self, window: WindowHandle) -> bool;
}
