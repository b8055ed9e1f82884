//! Isolated virtual desktop lifecycle.
//!
//! [`binding`] wraps the raw accessor primitives, [`controller`] owns the
//! single isolated desktop of a run and the shell surfaces hidden for it.

pub mod binding;
pub mod controller;
pub mod errors;
pub mod types;

#[cfg(windows)]
pub mod vda;

pub use binding::{DesktopBinding, RawDesktopAccessor, UnavailableAccessor};
pub use controller::VirtualDesktopController;
pub use errors::{DesktopError, DesktopResult};
pub use types::{
    ControllerState, IsolationMode, IsolationStatus, TeardownReport, VirtualDesktopSession,
};
