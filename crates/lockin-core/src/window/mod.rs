//! Top-level window model and queries.
//!
//! Everything that touches real windows goes through [`WindowSystem`], so the
//! registry and desktop controller can be driven by an in-memory window table
//! in tests.

pub mod discovery;
pub mod errors;
pub mod system;
pub mod types;

#[cfg(windows)]
pub mod win32;

pub use discovery::AppFamily;
pub use errors::WindowError;
pub use system::{NullWindowSystem, WindowSystem, default_window_system};
pub use types::{WindowHandle, WindowInfo, WindowQueryResult, WindowSet};
