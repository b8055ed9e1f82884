//! Ordered teardown of a session: applications first, then residue, then
//! the isolated desktop and shell.

pub mod orchestrator;
pub mod types;

pub use orchestrator::ShutdownOrchestrator;
pub use types::ShutdownReport;
