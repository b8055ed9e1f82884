pub mod errors;
pub mod operations;
pub mod types;

pub use errors::ProcessError;
pub use operations::{
    find_handoff_child, get_process_info, is_process_running, kill_process, process_family,
    terminate_process, wait_for_exit,
};
pub use types::{Pid, ProcessInfo, ProcessStatus};
