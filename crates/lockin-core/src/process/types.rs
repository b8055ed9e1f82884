use serde::{Deserialize, Serialize};
use std::fmt;
use sysinfo::Pid as SysinfoPid;

/// Platform-safe process ID wrapper
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pid(u32);

impl Pid {
    pub fn new(pid: u32) -> Result<Self, crate::process::errors::ProcessError> {
        if pid == 0 {
            return Err(crate::process::errors::ProcessError::InvalidPid { pid });
        }
        Ok(Self(pid))
    }

    pub fn from_raw(pid: u32) -> Self {
        Self(pid)
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }

    pub fn to_sysinfo_pid(&self) -> SysinfoPid {
        SysinfoPid::from_u32(self.0)
    }
}

impl From<u32> for Pid {
    fn from(pid: u32) -> Self {
        Self(pid)
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessStatus {
    Running,
    Sleeping,
    Stopped,
    Zombie,
    Dead,
    Unknown(String),
}

impl ProcessStatus {
    /// Zombie and dead processes have exited even though the OS still lists them.
    pub fn is_alive(&self) -> bool {
        !matches!(self, ProcessStatus::Zombie | ProcessStatus::Dead)
    }
}

impl From<sysinfo::ProcessStatus> for ProcessStatus {
    fn from(status: sysinfo::ProcessStatus) -> Self {
        let status_str = status.to_string();
        match status_str.as_str() {
            "Run" | "Running" | "Runnable" => ProcessStatus::Running,
            "Sleep" | "Sleeping" | "Idle" => ProcessStatus::Sleeping,
            "Stop" | "Stopped" => ProcessStatus::Stopped,
            "Zombie" => ProcessStatus::Zombie,
            "Dead" => ProcessStatus::Dead,
            _ => ProcessStatus::Unknown(status_str),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProcessInfo {
    pub pid: Pid,
    pub parent: Option<Pid>,
    pub name: String,
    pub status: ProcessStatus,
    /// Seconds since the Unix epoch
    pub start_time: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pid_rejects_zero() {
        assert!(Pid::new(0).is_err());
        assert_eq!(Pid::new(42).unwrap().as_u32(), 42);
    }

    #[test]
    fn test_pid_display() {
        assert_eq!(Pid::from_raw(1234).to_string(), "1234");
    }

    #[test]
    fn test_status_liveness() {
        assert!(ProcessStatus::Running.is_alive());
        assert!(ProcessStatus::Sleeping.is_alive());
        assert!(!ProcessStatus::Zombie.is_alive());
        assert!(!ProcessStatus::Dead.is_alive());
    }
}
