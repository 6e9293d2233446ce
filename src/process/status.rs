use std::fmt;

use nix::sys::{signal::Signal, wait::WaitStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildStatus {
    Exited(i32),
    Signaled(Signal),
    /// Stopped, continued or traced; never produced without `WUNTRACED`.
    Other,
}

impl From<WaitStatus> for ChildStatus {
    fn from(value: WaitStatus) -> Self {
        match value {
            WaitStatus::Exited(_, code) => Self::Exited(code),
            WaitStatus::Signaled(_, signal, _) => Self::Signaled(signal),
            _ => Self::Other,
        }
    }
}

impl ChildStatus {
    pub fn code(&self) -> Option<i32> {
        match self {
            Self::Exited(code) => Some(*code),
            _ => None,
        }
    }

    pub fn success(&self) -> bool {
        self.code() == Some(0)
    }
}

impl fmt::Display for ChildStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exited(code) => write!(f, "exit {code}"),
            Self::Signaled(signal) => write!(f, "killed by {signal}"),
            Self::Other => write!(f, "unknown"),
        }
    }
}
