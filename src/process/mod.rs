use std::ffi::NulError;

use nix::errno::Errno;
use thiserror::Error;

use self::redirect::Direction;

pub mod child;
pub mod launch;
pub mod pipe;
pub mod reap;
pub mod redirect;
pub mod status;

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("pipe failed: {0}")]
    Pipe(#[source] Errno),
    #[error("fork failed: {0}")]
    Fork(#[source] Errno),
    #[error("dup failed: {0}")]
    Dup(#[source] Errno),
    #[error("sigaction failed: {0}")]
    Signal(#[source] Errno),
    #[error("waitpid failed: {0}")]
    Wait(#[source] Errno),
    #[error("{path}: {source}")]
    Open {
        path: String,
        #[source]
        source: Errno,
    },
    #[error("failed to redirect {direction}: {source}")]
    Redirect {
        direction: Direction,
        #[source]
        source: Errno,
    },
    #[error("argument contains a nul byte")]
    Argument(#[from] NulError),
    #[error("empty argument vector")]
    EmptyArgv,
}

impl ProcessError {
    /// Whether the interpreter can no longer trust its own process state.
    ///
    /// Resource-creation failures are fatal; a missing file or a bad argument
    /// only costs the current command.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Pipe(_) | Self::Fork(_) | Self::Dup(_) | Self::Signal(_) | Self::Wait(_)
        )
    }
}
