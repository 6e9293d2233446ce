use std::{
    io::{self, Write},
    os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd},
    path::Path,
};

use nix::{
    fcntl::{fcntl, open, FcntlArg, OFlag},
    libc,
    sys::stat::Mode,
    unistd::dup2,
};
use strum::Display;

use super::{
    child::{spawn, ChildSetup, Program},
    status::ChildStatus,
    ProcessError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Direction {
    #[strum(serialize = "standard input")]
    Input,
    #[strum(serialize = "standard output")]
    Output,
}

impl Direction {
    /// The interpreter's own descriptor this direction replaces.
    pub fn slot(&self) -> RawFd {
        match self {
            Self::Input => libc::STDIN_FILENO,
            Self::Output => libc::STDOUT_FILENO,
        }
    }

    fn open(&self, path: &Path) -> Result<OwnedFd, ProcessError> {
        let (flags, mode) = match self {
            Self::Input => (OFlag::O_RDONLY, Mode::empty()),
            Self::Output => (
                OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_TRUNC,
                Mode::S_IRUSR | Mode::S_IWUSR | Mode::S_IRGRP | Mode::S_IROTH,
            ),
        };

        let fd = open(path, flags | OFlag::O_CLOEXEC, mode).map_err(|source| {
            ProcessError::Open {
                path: path.display().to_string(),
                source,
            }
        })?;

        // SAFETY: fd was just returned by open(2).
        Ok(unsafe { OwnedFd::from_raw_fd(fd) })
    }
}

/// A copy of one of the interpreter's standard descriptors. Dropping it maps
/// the copy back onto the slot.
#[derive(Debug)]
pub struct SavedDescriptor {
    slot: RawFd,
    saved: OwnedFd,
}

impl SavedDescriptor {
    /// Close-on-exec, so children never inherit the saved copy.
    pub fn save(slot: RawFd) -> Result<Self, ProcessError> {
        let fd = fcntl(slot, FcntlArg::F_DUPFD_CLOEXEC(0)).map_err(ProcessError::Dup)?;

        // SAFETY: fd was just returned by fcntl(F_DUPFD_CLOEXEC).
        let saved = unsafe { OwnedFd::from_raw_fd(fd) };

        debug!(slot, saved = fd, "saved descriptor");

        Ok(Self { slot, saved })
    }
}

impl Drop for SavedDescriptor {
    fn drop(&mut self) {
        if self.slot == libc::STDOUT_FILENO {
            let _ = io::stdout().flush();
        }

        match dup2(self.saved.as_raw_fd(), self.slot) {
            Ok(_) => debug!(slot = self.slot, "restored descriptor"),
            Err(err) => error!(slot = self.slot, %err, "failed to restore descriptor"),
        }
    }
}

/// Runs `program` with the interpreter's standard input or output mapped onto
/// `path`, then puts the interpreter's own mapping back.
///
/// The file is opened before anything else is touched: a missing input file
/// leaves the interpreter exactly as it was.
pub fn run_redirected(
    program: &Program,
    path: impl AsRef<Path>,
    direction: Direction,
) -> Result<Option<ChildStatus>, ProcessError> {
    let path = path.as_ref();
    let file = direction.open(path)?;
    let slot = direction.slot();

    let saved = SavedDescriptor::save(slot)?;

    if direction == Direction::Output {
        let _ = io::stdout().flush();
    }

    // a failed mapping leaves the slot as it was; both guards just close
    dup2(file.as_raw_fd(), slot)
        .map_err(|source| ProcessError::Redirect { direction, source })?;
    drop(file);

    trace!(%program, path = %path.display(), %direction, "redirected");

    let status = spawn(program, &ChildSetup::foreground())?.wait();

    drop(saved);

    status
}
