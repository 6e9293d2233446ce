use std::{
    ffi::{CStr, CString},
    fmt,
    os::{fd::RawFd, raw::c_char},
    ptr,
};

use itertools::Itertools;
use nix::{
    errno::Errno,
    libc,
    sys::wait::waitpid,
    unistd::{close, dup2, fork, write, ForkResult, Pid},
};

use super::{status::ChildStatus, ProcessError};
use crate::signal::Interrupt;

/// An argument vector converted for `execvp` ahead of `fork`, so the child
/// never allocates between the two.
#[derive(Debug)]
pub struct Program {
    argv: Vec<CString>,
    /// Null-terminated pointers into `argv`; the strings' heap buffers never move.
    argv_ptrs: Vec<*const c_char>,
}

impl Program {
    pub fn new<S: AsRef<str>>(argv: &[S]) -> Result<Self, ProcessError> {
        if argv.is_empty() {
            return Err(ProcessError::EmptyArgv);
        }

        let argv = argv
            .iter()
            .map(|arg| CString::new(arg.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;

        let argv_ptrs = argv
            .iter()
            .map(|arg| arg.as_ptr())
            .chain([ptr::null()])
            .collect();

        Ok(Self { argv, argv_ptrs })
    }

    pub fn file(&self) -> &CStr {
        &self.argv[0]
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            self.argv.iter().map(|arg| arg.to_string_lossy()).join(" ")
        )
    }
}

/// Descriptor wiring and interrupt policy applied inside the child.
#[derive(Debug, Default, Clone)]
pub struct ChildSetup {
    interrupt: Interrupt,
    stdin: Option<RawFd>,
    stdout: Option<RawFd>,
    close: Vec<RawFd>,
}

impl ChildSetup {
    pub fn foreground() -> Self {
        Self::default()
    }

    pub fn background() -> Self {
        Self {
            interrupt: Interrupt::Inherit,
            ..Self::default()
        }
    }

    pub fn stdin(mut self, fd: RawFd) -> Self {
        self.stdin = Some(fd);
        self
    }

    pub fn stdout(mut self, fd: RawFd) -> Self {
        self.stdout = Some(fd);
        self
    }

    /// Descriptors the child must close once its standard slots are wired.
    pub fn close(mut self, fds: impl IntoIterator<Item = RawFd>) -> Self {
        self.close.extend(fds);
        self
    }
}

/// A running child. Consumed by exactly one of [`Child::wait`] or
/// [`Child::detach`].
#[derive(Debug)]
#[must_use = "a child must be waited on or detached to the reaper"]
pub struct Child {
    pid: Pid,
}

impl Child {
    pub fn pid(&self) -> Pid {
        self.pid
    }

    /// Blocks until this specific child terminates. An interrupted wait, or a
    /// child that is already gone, abandons the wait and yields `None`.
    pub fn wait(self) -> Result<Option<ChildStatus>, ProcessError> {
        match waitpid(self.pid, None) {
            Ok(status) => {
                let status = ChildStatus::from(status);
                trace!(pid = %self.pid, %status, "child finished");
                Ok(Some(status))
            }
            Err(err @ (Errno::EINTR | Errno::ECHILD)) => {
                warn!(pid = %self.pid, %err, "abandoned wait");
                Ok(None)
            }
            Err(err) => Err(ProcessError::Wait(err)),
        }
    }

    /// Hands the child to the reaper without waiting.
    pub fn detach(self) -> Pid {
        self.pid
    }
}

pub fn spawn(program: &Program, setup: &ChildSetup) -> Result<Child, ProcessError> {
    trace!(%program, ?setup, "forking");

    // SAFETY: the child only performs async-signal-safe calls before exec or _exit.
    match unsafe { fork() }.map_err(ProcessError::Fork)? {
        ForkResult::Child => exec_child(program, setup),
        ForkResult::Parent { child } => Ok(Child { pid: child }),
    }
}

fn exec_child(program: &Program, setup: &ChildSetup) -> ! {
    if let Err(err) = setup.interrupt.apply() {
        fail(b"sigaction", err);
    }

    for (fd, slot) in [
        (setup.stdin, libc::STDIN_FILENO),
        (setup.stdout, libc::STDOUT_FILENO),
    ] {
        if let Some(fd) = fd {
            if let Err(err) = dup2(fd, slot) {
                fail(b"dup2", err);
            }
        }
    }

    for &fd in &setup.close {
        if fd != libc::STDIN_FILENO && fd != libc::STDOUT_FILENO {
            let _ = close(fd);
        }
    }

    // SAFETY: both pointers come from `program`, which outlives the call, and
    // `argv_ptrs` ends with a null pointer.
    unsafe { libc::execvp(program.file().as_ptr(), program.argv_ptrs.as_ptr()) };

    fail(program.file().to_bytes(), Errno::last())
}

/// `perror` followed by `_exit`, without touching the allocator or stdio locks.
fn fail(context: &[u8], err: Errno) -> ! {
    let parts: [&[u8]; 5] = [b"tush: ", context, b": ", err.desc().as_bytes(), b"\n"];
    for part in parts {
        let _ = write(libc::STDERR_FILENO, part);
    }

    // SAFETY: _exit skips atexit handlers and buffered stdio inherited from the parent.
    unsafe { libc::_exit(libc::EXIT_FAILURE) }
}
