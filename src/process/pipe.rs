use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};

use itertools::Itertools;

use super::{
    child::{spawn, ChildSetup, Program},
    status::ChildStatus,
    ProcessError,
};

/// Both ends of an anonymous pipe. Each end is closed when dropped.
#[derive(Debug)]
pub struct Pipe {
    pub read: OwnedFd,
    pub write: OwnedFd,
}

impl Pipe {
    pub fn new() -> Result<Self, ProcessError> {
        let (read, write) = nix::unistd::pipe().map_err(ProcessError::Pipe)?;

        // SAFETY: both descriptors were just returned by pipe(2) and are owned by nobody else.
        let (read, write) = unsafe { (OwnedFd::from_raw_fd(read), OwnedFd::from_raw_fd(write)) };

        Ok(Self { read, write })
    }

    pub fn raw_fds(&self) -> [RawFd; 2] {
        [self.read.as_raw_fd(), self.write.as_raw_fd()]
    }
}

/// Runs `stages` connected by `stages.len() - 1` pipes and waits for all of
/// them, in order, by pid.
///
/// Every pipe end is closed in every child that does not own it, and in the
/// interpreter before the first wait, so each reader sees end-of-stream as soon
/// as its writer exits.
pub fn run_pipeline(stages: &[Program]) -> Result<Vec<Option<ChildStatus>>, ProcessError> {
    if stages.is_empty() {
        return Err(ProcessError::EmptyArgv);
    }

    let pipes = (1..stages.len())
        .map(|_| Pipe::new())
        .collect::<Result<Vec<_>, _>>()?;

    let every_end = pipes.iter().flat_map(Pipe::raw_fds).collect_vec();

    debug!(stages = stages.len(), fds = ?every_end, "pipeline plumbing ready");

    let mut children = Vec::with_capacity(stages.len());

    for (index, program) in stages.iter().enumerate() {
        let mut setup = ChildSetup::foreground().close(every_end.iter().copied());

        if index > 0 {
            setup = setup.stdin(pipes[index - 1].read.as_raw_fd());
        }

        if let Some(pipe) = pipes.get(index) {
            setup = setup.stdout(pipe.write.as_raw_fd());
        }

        children.push(spawn(program, &setup)?);
    }

    drop(pipes);

    children.into_iter().map(|child| child.wait()).collect()
}
