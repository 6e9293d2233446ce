use nix::{
    errno::Errno,
    sys::wait::{waitpid, WaitPidFlag, WaitStatus},
    unistd::Pid,
};

use super::{status::ChildStatus, ProcessError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reaped {
    pub pid: Pid,
    pub status: ChildStatus,
}

/// Collects every child that has already terminated, without blocking.
///
/// Foreground children are always waited on by pid before control returns
/// to the interpreter, so anything found here was launched in the background.
pub fn reap_background() -> Result<Vec<Reaped>, ProcessError> {
    let mut reaped = Vec::new();

    loop {
        match waitpid(Pid::from_raw(-1), Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::StillAlive) => break,
            Ok(status) => {
                let Some(pid) = status.pid() else { break };
                let status = ChildStatus::from(status);
                info!(%pid, %status, "reaped background child");
                reaped.push(Reaped { pid, status });
            }
            Err(Errno::ECHILD | Errno::EINTR) => break,
            Err(err) => return Err(ProcessError::Wait(err)),
        }
    }

    Ok(reaped)
}
