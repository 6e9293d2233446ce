use super::{
    child::{spawn, ChildSetup, Program},
    status::ChildStatus,
    ProcessError,
};
use crate::signal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Launched {
    Foreground(Option<ChildStatus>),
    Background(nix::unistd::Pid),
}

/// Runs a single program with no pipe or redirection involved.
///
/// A foreground child gets the default interrupt action and is waited on. A
/// background child keeps the interpreter's ignored interrupt and is left for
/// [`reap_background`](super::reap::reap_background).
pub fn launch(program: &Program, background: bool) -> Result<Launched, ProcessError> {
    if background && !signal::is_initialized() {
        warn!(%program, "launching in background before signals were initialized");
    }

    let setup = if background {
        ChildSetup::background()
    } else {
        ChildSetup::foreground()
    };
    let child = spawn(program, &setup)?;

    if background {
        let pid = child.detach();
        info!(%pid, %program, "running in background");
        Ok(Launched::Background(pid))
    } else {
        let status = child.wait()?;
        if let Some(status) = status.filter(|status| !status.success()) {
            debug!(%program, %status, "foreground command failed");
        }
        Ok(Launched::Foreground(status))
    }
}
