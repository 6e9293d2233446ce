//! Interrupt disposition shared by the interpreter and the children it creates.
//!
//! The interpreter ignores `SIGINT` for its whole lifetime. Foreground children
//! put the default action back before they exec; background children keep the
//! inherited ignore, so the interrupt key only ever reaches the foreground.

use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};
use once_cell::sync::OnceCell;

use crate::process::ProcessError;

static IGNORING: OnceCell<()> = OnceCell::new();

/// Makes the interpreter immune to the interrupt key for the rest of its
/// lifetime. Safe to call again; only the first call touches the disposition.
pub fn initialize() -> Result<(), ProcessError> {
    IGNORING
        .get_or_try_init(|| {
            let ignore = SigAction::new(SigHandler::SigIgn, SaFlags::SA_RESTART, SigSet::all());

            // SAFETY: SigIgn installs no handler code.
            unsafe { sigaction(Signal::SIGINT, &ignore) }.map_err(ProcessError::Signal)?;

            debug!("interpreter now ignores SIGINT");
            Ok(())
        })
        .copied()
}

pub fn is_initialized() -> bool {
    IGNORING.get().is_some()
}

/// What a freshly forked child does with `SIGINT` before it execs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Interrupt {
    /// Restore the default action so the interrupt key terminates the child.
    #[default]
    Default,
    /// Keep whatever the interpreter has, i.e. ignored once initialized.
    Inherit,
}

impl Interrupt {
    /// Runs in the child between `fork` and `exec`.
    pub(crate) fn apply(self) -> nix::Result<()> {
        match self {
            Self::Default => {
                let default = SigAction::new(SigHandler::SigDfl, SaFlags::empty(), SigSet::empty());
                // SAFETY: SigDfl installs no handler code.
                unsafe { sigaction(Signal::SIGINT, &default) }.map(|_| ())
            }
            Self::Inherit => Ok(()),
        }
    }
}
