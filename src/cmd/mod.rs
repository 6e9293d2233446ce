use nix::unistd::Pid;
use thiserror::Error;

use self::execution_plan::{CommandLine, CommandSyntaxError};
use crate::process::{status::ChildStatus, ProcessError};

pub mod execute;
pub mod execution_plan;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Syntax(#[from] CommandSyntaxError),
    #[error(transparent)]
    Process(#[from] ProcessError),
}

impl DispatchError {
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Syntax(_) => false,
            Self::Process(err) => err.is_fatal(),
        }
    }
}

/// What happened to a dispatched command line. A `None` status means the wait
/// for that child was abandoned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Completed(Option<ChildStatus>),
    Pipeline(Vec<Option<ChildStatus>>),
    Background(Pid),
}

/// Classifies one tokenized command line and runs it.
///
/// Syntax errors are reported before any process is created.
pub fn dispatch(tokens: &[&str]) -> Result<Outcome, DispatchError> {
    let line = CommandLine::parse(tokens)?;

    trace!(?line, "execution plan");

    line.execute()
}
