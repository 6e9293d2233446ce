#[macro_use]
extern crate tracing;

pub mod cmd;
pub mod config;
pub mod parse;
pub mod process;
pub mod signal;

pub use cmd::{dispatch, DispatchError, Outcome};
pub use process::reap::{reap_background, Reaped};
pub use signal::initialize;
