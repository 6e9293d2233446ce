use std::io::Write;

use color_eyre::{eyre::eyre, Result};
use itertools::Itertools;
use tush::{config::Config, parse::tokenize, Outcome};

pub struct State {
    pub prompt: String,
    pub interactive: bool,
    pub report_reaped: bool,
}

impl State {
    pub fn new(config: &Config, interactive: bool) -> Self {
        Self {
            prompt: config.prompt.clone(),
            interactive,
            report_reaped: config.reaper.report,
        }
    }

    pub fn render<W: Write>(&self, stdout: &mut W) -> Result<()> {
        if self.interactive {
            write!(stdout, "{}", self.prompt)?;
            stdout.flush()?;
        }

        Ok(())
    }

    /// Runs one input line. Only a fatal dispatch error is returned; anything
    /// else is reported and the interpreter carries on.
    pub fn execute(&mut self, line: &str) -> Result<()> {
        let tokens = match tokenize(line) {
            Ok(tokens) => tokens,
            Err(err) => {
                eprintln!("tush: {err}");
                return Ok(());
            }
        };

        if tokens.is_empty() {
            return Ok(());
        }

        trace!(line = %tokens.iter().join(" "), "dispatching");

        match tush::dispatch(&tokens) {
            Ok(Outcome::Background(pid)) => {
                if self.interactive {
                    println!("[{pid}]");
                }
            }
            Ok(outcome) => trace!(?outcome, "command finished"),
            Err(err) if err.is_fatal() => {
                error!(%err, "fatal dispatch error");
                return Err(eyre!(err));
            }
            Err(err) => {
                debug!(%err, "command failed");
                eprintln!("tush: {err}");
            }
        }

        Ok(())
    }

    pub fn reap(&mut self) -> Result<()> {
        for reaped in tush::reap_background()? {
            if self.report_reaped {
                println!("[{}] done {}", reaped.pid, reaped.status);
            }
        }

        Ok(())
    }
}
