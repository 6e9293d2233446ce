use std::io::{self, stdin, BufRead};

use crate::prelude::*;

#[derive(Debug)]
pub enum InputMessage {
    Line(String),
    Eof,
    Error(String),
}

pub type InputReceiver = Receiver<InputMessage>;
pub type InputSender = Sender<()>;

/// Reads one line from stdin per request. Nothing is read while a command is
/// running, so foreground children get the terminal to themselves.
///
/// The thread stops after end-of-file or an unrecoverable read error; the
/// receiver then yields `None`.
pub fn spawn_input_thread() -> (InputSender, InputReceiver) {
    let (request_tx, mut request_rx) = unbounded_channel::<()>();
    let (sender, receiver) = unbounded_channel();

    tokio::task::spawn_blocking(move || {
        let stdin = stdin();

        while request_rx.blocking_recv().is_some() {
            let mut line = String::new();

            let (msg, last) = match stdin.lock().read_line(&mut line) {
                Ok(0) => (InputMessage::Eof, true),
                Ok(_) => (InputMessage::Line(line), false),
                // the bad line has been consumed, the next one may be fine
                Err(err) if err.kind() == io::ErrorKind::InvalidData => {
                    (InputMessage::Error(err.to_string()), false)
                }
                Err(err) => (InputMessage::Error(err.to_string()), true),
            };

            if sender.send(msg).is_err() || last {
                break;
            }
        }

        trace!("input thread finished");
    });

    (request_tx, receiver)
}
