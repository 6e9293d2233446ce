use std::io;

use color_eyre::Result;
use tokio::{select, time::MissedTickBehavior};
use tracing_subscriber::prelude::*;
use tush::config::Config;

use crate::{input::InputMessage, state::State};

#[macro_use]
extern crate tracing;

pub mod input;
pub mod prelude;
pub mod state;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    color_eyre::install()?;

    let config = Config::load()?;

    let (writer, _guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(
        &config.log.directory,
        &config.log.file,
    ));

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(writer))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_error::ErrorLayer::default())
        .init();

    trace!(?config, "loaded config");

    tush::initialize()?;

    let mut state = State::new(&config, termion::is_tty(&io::stdin()));

    trace!("spawning input thread");
    let (requests, mut rx) = input::spawn_input_thread();

    let mut reaper = tokio::time::interval(config.reaper.interval());
    reaper.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        state.render(&mut io::stdout().lock())?;

        if requests.send(()).is_err() {
            break;
        }

        let msg = loop {
            select! {
                msg = rx.recv() => break msg,
                _ = reaper.tick() => state.reap()?,
            }
        };

        match msg {
            Some(InputMessage::Line(line)) => state.execute(&line)?,
            Some(InputMessage::Error(err)) => eprintln!("tush: {err}"),
            Some(InputMessage::Eof) | None => break,
        }

        state.reap()?;
    }

    if state.interactive {
        println!();
    }

    state.reap()?;

    Ok(())
}
