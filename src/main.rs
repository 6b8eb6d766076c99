use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread;

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info, warn};

use crate::args::{Args, Config};
use crate::glyphs::GlyphPair;
use crate::gol::{engine::Engine, Board};
use crate::render::term::TermPresenter;
use crate::sched::{forward_signals, watch_keys, Outcome, Scheduler, StopReason};

mod args;
mod glyphs;
mod gol;
mod render;
mod sched;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let config = Config::try_from(Args::parse())?;
    let glyphs = GlyphPair::resolve(config.style, &mut rand::thread_rng());
    let board = Board::seeded(config.rows, config.cols, config.seed)?;
    let engine = Engine::new(config.threads).context("failed to create threadpool")?;
    let mut sched = Scheduler::new(board, engine, glyphs, config.padding, config.frame_duration)
        .with_limit(config.generations);

    let (tx, rx) = mpsc::channel();
    // SIGINT/SIGTERM from outside stop the loop like a key does. In raw
    // mode Ctrl-C itself arrives as a key.
    if let Err(e) = forward_signals(tx.clone()) {
        warn!("{e:#}");
    }
    let stop = AtomicBool::new(false);
    // Nothing may be logged while the alternate screen is up: stderr shares
    // the tty with the frame. Failures inside are carried out and reported
    // once the terminal is restored.
    let (outcome, keys, teardown) = thread::scope(|s| {
        let stop = &stop;
        // dropped last: lets the key thread exit so the scope can join it
        let _release_keys = scopeguard::guard((), |_| stop.store(true, Ordering::Relaxed));
        let keys = s.spawn(move || watch_keys(&tx, stop));

        let mut term = scopeguard::guard_on_unwind(TermPresenter::new(io::stdout()), |mut term| {
            let _ = term.end();
        });
        let outcome = term.begin().and_then(|()| sched.run(&mut *term, &rx));
        let teardown = term.end();
        stop.store(true, Ordering::Relaxed);
        (outcome, keys.join(), teardown)
    });

    if let Err(e) = teardown {
        error!("{e:#}");
    }
    match keys {
        Ok(Err(e)) => warn!("keyboard input unavailable: {e:#}"),
        Err(_) => warn!("keyboard thread panicked"),
        Ok(Ok(())) => {}
    }
    let outcome: Outcome = outcome?;

    match outcome.reason {
        StopReason::Interrupted => {
            println!("\n\nGame Over: process terminated by keyboard interruption.")
        }
        StopReason::Finished => info!("finished after {} frames", outcome.frames),
    }
    info!(
        "{} cells alive at generation {}",
        sched.board().alive(),
        sched.board().generation()
    );
    Ok(())
}
