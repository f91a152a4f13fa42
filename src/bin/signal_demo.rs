//! Catch Ctrl+Z (SIGTSTP) with the older signal(2) call
//!
//! Sleeps in a loop forever; `DEMO_TICK_MS` changes the sleep period.

use anyhow::{Context, Result};
use nix::sys::signal::Signal;
use posix_signal_demos::{logging, DemoConfig, SignalContext, SignalController};
use std::thread;
use tracing::debug;

fn signal_handler(ctx: &SignalContext) {
    ctx.write_line("Received signal: ", ctx.number() as i64);
}

fn main() {
    logging::exit_on_error(run());
}

fn run() -> Result<()> {
    logging::init();
    let config = DemoConfig::from_env().context("invalid environment")?;
    let controller = SignalController::new();

    let previous = controller
        .install_legacy(Signal::SIGTSTP, signal_handler)
        .context("signal(SIGTSTP)")?;
    debug!(?previous, "replaced disposition");

    println!("Running... Press Ctrl+Z to pause.");

    loop {
        thread::sleep(config.tick);
    }
}
