//! Catch Ctrl+Z (SIGTSTP) with sigaction(2)
//!
//! The handler only prints, so the terminal's default "stop the process"
//! action never happens. The previous action's fields are printed and the
//! program then spins until it is killed.

use anyhow::{Context, Result};
use nix::sys::signal::Signal;
use posix_signal_demos::{default_action, logging, SignalContext, SignalController};
use tracing::info;

fn signal_handler(ctx: &SignalContext) {
    ctx.write_line("Received signal: ", ctx.number() as i64);
    if ctx.signal() == Signal::SIGTSTP {
        ctx.write_stdout(b"Ctrl+Z pressed. Pausing...\n");
    }
}

fn main() {
    logging::exit_on_error(run());
}

fn run() -> Result<()> {
    logging::init();
    let controller = SignalController::new();

    let old = controller
        .install_handler(Signal::SIGTSTP, signal_handler)
        .context("sigaction(SIGTSTP)")?;
    info!(
        "SIGTSTP handled; the default action would have been {:?}",
        default_action(Signal::SIGTSTP)
    );

    println!("Running... Press Ctrl+Z to pause.");
    println!("old_sa.sa_handler: {:#x}", old.disposition.handler_address());
    println!("old_sa.sa_flags: {}", old.raw_flags);
    let old_mask: Vec<Signal> = old.mask.iter().collect();
    println!("old_sa.sa_mask: {:?}", old_mask);
    println!("old_sa.sa_restorer: {:#x}", old.restorer);

    loop {
        std::hint::spin_loop();
    }
}
