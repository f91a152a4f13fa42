//! Deferred delivery: SIGUSR1 raised while blocked runs its handler on unblock

use anyhow::{Context, Result};
use nix::sys::signal::{SigSet, Signal};
use posix_signal_demos::{logging, SignalContext, SignalController};
use tracing::debug;

fn signal_handler(ctx: &SignalContext) {
    ctx.write_line("Received signal: ", ctx.number() as i64);
}

fn main() {
    logging::exit_on_error(run());
}

fn run() -> Result<()> {
    logging::init();
    let controller = SignalController::new();

    controller
        .install_handler(Signal::SIGUSR1, signal_handler)
        .context("sigaction")?;

    let mut mask = SigSet::empty();
    mask.add(Signal::SIGUSR1);
    controller.block(&mask).context("sigprocmask")?;

    println!("Signal handler registered. Sending signal...");
    controller.send_to_process(Signal::SIGUSR1).context("kill")?;

    println!("Signal sent. Unblocking signal...");
    controller.unblock(&mask).context("sigprocmask")?;

    println!("Signal unblocked. Restoring signal context...");
    debug!(deliveries = controller.deliveries(Signal::SIGUSR1), "handler calls");

    println!("Program completed.");
    Ok(())
}
