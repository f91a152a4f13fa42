//! Block SIGINT while waiting for a line on stdin
//!
//! Ctrl+C pressed while blocked stays pending. No handler is installed, so
//! unblocking a pending SIGINT terminates the process with the default
//! action before "unblocked" is printed.

use anyhow::{Context, Result};
use nix::sys::signal::{SigSet, Signal};
use posix_signal_demos::{logging, SignalController};
use std::io::{self, BufRead};
use tracing::{debug, info};

fn main() {
    logging::exit_on_error(run());
}

fn run() -> Result<()> {
    logging::init();
    let controller = SignalController::new();

    println!("sigset_t size: {}", std::mem::size_of::<libc::sigset_t>());

    let mut set = SigSet::empty();
    set.add(Signal::SIGINT);
    let old = controller.block(&set).context("sigprocmask(SIG_BLOCK)")?;
    debug!(previously_blocked = old.contains(Signal::SIGINT), "SIGINT blocked");

    println!("SIGINT signal blocked. Press Ctrl+C to send the signal.");

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line).context("read stdin")?;

    if controller.pending().context("sigpending")?.contains(Signal::SIGINT) {
        info!("SIGINT is pending and will be delivered on unblock");
    }

    controller.unblock(&set).context("sigprocmask(SIG_UNBLOCK)")?;
    println!("SIGINT signal unblocked.");

    Ok(())
}
