//! Signals handled by an async dispatcher loop instead of an interrupt
//!
//! SIGTSTP and SIGHUP are reported and the program keeps running; SIGINT or
//! SIGTERM end it.

use anyhow::{Context, Result};
use nix::sys::signal::Signal;
use posix_signal_demos::{logging, AsyncSignalDispatcher, DemoConfig, Flow};
use tokio::time::sleep;
use tracing::{info, warn};

#[tokio::main]
async fn main() {
    logging::exit_on_error(run().await);
}

async fn run() -> Result<()> {
    logging::init();
    let config = DemoConfig::from_env().context("invalid environment")?;

    let dispatcher = AsyncSignalDispatcher::new(&[
        Signal::SIGTSTP,
        Signal::SIGHUP,
        Signal::SIGINT,
        Signal::SIGTERM,
    ])
    .context("register signals")?;
    let token = dispatcher.cancellation_token();

    info!("PID: {}", std::process::id());
    println!("Running... Press Ctrl+Z to pause, Ctrl+C to quit.");

    let ticker = tokio::spawn({
        let token = token.clone();
        async move {
            let mut count = 0u64;
            while !token.is_cancelled() {
                info!("still running, tick {}", count);
                count += 1;
                sleep(config.tick).await;
            }
        }
    });

    let dispatched = dispatcher
        .run(|signal| {
            println!("Received signal: {}", signal as i32);
            match signal {
                Signal::SIGINT | Signal::SIGTERM => {
                    warn!("{} received, shutting down", signal);
                    Flow::Stop
                }
                _ => Flow::Continue,
            }
        })
        .await;

    token.cancel();
    ticker.await.context("ticker task")?;
    info!("{} signals dispatched", dispatched);

    Ok(())
}
