//! Signal delivery through a channel read by a dispatcher loop
//!
//! The kernel-level handler (owned by `signal-hook`) only writes the signal
//! number into a self-pipe. Callbacks then run on the dispatcher's own thread
//! or task, where they may log, allocate and lock freely. They no longer run
//! at the interruption point, and a signal raised several times before the
//! loop reads it may still arrive once.

use crate::errors::{DemoError, DemoResult};
use futures::stream::StreamExt;
use nix::sys::signal::Signal;
use signal_hook::consts::FORBIDDEN;
use signal_hook::iterator::{Handle, Signals};
use std::os::raw::c_int;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// What the dispatcher does after a callback returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

fn signal_numbers(signals: &[Signal]) -> DemoResult<Vec<c_int>> {
    if signals.is_empty() {
        return Err(DemoError::InvalidInput("no signals to dispatch".into()));
    }

    signals
        .iter()
        .map(|&sig| {
            let number = sig as c_int;
            if FORBIDDEN.contains(&number) {
                Err(DemoError::InvalidInput(format!("{} cannot be dispatched", sig)))
            } else {
                Ok(number)
            }
        })
        .collect()
}

/// Blocking dispatcher loop over `signal_hook::iterator::Signals`
pub struct SignalDispatcher {
    signals: Signals,
}

impl SignalDispatcher {
    pub fn new(signals: &[Signal]) -> DemoResult<Self> {
        let numbers = signal_numbers(signals)?;
        let signals = Signals::new(&numbers).map_err(|e| DemoError::io("register signals", e))?;
        debug!(?numbers, "dispatcher registered");
        Ok(Self { signals })
    }

    /// Handle that ends [`run`](Self::run) from another thread
    pub fn handle(&self) -> Handle {
        self.signals.handle()
    }

    /// Feed each delivered signal to `callback` until it returns
    /// [`Flow::Stop`] or the handle is closed. Returns how many signals were
    /// dispatched.
    pub fn run<F>(&mut self, mut callback: F) -> usize
    where
        F: FnMut(Signal) -> Flow,
    {
        let mut dispatched = 0;

        for number in self.signals.forever() {
            let signal = match Signal::try_from(number) {
                Ok(signal) => signal,
                Err(_) => {
                    warn!(number, "ignoring unknown signal number");
                    continue;
                }
            };

            dispatched += 1;
            debug!(?signal, "dispatching");
            if callback(signal) == Flow::Stop {
                break;
            }
        }

        dispatched
    }
}

/// Async dispatcher over `signal_hook_tokio::Signals`
///
/// Must be created inside a Tokio runtime.
pub struct AsyncSignalDispatcher {
    signals: signal_hook_tokio::Signals,
    token: CancellationToken,
}

impl AsyncSignalDispatcher {
    pub fn new(signals: &[Signal]) -> DemoResult<Self> {
        let numbers = signal_numbers(signals)?;
        let signals =
            signal_hook_tokio::Signals::new(&numbers).map_err(|e| DemoError::io("register signals", e))?;
        Ok(Self {
            signals,
            token: CancellationToken::new(),
        })
    }

    /// Cancelling this token ends [`run`](Self::run)
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub async fn run<F>(mut self, mut callback: F) -> usize
    where
        F: FnMut(Signal) -> Flow,
    {
        let mut dispatched = 0;

        loop {
            tokio::select! {
                _ = self.token.cancelled() => {
                    info!("dispatcher cancelled");
                    break;
                }
                next = self.signals.next() => {
                    let Some(number) = next else { break };
                    let Ok(signal) = Signal::try_from(number) else {
                        warn!(number, "ignoring unknown signal number");
                        continue;
                    };

                    dispatched += 1;
                    if callback(signal) == Flow::Stop {
                        break;
                    }
                }
            }
        }

        self.signals.handle().close();
        dispatched
    }
}
