//! POSIX facility demonstrations for Rust
//!
//! This library backs a handful of small programs that each exercise one
//! POSIX facility: scatter/gather writes with `writev(2)`, and signal
//! registration, masking and delivery (`sigaction`, `signal`,
//! `sigprocmask`, raised `SIGUSR1`/`SIGTSTP`/`SIGINT`).

pub mod config;
pub mod controller;
pub mod dispatch;
pub mod errors;
pub mod handler;
pub mod logging;
pub mod vectored;

// Re-export commonly used types
pub use config::DemoConfig;
pub use controller::{
    default_action, BlockedWindow, DefaultAction, Disposition, HandlerOptions, HandlerRef,
    SignalAction, SignalController,
};
pub use dispatch::{AsyncSignalDispatcher, Flow, SignalDispatcher};
pub use errors::{DemoError, DemoResult};
pub use handler::{SignalContext, SignalFn};
pub use vectored::{create_output, write_vectored, IoVector, WriteOutcome};

/// Serializes tests that touch process-wide signal state.
#[cfg(test)]
pub(crate) fn signal_test_lock() -> std::sync::MutexGuard<'static, ()> {
    static LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
    LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
