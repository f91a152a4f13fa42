//! Error handling module
//!
//! Uses `thiserror` for library errors. Every variant names the operation
//! that failed so a binary can report a one-line diagnostic and exit.

use nix::errno::Errno;
use std::io;
use thiserror::Error;

/// Errors raised by the vectored writer and the signal controller
#[derive(Error, Debug)]
pub enum DemoError {
    /// open/write failure carrying the OS error
    #[error("{op} failed")]
    Io {
        op: &'static str,
        #[source]
        source: io::Error,
    },

    /// Handler registration or mask change rejected by the kernel
    #[error("{op} failed: {errno}")]
    SignalApi { op: &'static str, errno: Errno },

    /// Invalid input provided before any syscall was made
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Environment override could not be parsed
    #[error("Configuration error: {0}")]
    Config(String),
}

impl DemoError {
    pub fn io(op: &'static str, source: io::Error) -> Self {
        Self::Io { op, source }
    }

    pub fn signal_api(op: &'static str, errno: Errno) -> Self {
        Self::SignalApi { op, errno }
    }

    /// The underlying OS error code, when there is one.
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            Self::Io { source, .. } => source.raw_os_error(),
            Self::SignalApi { errno, .. } => Some(*errno as i32),
            Self::InvalidInput(_) | Self::Config(_) => None,
        }
    }

    /// Name of the failing operation
    pub fn operation(&self) -> Option<&'static str> {
        match self {
            Self::Io { op, .. } | Self::SignalApi { op, .. } => Some(op),
            Self::InvalidInput(_) | Self::Config(_) => None,
        }
    }
}

/// Result type alias for this crate
pub type DemoResult<T> = Result<T, DemoError>;

/// Attach an operation name to a raw nix result.
pub(crate) trait SignalApiContext<T> {
    fn signal_op(self, op: &'static str) -> DemoResult<T>;
}

impl<T> SignalApiContext<T> for nix::Result<T> {
    fn signal_op(self, op: &'static str) -> DemoResult<T> {
        self.map_err(|errno| DemoError::signal_api(op, errno))
    }
}
