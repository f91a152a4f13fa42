//! Environment overrides for the demo binaries
//!
//! The programs take no arguments and read no config file. A couple of
//! environment variables can redirect output or slow the loops down.

use crate::errors::{DemoError, DemoResult};
use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

/// Output file of the writev demo
pub const OUTPUT_ENV: &str = "WRITEV_OUTPUT";
/// Sleep period of the signal demo loop, in milliseconds
pub const TICK_ENV: &str = "DEMO_TICK_MS";

const DEFAULT_OUTPUT: &str = "output.txt";
const DEFAULT_TICK: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemoConfig {
    pub output_path: PathBuf,
    pub tick: Duration,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            output_path: PathBuf::from(DEFAULT_OUTPUT),
            tick: DEFAULT_TICK,
        }
    }
}

impl DemoConfig {
    /// Read overrides from the process environment
    pub fn from_env() -> DemoResult<Self> {
        Self::from_lookup(|key| std::env::var_os(key))
    }

    /// Build a config from any key lookup (used by tests)
    pub fn from_lookup<F>(lookup: F) -> DemoResult<Self>
    where
        F: Fn(&str) -> Option<OsString>,
    {
        let mut config = Self::default();

        if let Some(path) = lookup(OUTPUT_ENV) {
            if path.to_string_lossy().trim().is_empty() {
                return Err(DemoError::Config(format!("{} must not be empty", OUTPUT_ENV)));
            }
            config.output_path = PathBuf::from(path);
        }

        if let Some(value) = lookup(TICK_ENV) {
            let raw = value
                .into_string()
                .map_err(|v| DemoError::Config(format!("{}={:?} is not valid UTF-8", TICK_ENV, v)))?;
            let millis: u64 = raw.trim().parse().map_err(|e| {
                DemoError::Config(format!("{}={:?} is not a number of milliseconds: {}", TICK_ENV, raw, e))
            })?;
            if millis == 0 {
                return Err(DemoError::Config(format!("{} must be positive", TICK_ENV)));
            }
            config.tick = Duration::from_millis(millis);
        }

        Ok(config)
    }
}
