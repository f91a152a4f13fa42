//! Scatter/gather write of three strings with a single writev(2)
//!
//! Creates (or truncates) `output.txt` with mode 0644 and reports how many
//! bytes the kernel accepted. `WRITEV_OUTPUT` overrides the path.

use anyhow::{Context, Result};
use posix_signal_demos::{logging, vectored, DemoConfig, IoVector};
use tracing::{info, warn};

const BUF0: &str = "short string\n";
const BUF1: &str = "This is a longer string\n";
const BUF2: &str = "This is the longest string in this example\n";

fn main() {
    logging::exit_on_error(run());
}

fn run() -> Result<()> {
    logging::init();
    let config = DemoConfig::from_env().context("invalid environment")?;

    let mut iov = IoVector::new();
    iov.push(BUF0.as_bytes())
        .push(BUF1.as_bytes())
        .push(BUF2.as_bytes());

    let file = vectored::create_output(&config.output_path)
        .with_context(|| format!("open {}", config.output_path.display()))?;
    info!(path = %config.output_path.display(), segments = iov.len(), "writing");

    let outcome = iov.write_to(&file).context("writev")?;
    println!("Bytes written: {}", outcome.written);

    if outcome.is_short() {
        let transferred = iov.transferred_segments(outcome.written);
        warn!(
            "short write: {} of {} bytes ({} whole segments)",
            outcome.written, outcome.requested, transferred.complete_segments
        );
    }

    Ok(())
}
