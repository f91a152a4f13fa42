//! Scatter/gather output with a single `writev(2)` call
//!
//! The writer never retries. A short write is reported through
//! [`WriteOutcome`] and left for the caller to handle.

use crate::errors::{DemoError, DemoResult};
use nix::sys::uio::writev;
use std::fs::{File, OpenOptions};
use std::io::{self, IoSlice};
use std::os::fd::AsFd;
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;
use tracing::{debug, warn};

/// Mode of files created by [`create_output`]
pub const OUTPUT_MODE: u32 = 0o644;

/// Result of one vectored write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOutcome {
    /// Sum of all segment lengths
    pub requested: usize,
    /// Bytes the kernel reported as written
    pub written: usize,
}

impl WriteOutcome {
    pub fn is_complete(&self) -> bool {
        self.written == self.requested
    }

    /// Partial completion, not a failure.
    pub fn is_short(&self) -> bool {
        self.written < self.requested
    }

    pub fn remaining(&self) -> usize {
        self.requested.saturating_sub(self.written)
    }
}

/// How far a write got through the segment list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transferred {
    /// Segments written in full
    pub complete_segments: usize,
    /// Leading bytes of the next segment, if it was cut
    pub partial_bytes: usize,
}

/// Ordered list of borrowed buffers written as one logical stream
#[derive(Debug, Default)]
pub struct IoVector<'a> {
    segments: Vec<IoSlice<'a>>,
}

impl<'a> IoVector<'a> {
    pub fn new() -> Self {
        Self { segments: Vec::new() }
    }

    pub fn from_slices(buffers: &[&'a [u8]]) -> Self {
        Self {
            segments: buffers.iter().map(|buf| IoSlice::new(buf)).collect(),
        }
    }

    /// Append a segment after the existing ones
    pub fn push(&mut self, buffer: &'a [u8]) -> &mut Self {
        self.segments.push(IoSlice::new(buffer));
        self
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn total_len(&self) -> usize {
        self.segments.iter().map(|s| s.len()).sum()
    }

    pub fn segment_lens(&self) -> impl Iterator<Item = usize> + '_ {
        self.segments.iter().map(|s| s.len())
    }

    /// Map a byte count back onto the segments, in order.
    pub fn transferred_segments(&self, written: usize) -> Transferred {
        let mut left = written;
        let mut complete_segments = 0;

        for len in self.segment_lens() {
            if left < len {
                return Transferred {
                    complete_segments,
                    partial_bytes: left,
                };
            }
            left -= len;
            complete_segments += 1;
        }

        Transferred {
            complete_segments,
            partial_bytes: 0,
        }
    }

    /// Issue exactly one `writev(2)` against `target`.
    pub fn write_to<W: AsFd>(&self, target: &W) -> DemoResult<WriteOutcome> {
        if self.is_empty() {
            return Err(DemoError::InvalidInput(
                "vectored write needs at least one buffer".into(),
            ));
        }

        let requested = self.total_len();
        debug!(segments = self.len(), requested, "writev");

        let written = writev(target.as_fd(), &self.segments)
            .map_err(|errno| DemoError::io("writev", io::Error::from(errno)))?;

        let outcome = WriteOutcome { requested, written };
        if outcome.is_short() {
            let transferred = self.transferred_segments(written);
            warn!(
                written,
                requested,
                complete_segments = transferred.complete_segments,
                partial_bytes = transferred.partial_bytes,
                "short vectored write"
            );
        }

        Ok(outcome)
    }
}

/// Write `buffers` to `target` as one vectored write.
///
/// # Examples
///
/// ```no_run
/// use posix_signal_demos::vectored::{create_output, write_vectored};
///
/// let file = create_output("output.txt")?;
/// let outcome = write_vectored(&file, &[b"short string\n".as_slice(), b"another\n".as_slice()])?;
/// println!("Bytes written: {}", outcome.written);
/// # Ok::<(), posix_signal_demos::DemoError>(())
/// ```
pub fn write_vectored<W: AsFd>(target: &W, buffers: &[&[u8]]) -> DemoResult<WriteOutcome> {
    IoVector::from_slices(buffers).write_to(target)
}

/// Open `path` write-only, creating or truncating it with mode 0644.
pub fn create_output<P: AsRef<Path>>(path: P) -> DemoResult<File> {
    let path = path.as_ref();
    debug!(path = %path.display(), "opening output");

    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(OUTPUT_MODE)
        .open(path)
        .map_err(|e| DemoError::io("open", e))
}
