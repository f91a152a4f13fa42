//! Restricted interface for code that runs inside signal delivery
//!
//! The kernel only ever calls [`trampoline`]. It counts the delivery and
//! forwards to the [`SignalFn`] registered for that signal number, handing it
//! a [`SignalContext`]. Everything reachable from the context is
//! async-signal-safe: atomics, raw `write(2)` and stack formatting. No locks,
//! no allocation, no `println!`.

use nix::sys::signal::Signal;
use std::os::raw::c_int;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

/// A handler that may run at any instruction boundary of the interrupted thread
pub type SignalFn = fn(&SignalContext);

/// One slot per signal number (1..=64), index 0 unused
pub(crate) const SLOTS: usize = 65;

#[allow(clippy::declare_interior_mutable_const)]
const NO_HANDLER: AtomicUsize = AtomicUsize::new(0);
#[allow(clippy::declare_interior_mutable_const)]
const NO_DELIVERIES: AtomicU32 = AtomicU32::new(0);

static HANDLERS: [AtomicUsize; SLOTS] = [NO_HANDLER; SLOTS];
static DELIVERIES: [AtomicU32; SLOTS] = [NO_DELIVERIES; SLOTS];

/// What a handler is allowed to see and do
#[derive(Debug)]
pub struct SignalContext {
    signal: Signal,
    delivery: u32,
}

impl SignalContext {
    pub fn signal(&self) -> Signal {
        self.signal
    }

    /// The raw signal number, as a C handler would receive it
    pub fn number(&self) -> i32 {
        self.signal as i32
    }

    /// 1-based count of deliveries of this signal, including this one
    pub fn delivery(&self) -> u32 {
        self.delivery
    }

    pub fn write_stdout(&self, bytes: &[u8]) {
        write_raw(libc::STDOUT_FILENO, bytes);
    }

    pub fn write_stderr(&self, bytes: &[u8]) {
        write_raw(libc::STDERR_FILENO, bytes);
    }

    /// Write `"{prefix}{value}\n"` to stdout without touching the heap.
    pub fn write_line(&self, prefix: &str, value: i64) {
        let mut buf = [0u8; 24];
        let digits = format_decimal(value, &mut buf);
        self.write_stdout(prefix.as_bytes());
        self.write_stdout(digits);
        self.write_stdout(b"\n");
    }
}

fn write_raw(fd: c_int, mut bytes: &[u8]) {
    while !bytes.is_empty() {
        // SAFETY: write(2) is async-signal-safe and `bytes` is a live slice.
        let n = unsafe { libc::write(fd, bytes.as_ptr().cast(), bytes.len()) };
        if n <= 0 {
            // Nothing sensible to report from here
            return;
        }
        bytes = &bytes[n as usize..];
    }
}

/// Render `value` in base 10 at the end of `buf` and return the used part.
pub(crate) fn format_decimal(value: i64, buf: &mut [u8; 24]) -> &[u8] {
    let negative = value < 0;
    let mut magnitude = value.unsigned_abs();
    let mut pos = buf.len();

    loop {
        pos -= 1;
        buf[pos] = b'0' + (magnitude % 10) as u8;
        magnitude /= 10;
        if magnitude == 0 {
            break;
        }
    }
    if negative {
        pos -= 1;
        buf[pos] = b'-';
    }
    &buf[pos..]
}

pub(crate) fn slot(signal: Signal) -> usize {
    let index = signal as usize;
    debug_assert!(index < SLOTS);
    index
}

/// Replace the registered handler, returning the previous one.
pub(crate) fn swap_handler(signal: Signal, handler: Option<SignalFn>) -> Option<SignalFn> {
    let raw = handler.map_or(0, |f| f as usize);
    decode(HANDLERS[slot(signal)].swap(raw, Ordering::SeqCst))
}

pub(crate) fn registered(signal: Signal) -> Option<SignalFn> {
    decode(HANDLERS[slot(signal)].load(Ordering::SeqCst))
}

fn decode(raw: usize) -> Option<SignalFn> {
    if raw == 0 {
        None
    } else {
        // SAFETY: non-zero slots only ever hold values produced from a SignalFn.
        Some(unsafe { std::mem::transmute::<usize, SignalFn>(raw) })
    }
}

/// Handler invocations observed for `signal` since process start
pub fn deliveries(signal: Signal) -> u32 {
    DELIVERIES[slot(signal)].load(Ordering::SeqCst)
}

pub(crate) fn trampoline_address() -> usize {
    trampoline as extern "C" fn(c_int) as usize
}

/// The only function the kernel calls for handled signals.
pub(crate) extern "C" fn trampoline(signo: c_int) {
    let index = signo as usize;
    if signo <= 0 || index >= SLOTS {
        return;
    }

    let saved_errno = errno::get();
    let delivery = DELIVERIES[index].fetch_add(1, Ordering::SeqCst).wrapping_add(1);

    if let (Some(handler), Ok(signal)) = (decode(HANDLERS[index].load(Ordering::SeqCst)), Signal::try_from(signo)) {
        handler(&SignalContext { signal, delivery });
    }

    errno::set(saved_errno);
}

mod errno {
    // SAFETY (both): __errno_location returns the calling thread's errno slot.
    pub(super) fn get() -> i32 {
        unsafe { *libc::__errno_location() }
    }

    pub(super) fn set(value: i32) {
        unsafe { *libc::__errno_location() = value }
    }
}
