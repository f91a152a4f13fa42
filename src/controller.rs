//! Signal disposition and mask control
//!
//! [`SignalController`] is the single owner of the process-wide signal
//! dispositions and of the calling thread's blocked set. It is neither
//! `Send` nor `Sync`, so mask changes always apply to the thread that holds
//! the controller.

use crate::errors::{DemoError, DemoResult, SignalApiContext};
use crate::handler::{self, SignalFn};
use nix::errno::Errno;
use nix::sys::signal::{self, pthread_sigmask, SaFlags, SigHandler, SigSet, SigmaskHow, Signal};
use nix::unistd::getpid;
use std::fmt;
use std::marker::PhantomData;
use std::os::raw::c_int;
use std::ptr;
use tracing::{debug, warn};

/// Reference to the function behind a `Handled` disposition
#[derive(Clone, Copy)]
pub enum HandlerRef {
    /// Installed through this crate
    Registered(SignalFn),
    /// Any other handler address
    Foreign(usize),
}

impl HandlerRef {
    pub fn address(&self) -> usize {
        match self {
            Self::Registered(f) => *f as usize,
            Self::Foreign(addr) => *addr,
        }
    }
}

impl PartialEq for HandlerRef {
    fn eq(&self, other: &Self) -> bool {
        matches!(
            (self, other),
            (Self::Registered(_), Self::Registered(_)) | (Self::Foreign(_), Self::Foreign(_))
        ) && self.address() == other.address()
    }
}

impl Eq for HandlerRef {}

impl fmt::Debug for HandlerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Registered(_) => write!(f, "Registered({:#x})", self.address()),
            Self::Foreign(addr) => write!(f, "Foreign({:#x})", addr),
        }
    }
}

/// Action taken when a signal is delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Default,
    Ignore,
    Handled(HandlerRef),
}

impl Disposition {
    pub fn is_handled(&self) -> bool {
        matches!(self, Self::Handled(_))
    }

    /// Address as stored in `sa_handler` (`SIG_DFL` = 0, `SIG_IGN` = 1)
    pub fn handler_address(&self) -> usize {
        match self {
            Self::Default => libc::SIG_DFL,
            Self::Ignore => libc::SIG_IGN,
            Self::Handled(h) => h.address(),
        }
    }
}

/// Flags and extra mask for a handler installation
///
/// The default matches `sa_flags = 0` with an empty `sa_mask`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandlerOptions {
    /// `SA_RESTART`: restart interrupted syscalls
    pub restart: bool,
    /// `SA_NODEFER`: do not block the signal inside its own handler
    pub no_defer: bool,
    /// `SA_RESETHAND`: go back to the default action after one delivery
    pub reset_on_delivery: bool,
    /// Signals blocked in addition while the handler runs
    pub mask: SigSet,
}

impl Default for HandlerOptions {
    fn default() -> Self {
        Self {
            restart: false,
            no_defer: false,
            reset_on_delivery: false,
            mask: SigSet::empty(),
        }
    }
}

impl HandlerOptions {
    pub fn flags(&self) -> SaFlags {
        let mut flags = SaFlags::empty();
        flags.set(SaFlags::SA_RESTART, self.restart);
        flags.set(SaFlags::SA_NODEFER, self.no_defer);
        flags.set(SaFlags::SA_RESETHAND, self.reset_on_delivery);
        flags
    }
}

/// A full `sigaction` record as the kernel reported it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalAction {
    pub disposition: Disposition,
    /// `sa_flags`, including bits libc adds such as `SA_RESTORER`
    pub raw_flags: c_int,
    pub mask: SigSet,
    /// `sa_restorer`, 0 when unset
    pub restorer: usize,
}

impl SignalAction {
    /// The flags nix knows about
    pub fn flags(&self) -> SaFlags {
        SaFlags::from_bits_truncate(self.raw_flags)
    }
}

/// Kernel default action for a standard signal, as listed in signal(7)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultAction {
    Terminate,
    CoreDump,
    Ignore,
    Stop,
    Continue,
}

pub fn default_action(signal: Signal) -> DefaultAction {
    use Signal::*;

    match signal {
        SIGQUIT | SIGILL | SIGTRAP | SIGABRT | SIGBUS | SIGFPE | SIGSEGV | SIGXCPU | SIGXFSZ
        | SIGSYS => DefaultAction::CoreDump,
        SIGCHLD | SIGURG | SIGWINCH => DefaultAction::Ignore,
        SIGSTOP | SIGTSTP | SIGTTIN | SIGTTOU => DefaultAction::Stop,
        SIGCONT => DefaultAction::Continue,
        _ => DefaultAction::Terminate,
    }
}

/// Owner of signal dispositions and of this thread's signal mask
///
/// # Examples
///
/// ```no_run
/// use nix::sys::signal::{SigSet, Signal};
/// use posix_signal_demos::{SignalContext, SignalController};
///
/// fn on_usr1(ctx: &SignalContext) {
///     ctx.write_line("Received signal: ", ctx.number() as i64);
/// }
///
/// let controller = SignalController::new();
/// controller.install_handler(Signal::SIGUSR1, on_usr1)?;
///
/// let mut mask = SigSet::empty();
/// mask.add(Signal::SIGUSR1);
/// controller.block(&mask)?;
/// controller.raise(Signal::SIGUSR1)?;
/// controller.unblock(&mask)?; // handler runs here
/// # Ok::<(), posix_signal_demos::DemoError>(())
/// ```
pub struct SignalController {
    _thread_bound: PhantomData<*const ()>,
}

impl Default for SignalController {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalController {
    pub fn new() -> Self {
        Self {
            _thread_bound: PhantomData,
        }
    }

    /// Validate a raw signal number
    pub fn signal_from_raw(number: i32) -> DemoResult<Signal> {
        Signal::try_from(number).signal_op("signal number")
    }

    /// Install `handler` with `sa_flags = 0` and an empty mask.
    ///
    /// Returns the action that was replaced.
    pub fn install_handler(&self, signal: Signal, handler: SignalFn) -> DemoResult<SignalAction> {
        self.install_handler_with(signal, handler, HandlerOptions::default())
    }

    pub fn install_handler_with(
        &self,
        signal: Signal,
        handler: SignalFn,
        options: HandlerOptions,
    ) -> DemoResult<SignalAction> {
        let previous = handler::swap_handler(signal, Some(handler));
        let raw = raw_action(handler::trampoline_address(), options.flags().bits(), &options.mask);

        match swap_action(signal, Some(&raw)) {
            Ok(old) => {
                debug!(?signal, flags = ?options.flags(), "handler installed");
                Ok(action_from_raw(&old, previous))
            }
            Err(e) => {
                handler::swap_handler(signal, previous);
                Err(e)
            }
        }
    }

    /// Install through `signal(2)` instead of `sigaction(2)`.
    pub fn install_legacy(&self, signal: Signal, handler: SignalFn) -> DemoResult<Disposition> {
        let previous = handler::swap_handler(signal, Some(handler));
        // SAFETY: the trampoline only touches atomics and the registered SignalFn.
        let result = unsafe { signal::signal(signal, SigHandler::Handler(handler::trampoline)) };

        match result {
            Ok(old) => {
                debug!(?signal, "handler installed with signal(2)");
                Ok(disposition_from_handler(old, previous))
            }
            Err(errno) => {
                handler::swap_handler(signal, previous);
                Err(DemoError::signal_api("signal", errno))
            }
        }
    }

    pub fn ignore(&self, signal: Signal) -> DemoResult<SignalAction> {
        self.install_plain(signal, libc::SIG_IGN)
    }

    pub fn reset_default(&self, signal: Signal) -> DemoResult<SignalAction> {
        self.install_plain(signal, libc::SIG_DFL)
    }

    fn install_plain(&self, signal: Signal, address: usize) -> DemoResult<SignalAction> {
        let previous = handler::swap_handler(signal, None);
        let raw = raw_action(address, 0, &SigSet::empty());

        match swap_action(signal, Some(&raw)) {
            Ok(old) => Ok(action_from_raw(&old, previous)),
            Err(e) => {
                handler::swap_handler(signal, previous);
                Err(e)
            }
        }
    }

    /// Current action for `signal`, unchanged
    pub fn query(&self, signal: Signal) -> DemoResult<SignalAction> {
        let old = swap_action(signal, None)?;
        Ok(action_from_raw(&old, handler::registered(signal)))
    }

    /// Reinstall an action returned earlier by an install call.
    ///
    /// Returns the action it replaced. Flags libc adds on its own may differ
    /// afterwards.
    pub fn restore(&self, signal: Signal, action: &SignalAction) -> DemoResult<SignalAction> {
        let (address, registered) = match action.disposition {
            Disposition::Handled(HandlerRef::Registered(f)) => (handler::trampoline_address(), Some(f)),
            other => (other.handler_address(), None),
        };

        let previous = handler::swap_handler(signal, registered);
        let raw = raw_action(address, action.raw_flags, &action.mask);

        match swap_action(signal, Some(&raw)) {
            Ok(old) => {
                debug!(?signal, disposition = ?action.disposition, "action restored");
                Ok(action_from_raw(&old, previous))
            }
            Err(e) => {
                handler::swap_handler(signal, previous);
                Err(e)
            }
        }
    }

    /// Add `set` to the blocked set; returns the previous mask.
    pub fn block(&self, set: &SigSet) -> DemoResult<SigSet> {
        change_mask(SigmaskHow::SIG_BLOCK, set, "block signals")
    }

    /// Remove `set` from the blocked set; returns the previous mask.
    ///
    /// Pending signals in `set` are delivered before this returns.
    pub fn unblock(&self, set: &SigSet) -> DemoResult<SigSet> {
        change_mask(SigmaskHow::SIG_UNBLOCK, set, "unblock signals")
    }

    pub fn set_mask(&self, set: &SigSet) -> DemoResult<SigSet> {
        change_mask(SigmaskHow::SIG_SETMASK, set, "set signal mask")
    }

    pub fn current_mask(&self) -> DemoResult<SigSet> {
        let mut current = SigSet::empty();
        pthread_sigmask(SigmaskHow::SIG_BLOCK, None, Some(&mut current)).signal_op("read signal mask")?;
        Ok(current)
    }

    /// Signals raised while blocked and not yet delivered
    pub fn pending(&self) -> DemoResult<SigSet> {
        // SAFETY: sigpending fills a zeroed sigset_t we own.
        let mut raw: libc::sigset_t = unsafe { std::mem::zeroed() };
        Errno::result(unsafe { libc::sigpending(&mut raw) }).signal_op("sigpending")?;
        Ok(sigset_from_raw(&raw))
    }

    /// Block `set` until the returned window is dropped or released.
    pub fn block_scoped(&self, set: &SigSet) -> DemoResult<BlockedWindow> {
        let previous = self.block(set)?;
        Ok(BlockedWindow {
            previous,
            released: false,
            _thread_bound: PhantomData,
        })
    }

    /// Send `signal` to the calling thread.
    pub fn raise(&self, signal: Signal) -> DemoResult<()> {
        signal::raise(signal).signal_op("raise")
    }

    /// Send `signal` to the whole process, like `kill(getpid(), sig)`.
    pub fn send_to_process(&self, signal: Signal) -> DemoResult<()> {
        signal::kill(getpid(), signal).signal_op("kill")
    }

    pub fn deliveries(&self, signal: Signal) -> u32 {
        handler::deliveries(signal)
    }
}

/// A blocked section; the previous mask comes back on drop
///
/// Anything raised inside the window is delivered when it closes.
pub struct BlockedWindow {
    previous: SigSet,
    released: bool,
    _thread_bound: PhantomData<*const ()>,
}

impl BlockedWindow {
    pub fn previous(&self) -> &SigSet {
        &self.previous
    }

    /// Close the window now and report failure instead of logging it.
    pub fn release(mut self) -> DemoResult<()> {
        self.released = true;
        change_mask(SigmaskHow::SIG_SETMASK, &self.previous, "restore signal mask").map(|_| ())
    }
}

impl Drop for BlockedWindow {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = change_mask(SigmaskHow::SIG_SETMASK, &self.previous, "restore signal mask") {
            warn!("failed to close blocked window: {}", e);
        }
    }
}

fn change_mask(how: SigmaskHow, set: &SigSet, op: &'static str) -> DemoResult<SigSet> {
    let mut previous = SigSet::empty();
    pthread_sigmask(how, Some(set), Some(&mut previous)).signal_op(op)?;
    debug!(op, "signal mask changed");
    Ok(previous)
}

fn swap_action(signal: Signal, new: Option<&libc::sigaction>) -> DemoResult<libc::sigaction> {
    // SAFETY: both pointers are valid or null; the kernel copies the structs.
    let mut old: libc::sigaction = unsafe { std::mem::zeroed() };
    let new_ptr = new.map_or(ptr::null(), |a| a as *const libc::sigaction);
    Errno::result(unsafe { libc::sigaction(signal as c_int, new_ptr, &mut old) }).signal_op("sigaction")?;
    Ok(old)
}

fn raw_action(address: usize, flags: c_int, mask: &SigSet) -> libc::sigaction {
    // SAFETY: all-zero is a valid sigaction.
    let mut raw: libc::sigaction = unsafe { std::mem::zeroed() };
    raw.sa_sigaction = address;
    raw.sa_flags = flags;
    raw.sa_mask = sigset_to_raw(mask);
    raw
}

fn action_from_raw(raw: &libc::sigaction, registered: Option<SignalFn>) -> SignalAction {
    SignalAction {
        disposition: disposition_from_address(raw.sa_sigaction, registered),
        raw_flags: raw.sa_flags,
        mask: sigset_from_raw(&raw.sa_mask),
        restorer: restorer_address(raw),
    }
}

fn disposition_from_address(address: usize, registered: Option<SignalFn>) -> Disposition {
    match address {
        libc::SIG_DFL => Disposition::Default,
        libc::SIG_IGN => Disposition::Ignore,
        addr if addr == handler::trampoline_address() => {
            Disposition::Handled(registered.map_or(HandlerRef::Foreign(addr), HandlerRef::Registered))
        }
        addr => Disposition::Handled(HandlerRef::Foreign(addr)),
    }
}

fn disposition_from_handler(old: SigHandler, registered: Option<SignalFn>) -> Disposition {
    match old {
        SigHandler::SigDfl => Disposition::Default,
        SigHandler::SigIgn => Disposition::Ignore,
        SigHandler::Handler(f) => disposition_from_address(f as usize, registered),
        SigHandler::SigAction(f) => Disposition::Handled(HandlerRef::Foreign(f as usize)),
    }
}

#[cfg(target_os = "linux")]
fn restorer_address(raw: &libc::sigaction) -> usize {
    raw.sa_restorer.map_or(0, |f| f as usize)
}

#[cfg(not(target_os = "linux"))]
fn restorer_address(_raw: &libc::sigaction) -> usize {
    0
}

/// Convert a libc `sigset_t` into a nix `SigSet`
fn sigset_from_raw(raw: &libc::sigset_t) -> SigSet {
    let mut set = SigSet::empty();
    for sig in Signal::iterator() {
        // SAFETY: raw points to an initialized sigset_t.
        if unsafe { libc::sigismember(raw, sig as c_int) } == 1 {
            set.add(sig);
        }
    }
    set
}

fn sigset_to_raw(set: &SigSet) -> libc::sigset_t {
    // SAFETY: sigemptyset initializes the zeroed set before sigaddset.
    let mut raw: libc::sigset_t = unsafe { std::mem::zeroed() };
    unsafe { libc::sigemptyset(&mut raw) };
    for sig in Signal::iterator().filter(|s| set.contains(*s)) {
        unsafe { libc::sigaddset(&mut raw, sig as c_int) };
    }
    raw
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::SignalContext;
    use std::sync::atomic::{AtomicI32, Ordering};

    static LAST_SIGNAL: AtomicI32 = AtomicI32::new(0);

    fn record(ctx: &SignalContext) {
        LAST_SIGNAL.store(ctx.number(), Ordering::SeqCst);
    }

    fn other(_: &SignalContext) {}

    fn only(signal: Signal) -> SigSet {
        let mut set = SigSet::empty();
        set.add(signal);
        set
    }

    #[test]
    fn test_raise_unblocked_runs_handler_once() {
        let _guard = crate::signal_test_lock();
        let controller = SignalController::new();
        controller.install_handler(Signal::SIGUSR1, record).unwrap();

        let before = controller.deliveries(Signal::SIGUSR1);
        controller.raise(Signal::SIGUSR1).unwrap();

        assert_eq!(controller.deliveries(Signal::SIGUSR1), before + 1);
        assert_eq!(LAST_SIGNAL.load(Ordering::SeqCst), libc::SIGUSR1);
    }

    #[test]
    fn test_blocked_signal_is_deferred_until_unblock() {
        let _guard = crate::signal_test_lock();
        let controller = SignalController::new();
        controller.install_handler(Signal::SIGUSR2, record).unwrap();
        let mask = only(Signal::SIGUSR2);

        let before = controller.deliveries(Signal::SIGUSR2);
        controller.block(&mask).unwrap();
        controller.raise(Signal::SIGUSR2).unwrap();

        assert_eq!(controller.deliveries(Signal::SIGUSR2), before);
        assert!(controller.pending().unwrap().contains(Signal::SIGUSR2));

        controller.unblock(&mask).unwrap();
        assert_eq!(controller.deliveries(Signal::SIGUSR2), before + 1);
        assert_eq!(LAST_SIGNAL.load(Ordering::SeqCst), libc::SIGUSR2);
        assert!(!controller.pending().unwrap().contains(Signal::SIGUSR2));
    }

    #[test]
    fn test_blocked_raises_coalesce() {
        let _guard = crate::signal_test_lock();
        let controller = SignalController::new();
        controller.install_handler(Signal::SIGWINCH, record).unwrap();
        let mask = only(Signal::SIGWINCH);

        let before = controller.deliveries(Signal::SIGWINCH);
        controller.block(&mask).unwrap();
        controller.raise(Signal::SIGWINCH).unwrap();
        controller.raise(Signal::SIGWINCH).unwrap();
        controller.raise(Signal::SIGWINCH).unwrap();
        controller.unblock(&mask).unwrap();

        assert_eq!(controller.deliveries(Signal::SIGWINCH), before + 1);
    }

    #[test]
    fn test_blocked_window_delivers_on_drop() {
        let _guard = crate::signal_test_lock();
        let controller = SignalController::new();
        controller.install_handler(Signal::SIGURG, record).unwrap();

        let before = controller.deliveries(Signal::SIGURG);
        {
            let window = controller.block_scoped(&only(Signal::SIGURG)).unwrap();
            assert!(!window.previous().contains(Signal::SIGURG));
            assert!(controller.current_mask().unwrap().contains(Signal::SIGURG));
            controller.raise(Signal::SIGURG).unwrap();
            assert_eq!(controller.deliveries(Signal::SIGURG), before);
        }
        assert_eq!(controller.deliveries(Signal::SIGURG), before + 1);
        assert!(!controller.current_mask().unwrap().contains(Signal::SIGURG));

        let window = controller.block_scoped(&only(Signal::SIGURG)).unwrap();
        controller.raise(Signal::SIGURG).unwrap();
        window.release().unwrap();
        assert_eq!(controller.deliveries(Signal::SIGURG), before + 2);
    }

    #[test]
    fn test_block_returns_previous_mask() {
        let _guard = crate::signal_test_lock();
        let controller = SignalController::new();
        let mask = only(Signal::SIGTTIN);

        let first = controller.block(&mask).unwrap();
        assert!(!first.contains(Signal::SIGTTIN));
        let second = controller.block(&mask).unwrap();
        assert!(second.contains(Signal::SIGTTIN));

        let before_unblock = controller.unblock(&mask).unwrap();
        assert!(before_unblock.contains(Signal::SIGTTIN));

        let restored = controller.set_mask(&first).unwrap();
        assert!(!restored.contains(Signal::SIGTTIN));
    }

    #[test]
    fn test_install_returns_previous_and_restore() {
        let _guard = crate::signal_test_lock();
        let controller = SignalController::new();

        let original = controller.reset_default(Signal::SIGHUP).unwrap();
        let before = controller.install_handler(Signal::SIGHUP, record).unwrap();
        assert_eq!(before.disposition, Disposition::Default);

        let options = HandlerOptions {
            restart: true,
            mask: only(Signal::SIGUSR1),
            ..Default::default()
        };
        let replaced = controller.install_handler_with(Signal::SIGHUP, other, options).unwrap();
        assert_eq!(replaced.disposition, Disposition::Handled(HandlerRef::Registered(record)));

        let current = controller.query(Signal::SIGHUP).unwrap();
        assert_eq!(current.disposition, Disposition::Handled(HandlerRef::Registered(other)));
        assert!(current.flags().contains(SaFlags::SA_RESTART));
        assert!(current.mask.contains(Signal::SIGUSR1));

        controller.restore(Signal::SIGHUP, &replaced).unwrap();
        let current = controller.query(Signal::SIGHUP).unwrap();
        assert_eq!(current.disposition, Disposition::Handled(HandlerRef::Registered(record)));
        assert!(!current.flags().contains(SaFlags::SA_RESTART));

        controller.restore(Signal::SIGHUP, &original).unwrap();
        assert_eq!(controller.query(Signal::SIGHUP).unwrap().disposition, original.disposition);
    }

    static SELF_BLOCKED: AtomicI32 = AtomicI32::new(-1);
    static EXTRA_BLOCKED: AtomicI32 = AtomicI32::new(-1);

    fn record_mask(ctx: &SignalContext) {
        let mut current = SigSet::empty();
        if pthread_sigmask(SigmaskHow::SIG_BLOCK, None, Some(&mut current)).is_ok() {
            SELF_BLOCKED.store(current.contains(ctx.signal()) as i32, Ordering::SeqCst);
            EXTRA_BLOCKED.store(current.contains(Signal::SIGSTKFLT) as i32, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_handler_runs_with_own_signal_blocked() {
        let _guard = crate::signal_test_lock();
        let controller = SignalController::new();
        controller.install_handler(Signal::SIGXFSZ, record_mask).unwrap();

        SELF_BLOCKED.store(-1, Ordering::SeqCst);
        controller.raise(Signal::SIGXFSZ).unwrap();
        assert_eq!(SELF_BLOCKED.load(Ordering::SeqCst), 1);
        assert!(!controller.current_mask().unwrap().contains(Signal::SIGXFSZ));

        let options = HandlerOptions {
            no_defer: true,
            ..HandlerOptions::default()
        };
        controller.install_handler_with(Signal::SIGXFSZ, record_mask, options).unwrap();
        assert!(controller.query(Signal::SIGXFSZ).unwrap().flags().contains(SaFlags::SA_NODEFER));

        SELF_BLOCKED.store(-1, Ordering::SeqCst);
        controller.raise(Signal::SIGXFSZ).unwrap();
        assert_eq!(SELF_BLOCKED.load(Ordering::SeqCst), 0);

        controller.reset_default(Signal::SIGXFSZ).unwrap();
    }

    #[test]
    fn test_handler_mask_adds_signals_while_running() {
        let _guard = crate::signal_test_lock();
        let controller = SignalController::new();
        let options = HandlerOptions {
            restart: true,
            mask: only(Signal::SIGSTKFLT),
            ..HandlerOptions::default()
        };
        controller.install_handler_with(Signal::SIGIO, record_mask, options).unwrap();

        let action = controller.query(Signal::SIGIO).unwrap();
        assert!(action.flags().contains(SaFlags::SA_RESTART));
        assert!(action.mask.contains(Signal::SIGSTKFLT));

        EXTRA_BLOCKED.store(-1, Ordering::SeqCst);
        let before = controller.deliveries(Signal::SIGIO);
        controller.raise(Signal::SIGIO).unwrap();

        assert_eq!(controller.deliveries(Signal::SIGIO), before + 1);
        assert_eq!(EXTRA_BLOCKED.load(Ordering::SeqCst), 1);
        assert!(!controller.current_mask().unwrap().contains(Signal::SIGSTKFLT));

        controller.ignore(Signal::SIGIO).unwrap();
    }

    #[test]
    fn test_reset_on_delivery_restores_default() {
        let _guard = crate::signal_test_lock();
        let controller = SignalController::new();
        let options = HandlerOptions {
            reset_on_delivery: true,
            ..HandlerOptions::default()
        };
        controller.install_handler_with(Signal::SIGCHLD, record, options).unwrap();
        assert!(controller.query(Signal::SIGCHLD).unwrap().disposition.is_handled());

        let before = controller.deliveries(Signal::SIGCHLD);
        controller.raise(Signal::SIGCHLD).unwrap();

        assert_eq!(controller.deliveries(Signal::SIGCHLD), before + 1);
        assert_eq!(LAST_SIGNAL.load(Ordering::SeqCst), libc::SIGCHLD);
        assert_eq!(controller.query(Signal::SIGCHLD).unwrap().disposition, Disposition::Default);
    }

    #[test]
    fn test_ignored_signal_is_dropped() {
        let _guard = crate::signal_test_lock();
        let controller = SignalController::new();
        controller.install_handler(Signal::SIGALRM, record).unwrap();

        let before = controller.deliveries(Signal::SIGALRM);
        let previous = controller.ignore(Signal::SIGALRM).unwrap();
        assert!(previous.disposition.is_handled());

        controller.raise(Signal::SIGALRM).unwrap();
        assert_eq!(controller.deliveries(Signal::SIGALRM), before);
        assert_eq!(controller.query(Signal::SIGALRM).unwrap().disposition, Disposition::Ignore);
    }

    #[test]
    fn test_legacy_install_delivers() {
        let _guard = crate::signal_test_lock();
        let controller = SignalController::new();

        controller.install_legacy(Signal::SIGTTOU, record).unwrap();
        let replaced = controller.install_legacy(Signal::SIGTTOU, record).unwrap();
        assert_eq!(replaced, Disposition::Handled(HandlerRef::Registered(record)));

        let before = controller.deliveries(Signal::SIGTTOU);
        controller.raise(Signal::SIGTTOU).unwrap();
        assert_eq!(controller.deliveries(Signal::SIGTTOU), before + 1);
        assert_eq!(LAST_SIGNAL.load(Ordering::SeqCst), libc::SIGTTOU);
    }

    #[test]
    fn test_sigkill_cannot_be_handled() {
        let _guard = crate::signal_test_lock();
        let controller = SignalController::new();

        let err = controller.install_handler(Signal::SIGKILL, record).unwrap_err();
        assert!(matches!(err, DemoError::SignalApi { op: "sigaction", errno: Errno::EINVAL }));
        assert!(crate::handler::registered(Signal::SIGKILL).is_none());

        let err = controller.install_legacy(Signal::SIGSTOP, record).unwrap_err();
        assert!(matches!(err, DemoError::SignalApi { op: "signal", .. }));
    }

    #[test]
    fn test_invalid_signal_numbers() {
        for number in [0, -1, 65, 999] {
            let err = SignalController::signal_from_raw(number).unwrap_err();
            assert_eq!(err.raw_os_error(), Some(libc::EINVAL));
        }
        assert_eq!(SignalController::signal_from_raw(10).unwrap(), Signal::SIGUSR1);
    }

    #[test]
    fn test_sigset_raw_conversion() {
        let mut set = SigSet::empty();
        set.add(Signal::SIGINT);
        set.add(Signal::SIGTSTP);

        let back = sigset_from_raw(&sigset_to_raw(&set));
        assert!(back.contains(Signal::SIGINT));
        assert!(back.contains(Signal::SIGTSTP));
        assert!(!back.contains(Signal::SIGUSR1));
    }

    #[test]
    fn test_default_actions() {
        assert_eq!(default_action(Signal::SIGTSTP), DefaultAction::Stop);
        assert_eq!(default_action(Signal::SIGINT), DefaultAction::Terminate);
        assert_eq!(default_action(Signal::SIGUSR1), DefaultAction::Terminate);
        assert_eq!(default_action(Signal::SIGSEGV), DefaultAction::CoreDump);
        assert_eq!(default_action(Signal::SIGCHLD), DefaultAction::Ignore);
        assert_eq!(default_action(Signal::SIGCONT), DefaultAction::Continue);
    }
}
