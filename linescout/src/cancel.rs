//! Cooperative cancellation shared by every pipeline stage.
//!
//! A [`CancelToken`] is cloned into the walker, each scanner worker, and the
//! deadline watchdog. It pairs an atomic reason flag with a zero-capacity
//! channel whose sender is dropped when the token fires, so a stage blocked
//! in a `select!` on a full or empty queue wakes immediately instead of
//! waiting for its next loop iteration.

use crossbeam_channel::{bounded, Receiver, Sender};
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};

const LIVE: u8 = 0;
const TIMEOUT: u8 = 1;
const USER_ABORT: u8 = 2;

/// Why a run was cut short.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    Timeout,
    UserAbort,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelReason::Timeout => write!(f, "timeout elapsed"),
            CancelReason::UserAbort => write!(f, "aborted by caller"),
        }
    }
}

#[derive(Clone)]
pub struct CancelToken {
    state: Arc<State>,
    rx: Receiver<()>,
}

struct State {
    reason: AtomicU8,
    // Held open until the token fires; dropping it disconnects `rx`.
    tx: Mutex<Option<Sender<()>>>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, rx) = bounded(0);
        CancelToken {
            state: Arc::new(State {
                reason: AtomicU8::new(LIVE),
                tx: Mutex::new(Some(tx)),
            }),
            rx,
        }
    }

    /// Fire the token. The first reason wins; later calls are no-ops.
    pub fn cancel(&self, reason: CancelReason) {
        let code = match reason {
            CancelReason::Timeout => TIMEOUT,
            CancelReason::UserAbort => USER_ABORT,
        };
        if self
            .state
            .reason
            .compare_exchange(LIVE, code, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            if let Ok(mut guard) = self.state.tx.lock() {
                guard.take();
            }
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.reason.load(Ordering::SeqCst) != LIVE
    }

    pub fn reason(&self) -> Option<CancelReason> {
        match self.state.reason.load(Ordering::SeqCst) {
            TIMEOUT => Some(CancelReason::Timeout),
            USER_ABORT => Some(CancelReason::UserAbort),
            _ => None,
        }
    }

    /// Channel that disconnects when the token fires. No message is ever
    /// sent on it; a `recv` arm in `select!` becomes ready only through
    /// disconnection.
    pub fn channel(&self) -> &Receiver<()> {
        &self.rx
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}
