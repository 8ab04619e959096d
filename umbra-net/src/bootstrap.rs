//! Bootstrap readiness barrier
//!
//! One-shot gate that keeps peer networking closed until the Tor setup
//! routine has finished. There is exactly one writer (the setup routine) and
//! any number of readers (listener and connection threads).
//!
//! The state only ever moves forward:
//! `Uninitialized -> Initializing -> Ready`. A fresh barrier is needed to
//! restart the subsystem.
//!
//! If the setup routine exits without calling
//! [`signal_ready`](BootstrapBarrier::signal_ready), the barrier stays closed
//! for good and [`wait_ready`](BootstrapBarrier::wait_ready) never returns.
//! Shutdown paths should use
//! [`wait_ready_interruptible`](BootstrapBarrier::wait_ready_interruptible) or
//! [`ready_or_interrupted`](BootstrapBarrier::ready_or_interrupted) instead;
//! those also return once the routine reports itself gone through
//! [`abandon`](BootstrapBarrier::abandon).

use crate::interrupt::InterruptSignal;
use crate::{Error, Result};
use parking_lot::{Condvar, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::Notify;
use tracing::{debug, info, warn};

/// Barrier state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapState {
    /// Setup routine has not started
    Uninitialized,
    /// Setup routine is running
    Initializing,
    /// Transport is live; peer networking may proceed
    Ready,
}

impl BootstrapState {
    /// Display name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Initializing => "initializing",
            Self::Ready => "ready",
        }
    }
}

/// Shortest interval between interruption checks in
/// [`wait_ready_interruptible`](BootstrapBarrier::wait_ready_interruptible).
pub const MIN_WAIT_POLL: Duration = Duration::from_millis(10);

/// Interval between "still waiting" warnings.
const STALL_WARN_INTERVAL: Duration = Duration::from_secs(1);

fn poll_interval(requested: Duration) -> Duration {
    requested.max(MIN_WAIT_POLL)
}

#[derive(Debug)]
struct Inner {
    state: BootstrapState,
    writer_gone: bool,
}

/// One-shot readiness gate
pub struct BootstrapBarrier {
    inner: Mutex<Inner>,
    cond: Condvar,
    notify: Notify,
}

impl BootstrapBarrier {
    /// Create a closed barrier
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: BootstrapState::Uninitialized,
                writer_gone: false,
            }),
            cond: Condvar::new(),
            notify: Notify::new(),
        }
    }

    /// Current state
    pub fn state(&self) -> BootstrapState {
        self.inner.lock().state
    }

    /// True once the barrier is open
    pub fn is_ready(&self) -> bool {
        self.state() == BootstrapState::Ready
    }

    /// True if the setup routine exited without opening the barrier.
    pub fn is_writer_gone(&self) -> bool {
        let inner = self.inner.lock();
        inner.writer_gone && inner.state != BootstrapState::Ready
    }

    /// Record that the setup routine has started. No effect unless the
    /// barrier is still uninitialized.
    pub fn mark_initializing(&self) {
        let mut inner = self.inner.lock();
        if inner.state == BootstrapState::Uninitialized {
            inner.state = BootstrapState::Initializing;
            debug!(event = "bootstrap_initializing", "Tor bootstrap started");
        }
    }

    /// Open the barrier and wake every waiter.
    ///
    /// Returns `true` for the call that opened it; later calls are no-ops
    /// and return `false`.
    pub fn signal_ready(&self) -> bool {
        {
            let mut inner = self.inner.lock();
            if inner.state == BootstrapState::Ready {
                debug!(event = "bootstrap_ready_repeat", "Barrier already open");
                return false;
            }
            inner.state = BootstrapState::Ready;
        }
        self.cond.notify_all();
        self.notify.notify_waiters();
        info!(event = "bootstrap_ready", "Tor transport ready; peer networking unblocked");
        true
    }

    /// Record that the setup routine has exited without signalling.
    ///
    /// The barrier stays closed. Untimed [`wait_ready`](Self::wait_ready)
    /// callers keep blocking; the interruptible waits return
    /// [`Error::BootstrapAbandoned`]. No effect once the barrier is open.
    pub fn abandon(&self) {
        {
            let mut inner = self.inner.lock();
            if inner.state == BootstrapState::Ready || inner.writer_gone {
                return;
            }
            inner.writer_gone = true;
        }
        self.cond.notify_all();
        self.notify.notify_waiters();
        warn!(
            event = "bootstrap_writer_gone",
            "Tor setup exited without becoming ready; peer networking stays blocked"
        );
    }

    /// Block until the barrier is open. No timeout.
    pub fn wait_ready(&self) {
        let mut inner = self.inner.lock();
        while inner.state != BootstrapState::Ready {
            self.cond.wait(&mut inner);
        }
    }

    /// Block until the barrier is open or `timeout` elapses.
    ///
    /// Returns whether the barrier is open. A timeout too large to represent
    /// waits without a deadline.
    pub fn wait_ready_timeout(&self, timeout: Duration) -> bool {
        let mut inner = self.inner.lock();
        if inner.state == BootstrapState::Ready {
            return true;
        }
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            while inner.state != BootstrapState::Ready {
                self.cond.wait(&mut inner);
            }
            return true;
        };
        while inner.state != BootstrapState::Ready {
            if self.cond.wait_until(&mut inner, deadline).timed_out() {
                return inner.state == BootstrapState::Ready;
            }
        }
        true
    }

    /// Block until the barrier opens, re-checking `interrupt` every `poll`.
    ///
    /// `poll` is raised to at least [`MIN_WAIT_POLL`]. Returns
    /// [`Error::Interrupted`] on shutdown and [`Error::BootstrapAbandoned`]
    /// once the setup routine has exited without signalling. While neither
    /// happens, a stall warning is logged at most once a second.
    pub fn wait_ready_interruptible(&self, interrupt: &InterruptSignal, poll: Duration) -> Result<()> {
        let poll = poll_interval(poll);
        let started = Instant::now();
        let mut last_warn = started;
        let mut inner = self.inner.lock();
        loop {
            if inner.state == BootstrapState::Ready {
                return Ok(());
            }
            if inner.writer_gone {
                info!(
                    event = "bootstrap_wait_abandoned",
                    waited_ms = started.elapsed().as_millis() as u64,
                    "Tor setup exited; stopped waiting"
                );
                return Err(Error::BootstrapAbandoned);
            }
            if interrupt.is_interrupted() {
                info!(
                    event = "bootstrap_wait_interrupted",
                    waited_ms = started.elapsed().as_millis() as u64,
                    "Stopped waiting for Tor bootstrap"
                );
                return Err(Error::Interrupted);
            }
            if last_warn.elapsed() >= STALL_WARN_INTERVAL {
                last_warn = Instant::now();
                warn!(
                    event = "bootstrap_wait_stalled",
                    state = inner.state.name(),
                    waited_secs = started.elapsed().as_secs(),
                    "Still waiting on anonymizing transport"
                );
            }
            self.cond.wait_for(&mut inner, poll);
        }
    }

    /// Await until the barrier is open.
    pub async fn ready(&self) {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.is_ready() {
                return;
            }
            notified.await;
        }
    }

    /// Await until the barrier opens, the setup routine exits without
    /// signalling, or shutdown is requested.
    pub async fn ready_or_interrupted(&self, interrupt: &InterruptSignal) -> Result<()> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.is_ready() {
                return Ok(());
            }
            if self.is_writer_gone() {
                return Err(Error::BootstrapAbandoned);
            }
            tokio::select! {
                biased;
                _ = &mut notified => {}
                _ = interrupt.interrupted() => {
                    return if self.is_ready() {
                        Ok(())
                    } else {
                        Err(Error::Interrupted)
                    };
                }
            }
        }
    }
}

impl Default for BootstrapBarrier {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for BootstrapBarrier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootstrapBarrier")
            .field("state", &self.state())
            .finish()
    }
}
