//! Shutdown signal polled by the Tor setup routine.
//!
//! Raised once when the node starts shutting down. The setup routine checks
//! it between steps and inside long blocking steps, then exits without
//! opening the bootstrap barrier. Barrier waiters that want to stop on
//! shutdown pass the same signal to the interruptible wait methods.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tokio::sync::Notify;
use tracing::info;

/// Node shutdown flag, shared by cloning.
///
/// All clones observe the same flag. Raising it is sticky until
/// [`reset`](Self::reset).
#[derive(Clone)]
pub struct InterruptSignal {
    raised: Arc<AtomicBool>,
    wake: Arc<Notify>,
}

impl InterruptSignal {
    /// Signal with shutdown not yet requested.
    pub fn new() -> Self {
        Self {
            raised: Arc::new(AtomicBool::new(false)),
            wake: Arc::new(Notify::new()),
        }
    }

    /// Current value of the flag at call time.
    pub fn is_interrupted(&self) -> bool {
        self.raised.load(Ordering::Acquire)
    }

    /// Request shutdown. Returns `true` for the call that raised the flag.
    ///
    /// Async waiters in [`interrupted`](Self::interrupted) are woken; blocked
    /// threads see the flag on their next poll.
    pub fn interrupt(&self) -> bool {
        let first = !self.raised.swap(true, Ordering::AcqRel);
        if first {
            info!(event = "shutdown_requested", "Shutdown requested");
        }
        self.wake.notify_waiters();
        first
    }

    /// Lower the flag for a restarted subsystem.
    ///
    /// Routines from the previous run must have exited first.
    pub fn reset(&self) {
        self.raised.store(false, Ordering::Release);
    }

    /// Resolve once shutdown has been requested.
    pub async fn interrupted(&self) {
        loop {
            let notified = self.wake.notified();
            tokio::pin!(notified);
            // Register before reading the flag so a concurrent interrupt()
            // cannot land between the read and the await
            notified.as_mut().enable();
            if self.is_interrupted() {
                return;
            }
            notified.await;
        }
    }
}

impl Default for InterruptSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InterruptSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterruptSignal")
            .field("interrupted", &self.is_interrupted())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_poll_reflects_current_value() {
        let signal = InterruptSignal::new();
        assert!(!signal.is_interrupted());

        signal.interrupt();
        assert!(signal.is_interrupted());

        signal.reset();
        assert!(!signal.is_interrupted());
    }

    #[test]
    fn test_only_first_interrupt_raises() {
        let signal = InterruptSignal::new();
        assert!(signal.interrupt());
        assert!(!signal.clone().interrupt());
        assert!(signal.is_interrupted());

        signal.reset();
        assert!(signal.interrupt());
    }

    #[test]
    fn test_clones_share_state() {
        let signal = InterruptSignal::new();
        let clone = signal.clone();
        clone.interrupt();
        assert!(signal.is_interrupted());
    }

    #[tokio::test]
    async fn test_interrupted_wakes_waiter() {
        let signal = InterruptSignal::new();
        let waiter = {
            let signal = signal.clone();
            tokio::spawn(async move { signal.interrupted().await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        signal.interrupt();

        tokio::time::timeout(Duration::from_secs(5), waiter)
            .await
            .expect("waiter should wake")
            .unwrap();
    }

    #[tokio::test]
    async fn test_interrupted_returns_immediately_when_set() {
        let signal = InterruptSignal::new();
        signal.interrupt();
        tokio::time::timeout(Duration::from_secs(1), signal.interrupted())
            .await
            .expect("already interrupted");
    }
}
