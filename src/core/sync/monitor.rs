/*!
 * Monitor
 *
 * A coarse lock paired with a condition variable. Suspending on the monitor
 * releases the lock so event delivery can run, and reacquires it before the
 * waiter inspects shared state again.
 *
 * # Design: Broadcast Wakeups
 *
 * Every state change that may satisfy a waiter broadcasts the monitor.
 * Waiters re-check their own predicate under the lock, so spurious or
 * foreign wakeups are harmless. This keeps the signalling side free of any
 * per-waiter bookkeeping.
 */

use super::cancel::{CancelToken, Notify};
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

/// Guard type handed out by [`Monitor::lock`]
pub type MonitorGuard<'a, T> = MutexGuard<'a, T>;

/// Outcome of a monitor wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// Predicate became true
    Signaled,
    /// Timeout elapsed with the predicate still false
    TimedOut,
    /// A cancellation token fired with the predicate still false
    Interrupted,
}

/// Coarse lock plus condition variable
pub struct Monitor<T> {
    lock: Mutex<T>,
    cond: Condvar,
}

impl<T> Monitor<T> {
    pub fn new(state: T) -> Self {
        Self {
            lock: Mutex::new(state),
            cond: Condvar::new(),
        }
    }

    /// Acquire the coarse lock
    #[inline]
    pub fn lock(&self) -> MonitorGuard<'_, T> {
        self.lock.lock()
    }

    /// Wake every waiter. Callers normally hold the lock while calling this.
    #[inline]
    pub fn notify_all(&self) {
        self.cond.notify_all();
    }

    /// Suspend until `ready` holds, the timeout elapses, or `cancel` fires
    ///
    /// `guard` must come from this monitor. The lock is released while
    /// suspended and held again whenever `ready` runs and when this returns.
    /// A predicate that is already true wins over both timeout and cancellation.
    pub fn wait_until_ready<F>(
        &self,
        guard: &mut MonitorGuard<'_, T>,
        timeout: Option<Duration>,
        cancel: Option<&CancelToken>,
        mut ready: F,
    ) -> WaitOutcome
    where
        F: FnMut(&mut T) -> bool,
    {
        let deadline = timeout.and_then(|t| Instant::now().checked_add(t));

        loop {
            if ready(&mut **guard) {
                return WaitOutcome::Signaled;
            }
            if cancel.is_some_and(|c| c.is_cancelled()) {
                return WaitOutcome::Interrupted;
            }

            match deadline {
                Some(deadline) => {
                    if self.cond.wait_until(guard, deadline).timed_out() {
                        return if ready(&mut **guard) {
                            WaitOutcome::Signaled
                        } else {
                            WaitOutcome::TimedOut
                        };
                    }
                }
                None => self.cond.wait(guard),
            }
        }
    }
}

impl<T: Send + 'static> Monitor<T> {
    /// Create a cancellation token bound to this monitor
    pub fn cancel_token(self: &Arc<Self>) -> CancelToken {
        let notify: Weak<dyn Notify> = Arc::downgrade(self) as Weak<dyn Notify>;
        CancelToken::new(notify)
    }

    /// Whether `token` was created by this monitor
    pub fn owns(&self, token: &CancelToken) -> bool {
        token.is_bound_to(self)
    }
}

impl<T: Send> Notify for Monitor<T> {
    fn notify_waiters(&self) {
        // Taking the lock orders the wakeup after any waiter's predicate check
        let _guard = self.lock.lock();
        self.cond.notify_all();
    }
}
