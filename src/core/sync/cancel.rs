/*!
 * Cancellation Tokens
 *
 * Lets one thread interrupt another thread suspended on a monitor.
 */

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

/// Something that can wake all of its waiters
pub trait Notify: Send + Sync {
    /// Wake every waiter. Must not be called while holding the lock being waited on.
    fn notify_waiters(&self);
}

struct CancelInner {
    cancelled: AtomicBool,
    notify: Weak<dyn Notify>,
}

/// Shared cancellation flag bound to one monitor
///
/// Cloning shares the flag. Once cancelled a token stays cancelled.
#[derive(Clone)]
pub struct CancelToken {
    inner: Arc<CancelInner>,
}

impl CancelToken {
    pub fn new(notify: Weak<dyn Notify>) -> Self {
        Self {
            inner: Arc::new(CancelInner {
                cancelled: AtomicBool::new(false),
                notify,
            }),
        }
    }

    /// Cancel and wake the monitor so waiters observe it
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        if let Some(notify) = self.inner.notify.upgrade() {
            notify.notify_waiters();
        }
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Whether cancelling wakes the waiters of `target`
    pub fn is_bound_to(&self, target: &dyn Notify) -> bool {
        std::ptr::addr_eq(self.inner.notify.as_ptr(), target as *const dyn Notify)
    }
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
