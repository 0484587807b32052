/*!
 * RAII Resource Guards
 *
 * Scoped guards that give back a resource on every exit path, including
 * early returns and unwinding.
 *
 * ## Guard Types
 *
 * - **CallbackGuard**: Event callback registration held while a caller
 *   waits on the network monitor
 *
 * ## Example
 *
 * ```rust,ignore
 * let cb = conn.callbacks.alloc(mask, handler)?;
 * let mut guard = CallbackGuard::new(&monitor, &mut net, conn_id, cb);
 * let outcome = guard.wait(timeout, cancel, |state| done(state));
 * // Registration freed on drop
 * ```
 */

mod callback;
mod traits;

pub use callback::{CallbackGuard, CallbackHost};
pub use traits::{Guard, GuardDrop};

use crate::core::types::ConnId;

/// Result type for guard operations
pub type GuardResult<T> = Result<T, GuardError>;

/// Errors that can occur during guard operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GuardError {
    #[error("Resource already released")]
    AlreadyReleased,

    #[error("Resource unavailable: {0}")]
    ResourceUnavailable(String),
}

/// Guard metadata for observability
#[derive(Debug, Clone)]
pub struct GuardMetadata {
    pub resource_type: &'static str,
    pub creation_time: std::time::Instant,
    pub conn: Option<ConnId>,
}

impl GuardMetadata {
    #[inline]
    pub fn new(resource_type: &'static str) -> Self {
        Self {
            resource_type,
            creation_time: std::time::Instant::now(),
            conn: None,
        }
    }

    #[inline]
    pub fn with_conn(mut self, conn: ConnId) -> Self {
        self.conn = Some(conn);
        self
    }

    #[inline]
    pub fn lifetime_micros(&self) -> u64 {
        self.creation_time.elapsed().as_micros() as u64
    }
}
