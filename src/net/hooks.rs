/*!
 * Device Notification Hooks
 *
 * Outbound notifications the receive path raises toward the device layer.
 * Hooks are invoked with the coarse network lock held and must not call
 * back into the stack.
 */

use crate::core::types::{ConnId, CpuId};
use log::debug;

/// Receivers of receive-path notifications
pub trait NetHooks: Send + Sync {
    /// Draining read-ahead opened the receive window enough to advertise it
    fn notify_window_available(&self, conn: ConnId) {
        let _ = conn;
    }

    /// A different execution unit is now servicing receives on `conn`
    fn notify_affinity_changed(&self, conn: ConnId, cpu: CpuId) {
        let _ = (conn, cpu);
    }
}

/// Hooks that only log
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHooks;

impl NetHooks for LoggingHooks {
    fn notify_window_available(&self, conn: ConnId) {
        debug!("{}: receive window reopened", conn);
    }

    fn notify_affinity_changed(&self, conn: ConnId, cpu: CpuId) {
        debug!("{}: receive affinity moved to cpu {}", conn, cpu);
    }
}
