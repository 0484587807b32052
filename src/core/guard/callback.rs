/*!
 * Callback Registration Guards
 *
 * Ties a connection callback registration to the scope of a waiting caller.
 * The guard borrows the caller's monitor lock instead of re-acquiring it,
 * so the registration is freed under the same lock that protects dispatch
 * and no event can reach the handler after the guard is gone.
 */

use super::traits::{Guard, GuardDrop};
use super::{GuardError, GuardMetadata, GuardResult};
use crate::core::sync::{CancelToken, Monitor, MonitorGuard, WaitOutcome};
use crate::core::types::{CallbackId, ConnId};
use std::time::Duration;

/// State that owns connection callback registrations
pub trait CallbackHost {
    /// Free `cb` on `conn`. Returns false if it no longer exists.
    fn free_callback(&mut self, conn: ConnId, cb: CallbackId) -> bool;
}

/// Registration guard with automatic deregistration
pub struct CallbackGuard<'g, 'm, T: CallbackHost> {
    monitor: &'g Monitor<T>,
    net: &'g mut MonitorGuard<'m, T>,
    conn: ConnId,
    cb: CallbackId,
    metadata: GuardMetadata,
    active: bool,
}

impl<'g, 'm, T: CallbackHost> CallbackGuard<'g, 'm, T> {
    /// Guard `cb`, which must already be registered on `conn`
    ///
    /// `net` must be the locked state of `monitor`.
    pub fn new(
        monitor: &'g Monitor<T>,
        net: &'g mut MonitorGuard<'m, T>,
        conn: ConnId,
        cb: CallbackId,
    ) -> Self {
        log::trace!("{}: guarding {}", conn, cb);
        Self {
            monitor,
            net,
            conn,
            cb,
            metadata: GuardMetadata::new("callback").with_conn(conn),
            active: true,
        }
    }

    /// Suspend on the monitor until `ready` holds
    ///
    /// The lock is released while suspended; the registration stays in place.
    pub fn wait<F>(
        &mut self,
        timeout: Option<Duration>,
        cancel: Option<&CancelToken>,
        ready: F,
    ) -> WaitOutcome
    where
        F: FnMut(&mut T) -> bool,
    {
        self.monitor.wait_until_ready(&mut *self.net, timeout, cancel, ready)
    }
}

impl<T: CallbackHost> Guard for CallbackGuard<'_, '_, T> {
    fn resource_type(&self) -> &'static str {
        "callback"
    }

    fn metadata(&self) -> &GuardMetadata {
        &self.metadata
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn release(&mut self) -> GuardResult<()> {
        if !self.active {
            return Err(GuardError::AlreadyReleased);
        }
        self.active = false;

        if !self.net.free_callback(self.conn, self.cb) {
            return Err(GuardError::ResourceUnavailable(format!(
                "{} on {} already gone",
                self.cb, self.conn
            )));
        }

        log::trace!(
            "{}: released {} after {}us",
            self.conn,
            self.cb,
            self.metadata.lifetime_micros()
        );
        Ok(())
    }
}

impl<T: CallbackHost> GuardDrop for CallbackGuard<'_, '_, T> {
    fn on_drop(&mut self) {
        if self.active {
            if let Err(e) = self.release() {
                // The connection may have been torn down while we waited
                log::debug!("Callback guard drop for {}: {}", self.conn, e);
            }
        }
    }
}

impl<T: CallbackHost> Drop for CallbackGuard<'_, '_, T> {
    fn drop(&mut self) {
        self.on_drop();
    }
}
