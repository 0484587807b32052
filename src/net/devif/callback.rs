/*!
 * Connection Callback Registry
 *
 * Per-connection list of event handlers. The transport layer dispatches
 * every event to each armed handler whose mask intersects it, threading the
 * event flags through the handlers in registration order.
 *
 * # Design: Handlers Leave the List While Running
 *
 * A handler needs `&mut TcpConn`, and the registry lives inside the
 * connection. Dispatch takes the handler out of its slot for the duration
 * of the call and puts it back afterwards, unless the slot was freed in the
 * meantime. A handler that is out of its slot is skipped by nested
 * dispatches, so re-entrant delivery never runs it twice.
 */

use super::device::DevPacket;
use super::events::TcpEvents;
use crate::core::errors::NetError;
use crate::core::types::CallbackId;
use crate::net::tcp::TcpConn;
use log::{debug, trace};

/// Event handler attached to a connection
pub trait ConnEventHandler: Send {
    /// Handle `flags` for `conn`, returning the flags as the transport should see them
    ///
    /// Runs with the coarse network lock held, possibly on the network
    /// service thread.
    fn on_event(&mut self, conn: &mut TcpConn, dev: &mut DevPacket, flags: TcpEvents)
        -> TcpEvents;
}

impl<F> ConnEventHandler for F
where
    F: FnMut(&mut TcpConn, &mut DevPacket, TcpEvents) -> TcpEvents + Send,
{
    fn on_event(
        &mut self,
        conn: &mut TcpConn,
        dev: &mut DevPacket,
        flags: TcpEvents,
    ) -> TcpEvents {
        self(conn, dev, flags)
    }
}

struct CallbackEntry {
    id: CallbackId,
    mask: TcpEvents,
    handler: Option<Box<dyn ConnEventHandler>>,
}

/// Bounded list of callback registrations
pub struct CallbackList {
    entries: Vec<CallbackEntry>,
    next_id: u32,
    capacity: usize,
}

impl CallbackList {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            next_id: 1,
            capacity,
        }
    }

    /// Register a handler built from its own id
    ///
    /// Fails with `ResourceExhausted` when every slot is taken.
    pub fn alloc_with<F>(&mut self, mask: TcpEvents, make: F) -> Result<CallbackId, NetError>
    where
        F: FnOnce(CallbackId) -> Box<dyn ConnEventHandler>,
    {
        if self.entries.len() >= self.capacity {
            return Err(NetError::ResourceExhausted(format!(
                "all {} callback slots in use",
                self.capacity
            )));
        }

        let id = CallbackId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1).max(1);

        self.entries.push(CallbackEntry {
            id,
            mask,
            handler: Some(make(id)),
        });
        trace!("Allocated callback {} (mask {:?})", id, mask);
        Ok(id)
    }

    pub fn alloc(
        &mut self,
        mask: TcpEvents,
        handler: Box<dyn ConnEventHandler>,
    ) -> Result<CallbackId, NetError> {
        self.alloc_with(mask, |_| handler)
    }

    /// Remove a registration. Returns false if it was already gone.
    pub fn free(&mut self, id: CallbackId) -> bool {
        match self.entries.iter().position(|e| e.id == id) {
            Some(idx) => {
                self.entries.remove(idx);
                trace!("Freed callback {}", id);
                true
            }
            None => false,
        }
    }

    /// Stop delivering events to a registration without freeing it
    pub fn disarm(&mut self, id: CallbackId) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.id == id) {
            entry.mask = TcpEvents::empty();
        }
    }

    pub fn mask(&self, id: CallbackId) -> Option<TcpEvents> {
        self.entries.iter().find(|e| e.id == id).map(|e| e.mask)
    }

    pub fn contains(&self, id: CallbackId) -> bool {
        self.entries.iter().any(|e| e.id == id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn armed_for(&self, flags: TcpEvents) -> Vec<CallbackId> {
        self.entries
            .iter()
            .filter(|e| e.mask.intersects(flags))
            .map(|e| e.id)
            .collect()
    }

    fn take_handler(&mut self, id: CallbackId) -> Option<(TcpEvents, Box<dyn ConnEventHandler>)> {
        let entry = self.entries.iter_mut().find(|e| e.id == id)?;
        let handler = entry.handler.take()?;
        Some((entry.mask, handler))
    }

    fn restore_handler(&mut self, id: CallbackId, handler: Box<dyn ConnEventHandler>) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.id == id) {
            entry.handler = Some(handler);
        }
    }
}

impl std::fmt::Debug for CallbackList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackList")
            .field("registered", &self.entries.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}

/// Deliver `flags` to every armed callback on `conn`
///
/// Returns the flags after every handler had its say.
pub fn conn_event(conn: &mut TcpConn, dev: &mut DevPacket, mut flags: TcpEvents) -> TcpEvents {
    for id in conn.callbacks.armed_for(flags) {
        let Some((mask, mut handler)) = conn.callbacks.take_handler(id) else {
            continue;
        };

        // An earlier handler in this pass may have changed the mask or flags
        if mask.intersects(flags) {
            debug!("{}: {} <- {:?}", conn.id(), id, flags);
            flags = handler.on_event(conn, dev, flags);
        }

        conn.callbacks.restore_handler(id, handler);
    }
    flags
}
