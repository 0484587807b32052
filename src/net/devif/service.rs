/*!
 * Network Service Thread
 *
 * Stands in for the device interrupt / network work queue: a dedicated
 * thread that drains device events from a channel and delivers each one to
 * the stack under the coarse lock. Receivers blocked on the stack are woken
 * from here.
 */

use crate::core::limits::NET_SERVICE_QUEUE_DEPTH;
use crate::core::types::ConnId;
use crate::net::stack::NetStack;
use crate::net::tcp::{DisconnectReason, TcpSegment};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::io;
use std::thread::{self, JoinHandle};

/// Event raised by a network device
#[derive(Debug, Clone)]
pub enum DevEvent {
    Segment { conn: ConnId, segment: TcpSegment },
    Disconnect { conn: ConnId, reason: DisconnectReason },
    /// Stop the service after everything queued before it
    Shutdown,
}

/// Counters kept by the service thread
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ServiceStats {
    pub segments: u64,
    pub disconnects: u64,
    /// Events for connections the stack no longer knows
    pub orphaned: u64,
}

fn run_service(stack: NetStack, rx: flume::Receiver<DevEvent>) -> ServiceStats {
    let mut stats = ServiceStats::default();
    info!("Network service started");

    for event in rx.iter() {
        match event {
            DevEvent::Segment { conn, segment } => match stack.input(conn, &segment) {
                Ok(flags) => {
                    stats.segments += 1;
                    debug!("{}: segment delivered, flags {:?}", conn, flags);
                }
                Err(e) => {
                    stats.orphaned += 1;
                    warn!("{}: segment dropped: {}", conn, e);
                }
            },
            DevEvent::Disconnect { conn, reason } => match stack.disconnect(conn, reason) {
                Ok(_) => stats.disconnects += 1,
                Err(e) => {
                    stats.orphaned += 1;
                    warn!("{}: disconnect dropped: {}", conn, e);
                }
            },
            DevEvent::Shutdown => break,
        }
    }

    info!(
        "Network service stopped ({} segments, {} disconnects, {} orphaned)",
        stats.segments, stats.disconnects, stats.orphaned
    );
    stats
}

/// Handle to a running network service thread
pub struct NetService {
    tx: flume::Sender<DevEvent>,
    handle: Option<JoinHandle<ServiceStats>>,
}

impl NetService {
    pub fn start(stack: NetStack) -> io::Result<Self> {
        let (tx, rx) = flume::bounded(NET_SERVICE_QUEUE_DEPTH);
        let handle = thread::Builder::new()
            .name("net-service".to_string())
            .spawn(move || run_service(stack, rx))?;

        Ok(Self {
            tx,
            handle: Some(handle),
        })
    }

    /// Queue an event. Returns false once the service has stopped.
    pub fn send(&self, event: DevEvent) -> bool {
        self.tx.send(event).is_ok()
    }

    pub fn deliver_segment(&self, conn: ConnId, segment: TcpSegment) -> bool {
        self.send(DevEvent::Segment { conn, segment })
    }

    pub fn deliver_disconnect(&self, conn: ConnId, reason: DisconnectReason) -> bool {
        self.send(DevEvent::Disconnect { conn, reason })
    }

    /// Sender for device threads of their own
    pub fn sender(&self) -> flume::Sender<DevEvent> {
        self.tx.clone()
    }

    /// Drain queued events, stop the thread and return its counters
    pub fn shutdown(mut self) -> ServiceStats {
        self.stop()
    }

    fn stop(&mut self) -> ServiceStats {
        let Some(handle) = self.handle.take() else {
            return ServiceStats::default();
        };
        let _ = self.tx.send(DevEvent::Shutdown);
        handle.join().unwrap_or_else(|_| {
            warn!("Network service thread panicked");
            ServiceStats::default()
        })
    }
}

impl Drop for NetService {
    fn drop(&mut self) {
        self.stop();
    }
}
