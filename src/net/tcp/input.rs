/*!
 * TCP Input Path
 *
 * Turns inbound segments and connection-loss notifications into callback
 * events. Whatever the callbacks leave unclaimed is saved to read-ahead
 * here, and the connection is finalized once a disconnect event has been
 * delivered.
 *
 * Callers hold the coarse network lock and broadcast the monitor after each
 * call returns.
 */

use super::conn::{ConnState, TcpConn};
use super::datahandler::tcp_datahandler;
use super::recvwindow::tcp_update_recvwindow;
use crate::net::devif::{conn_event, DevPacket, PacketHeader, TcpEvents};
use crate::net::iob::IobPool;
use bytes::Bytes;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Why a connection went away
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisconnectReason {
    /// Peer sent FIN
    Close,
    /// Peer sent RST
    Abort,
    /// Retransmissions exhausted
    TimedOut,
    /// Device went down underneath the connection
    NetdevDown,
}

impl DisconnectReason {
    pub fn flags(&self) -> TcpEvents {
        match self {
            DisconnectReason::Close => TcpEvents::CLOSE,
            DisconnectReason::Abort => TcpEvents::ABORT,
            DisconnectReason::TimedOut => TcpEvents::TIMEDOUT,
            DisconnectReason::NetdevDown => TcpEvents::NETDEV_DOWN,
        }
    }
}

/// Inbound segment as the device hands it over
#[derive(Debug, Clone)]
pub struct TcpSegment {
    pub header: PacketHeader,
    pub payload: Bytes,
    /// Segment carries FIN
    pub fin: bool,
    /// Segment also acknowledges outstanding data
    pub ackdata: bool,
}

impl TcpSegment {
    pub fn new(from: SocketAddr, payload: impl Into<Bytes>) -> Self {
        Self {
            header: PacketHeader::from(from),
            payload: payload.into(),
            fin: false,
            ackdata: false,
        }
    }

    pub fn with_fin(mut self) -> Self {
        self.fin = true;
        self
    }

    pub fn with_ackdata(mut self) -> Self {
        self.ackdata = true;
        self
    }

    fn flags(&self) -> TcpEvents {
        let mut flags = TcpEvents::empty();
        if !self.payload.is_empty() {
            flags |= TcpEvents::NEWDATA;
        }
        if self.fin {
            flags |= TcpEvents::CLOSE;
        }
        if self.ackdata {
            flags |= TcpEvents::ACKDATA;
        }
        flags
    }
}

/// Record loss of the connection
///
/// Moves a connected connection to Closing, graceful when `flags` carries
/// CLOSE. Later calls are no-ops. Returns whether this call made the move.
pub fn tcp_lost_connection(conn: &mut TcpConn, flags: TcpEvents) -> bool {
    if !conn.is_connected() {
        return false;
    }

    let graceful = flags.contains(TcpEvents::CLOSE);
    conn.advance_state(ConnState::Closing { graceful });
    info!(
        "{}: connection lost ({})",
        conn.id(),
        if graceful { "closed by peer" } else { "aborted" }
    );
    true
}

/// Complete the teardown after a disconnect event was dispatched
fn tcp_finalize(conn: &mut TcpConn, flags: TcpEvents) {
    tcp_lost_connection(conn, flags);
    if let ConnState::Closing { graceful } = conn.state() {
        conn.advance_state(ConnState::Closed { graceful });
    }
}

/// Deliver an inbound segment
///
/// Returns the flags left after dispatch. A FIN riding on a data segment is
/// only honored if every payload byte found a home; otherwise the FIN is
/// treated as not received and the connection stays up.
pub fn tcp_input(conn: &mut TcpConn, pool: &IobPool, segment: &TcpSegment) -> TcpEvents {
    if !conn.is_connected() {
        debug!("{}: dropping segment on {:?} connection", conn.id(), conn.state());
        return TcpEvents::empty();
    }

    let mut dev = match DevPacket::from_payload(pool, segment.header, &segment.payload) {
        Ok(dev) => dev,
        Err(e) => {
            warn!("{}: dropping {} byte segment: {}", conn.id(), segment.payload.len(), e);
            return TcpEvents::empty();
        }
    };

    let initial = segment.flags();
    let mut flags = conn_event(conn, &mut dev, initial);

    // Nobody claimed the payload; keep it for the next reader
    if flags.contains(TcpEvents::NEWDATA) && dev.len() > 0 {
        let len = dev.len();
        let saved = tcp_datahandler(conn, &mut dev);
        if saved < len {
            flags.remove(TcpEvents::CLOSE);
        }
        conn.rcvseq = conn.rcvseq.wrapping_add(saved as u32);
        flags = (flags - TcpEvents::NEWDATA) | TcpEvents::SNDACK;
    }

    if flags.contains(TcpEvents::SNDACK) {
        tcp_update_recvwindow(conn);
    }

    if flags.contains(TcpEvents::CLOSE) {
        // Data and FIN together only reached the data branch of each handler
        if initial.contains(TcpEvents::NEWDATA) {
            let mut notice = DevPacket::empty(pool);
            conn_event(conn, &mut notice, TcpEvents::CLOSE);
        }
        tcp_finalize(conn, TcpEvents::CLOSE);
    } else if initial.contains(TcpEvents::CLOSE) {
        warn!("{}: FIN ignored, segment data not fully buffered", conn.id());
    }

    flags
}

/// Deliver a connection-loss event
///
/// Returns false if the connection was already gone.
pub fn tcp_disconnect(conn: &mut TcpConn, pool: &IobPool, reason: DisconnectReason) -> bool {
    if !conn.is_connected() {
        return false;
    }

    let flags = reason.flags();
    let mut dev = DevPacket::empty(pool);
    conn_event(conn, &mut dev, flags);
    tcp_finalize(conn, flags);
    true
}
