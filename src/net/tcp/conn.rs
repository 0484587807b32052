/*!
 * TCP Connection State
 *
 * The per-connection record shared by the transport input path and the
 * receive engine. All fields are only touched with the coarse network lock
 * held.
 */

use crate::core::types::{ConnId, CpuId};
use crate::net::devif::CallbackList;
use crate::net::iob::IobChain;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

/// Connection lifecycle
///
/// Moves forward only: Connected -> Closing -> Closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ConnState {
    Connected,
    /// Loss observed, event delivery still in progress
    Closing { graceful: bool },
    Closed { graceful: bool },
}

impl ConnState {
    fn rank(&self) -> u8 {
        match self {
            ConnState::Connected => 0,
            ConnState::Closing { .. } => 1,
            ConnState::Closed { .. } => 2,
        }
    }
}

/// TCP connection
pub struct TcpConn {
    id: ConnId,
    remote: SocketAddr,
    state: ConnState,

    /// Bytes received ahead of any reader
    pub(crate) readahead: Option<IobChain>,
    /// Next expected receive sequence number
    pub(crate) rcvseq: u32,
    /// Execution unit that last serviced a receive
    pub(crate) rcvcpu: Option<CpuId>,
    pub(crate) rcvtimeo: Option<Duration>,
    pub(crate) nonblocking: bool,
    pub(crate) readahead_limit: usize,
    /// Receive window as last advertised to the peer
    pub(crate) rcv_adv: usize,
    pub(crate) mss: usize,

    pub(crate) callbacks: CallbackList,
}

impl TcpConn {
    pub fn new(
        id: ConnId,
        remote: SocketAddr,
        readahead_limit: usize,
        max_callbacks: usize,
    ) -> Self {
        Self {
            id,
            remote,
            state: ConnState::Connected,
            readahead: None,
            rcvseq: 0,
            rcvcpu: None,
            rcvtimeo: None,
            nonblocking: false,
            readahead_limit,
            rcv_adv: readahead_limit,
            mss: crate::core::limits::DEFAULT_TCP_MSS,
            callbacks: CallbackList::new(max_callbacks),
        }
    }

    pub fn with_mss(mut self, mss: usize) -> Self {
        self.mss = mss.max(1);
        self
    }

    pub fn with_recv_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.set_recv_timeout(timeout);
        self
    }

    /// Bound blocking receives. A zero timeout, like `None`, waits forever.
    pub(crate) fn set_recv_timeout(&mut self, timeout: Option<Duration>) {
        self.rcvtimeo = timeout.filter(|t| !t.is_zero());
    }

    #[inline]
    pub fn id(&self) -> ConnId {
        self.id
    }

    #[inline]
    pub fn remote(&self) -> SocketAddr {
        self.remote
    }

    #[inline]
    pub fn state(&self) -> ConnState {
        self.state
    }

    #[inline]
    pub fn is_connected(&self) -> bool {
        matches!(self.state, ConnState::Connected)
    }

    /// Whether the peer closed gracefully
    #[inline]
    pub fn is_closed(&self) -> bool {
        matches!(
            self.state,
            ConnState::Closing { graceful: true } | ConnState::Closed { graceful: true }
        )
    }

    /// Move to `next` unless that would go backwards
    pub(crate) fn advance_state(&mut self, next: ConnState) -> bool {
        if next.rank() <= self.state.rank() {
            return false;
        }
        self.state = next;
        true
    }

    /// Bytes sitting in read-ahead
    #[inline]
    pub fn readahead_len(&self) -> usize {
        self.readahead.as_ref().map_or(0, |c| c.len())
    }

    #[inline]
    pub fn rcvseq(&self) -> u32 {
        self.rcvseq
    }

    /// Space left in read-ahead, i.e. the window that could be offered now
    #[inline]
    pub fn recv_window(&self) -> usize {
        self.readahead_limit.saturating_sub(self.readahead_len())
    }

    /// Append `chain` to read-ahead
    pub(crate) fn push_readahead(&mut self, chain: IobChain) {
        if chain.is_empty() {
            return;
        }
        match self.readahead.as_mut() {
            Some(existing) => existing.append(chain),
            None => self.readahead = Some(chain),
        }
    }

    pub fn stats(&self) -> ConnStats {
        ConnStats {
            id: self.id,
            remote: self.remote,
            state: self.state,
            readahead_bytes: self.readahead_len(),
            rcvseq: self.rcvseq,
            recv_window: self.recv_window(),
            registrations: self.callbacks.len(),
            rcvcpu: self.rcvcpu,
        }
    }
}

impl std::fmt::Debug for TcpConn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpConn")
            .field("id", &self.id)
            .field("remote", &self.remote)
            .field("state", &self.state)
            .field("readahead", &self.readahead_len())
            .field("rcvseq", &self.rcvseq)
            .field("callbacks", &self.callbacks)
            .finish()
    }
}

/// Point-in-time connection snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ConnStats {
    pub id: ConnId,
    pub remote: SocketAddr,
    pub state: ConnState,
    pub readahead_bytes: usize,
    pub rcvseq: u32,
    pub recv_window: usize,
    pub registrations: usize,
    pub rcvcpu: Option<CpuId>,
}
