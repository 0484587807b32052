/*!
 * Network Stack
 *
 * Owns every connection and the buffer pool behind one coarse lock, and
 * exposes the socket-facing receive calls plus the device-facing input
 * calls. Each device event broadcasts the monitor once it has been
 * delivered so suspended receivers re-check their requests.
 */

use super::config::NetConfig;
use super::devif::{ConnEventHandler, TcpEvents};
use super::hooks::{LoggingHooks, NetHooks};
use super::iob::{IobPool, IobPoolStats};
use super::tcp::recvfrom::{tcp_recvmsg, RecvContext};
use super::tcp::{
    tcp_disconnect, tcp_input, ConnStats, DisconnectReason, RecvFlags, RecvMsg, TcpConn,
    TcpSegment,
};
use crate::core::errors::{NetError, NetResult};
use crate::core::guard::CallbackHost;
use crate::core::limits::FIRST_CONN_ID;
use crate::core::sync::{CancelToken, Monitor};
use crate::core::types::{CallbackId, ConnId};
use crate::monitoring::span_recv;
use ahash::RandomState;
use log::info;
use std::collections::HashMap;
use std::io::IoSliceMut;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

/// State protected by the coarse network lock
pub struct NetState {
    pub(crate) conns: HashMap<ConnId, TcpConn, RandomState>,
    pub(crate) pool: IobPool,
    next_id: u32,
}

impl NetState {
    fn new(pool: IobPool) -> Self {
        Self {
            conns: HashMap::with_hasher(RandomState::new()),
            pool,
            next_id: FIRST_CONN_ID,
        }
    }

    pub(crate) fn conn_mut(&mut self, id: ConnId) -> NetResult<&mut TcpConn> {
        self.conns.get_mut(&id).ok_or(NetError::ConnNotFound(id))
    }

    pub(crate) fn conn(&self, id: ConnId) -> NetResult<&TcpConn> {
        self.conns.get(&id).ok_or(NetError::ConnNotFound(id))
    }
}

impl CallbackHost for NetState {
    fn free_callback(&mut self, conn: ConnId, cb: CallbackId) -> bool {
        self.conns
            .get_mut(&conn)
            .is_some_and(|c| c.callbacks.free(cb))
    }
}

/// Network stack handle
///
/// Cloning shares the same stack.
#[derive(Clone)]
pub struct NetStack {
    monitor: Arc<Monitor<NetState>>,
    hooks: Arc<dyn NetHooks>,
    config: NetConfig,
}

impl NetStack {
    pub fn new(config: NetConfig) -> Self {
        Self::with_hooks(config, Arc::new(LoggingHooks))
    }

    pub fn with_hooks(config: NetConfig, hooks: Arc<dyn NetHooks>) -> Self {
        let pool = IobPool::from_config(&config);
        info!(
            "Network stack ready: {} x {} byte buffers, read-ahead limit {}",
            config.iob_nbuffers, config.iob_bufsize, config.readahead_limit
        );
        Self {
            monitor: Arc::new(Monitor::new(NetState::new(pool))),
            hooks,
            config,
        }
    }

    #[inline]
    pub fn config(&self) -> &NetConfig {
        &self.config
    }

    /// Register an established connection to `remote`
    pub fn open(&self, remote: SocketAddr) -> ConnId {
        let mut net = self.monitor.lock();
        let id = ConnId(net.next_id);
        net.next_id = net.next_id.wrapping_add(1).max(FIRST_CONN_ID);

        let conn = TcpConn::new(
            id,
            remote,
            self.config.readahead_limit,
            self.config.max_callbacks,
        )
        .with_mss(self.config.mss)
        .with_recv_timeout(self.config.recv_timeout());

        net.conns.insert(id, conn);
        info!("{}: opened to {}", id, remote);
        id
    }

    /// Forget a connection, waking anyone still receiving on it
    pub fn close(&self, id: ConnId) -> NetResult<()> {
        let mut net = self.monitor.lock();
        let NetState { conns, pool, .. } = &mut *net;
        let conn = conns.get_mut(&id).ok_or(NetError::ConnNotFound(id))?;

        tcp_disconnect(conn, pool, DisconnectReason::Abort);
        conns.remove(&id);
        self.monitor.notify_all();
        info!("{}: closed", id);
        Ok(())
    }

    pub fn set_nonblocking(&self, id: ConnId, nonblocking: bool) -> NetResult<()> {
        let mut net = self.monitor.lock();
        net.conn_mut(id)?.nonblocking = nonblocking;
        Ok(())
    }

    /// Bound blocking receives; `None` or zero waits indefinitely
    pub fn set_recv_timeout(&self, id: ConnId, timeout: Option<Duration>) -> NetResult<()> {
        let mut net = self.monitor.lock();
        net.conn_mut(id)?.set_recv_timeout(timeout);
        Ok(())
    }

    /// Receive into `buf`
    pub fn recv(&self, id: ConnId, buf: &mut [u8], flags: RecvFlags) -> NetResult<usize> {
        self.recvfrom(id, buf, flags).map(|(n, _)| n)
    }

    /// Receive into `buf`, also reporting the sender of any segment
    /// delivered during the call
    pub fn recvfrom(
        &self,
        id: ConnId,
        buf: &mut [u8],
        flags: RecvFlags,
    ) -> NetResult<(usize, Option<SocketAddr>)> {
        let mut iov = [IoSliceMut::new(buf)];
        let mut msg = RecvMsg::new(&mut iov);
        let n = self.recvmsg(id, &mut msg, flags)?;
        Ok((n, msg.name))
    }

    /// Scatter-gather receive
    ///
    /// Returns the total bytes placed across all regions; `Ok(0)` means the
    /// peer closed the stream.
    ///
    /// A cancel token attached to `msg` must come from this stack's
    /// [`cancel_token`](Self::cancel_token); any other token could never
    /// wake the wait and is rejected.
    pub fn recvmsg(&self, id: ConnId, msg: &mut RecvMsg<'_, '_>, flags: RecvFlags) -> NetResult<usize> {
        if msg.cancel.is_some_and(|token| !self.monitor.owns(token)) {
            return Err(NetError::ForeignCancelToken);
        }

        let span = span_recv(id, msg.iov.len(), msg.capacity());
        let _entered = span.enter();

        let ctx = RecvContext {
            monitor: &self.monitor,
            hooks: self.hooks.as_ref(),
            rss_enabled: self.config.rss_enabled,
            cancel: msg.cancel,
        };

        let ret = {
            let mut net = self.monitor.lock();
            tcp_recvmsg(&ctx, &mut net, id, msg, flags)
        };

        span.record_result(&ret);
        ret
    }

    /// Deliver an inbound segment, as the device layer would
    pub fn input(&self, id: ConnId, segment: &TcpSegment) -> NetResult<TcpEvents> {
        let mut net = self.monitor.lock();
        let NetState { conns, pool, .. } = &mut *net;
        let conn = conns.get_mut(&id).ok_or(NetError::ConnNotFound(id))?;

        let flags = tcp_input(conn, pool, segment);
        self.monitor.notify_all();
        Ok(flags)
    }

    /// Deliver a connection-loss event
    ///
    /// Returns false if the connection was already down.
    pub fn disconnect(&self, id: ConnId, reason: DisconnectReason) -> NetResult<bool> {
        let mut net = self.monitor.lock();
        let NetState { conns, pool, .. } = &mut *net;
        let conn = conns.get_mut(&id).ok_or(NetError::ConnNotFound(id))?;

        let delivered = tcp_disconnect(conn, pool, reason);
        self.monitor.notify_all();
        Ok(delivered)
    }

    /// Attach a connection monitor that sees every event in `mask`
    ///
    /// The handler runs with the network lock held and must not call back
    /// into the stack.
    pub fn register_monitor(
        &self,
        id: ConnId,
        mask: TcpEvents,
        handler: Box<dyn ConnEventHandler>,
    ) -> NetResult<CallbackId> {
        let mut net = self.monitor.lock();
        net.conn_mut(id)?.callbacks.alloc(mask, handler)
    }

    pub fn unregister(&self, id: ConnId, cb: CallbackId) -> NetResult<bool> {
        let mut net = self.monitor.lock();
        Ok(net.conn_mut(id)?.callbacks.free(cb))
    }

    /// Token that interrupts receives waiting on this stack
    pub fn cancel_token(&self) -> CancelToken {
        self.monitor.cancel_token()
    }

    pub fn conn_stats(&self, id: ConnId) -> NetResult<ConnStats> {
        let net = self.monitor.lock();
        Ok(net.conn(id)?.stats())
    }

    pub fn pool_stats(&self) -> IobPoolStats {
        self.monitor.lock().pool.stats()
    }

    pub fn connections(&self) -> Vec<ConnId> {
        let net = self.monitor.lock();
        let mut ids: Vec<ConnId> = net.conns.keys().copied().collect();
        ids.sort();
        ids
    }
}

impl std::fmt::Debug for NetStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetStack")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
