/*!
 * Blocking Receive Orchestrator
 *
 * Receives into one caller region: drains read-ahead, decides whether the
 * caller may suspend, and if so registers a completion handler and waits on
 * the network monitor until the handler posts, the receive timeout
 * elapses, or the wait is cancelled.
 */

use super::handler::RecvHandler;
use super::readahead::tcp_readahead;
use super::result::{tcp_recvfrom_result, wait_result};
use super::state::RecvRequest;
use crate::core::errors::{NetError, NetResult};
use crate::core::guard::CallbackGuard;
use crate::core::sync::{CancelToken, Monitor, MonitorGuard};
use crate::core::types::{this_cpu, ConnId};
use crate::net::devif::{ConnEventHandler, TcpEvents};
use crate::net::hooks::NetHooks;
use crate::net::stack::NetState;
use crate::net::tcp::recvwindow::tcp_should_send_recvwindow;
use crate::net::tcp::{RecvFlags, TcpConn};
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, warn};

/// Everything a receive needs besides the locked state
pub(crate) struct RecvContext<'a> {
    pub monitor: &'a Monitor<NetState>,
    pub hooks: &'a dyn NetHooks,
    pub rss_enabled: bool,
    pub cancel: Option<&'a CancelToken>,
}

/// Report a change of the execution unit servicing `conn`
fn tcp_notify_recvcpu(conn: &mut TcpConn, hooks: &dyn NetHooks) {
    let cpu = this_cpu();
    if conn.rcvcpu != Some(cpu) {
        conn.rcvcpu = Some(cpu);
        hooks.notify_affinity_changed(conn.id(), cpu);
    }
}

/// Suspend until the handler completes `req`
fn tcp_recvfrom_wait(
    ctx: &RecvContext<'_>,
    net: &mut MonitorGuard<'_, NetState>,
    id: ConnId,
    region: &mut [u8],
    req: RecvRequest,
    from: &mut Option<SocketAddr>,
) -> NetResult<usize> {
    let drained = req.recvlen;
    let shared = Arc::new(Mutex::new(req));

    let conn = net.conn_mut(id)?;
    let timeout = conn.rcvtimeo;
    let handler_req = Arc::clone(&shared);
    let cb = match conn
        .callbacks
        .alloc_with(TcpEvents::NEWDATA | TcpEvents::DISCONN_EVENTS, |cb| {
            Box::new(RecvHandler::new(handler_req, cb)) as Box<dyn ConnEventHandler>
        }) {
        Ok(cb) => cb,
        Err(e) => {
            warn!(conn = %id, error = %e, drained, "cannot register receive handler");
            return if drained > 0 { Ok(drained) } else { Err(e) };
        }
    };

    let waited = {
        let mut guard = CallbackGuard::new(ctx.monitor, net, id, cb);
        let outcome = guard.wait(timeout, ctx.cancel, |_| shared.lock().posted);
        debug!(conn = %id, ?outcome, "receive wait finished");
        wait_result(outcome)
    };

    let mut req = shared.lock();
    req.unstage(region, drained);
    if req.from.is_some() {
        *from = req.from;
    }
    tcp_recvfrom_result(waited, &req)
}

/// Receive into a single region
///
/// Called with the coarse lock held; the lock is only released while
/// suspended. Returns `Ok(0)` for end-of-stream.
pub(crate) fn tcp_recvfrom_one(
    ctx: &RecvContext<'_>,
    net: &mut MonitorGuard<'_, NetState>,
    id: ConnId,
    region: &mut [u8],
    flags: RecvFlags,
    from: &mut Option<SocketAddr>,
) -> NetResult<usize> {
    let mut req = RecvRequest::new(region.len(), flags);

    let conn = net.conn_mut(id)?;

    // Read-ahead may hold data even after the connection went away
    tcp_readahead(conn, &mut req, region);

    let mut ret = Ok(req.recvlen);

    if !conn.is_connected() {
        // Drained data is reported now; the disconnect on the next call
        if req.recvlen == 0 && !conn.is_closed() {
            ret = Err(NetError::NotConnected);
        }
    } else if conn.nonblocking || flags.dont_wait() {
        if req.recvlen == 0 {
            ret = Err(NetError::WouldBlock);
        }
    } else if (flags.wait_all() || req.recvlen == 0) && req.buflen > 0 {
        ret = tcp_recvfrom_wait(ctx, net, id, region, req, from);
    }

    // The connection may have been released while we were suspended
    if let Ok(conn) = net.conn_mut(id) {
        if tcp_should_send_recvwindow(conn) {
            ctx.hooks.notify_window_available(id);
        }
        if ctx.rss_enabled {
            tcp_notify_recvcpu(conn, ctx.hooks);
        }
    }

    ret
}
