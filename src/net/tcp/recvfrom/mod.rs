/*!
 * TCP Receive Engine
 *
 * Synchronizes a caller receiving on a stream connection with data and
 * connection-loss events delivered from the network service thread.
 *
 * ## Flow
 *
 * 1. Drain bytes already buffered in read-ahead
 * 2. Decide: report what was drained, fail fast, or suspend
 * 3. When suspending, register a completion handler on the connection and
 *    wait on the network monitor; the handler copies arriving bytes and
 *    posts the request
 * 4. Free the registration on every exit path and reconcile the outcome
 *
 * A scatter-gather receive repeats this per region without releasing the
 * coarse lock between regions.
 */

mod handler;
mod readahead;
mod result;
mod state;
mod wait;

pub use handler::RecvHandler;
pub use readahead::tcp_readahead;
pub use result::{tcp_recvfrom_result, wait_result};
pub use state::RecvRequest;
pub(crate) use wait::{tcp_recvfrom_one, RecvContext};

use super::types::{RecvFlags, RecvMsg};
use crate::core::errors::NetResult;
use crate::core::sync::MonitorGuard;
use crate::core::types::ConnId;
use crate::net::stack::NetState;
use tracing::trace;

/// Scatter-gather receive
///
/// Fills regions in order. Stops at the first region that ends the stream
/// or fails, and without WAITALL also at the first region left short. An
/// error is only reported when no region received anything.
pub(crate) fn tcp_recvmsg(
    ctx: &RecvContext<'_>,
    net: &mut MonitorGuard<'_, NetState>,
    id: ConnId,
    msg: &mut RecvMsg<'_, '_>,
    flags: RecvFlags,
) -> NetResult<usize> {
    let mut nrecv = 0;
    let mut ret = Ok(0);
    let mut from = None;

    for region in msg.iov.iter_mut() {
        let len = region.len();
        ret = tcp_recvfrom_one(ctx, net, id, &mut region[..], flags, &mut from);

        match ret {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                nrecv += n;
                if !flags.wait_all() && n < len {
                    break;
                }
            }
        }
    }

    if from.is_some() {
        msg.name = from;
    }

    trace!(conn = %id, nrecv, ?ret, "scatter receive done");
    if nrecv > 0 {
        Ok(nrecv)
    } else {
        ret
    }
}
