/*!
 * Read-Ahead Drain
 * Satisfies a receive from bytes buffered before the call
 */

use super::state::RecvRequest;
use crate::net::tcp::TcpConn;
use tracing::trace;

/// Move read-ahead bytes into `region`
///
/// Writes at `region[req.recvlen..]`. Under PEEK the bytes are copied but
/// stay buffered, and only one pass is made.
pub fn tcp_readahead(conn: &mut TcpConn, req: &mut RecvRequest, region: &mut [u8]) {
    let id = conn.id();
    while req.buflen > 0 {
        let Some(chain) = conn.readahead.as_mut() else {
            break;
        };

        let start = req.recvlen;
        let copied = chain.copy_out(&mut region[start..start + req.buflen], 0);
        trace!(conn = %id, copied, buffered = chain.len(), "drained read-ahead");
        req.update_recvlen(copied);

        if req.flags.peek() {
            break;
        }

        if copied >= chain.len() {
            conn.readahead = None;
        } else {
            chain.trim_head(copied);
        }
    }
}
