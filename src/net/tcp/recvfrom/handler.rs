/*!
 * Receive Completion Handler
 *
 * Registered on a connection while a receiver is suspended. Runs on the
 * delivering thread with the coarse lock held, moves arriving bytes into
 * the request, and posts the request once it is satisfied or the
 * connection is lost.
 */

use super::state::RecvRequest;
use crate::core::errors::NetError;
use crate::core::types::CallbackId;
use crate::net::devif::{ConnEventHandler, DevPacket, TcpEvents};
use crate::net::tcp::datahandler::tcp_datahandler;
use crate::net::tcp::input::tcp_lost_connection;
use crate::net::tcp::TcpConn;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, error, trace, warn};

/// Copy what fits from the packet into the request
///
/// Returns the bytes consumed from the packet: zero under PEEK, since the
/// payload stays in the chain for the read-ahead path.
fn recvfrom_newdata(dev: &mut DevPacket, req: &mut RecvRequest) -> usize {
    let want = dev.len().min(req.buflen);

    let start = req.staged.len();
    req.staged.resize(start + want, 0);
    let recvlen = dev.copy_payload(&mut req.staged[start..]);
    req.staged.truncate(start + recvlen);

    let appdata = dev.appdata;
    if req.flags.peek() {
        dev.trim_head(appdata);
    } else {
        dev.trim_head(recvlen + appdata);
    }

    trace!(recvlen, len = dev.len(), "received from packet");
    req.update_recvlen(recvlen);

    if req.flags.peek() {
        0
    } else {
        recvlen
    }
}

/// Move bytes still queued in read-ahead into the request
///
/// Those bytes are older than any packet being delivered, so they go first.
/// Under PEEK nothing is consumed, so the chain still begins with the
/// `recvlen` bytes the request already holds and copying resumes past them.
fn recvfrom_readahead(conn: &mut TcpConn, req: &mut RecvRequest) -> usize {
    let Some(chain) = conn.readahead.as_mut() else {
        return 0;
    };

    let offset = if req.flags.peek() { req.recvlen } else { 0 };
    let want = chain.len().saturating_sub(offset).min(req.buflen);
    let start = req.staged.len();
    req.staged.resize(start + want, 0);
    let copied = chain.copy_out(&mut req.staged[start..], offset);
    req.staged.truncate(start + copied);
    req.update_recvlen(copied);

    if !req.flags.peek() {
        if copied >= chain.len() {
            conn.readahead = None;
        } else {
            chain.trim_head(copied);
        }
    }

    trace!(conn = %conn.id(), copied, "received from read-ahead");
    copied
}

/// Take the packet's data, saving any excess to read-ahead
fn tcp_newdata(
    conn: &mut TcpConn,
    dev: &mut DevPacket,
    req: &mut RecvRequest,
    mut flags: TcpEvents,
) -> TcpEvents {
    let mut recvlen = recvfrom_newdata(dev, req);

    if recvlen < dev.len() {
        let buflen = dev.len() - recvlen;
        let nsaved = tcp_datahandler(conn, dev);
        if nsaved < buflen {
            warn!(
                conn = %conn.id(),
                dropped = buflen - nsaved,
                nsaved,
                recvlen,
                len = dev.len(),
                "packet data not fully saved"
            );
        }
        recvlen += nsaved;
    } else {
        dev.release_iob();
    }

    // Part of the segment was dropped, so its FIN was too
    if recvlen < dev.len() {
        flags.remove(TcpEvents::CLOSE);
    }

    conn.rcvseq = conn.rcvseq.wrapping_add(recvlen as u32);
    dev.len = 0;
    flags
}

/// Handler bound to one receive request
pub struct RecvHandler {
    req: Arc<Mutex<RecvRequest>>,
    cb: CallbackId,
}

impl RecvHandler {
    pub fn new(req: Arc<Mutex<RecvRequest>>, cb: CallbackId) -> Self {
        Self { req, cb }
    }
}

impl ConnEventHandler for RecvHandler {
    fn on_event(
        &mut self,
        conn: &mut TcpConn,
        dev: &mut DevPacket,
        mut flags: TcpEvents,
    ) -> TcpEvents {
        trace!(conn = %conn.id(), cb = %self.cb, ?flags, "receive handler");

        let mut req = self.req.lock();
        if req.posted {
            return flags;
        }

        if flags.contains(TcpEvents::NEWDATA) {
            if let Some(header) = dev.header() {
                req.from = Some(header.sender());
            }

            // Keep an intact copy for the transport when the segment also acks data
            let mut saved = None;
            if flags.contains(TcpEvents::ACKDATA) {
                if let Some(iob) = dev.iob() {
                    match iob.clone_partial(dev.pool(), iob.len(), 0) {
                        Ok(clone) => saved = Some((clone, dev.appdata)),
                        Err(e) => {
                            error!(conn = %conn.id(), error = %e, "packet clone failed");
                            return flags;
                        }
                    }
                }
            }

            recvfrom_readahead(conn, &mut req);
            flags = tcp_newdata(conn, dev, &mut req, flags);

            if let Some((iob, appdata)) = saved {
                dev.replace_iob(iob, appdata);
            }

            flags = (flags - TcpEvents::NEWDATA) | TcpEvents::SNDACK;

            if (req.recvlen > 0 && !req.flags.wait_all()) || req.buflen == 0 {
                debug!(conn = %conn.id(), recvlen = req.recvlen, "receive resumed");
                conn.callbacks.disarm(self.cb);
                req.post();
            }
        } else if flags.is_disconnect() {
            warn!(conn = %conn.id(), ?flags, "lost connection");

            if conn.is_connected() {
                tcp_lost_connection(conn, flags);
            }

            req.result = if flags.contains(TcpEvents::CLOSE) {
                None
            } else {
                Some(NetError::NotConnected)
            };
            conn.callbacks.disarm(self.cb);
            req.post();
        }

        flags
    }
}
