/*!
 * Read-Ahead Save Path
 * Stores payload nobody consumed so a later receive can drain it
 */

use super::conn::TcpConn;
use crate::net::devif::DevPacket;
use log::{trace, warn};

/// Move the packet's unclaimed payload into the connection's read-ahead
///
/// Stores at most the space left under the read-ahead limit; anything past
/// that is dropped. Returns the number of bytes saved.
pub fn tcp_datahandler(conn: &mut TcpConn, dev: &mut DevPacket) -> usize {
    let Some(mut payload) = dev.take_payload() else {
        return 0;
    };

    let available = payload.len();
    let room = conn.recv_window();
    if available > room {
        payload.truncate(room);
        warn!(
            "{}: read-ahead full, dropped {} of {} bytes",
            conn.id(),
            available - room,
            available
        );
    }

    let saved = payload.len();
    conn.push_readahead(payload);
    trace!(
        "{}: saved {} bytes to read-ahead ({} buffered)",
        conn.id(),
        saved,
        conn.readahead_len()
    );
    saved
}
