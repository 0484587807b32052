/*!
 * Receive Window Tracking
 *
 * Decides when draining read-ahead has opened enough space to be worth
 * telling the peer about. Small openings are held back so the sender is not
 * invited to trickle tiny segments.
 */

use super::conn::TcpConn;

/// Smallest window growth worth advertising
#[inline]
fn update_threshold(conn: &TcpConn) -> usize {
    conn.mss.min(conn.readahead_limit / 2).max(1)
}

/// Record the window carried by an outgoing ACK
pub fn tcp_update_recvwindow(conn: &mut TcpConn) {
    conn.rcv_adv = conn.recv_window();
}

/// Whether the window grew enough since the last advertisement
///
/// Returns true at most once per opening; the new window is recorded as
/// advertised.
pub fn tcp_should_send_recvwindow(conn: &mut TcpConn) -> bool {
    let window = conn.recv_window();
    if window >= conn.rcv_adv.saturating_add(update_threshold(conn)) {
        conn.rcv_adv = window;
        true
    } else {
        false
    }
}
