/*!
 * Read-Ahead Tests
 *
 * Receives that are satisfied, or fail fast, without ever suspending.
 */

use crate::common::{connected, feed, pattern, peer};
use pretty_assertions::assert_eq;
use rtos_kernel::net::ConnState;
use rtos_kernel::{DisconnectReason, NetError, RecvFlags, TcpSegment};

#[test]
fn test_readahead_satisfies_small_buffer() {
    let (stack, id) = connected();
    let data = pattern(150);
    feed(&stack, id, &data);

    let mut buf = [0u8; 100];
    let n = stack.recv(id, &mut buf, RecvFlags::empty()).expect("recv failed");

    assert_eq!(n, 100);
    assert_eq!(&buf[..], &data[..100]);
    assert_eq!(stack.conn_stats(id).unwrap().readahead_bytes, 50);

    let n = stack.recv(id, &mut buf, RecvFlags::empty()).expect("recv failed");
    assert_eq!(n, 50);
    assert_eq!(&buf[..50], &data[100..]);
    assert_eq!(stack.conn_stats(id).unwrap().readahead_bytes, 0);
}

#[test]
fn test_segments_read_back_in_order() {
    let (stack, id) = connected();
    feed(&stack, id, b"first ");
    feed(&stack, id, b"second ");
    feed(&stack, id, b"third");

    let mut buf = [0u8; 64];
    let n = stack.recv(id, &mut buf, RecvFlags::empty()).unwrap();
    assert_eq!(&buf[..n], b"first second third");
}

#[test]
fn test_peek_leaves_data_in_place() {
    let (stack, id) = connected();
    feed(&stack, id, b"peekaboo");

    let mut first = [0u8; 4];
    let mut second = [0u8; 4];
    assert_eq!(stack.recv(id, &mut first, RecvFlags::PEEK), Ok(4));
    assert_eq!(stack.recv(id, &mut second, RecvFlags::PEEK), Ok(4));
    assert_eq!(first, second);
    assert_eq!(&first, b"peek");
    assert_eq!(stack.conn_stats(id).unwrap().readahead_bytes, 8);

    let mut all = [0u8; 8];
    assert_eq!(stack.recv(id, &mut all, RecvFlags::empty()), Ok(8));
    assert_eq!(&all, b"peekaboo");
}

#[test]
fn test_peek_never_consumes_buffers() {
    let (stack, id) = connected();
    feed(&stack, id, &pattern(600));
    let before = stack.pool_stats();

    let mut buf = [0u8; 1000];
    let n = stack.recv(id, &mut buf, RecvFlags::PEEK).unwrap();

    assert!(n > 0 && n <= 600);
    assert_eq!(stack.pool_stats(), before);
}

#[test]
fn test_nonblocking_without_data() {
    let (stack, id) = connected();
    stack.set_nonblocking(id, true).unwrap();

    let mut buf = [0u8; 8];
    assert_eq!(
        stack.recv(id, &mut buf, RecvFlags::empty()),
        Err(NetError::WouldBlock)
    );
    assert_eq!(stack.conn_stats(id).unwrap().registrations, 0);
}

#[test]
fn test_dontwait_flag() {
    let (stack, id) = connected();
    let mut buf = [0u8; 8];

    assert_eq!(
        stack.recv(id, &mut buf, RecvFlags::DONTWAIT),
        Err(NetError::WouldBlock)
    );

    feed(&stack, id, b"abc");
    assert_eq!(stack.recv(id, &mut buf, RecvFlags::DONTWAIT), Ok(3));
}

#[test]
fn test_dontwait_ignores_waitall_shortfall() {
    let (stack, id) = connected();
    feed(&stack, id, b"abc");

    let mut buf = [0u8; 8];
    assert_eq!(
        stack.recv(id, &mut buf, RecvFlags::DONTWAIT | RecvFlags::WAITALL),
        Ok(3)
    );
}

#[test]
fn test_graceful_close_reads_zero() {
    let (stack, id) = connected();
    assert_eq!(stack.disconnect(id, DisconnectReason::Close), Ok(true));

    let mut buf = [0u8; 8];
    assert_eq!(stack.recv(id, &mut buf, RecvFlags::empty()), Ok(0));
    assert_eq!(stack.recv(id, &mut buf, RecvFlags::empty()), Ok(0));
}

#[test]
fn test_fin_with_data_drains_before_eof() {
    let (stack, id) = connected();
    stack
        .input(id, &TcpSegment::new(peer(), &b"bye"[..]).with_fin())
        .unwrap();
    assert_eq!(
        stack.conn_stats(id).unwrap().state,
        ConnState::Closed { graceful: true }
    );

    let mut buf = [0u8; 8];
    assert_eq!(stack.recv(id, &mut buf, RecvFlags::empty()), Ok(3));
    assert_eq!(&buf[..3], b"bye");
    assert_eq!(stack.recv(id, &mut buf, RecvFlags::empty()), Ok(0));
}

#[test]
fn test_abort_reports_not_connected() {
    let (stack, id) = connected();
    stack.disconnect(id, DisconnectReason::Abort).unwrap();

    let mut buf = [0u8; 8];
    assert_eq!(
        stack.recv(id, &mut buf, RecvFlags::empty()),
        Err(NetError::NotConnected)
    );
}

#[test]
fn test_abort_after_data_reports_data_first() {
    let (stack, id) = connected();
    feed(&stack, id, b"salvage");
    stack.disconnect(id, DisconnectReason::TimedOut).unwrap();

    let mut buf = [0u8; 16];
    assert_eq!(stack.recv(id, &mut buf, RecvFlags::WAITALL), Ok(7));
    assert_eq!(&buf[..7], b"salvage");
    assert_eq!(
        stack.recv(id, &mut buf, RecvFlags::empty()),
        Err(NetError::NotConnected)
    );
}

#[test]
fn test_segments_after_disconnect_are_dropped() {
    let (stack, id) = connected();
    stack.disconnect(id, DisconnectReason::NetdevDown).unwrap();
    feed(&stack, id, b"late");

    assert_eq!(stack.conn_stats(id).unwrap().readahead_bytes, 0);
}

#[test]
fn test_zero_length_buffer() {
    let (stack, id) = connected();
    feed(&stack, id, b"data");

    let mut buf = [0u8; 0];
    assert_eq!(stack.recv(id, &mut buf, RecvFlags::empty()), Ok(0));
    assert_eq!(stack.conn_stats(id).unwrap().readahead_bytes, 4);
}

#[test]
fn test_readahead_limit_truncates_and_keeps_fin_pending() {
    let config = rtos_kernel::NetConfig {
        readahead_limit: 8,
        ..Default::default()
    };
    let stack = rtos_kernel::NetStack::new(config);
    let id = stack.open(peer());

    stack
        .input(id, &TcpSegment::new(peer(), &b"0123456789"[..]).with_fin())
        .unwrap();

    let stats = stack.conn_stats(id).unwrap();
    assert_eq!(stats.readahead_bytes, 8);
    assert_eq!(stats.rcvseq, 8);
    assert_eq!(stats.state, ConnState::Connected);
}
