/*!
 * Blocking Receive Tests
 *
 * Receivers that suspend on the stack while another thread plays the
 * device: data arrival, close, abort, timeout and cancellation.
 */

use crate::common::{connected, feed, pattern, peer, wait_for_registrations};
use pretty_assertions::assert_eq;
use rtos_kernel::net::devif::DevPacket;
use rtos_kernel::net::tcp::TcpConn;
use rtos_kernel::net::TcpEvents;
use rtos_kernel::{
    ConnId, DisconnectReason, NetConfig, NetError, NetStack, RecvFlags, RecvMsg, TcpSegment,
};
use std::io::IoSliceMut;
use std::net::SocketAddr;
use std::thread;
use std::time::{Duration, Instant};

/// Start a receive of `len` bytes on a separate thread
fn spawn_recv(
    stack: &NetStack,
    id: ConnId,
    len: usize,
    flags: RecvFlags,
) -> thread::JoinHandle<(Result<usize, NetError>, Vec<u8>)> {
    let stack = stack.clone();
    thread::spawn(move || {
        let mut buf = vec![0u8; len];
        let ret = stack.recv(id, &mut buf, flags);
        (ret, buf)
    })
}

#[test]
fn test_waiter_receives_arriving_segment() {
    let (stack, id) = connected();
    let receiver = spawn_recv(&stack, id, 32, RecvFlags::empty());

    wait_for_registrations(&stack, id, 1);
    feed(&stack, id, b"hello");

    let (ret, buf) = receiver.join().expect("receiver panicked");
    assert_eq!(ret, Ok(5));
    assert_eq!(&buf[..5], b"hello");

    let stats = stack.conn_stats(id).unwrap();
    assert_eq!(stats.registrations, 0);
    assert_eq!(stats.readahead_bytes, 0);
    assert_eq!(stats.rcvseq, 5);
}

#[test]
fn test_excess_bytes_land_in_readahead() {
    let (stack, id) = connected();
    let data = pattern(40);
    let receiver = spawn_recv(&stack, id, 16, RecvFlags::empty());

    wait_for_registrations(&stack, id, 1);
    feed(&stack, id, &data);

    let (ret, buf) = receiver.join().unwrap();
    assert_eq!(ret, Ok(16));
    assert_eq!(buf, data[..16].to_vec());
    assert_eq!(stack.conn_stats(id).unwrap().readahead_bytes, 24);

    let mut rest = [0u8; 64];
    let n = stack.recv(id, &mut rest, RecvFlags::empty()).unwrap();
    assert_eq!(&rest[..n], &data[16..]);
}

#[test]
fn test_waitall_accumulates_across_segments() {
    let (stack, id) = connected();
    let receiver = spawn_recv(&stack, id, 10, RecvFlags::WAITALL);

    wait_for_registrations(&stack, id, 1);
    for chunk in [b"abcd", b"efgh", b"ijkl"] {
        feed(&stack, id, chunk);
        thread::sleep(Duration::from_millis(5));
    }

    let (ret, buf) = receiver.join().unwrap();
    assert_eq!(ret, Ok(10));
    assert_eq!(&buf, b"abcdefghij");
    assert_eq!(stack.conn_stats(id).unwrap().readahead_bytes, 2);
}

#[test]
fn test_waitall_cut_short_by_close() {
    let (stack, id) = connected();
    let receiver = spawn_recv(&stack, id, 10, RecvFlags::WAITALL);

    wait_for_registrations(&stack, id, 1);
    feed(&stack, id, b"part");
    stack.disconnect(id, DisconnectReason::Close).unwrap();

    let (ret, buf) = receiver.join().unwrap();
    assert_eq!(ret, Ok(4));
    assert_eq!(&buf[..4], b"part");

    let mut again = [0u8; 4];
    assert_eq!(stack.recv(id, &mut again, RecvFlags::empty()), Ok(0));
}

#[test]
fn test_data_beats_abort() {
    let (stack, id) = connected();
    let receiver = spawn_recv(&stack, id, 10, RecvFlags::WAITALL);

    wait_for_registrations(&stack, id, 1);
    feed(&stack, id, b"four");
    stack.disconnect(id, DisconnectReason::Abort).unwrap();

    let (ret, buf) = receiver.join().unwrap();
    assert_eq!(ret, Ok(4));
    assert_eq!(&buf[..4], b"four");
}

#[test]
fn test_close_while_waiting_reads_zero() {
    let (stack, id) = connected();
    let receiver = spawn_recv(&stack, id, 8, RecvFlags::empty());

    wait_for_registrations(&stack, id, 1);
    stack.disconnect(id, DisconnectReason::Close).unwrap();

    let (ret, _) = receiver.join().unwrap();
    assert_eq!(ret, Ok(0));
}

#[test]
fn test_abort_while_waiting() {
    for reason in [
        DisconnectReason::Abort,
        DisconnectReason::TimedOut,
        DisconnectReason::NetdevDown,
    ] {
        let (stack, id) = connected();
        let receiver = spawn_recv(&stack, id, 8, RecvFlags::empty());

        wait_for_registrations(&stack, id, 1);
        stack.disconnect(id, reason).unwrap();

        let (ret, _) = receiver.join().unwrap();
        assert_eq!(ret, Err(NetError::NotConnected), "reason {:?}", reason);
        assert_eq!(stack.conn_stats(id).unwrap().registrations, 0);
    }
}

#[test]
fn test_local_close_wakes_waiter() {
    let (stack, id) = connected();
    let receiver = spawn_recv(&stack, id, 8, RecvFlags::empty());

    wait_for_registrations(&stack, id, 1);
    stack.close(id).unwrap();

    let (ret, _) = receiver.join().unwrap();
    assert_eq!(ret, Err(NetError::NotConnected));
    assert!(stack.connections().is_empty());
}

#[test]
fn test_timeout_reports_would_block() {
    let (stack, id) = connected();
    stack
        .set_recv_timeout(id, Some(Duration::from_millis(50)))
        .unwrap();

    let start = Instant::now();
    let mut buf = [0u8; 8];
    assert_eq!(
        stack.recv(id, &mut buf, RecvFlags::empty()),
        Err(NetError::WouldBlock)
    );
    assert!(start.elapsed() >= Duration::from_millis(50));
    assert_eq!(stack.conn_stats(id).unwrap().registrations, 0);

    // Nothing is listening any more, so the next segment is buffered
    feed(&stack, id, b"later");
    assert_eq!(stack.conn_stats(id).unwrap().readahead_bytes, 5);
}

#[test]
fn test_zero_timeout_waits_for_data() {
    let config = NetConfig::from_json(r#"{"recv_timeout_ms": 0}"#).unwrap();
    let stack = NetStack::new(config);
    let id = stack.open(peer());
    let receiver = spawn_recv(&stack, id, 8, RecvFlags::empty());

    wait_for_registrations(&stack, id, 1);
    thread::sleep(Duration::from_millis(30));
    assert!(!receiver.is_finished());

    stack.set_recv_timeout(id, Some(Duration::ZERO)).unwrap();
    feed(&stack, id, b"late");
    assert_eq!(receiver.join().unwrap().0, Ok(4));
}

#[test]
fn test_waitall_timeout_keeps_partial_data() {
    let (stack, id) = connected();
    stack
        .set_recv_timeout(id, Some(Duration::from_millis(100)))
        .unwrap();
    let receiver = spawn_recv(&stack, id, 16, RecvFlags::WAITALL);

    wait_for_registrations(&stack, id, 1);
    feed(&stack, id, b"only six");

    let (ret, buf) = receiver.join().unwrap();
    assert_eq!(ret, Ok(8));
    assert_eq!(&buf[..8], b"only six");
}

#[test]
fn test_cancel_interrupts_waiter() {
    let (stack, id) = connected();
    let token = stack.cancel_token();

    let receiver = {
        let stack = stack.clone();
        let token = token.clone();
        thread::spawn(move || {
            let mut buf = [0u8; 16];
            let mut iov = [IoSliceMut::new(&mut buf)];
            let mut msg = RecvMsg::new(&mut iov).with_cancel(&token);
            stack.recvmsg(id, &mut msg, RecvFlags::empty())
        })
    };

    wait_for_registrations(&stack, id, 1);
    token.cancel();

    assert_eq!(receiver.join().unwrap(), Err(NetError::Interrupted));
    assert_eq!(stack.conn_stats(id).unwrap().registrations, 0);

    // The abandoned request must never see this
    feed(&stack, id, b"after cancel");
    assert_eq!(stack.conn_stats(id).unwrap().readahead_bytes, 12);
}

#[test]
fn test_cancel_before_wait() {
    let (stack, id) = connected();
    let token = stack.cancel_token();
    token.cancel();

    let mut buf = [0u8; 8];
    let mut iov = [IoSliceMut::new(&mut buf)];
    let mut msg = RecvMsg::new(&mut iov).with_cancel(&token);
    assert_eq!(
        stack.recvmsg(id, &mut msg, RecvFlags::empty()),
        Err(NetError::Interrupted)
    );
}

#[test]
fn test_token_from_other_stack_rejected() {
    let (stack, id) = connected();
    let other = crate::common::stack();
    let token = other.cancel_token();
    stack
        .set_recv_timeout(id, Some(Duration::from_secs(5)))
        .unwrap();

    let start = Instant::now();
    let mut buf = [0u8; 8];
    let mut iov = [IoSliceMut::new(&mut buf)];
    let mut msg = RecvMsg::new(&mut iov).with_cancel(&token);
    assert_eq!(
        stack.recvmsg(id, &mut msg, RecvFlags::empty()),
        Err(NetError::ForeignCancelToken)
    );
    assert!(start.elapsed() < Duration::from_secs(1));
    assert_eq!(stack.conn_stats(id).unwrap().registrations, 0);

    // The stack's own token still works
    let own = stack.cancel_token();
    own.cancel();
    let mut iov = [IoSliceMut::new(&mut buf)];
    let mut msg = RecvMsg::new(&mut iov).with_cancel(&own);
    assert_eq!(
        stack.recvmsg(id, &mut msg, RecvFlags::empty()),
        Err(NetError::Interrupted)
    );
}

#[test]
fn test_registrations_exhausted() {
    let config = NetConfig {
        max_callbacks: 1,
        ..Default::default()
    };
    let stack = NetStack::new(config);
    let id = stack.open(peer());

    let monitor = stack
        .register_monitor(
            id,
            TcpEvents::DISCONN_EVENTS,
            Box::new(|_: &mut TcpConn, _: &mut DevPacket, flags: TcpEvents| flags),
        )
        .unwrap();

    let mut buf = [0u8; 8];
    assert!(matches!(
        stack.recv(id, &mut buf, RecvFlags::empty()),
        Err(NetError::ResourceExhausted(_))
    ));

    // Drained bytes are still reported when the wait cannot be set up
    feed(&stack, id, b"abc");
    assert_eq!(stack.recv(id, &mut buf, RecvFlags::WAITALL), Ok(3));

    assert_eq!(stack.unregister(id, monitor), Ok(true));
    let receiver = spawn_recv(&stack, id, 8, RecvFlags::empty());
    wait_for_registrations(&stack, id, 1);
    feed(&stack, id, b"free");
    assert_eq!(receiver.join().unwrap().0, Ok(4));
}

#[test]
fn test_sender_address_reported() {
    let stack = crate::common::stack();
    let remote: SocketAddr = "[2001:db8::7]:4433".parse().unwrap();
    let id = stack.open(remote);

    let receiver = {
        let stack = stack.clone();
        thread::spawn(move || {
            let mut buf = [0u8; 8];
            stack.recvfrom(id, &mut buf, RecvFlags::empty())
        })
    };

    wait_for_registrations(&stack, id, 1);
    stack
        .input(id, &TcpSegment::new(remote, &b"v6"[..]))
        .unwrap();

    assert_eq!(receiver.join().unwrap(), Ok((2, Some(remote))));
}

#[test]
fn test_two_waiters_each_get_one_segment() {
    let (stack, id) = connected();
    let a = spawn_recv(&stack, id, 16, RecvFlags::empty());
    let b = spawn_recv(&stack, id, 16, RecvFlags::empty());

    wait_for_registrations(&stack, id, 2);
    feed(&stack, id, b"one");
    feed(&stack, id, b"two");

    let mut got: Vec<Vec<u8>> = [a, b]
        .into_iter()
        .map(|h| {
            let (ret, buf) = h.join().unwrap();
            buf[..ret.unwrap()].to_vec()
        })
        .collect();
    got.sort();

    assert_eq!(got, vec![b"one".to_vec(), b"two".to_vec()]);
    assert_eq!(stack.conn_stats(id).unwrap().readahead_bytes, 0);
}

#[test]
fn test_monitor_sees_disconnect_alongside_receiver() {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    let (stack, id) = connected();
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&seen);
    stack
        .register_monitor(
            id,
            TcpEvents::DISCONN_EVENTS,
            Box::new(move |_: &mut TcpConn, _: &mut DevPacket, flags: TcpEvents| {
                counter.fetch_add(1, Ordering::SeqCst);
                flags
            }),
        )
        .unwrap();

    let receiver = spawn_recv(&stack, id, 8, RecvFlags::empty());
    wait_for_registrations(&stack, id, 2);
    stack.disconnect(id, DisconnectReason::Abort).unwrap();

    assert_eq!(receiver.join().unwrap().0, Err(NetError::NotConnected));
    assert_eq!(seen.load(Ordering::SeqCst), 1);
}

#[test]
fn test_ackdata_segment_reaches_waiter() {
    let (stack, id) = connected();
    let receiver = spawn_recv(&stack, id, 16, RecvFlags::empty());

    wait_for_registrations(&stack, id, 1);
    stack
        .input(id, &TcpSegment::new(peer(), &b"acked"[..]).with_ackdata())
        .unwrap();

    let (ret, buf) = receiver.join().unwrap();
    assert_eq!(ret, Ok(5));
    assert_eq!(&buf[..5], b"acked");
    assert_eq!(stack.pool_stats().free, stack.pool_stats().total);
}

#[test]
fn test_stream_order_kept_when_ackdata_copy_fails() {
    let stack = NetStack::new(NetConfig {
        iob_bufsize: 16,
        iob_nbuffers: 8,
        ..Default::default()
    });
    let id = stack.open(peer());
    let receiver = spawn_recv(&stack, id, 8, RecvFlags::WAITALL);
    wait_for_registrations(&stack, id, 1);

    // 70 bytes with header room: five buffers, too many to copy as well
    let first = pattern(30);
    stack
        .input(id, &TcpSegment::new(peer(), first.clone()).with_ackdata())
        .unwrap();
    assert_eq!(stack.conn_stats(id).unwrap().readahead_bytes, 30);

    feed(&stack, id, b"efgh");

    let (ret, buf) = receiver.join().unwrap();
    assert_eq!(ret, Ok(8));
    assert_eq!(buf, first[..8].to_vec());

    let mut rest = [0u8; 64];
    let n = stack.recv(id, &mut rest, RecvFlags::empty()).unwrap();
    let mut expected = first[8..].to_vec();
    expected.extend_from_slice(b"efgh");
    assert_eq!(rest[..n].to_vec(), expected);
}
