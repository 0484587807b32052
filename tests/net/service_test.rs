/*!
 * Network Service Tests
 *
 * End-to-end streams through the service thread, plus property checks that
 * segmentation never changes what the reader sees.
 */

use crate::common::{pattern, peer};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rtos_kernel::net::ConnState;
use rtos_kernel::{
    DisconnectReason, NetConfig, NetService, NetStack, RecvFlags, TcpSegment,
};
use std::thread;
use std::time::Duration;

fn roomy_config() -> NetConfig {
    NetConfig {
        iob_nbuffers: 4096,
        readahead_limit: 64 * 1024,
        ..Default::default()
    }
}

/// Read until end-of-stream using buffers of the given sizes, cycling
fn drain(stack: &NetStack, id: rtos_kernel::ConnId, sizes: &[usize]) -> Vec<u8> {
    let mut out = Vec::new();
    for size in sizes.iter().cycle() {
        let mut buf = vec![0u8; *size];
        let n = stack
            .recv(id, &mut buf, RecvFlags::empty())
            .expect("recv failed");
        if n == 0 {
            break;
        }
        out.extend_from_slice(&buf[..n]);
    }
    out
}

#[test]
fn test_stream_through_service() {
    let stack = NetStack::new(roomy_config());
    let id = stack.open(peer());
    let service = NetService::start(stack.clone()).expect("service failed to start");

    let data = pattern(4000);
    let device = {
        let sender = service.sender();
        let data = data.clone();
        thread::spawn(move || {
            for chunk in data.chunks(97) {
                let segment = TcpSegment::new(peer(), chunk.to_vec());
                sender
                    .send(rtos_kernel::net::DevEvent::Segment { conn: id, segment })
                    .expect("service gone");
                thread::sleep(Duration::from_micros(200));
            }
            sender
                .send(rtos_kernel::net::DevEvent::Disconnect {
                    conn: id,
                    reason: DisconnectReason::Close,
                })
                .expect("service gone");
        })
    };

    let received = drain(&stack, id, &[64, 200, 13]);
    device.join().unwrap();

    assert_eq!(received.len(), data.len());
    assert!(received == data, "stream corrupted");

    let stats = service.shutdown();
    assert_eq!(stats.segments, data.chunks(97).count() as u64);
    assert_eq!(stats.disconnects, 1);
    assert_eq!(stats.orphaned, 0);

    let conn = stack.conn_stats(id).unwrap();
    assert_eq!(conn.state, ConnState::Closed { graceful: true });
    assert_eq!(conn.rcvseq, 4000);
    assert_eq!(stack.pool_stats().free, stack.pool_stats().total);
}

#[test]
fn test_service_counts_orphans() {
    let stack = NetStack::new(NetConfig::default());
    let id = stack.open(peer());
    stack.close(id).unwrap();

    let service = NetService::start(stack).unwrap();
    assert!(service.deliver_segment(id, TcpSegment::new(peer(), &b"ghost"[..])));
    assert!(service.deliver_disconnect(id, DisconnectReason::Abort));

    let stats = service.shutdown();
    assert_eq!(stats.orphaned, 2);
    assert_eq!(stats.segments, 0);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_segmentation_is_invisible(
        data in proptest::collection::vec(any::<u8>(), 1..1500),
        cuts in proptest::collection::vec(1usize..200, 1..16),
        reads in proptest::collection::vec(1usize..300, 1..8),
    ) {
        let stack = NetStack::new(roomy_config());
        let id = stack.open(peer());

        let mut rest = &data[..];
        for cut in cuts.iter().cycle() {
            if rest.is_empty() {
                break;
            }
            let (head, tail) = rest.split_at((*cut).min(rest.len()));
            stack.input(id, &TcpSegment::new(peer(), head.to_vec())).unwrap();
            rest = tail;
        }
        stack.disconnect(id, DisconnectReason::Close).unwrap();

        let received = drain(&stack, id, &reads);
        prop_assert_eq!(received, data);
        prop_assert_eq!(stack.pool_stats().free, stack.pool_stats().total);
    }

    #[test]
    fn prop_peek_matches_following_read(
        data in proptest::collection::vec(any::<u8>(), 1..400),
        len in 1usize..500,
    ) {
        let stack = NetStack::new(roomy_config());
        let id = stack.open(peer());
        stack.input(id, &TcpSegment::new(peer(), data.clone())).unwrap();

        let mut peeked = vec![0u8; len];
        let mut read = vec![0u8; len];
        let p = stack.recv(id, &mut peeked, RecvFlags::PEEK).unwrap();
        let r = stack.recv(id, &mut read, RecvFlags::empty()).unwrap();

        prop_assert_eq!(p, r);
        prop_assert_eq!(&peeked[..p], &read[..r]);
        prop_assert_eq!(stack.conn_stats(id).unwrap().readahead_bytes, data.len() - r);
    }
}
