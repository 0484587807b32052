/*!
 * RTOS Kernel - Network Demo Entry Point
 *
 * Brings up the network stack and its service thread, then streams a
 * message over a loopback connection in small segments while the main
 * thread receives it with blocking reads.
 */

use anyhow::{anyhow, Context, Result};
use bytes::Bytes;
use rtos_kernel::monitoring::init_tracing;
use rtos_kernel::net::DevEvent;
use rtos_kernel::{DisconnectReason, NetConfig, NetService, NetStack, RecvFlags, TcpSegment};
use std::net::SocketAddr;
use std::thread;
use std::time::Duration;
use tracing::info;

const MESSAGE: &[u8] = b"The quick brown fox jumps over the lazy dog, one segment at a time.";

fn main() -> Result<()> {
    init_tracing();

    info!("RTOS kernel network demo starting...");

    let config = NetConfig::from_env().context("loading network config")?;
    let stack = NetStack::new(config);
    let service = NetService::start(stack.clone()).context("starting network service")?;

    let peer: SocketAddr = "127.0.0.1:9000".parse()?;
    let conn = stack.open(peer);
    stack.set_recv_timeout(conn, Some(Duration::from_secs(2)))?;

    let sender = service.sender();
    let device = thread::Builder::new()
        .name("loopback-dev".to_string())
        .spawn(move || {
            for chunk in MESSAGE.chunks(7) {
                let segment = TcpSegment::new(peer, Bytes::copy_from_slice(chunk));
                if sender.send(DevEvent::Segment { conn, segment }).is_err() {
                    return;
                }
                thread::sleep(Duration::from_millis(5));
            }
            let _ = sender.send(DevEvent::Disconnect {
                conn,
                reason: DisconnectReason::Close,
            });
        })
        .context("spawning loopback device")?;

    let mut received = Vec::with_capacity(MESSAGE.len());
    let mut buf = [0u8; 16];
    loop {
        let (n, from) = stack.recvfrom(conn, &mut buf, RecvFlags::empty())?;
        if n == 0 {
            break;
        }
        info!(n, from = ?from, "received");
        received.extend_from_slice(&buf[..n]);
    }

    device
        .join()
        .map_err(|_| anyhow!("loopback device thread panicked"))?;

    let conn_stats = stack.conn_stats(conn)?;
    let service_stats = service.shutdown();

    info!(
        bytes = received.len(),
        intact = received == MESSAGE,
        "stream finished"
    );
    println!("{}", String::from_utf8_lossy(&received));
    println!("{}", serde_json::to_string_pretty(&conn_stats)?);
    println!("{}", serde_json::to_string_pretty(&service_stats)?);

    Ok(())
}
