/*!
 * Network Stack
 *
 * Stream-socket receive path over a small simulated device layer.
 *
 * ## Layout
 *
 * - **iob**: pooled, segmented byte chains
 * - **devif**: packet context, event flags, callback dispatch, service thread
 * - **tcp**: connection state, segment input, the receive engine
 * - **stack**: the coarse lock and the public socket/device calls
 */

pub mod config;
pub mod devif;
pub mod hooks;
pub mod iob;
pub mod stack;
pub mod tcp;

pub use config::NetConfig;
pub use devif::{DevEvent, NetService, PacketHeader, ServiceStats, TcpEvents};
pub use hooks::{LoggingHooks, NetHooks};
pub use iob::{IobChain, IobPool, IobPoolStats};
pub use stack::NetStack;
pub use tcp::{ConnState, ConnStats, DisconnectReason, RecvFlags, RecvMsg, TcpSegment};
