/*!
 * RTOS Kernel Network Library
 * Stream-socket receive engine exposed as a library
 */

pub mod core;
pub mod monitoring;
pub mod net;

// Re-exports
pub use crate::core::errors::{NetError, NetResult};
pub use crate::core::sync::CancelToken;
pub use crate::core::types::{CallbackId, ConnId};
pub use net::{
    DisconnectReason, NetConfig, NetService, NetStack, RecvFlags, RecvMsg, TcpEvents, TcpSegment,
};
