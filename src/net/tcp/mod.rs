/*!
 * TCP
 * Connection state, the inbound segment path and the receive engine
 */

mod conn;
pub mod datahandler;
pub mod input;
pub mod recvfrom;
pub mod recvwindow;
mod types;

pub use conn::{ConnState, ConnStats, TcpConn};
pub use input::{tcp_disconnect, tcp_input, tcp_lost_connection, DisconnectReason, TcpSegment};
pub use types::{RecvFlags, RecvMsg};
