/*!
 * Device Interface
 *
 * The boundary between network devices and connections: in-flight packet
 * context, event flags, per-connection callback dispatch, and the service
 * thread that delivers device events.
 */

mod callback;
mod device;
mod events;
mod service;

pub use callback::{conn_event, CallbackList, ConnEventHandler};
pub use device::{AddrFamily, DevPacket, PacketHeader, IPV4_TCP_HDRLEN, IPV6_TCP_HDRLEN};
pub use events::TcpEvents;
pub use service::{DevEvent, NetService, ServiceStats};
