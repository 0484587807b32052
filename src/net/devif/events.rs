/*!
 * Connection Event Flags
 * Bitmask passed between the transport layer and registered callbacks
 */

use bitflags::bitflags;

bitflags! {
    /// Events delivered to connection callbacks
    ///
    /// Handlers receive the current set and return it, possibly modified, to
    /// tell the transport what they consumed.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TcpEvents: u16 {
        /// The in-flight segment also acknowledges data; keep it intact
        const ACKDATA     = 1 << 0;
        /// The in-flight segment carries new payload
        const NEWDATA     = 1 << 1;
        /// Handler consumed data; an ACK should be sent
        const SNDACK      = 1 << 2;
        /// Peer closed gracefully (FIN)
        const CLOSE       = 1 << 4;
        /// Peer aborted (RST)
        const ABORT       = 1 << 5;
        /// Too many retransmissions
        const TIMEDOUT    = 1 << 7;
        /// Network device went down
        const NETDEV_DOWN = 1 << 8;

        /// Every event that ends the connection
        const DISCONN_EVENTS = Self::CLOSE.bits()
            | Self::ABORT.bits()
            | Self::TIMEDOUT.bits()
            | Self::NETDEV_DOWN.bits();
    }
}

impl TcpEvents {
    /// Whether any disconnect-class event is present
    #[inline]
    pub fn is_disconnect(&self) -> bool {
        self.intersects(Self::DISCONN_EVENTS)
    }
}
