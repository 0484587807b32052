/*!
 * In-Flight Packet Context
 *
 * What a device hands to connection callbacks while an inbound segment is
 * being processed: the buffer chain (headers followed by payload), where the
 * payload starts, the segment's payload length, and the addressing needed
 * to report the sender.
 */

use crate::net::iob::{IobChain, IobPool, IobResult};
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV4, SocketAddrV6};

/// Opaque bytes reserved ahead of the payload for IPv4 + TCP headers
pub const IPV4_TCP_HDRLEN: usize = 20 + 20;

/// Opaque bytes reserved ahead of the payload for IPv6 + TCP headers
pub const IPV6_TCP_HDRLEN: usize = 40 + 20;

/// Address family of an inbound segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddrFamily {
    Inet,
    Inet6,
}

/// Source addressing of an inbound segment, tagged by family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketHeader {
    Ipv4 { src: Ipv4Addr, src_port: u16 },
    Ipv6 { src: Ipv6Addr, src_port: u16 },
}

impl PacketHeader {
    pub fn family(&self) -> AddrFamily {
        match self {
            PacketHeader::Ipv4 { .. } => AddrFamily::Inet,
            PacketHeader::Ipv6 { .. } => AddrFamily::Inet6,
        }
    }

    /// Bytes of header room preceding the payload in the buffer chain
    pub fn header_len(&self) -> usize {
        match self.family() {
            AddrFamily::Inet => IPV4_TCP_HDRLEN,
            AddrFamily::Inet6 => IPV6_TCP_HDRLEN,
        }
    }

    /// Sender address as a socket address of the matching family
    pub fn sender(&self) -> SocketAddr {
        match *self {
            PacketHeader::Ipv4 { src, src_port } => {
                SocketAddr::V4(SocketAddrV4::new(src, src_port))
            }
            PacketHeader::Ipv6 { src, src_port } => {
                SocketAddr::V6(SocketAddrV6::new(src, src_port, 0, 0))
            }
        }
    }
}

impl From<SocketAddr> for PacketHeader {
    fn from(addr: SocketAddr) -> Self {
        match addr {
            SocketAddr::V4(a) => PacketHeader::Ipv4 {
                src: *a.ip(),
                src_port: a.port(),
            },
            SocketAddr::V6(a) => PacketHeader::Ipv6 {
                src: *a.ip(),
                src_port: a.port(),
            },
        }
    }
}

/// Packet being processed by the device
pub struct DevPacket {
    pool: IobPool,
    pub(crate) header: Option<PacketHeader>,
    pub(crate) iob: Option<IobChain>,
    /// Offset of the payload within `iob`
    pub(crate) appdata: usize,
    /// Payload length of the segment; zeroed once the segment is fully claimed
    pub(crate) len: usize,
}

impl DevPacket {
    /// Build a packet carrying `payload`, with header room ahead of it
    pub fn from_payload(pool: &IobPool, header: PacketHeader, payload: &[u8]) -> IobResult<Self> {
        let room = vec![0u8; header.header_len()];
        let iob = pool.try_alloc_parts(&[&room, payload])?;

        Ok(Self {
            pool: pool.clone(),
            header: Some(header),
            iob: Some(iob),
            appdata: room.len(),
            len: payload.len(),
        })
    }

    /// Packet with no payload, used for pure state-change events
    pub fn empty(pool: &IobPool) -> Self {
        Self {
            pool: pool.clone(),
            header: None,
            iob: None,
            appdata: 0,
            len: 0,
        }
    }

    #[inline]
    pub fn pool(&self) -> &IobPool {
        &self.pool
    }

    #[inline]
    pub fn header(&self) -> Option<&PacketHeader> {
        self.header.as_ref()
    }

    /// Payload length still owed to the connection
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn iob(&self) -> Option<&IobChain> {
        self.iob.as_ref()
    }

    /// Copy payload into `dest` without consuming it
    pub fn copy_payload(&self, dest: &mut [u8]) -> usize {
        let want = dest.len().min(self.len);
        match &self.iob {
            Some(iob) => iob.copy_out(&mut dest[..want], self.appdata),
            None => 0,
        }
    }

    /// Trim `n` bytes off the head of the chain
    ///
    /// Trimming past the header room moves the payload start to the new head.
    pub(crate) fn trim_head(&mut self, n: usize) {
        if let Some(iob) = self.iob.as_mut() {
            iob.trim_head(n);
        }
        self.appdata = self.appdata.saturating_sub(n);
    }

    /// Release the buffer chain back to the pool
    pub(crate) fn release_iob(&mut self) {
        self.iob = None;
        self.appdata = 0;
    }

    /// Install a replacement chain (an intact copy of the segment)
    pub(crate) fn replace_iob(&mut self, iob: IobChain, appdata: usize) {
        self.iob = Some(iob);
        self.appdata = appdata;
    }

    /// Take the unclaimed payload, leaving the packet without a chain
    pub(crate) fn take_payload(&mut self) -> Option<IobChain> {
        let mut iob = self.iob.take()?;
        iob.trim_head(self.appdata);
        iob.truncate(self.len);
        self.appdata = 0;
        Some(iob)
    }
}

impl std::fmt::Debug for DevPacket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DevPacket")
            .field("header", &self.header)
            .field("iob", &self.iob)
            .field("appdata", &self.appdata)
            .field("len", &self.len)
            .finish()
    }
}
