/*!
 * TCP Receive Types
 * Flags and message descriptors for the receive calls
 */

use crate::core::sync::CancelToken;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::io::IoSliceMut;
use std::net::SocketAddr;

bitflags! {
    /// Per-call receive flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct RecvFlags: u32 {
        /// Copy data without consuming it
        const PEEK     = 1 << 1;
        /// Never suspend, even on a blocking socket
        const DONTWAIT = 1 << 6;
        /// Keep waiting until every region is full or the connection ends
        const WAITALL  = 1 << 8;
    }
}

impl RecvFlags {
    #[inline]
    pub fn peek(&self) -> bool {
        self.contains(Self::PEEK)
    }

    #[inline]
    pub fn wait_all(&self) -> bool {
        self.contains(Self::WAITALL)
    }

    #[inline]
    pub fn dont_wait(&self) -> bool {
        self.contains(Self::DONTWAIT)
    }
}

/// Scatter-gather receive descriptor
///
/// `name` is filled with the sender address when a segment was delivered
/// during the call.
pub struct RecvMsg<'a, 'b> {
    pub iov: &'a mut [IoSliceMut<'b>],
    pub name: Option<SocketAddr>,
    pub cancel: Option<&'a CancelToken>,
}

impl<'a, 'b> RecvMsg<'a, 'b> {
    pub fn new(iov: &'a mut [IoSliceMut<'b>]) -> Self {
        Self {
            iov,
            name: None,
            cancel: None,
        }
    }

    /// Let `token` interrupt a suspended receive
    pub fn with_cancel(mut self, token: &'a CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Total capacity across all regions
    pub fn capacity(&self) -> usize {
        self.iov.iter().map(|r| r.len()).sum()
    }
}
