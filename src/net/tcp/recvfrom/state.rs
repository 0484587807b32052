/*!
 * Receive Request State
 * Progress of one in-flight receive into a single caller region
 */

use crate::core::errors::NetError;
use crate::net::tcp::RecvFlags;
use bytes::BytesMut;
use std::net::SocketAddr;

/// Receive request
///
/// `recvlen + buflen` always equals the length of the caller's region.
/// Bytes read from read-ahead go straight into the region; bytes delivered
/// by the completion handler land in `staged` and are copied into the
/// region after the waiter wakes.
#[derive(Debug)]
pub struct RecvRequest {
    /// Capacity left in the caller's region
    pub(crate) buflen: usize,
    /// Bytes accumulated so far
    pub(crate) recvlen: usize,
    /// Failure reported by the handler
    pub(crate) result: Option<NetError>,
    pub(crate) flags: RecvFlags,
    pub(crate) from: Option<SocketAddr>,
    /// Set once the request reached a terminal state
    pub(crate) posted: bool,
    pub(crate) staged: BytesMut,
}

impl RecvRequest {
    pub fn new(buflen: usize, flags: RecvFlags) -> Self {
        Self {
            buflen,
            recvlen: 0,
            result: None,
            flags,
            from: None,
            posted: false,
            staged: BytesMut::new(),
        }
    }

    #[inline]
    pub fn recvlen(&self) -> usize {
        self.recvlen
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.buflen
    }

    #[inline]
    pub fn is_posted(&self) -> bool {
        self.posted
    }

    /// Account for `n` more bytes placed in the region
    #[inline]
    pub(crate) fn update_recvlen(&mut self, n: usize) {
        debug_assert!(n <= self.buflen);
        self.recvlen += n;
        self.buflen -= n;
    }

    /// Mark terminal and let the waiter proceed
    #[inline]
    pub(crate) fn post(&mut self) {
        self.posted = true;
    }

    /// Copy staged bytes into the region, starting at `offset`
    pub(crate) fn unstage(&mut self, region: &mut [u8], offset: usize) -> usize {
        let n = self.staged.len();
        region[offset..offset + n].copy_from_slice(&self.staged);
        self.staged.clear();
        n
    }
}
