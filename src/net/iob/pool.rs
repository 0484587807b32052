/*!
 * I/O Buffer Pool
 * Fixed budget of equally sized buffers shared by the whole stack
 */

use super::chain::{IobChain, Segment};
use super::{IobError, IobResult};
use crate::net::config::NetConfig;
use bytes::Bytes;
use log::trace;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub(super) struct PoolInner {
    bufsize: usize,
    total: usize,
    free: AtomicUsize,
}

/// Claim on one pool buffer, returned on drop
pub(super) struct IobLease {
    pool: Arc<PoolInner>,
}

impl Drop for IobLease {
    fn drop(&mut self) {
        self.pool.free.fetch_add(1, Ordering::AcqRel);
    }
}

/// Pool statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct IobPoolStats {
    pub bufsize: usize,
    pub total: usize,
    pub free: usize,
}

/// Shared I/O buffer pool
///
/// # Performance
///
/// Reservation is a single CAS loop on the free counter; buffers are plain
/// `Bytes` so clones share storage.
#[derive(Clone)]
pub struct IobPool {
    inner: Arc<PoolInner>,
}

impl IobPool {
    pub fn new(bufsize: usize, nbuffers: usize) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                bufsize: bufsize.max(1),
                total: nbuffers,
                free: AtomicUsize::new(nbuffers),
            }),
        }
    }

    pub fn from_config(config: &NetConfig) -> Self {
        Self::new(config.iob_bufsize, config.iob_nbuffers)
    }

    #[inline]
    pub fn bufsize(&self) -> usize {
        self.inner.bufsize
    }

    /// Buffers currently free
    #[inline]
    pub fn available(&self) -> usize {
        self.inner.free.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> IobPoolStats {
        IobPoolStats {
            bufsize: self.inner.bufsize,
            total: self.inner.total,
            free: self.available(),
        }
    }

    /// Buffers needed to hold `len` bytes
    #[inline]
    pub fn buffers_for(&self, len: usize) -> usize {
        len.div_ceil(self.inner.bufsize)
    }

    /// Reserve `count` buffers or none at all
    pub(super) fn try_reserve(&self, count: usize) -> IobResult<Vec<IobLease>> {
        self.inner
            .free
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |free| {
                free.checked_sub(count)
            })
            .map_err(|available| IobError::Exhausted {
                requested: count,
                available,
            })?;

        Ok((0..count)
            .map(|_| IobLease {
                pool: Arc::clone(&self.inner),
            })
            .collect())
    }

    /// Copy `data` into a fresh chain of pool buffers
    pub fn try_alloc(&self, data: &[u8]) -> IobResult<IobChain> {
        self.try_alloc_parts(&[data])
    }

    /// Copy the concatenation of `parts` into a fresh chain
    pub fn try_alloc_parts(&self, parts: &[&[u8]]) -> IobResult<IobChain> {
        let total: usize = parts.iter().map(|p| p.len()).sum();
        let leases = self.try_reserve(self.buffers_for(total))?;

        let mut joined = Vec::with_capacity(total);
        for part in parts {
            joined.extend_from_slice(part);
        }
        let joined = Bytes::from(joined);

        let segments = leases
            .into_iter()
            .enumerate()
            .map(|(i, lease)| {
                let start = i * self.inner.bufsize;
                let end = (start + self.inner.bufsize).min(total);
                Segment::new(joined.slice(start..end), lease)
            })
            .collect();

        trace!(
            "Allocated {} bytes in {} buffers ({} free)",
            total,
            self.buffers_for(total),
            self.available()
        );
        Ok(IobChain::from_segments(segments))
    }
}

impl std::fmt::Debug for IobPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IobPool")
            .field("bufsize", &self.inner.bufsize)
            .field("total", &self.inner.total)
            .field("free", &self.available())
            .finish()
    }
}
