/*!
 * I/O Buffer Chain
 * Ordered byte segments with copy-out, head trimming and partial cloning
 */

use super::pool::{IobLease, IobPool};
use super::{IobError, IobResult};
use bytes::{Buf, Bytes};
use std::collections::VecDeque;

/// One pool buffer worth of bytes
pub(super) struct Segment {
    data: Bytes,
    _lease: IobLease,
}

impl Segment {
    pub(super) fn new(data: Bytes, lease: IobLease) -> Self {
        Self {
            data,
            _lease: lease,
        }
    }
}

/// Segmented byte chain
///
/// Logical length is the sum of segment lengths. Dropping the chain, or
/// trimming whole segments off its head, returns buffers to the pool.
pub struct IobChain {
    segs: VecDeque<Segment>,
    len: usize,
}

impl IobChain {
    pub(super) fn from_segments(segs: VecDeque<Segment>) -> Self {
        let len = segs.iter().map(|s| s.data.len()).sum();
        Self { segs, len }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn segment_count(&self) -> usize {
        self.segs.len()
    }

    /// Borrow the segment slices covering `[offset, offset + len)`
    fn slices(&self, offset: usize, len: usize) -> impl Iterator<Item = Bytes> + '_ {
        let mut skip = offset;
        let mut want = len;
        self.segs.iter().filter_map(move |seg| {
            if want == 0 {
                return None;
            }
            let seg_len = seg.data.len();
            if skip >= seg_len {
                skip -= seg_len;
                return None;
            }
            let n = (seg_len - skip).min(want);
            let slice = seg.data.slice(skip..skip + n);
            skip = 0;
            want -= n;
            Some(slice)
        })
    }

    /// Copy bytes starting at `offset` into `dest`
    ///
    /// Copies `min(dest.len(), len - offset)` bytes and returns the count.
    pub fn copy_out(&self, dest: &mut [u8], offset: usize) -> usize {
        if offset >= self.len {
            return 0;
        }
        let want = dest.len().min(self.len - offset);

        let mut copied = 0;
        for slice in self.slices(offset, want) {
            dest[copied..copied + slice.len()].copy_from_slice(&slice);
            copied += slice.len();
        }
        copied
    }

    /// Remove `n` bytes from the head, releasing emptied buffers
    pub fn trim_head(&mut self, n: usize) {
        let mut n = n.min(self.len);
        self.len -= n;

        while n > 0 {
            let Some(front) = self.segs.front_mut() else {
                break;
            };
            if front.data.len() <= n {
                n -= front.data.len();
                self.segs.pop_front();
            } else {
                front.data.advance(n);
                n = 0;
            }
        }
    }

    /// Drop everything past the first `len` bytes
    pub fn truncate(&mut self, len: usize) {
        if len >= self.len {
            return;
        }

        let mut remaining = len;
        let mut keep = 0;
        for seg in self.segs.iter_mut() {
            if remaining == 0 {
                break;
            }
            if seg.data.len() > remaining {
                seg.data.truncate(remaining);
            }
            remaining -= seg.data.len();
            keep += 1;
        }
        self.segs.truncate(keep);
        self.len = len;
    }

    /// Clone `[offset, offset + len)` into a new chain
    ///
    /// Storage is shared, but the clone holds its own pool buffers so both
    /// chains can be released independently.
    pub fn clone_partial(&self, pool: &IobPool, len: usize, offset: usize) -> IobResult<IobChain> {
        if offset.checked_add(len).map_or(true, |end| end > self.len) {
            return Err(IobError::OutOfRange {
                offset,
                len,
                chain_len: self.len,
            });
        }

        let slices: Vec<Bytes> = self.slices(offset, len).collect();
        let leases = pool.try_reserve(slices.len())?;

        Ok(IobChain::from_segments(
            slices
                .into_iter()
                .zip(leases)
                .map(|(data, lease)| Segment::new(data, lease))
                .collect(),
        ))
    }

    /// Append `other` to the tail of this chain
    pub fn append(&mut self, other: IobChain) {
        self.len += other.len;
        self.segs.extend(other.segs);
    }

    /// Copy the whole chain into a vector
    pub fn to_vec(&self) -> Vec<u8> {
        let mut out = vec![0u8; self.len];
        self.copy_out(&mut out, 0);
        out
    }
}

impl std::fmt::Debug for IobChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IobChain")
            .field("len", &self.len)
            .field("segments", &self.segs.len())
            .finish()
    }
}
