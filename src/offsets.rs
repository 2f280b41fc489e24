//! The shared bucket-offset array: one 64-bit cell per possible k-mer, plus a
//! sentinel.
//!
//! The same storage carries a different meaning at each build stage:
//!
//! 1. after allocation: all zeros;
//! 2. after the counting pass: cell `i` holds the number of postings destined
//!    for bucket `i`;
//! 3. after [`BucketOffsets::prefix_sum`]: cell `i` holds the start offset of
//!    bucket `i`, the sentinel cell holds the grand total;
//! 4. during the fill pass: cell `i` is the next free write cursor of bucket
//!    `i`, ending at bucket `i + 1`'s start;
//! 5. after [`BucketOffsets::rewind`]: start offsets again, as in stage 3.
//!
//! A separate counts array would make the stages explicit but doubles the
//! footprint on a `21^7`-cell table, so the in-place transform stays.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::IndexError;

/// Offset array over all `table_size` buckets. Shared by every build worker;
/// all cross-thread mutation goes through the atomic cells.
pub(crate) struct BucketOffsets {
    /// `table_size + 1` cells; the last one is the total-postings sentinel.
    cells: Box<[AtomicU64]>,
    table_size: usize,
}

impl BucketOffsets {
    pub fn new(table_size: usize) -> Result<Self, IndexError> {
        let len = table_size + 1;
        let mut cells = Vec::new();
        cells
            .try_reserve_exact(len)
            .map_err(|_| IndexError::AllocFailed {
                what: "bucket offsets",
                requested: len * size_of::<AtomicU64>(),
            })?;
        cells.extend((0..len).map(|_| AtomicU64::new(0)));
        Ok(Self {
            cells: cells.into_boxed_slice(),
            table_size,
        })
    }

    #[inline]
    pub fn table_size(&self) -> usize {
        self.table_size
    }

    /// Counting pass: one more posting destined for `kmer`'s bucket.
    ///
    /// Relaxed ordering: only the final per-cell sums matter, and the phase
    /// boundary joins all counting workers before the sums are read.
    #[inline]
    pub fn increment(&self, kmer: u32) {
        self.cells[kmer as usize].fetch_add(1, Ordering::Relaxed);
    }

    /// Stage-2 read of a bucket's population count.
    #[inline]
    pub fn count_of(&self, kmer: u32) -> u64 {
        self.cells[kmer as usize].load(Ordering::Relaxed)
    }

    /// Mask a bucket: set its start to the next bucket's start, leaving a
    /// zero-length window the fill pass skips. Valid only after
    /// [`BucketOffsets::prefix_sum`] and before the fill pass. No offset of
    /// any other bucket moves; the masked bucket's slots stay reserved in the
    /// entry store and are simply never written. When masking adjacent
    /// buckets, apply to the higher k-mer first so the runs chain to a
    /// common start.
    #[inline]
    pub fn mask(&mut self, kmer: u32) {
        let next = *self.cells[kmer as usize + 1].get_mut();
        *self.cells[kmer as usize].get_mut() = next;
    }

    /// Fill-pass probe: does `kmer`'s bucket carry a zero-length window?
    /// Reads the live cursors; a masked bucket's own cursor never moves.
    #[inline]
    pub fn bucket_is_empty(&self, kmer: u32) -> bool {
        let start = self.cells[kmer as usize].load(Ordering::Relaxed);
        let end = self.cells[kmer as usize + 1].load(Ordering::Relaxed);
        end == start
    }

    /// Convert per-bucket counts to start offsets in place and return the
    /// grand total, which also lands in the sentinel cell.
    pub fn prefix_sum(&mut self) -> u64 {
        let mut offset = 0u64;
        for cell in self.cells.iter_mut() {
            let count = *cell.get_mut();
            *cell.get_mut() = offset;
            offset += count;
        }
        // The sentinel counted nothing, so the loop left the total in it.
        offset
    }

    /// Fill pass: claim the next free slot of `kmer`'s bucket and return it.
    ///
    /// Fill workers own disjoint bucket windows, so the fetch-add never races
    /// another writer of the same cell; the atomicity guards the invariant,
    /// not a measured contention.
    #[inline]
    pub fn advance(&self, kmer: u32) -> u64 {
        self.cells[kmer as usize].fetch_add(1, Ordering::Relaxed)
    }

    /// Undo the cursor advancement of the fill pass: shift every cell one
    /// position right, restoring the stage-3 start offsets. Single-threaded;
    /// runs after all fill workers have been joined.
    pub fn rewind(&mut self) {
        for i in (1..self.cells.len()).rev() {
            let prev = *self.cells[i - 1].get_mut();
            *self.cells[i].get_mut() = prev;
        }
        *self.cells[0].get_mut() = 0;
    }

    /// Freeze the array for the read stage.
    pub fn into_offsets(self) -> Box<[u64]> {
        let Self { cells, .. } = self;
        // AtomicU64 has the same in-memory representation as u64.
        unsafe { Box::from_raw(Box::into_raw(cells) as *mut [u64]) }
    }
}
