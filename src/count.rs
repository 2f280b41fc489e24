//! First pass: per-bucket posting counts.

use std::ops::Range;

use crate::error::IndexError;
use crate::fill::TableFiller;
use crate::generator::KmerGenerator;
use crate::indexer::Indexer;
use crate::offsets::BucketOffsets;
use crate::seq::Sequence;
use crate::table;

/// Counting phase of a table build. Many workers feed sequences concurrently;
/// each bucket's population lands in the shared offset array via relaxed
/// atomic adds.
///
/// Deduplication is per sequence: a k-mer occurring five times in one
/// sequence contributes one count, the same k-mer in two sequences
/// contributes two.
pub struct KmerCounter {
    offsets: BucketOffsets,
    alphabet_size: usize,
    kmer_size: usize,
}

/// Sum of the per-symbol diagonal scores of a k-mer.
#[inline]
pub(crate) fn diagonal_score(kmer: &[u8], scores: &[i8]) -> i32 {
    kmer.iter().map(|&s| scores[s as usize] as i32).sum()
}

#[inline]
pub(crate) fn in_window(idx: u32, window: Option<&Range<u32>>) -> bool {
    window.is_none_or(|w| w.contains(&idx))
}

/// Grow a per-worker scratch buffer, surfacing exhaustion as `AllocFailed`
/// like every other build allocation.
pub(crate) fn reserve_scratch<T>(
    scratch: &mut Vec<T>,
    additional: usize,
) -> Result<(), IndexError> {
    scratch
        .try_reserve(additional)
        .map_err(|_| IndexError::AllocFailed {
            what: "worker scratch",
            requested: additional * size_of::<T>(),
        })
}

impl KmerCounter {
    pub fn new(alphabet_size: usize, kmer_size: usize) -> Result<Self, IndexError> {
        let size = table::table_size(alphabet_size, kmer_size)?;
        Ok(Self {
            offsets: BucketOffsets::new(size)?,
            alphabet_size,
            kmer_size,
        })
    }

    #[inline]
    pub fn alphabet_size(&self) -> usize {
        self.alphabet_size
    }

    #[inline]
    pub fn kmer_size(&self) -> usize {
        self.kmer_size
    }

    /// Number of buckets, `alphabet_size^kmer_size`.
    #[inline]
    pub fn table_size(&self) -> usize {
        self.offsets.table_size()
    }

    /// Count the k-mers of one sequence, exact emission.
    ///
    /// With `threshold > 0`, k-mers whose summed `diagonal_scores` fall below
    /// it are skipped; the fill pass must be driven with the identical filter
    /// or slots go missing. `window` restricts counting to a bucket range for
    /// drivers that partition this pass like the fill pass; `None` counts
    /// everything (the mode used when partitioning work by sequence).
    ///
    /// Returns the number of distinct k-mers the sequence contributed, or
    /// [`IndexError::AllocFailed`] when the scratch buffer cannot grow.
    pub fn count_sequence(
        &self,
        seq: &Sequence,
        indexer: &Indexer,
        scratch: &mut Vec<u32>,
        threshold: i32,
        diagonal_scores: &[i8],
        window: Option<&Range<u32>>,
    ) -> Result<usize, IndexError> {
        scratch.clear();
        reserve_scratch(scratch, seq.kmer_count(self.kmer_size))?;
        for (_, kmer) in seq.kmers(self.kmer_size) {
            if threshold > 0 && diagonal_score(kmer, diagonal_scores) < threshold {
                continue;
            }
            let idx = indexer.encode(kmer);
            if !in_window(idx, window) {
                continue;
            }
            scratch.push(idx);
        }
        Ok(self.increment_distinct(scratch))
    }

    /// Count the k-mers of one sequence, neighborhood emission: every index
    /// the generator yields lands in the scratch list before the per-sequence
    /// deduplication. Threshold filtering is the generator's business here.
    pub fn count_similar_sequence<G: KmerGenerator + ?Sized>(
        &self,
        seq: &Sequence,
        generator: &mut G,
        scratch: &mut Vec<u32>,
        window: Option<&Range<u32>>,
    ) -> Result<usize, IndexError> {
        scratch.clear();
        reserve_scratch(
            scratch,
            seq.kmer_count(self.kmer_size) * generator.fanout_hint(),
        )?;
        for (_, kmer) in seq.kmers(self.kmer_size) {
            let expanded = generator.expand(kmer);
            reserve_scratch(scratch, expanded.len())?;
            for &idx in expanded {
                if in_window(idx, window) {
                    scratch.push(idx);
                }
            }
        }
        Ok(self.increment_distinct(scratch))
    }

    /// The count accumulated for one bucket so far, e.g. to decide a mask
    /// before closing the phase.
    #[inline]
    pub fn count_of(&self, kmer: u32) -> u64 {
        self.offsets.count_of(kmer)
    }

    /// Close the counting phase: run the prefix sum, give every `masked`
    /// bucket a zero-length window, and allocate the entry store.
    ///
    /// The store is sized to the full prefix-sum total, so no bucket's offset
    /// depends on which buckets are masked; masked extents stay reserved and
    /// are never written.
    pub fn into_filler(self, masked: &[u32]) -> Result<TableFiller, IndexError> {
        let Self {
            mut offsets,
            alphabet_size,
            kmer_size,
        } = self;
        for &kmer in masked {
            if kmer as usize >= offsets.table_size() {
                return Err(IndexError::ContractViolation(format!(
                    "masked k-mer {} is outside the table of {} buckets",
                    kmer,
                    offsets.table_size()
                )));
            }
        }
        let total = offsets.prefix_sum();
        let mut masked_desc: Vec<u32> = masked.to_vec();
        masked_desc.sort_unstable();
        for &kmer in masked_desc.iter().rev() {
            offsets.mask(kmer);
        }
        TableFiller::new(offsets, total, alphabet_size, kmer_size)
    }

    /// Sort the scratch list and add one count per distinct index.
    fn increment_distinct(&self, scratch: &mut [u32]) -> usize {
        if scratch.len() > 1 {
            scratch.sort_unstable();
        }
        let mut distinct = 0;
        let mut prev = u32::MAX;
        for &idx in scratch.iter() {
            if idx != prev {
                self.offsets.increment(idx);
                distinct += 1;
            }
            prev = idx;
        }
        distinct
    }
}
