//! Second pass: write postings into the entry store behind the bucket
//! cursors.

use std::ops::Range;

use crate::count::{diagonal_score, reserve_scratch};
use crate::error::IndexError;
use crate::generator::KmerGenerator;
use crate::indexer::Indexer;
use crate::offsets::BucketOffsets;
use crate::posting::{BuildPosting, Posting};
use crate::seq::{Sequence, SequenceLookup};
use crate::store::EntryStore;
use crate::table::IndexTable;

/// Fill phase of a table build.
///
/// Every worker processes every sequence but owns a disjoint bucket window
/// `[from, to)` and only emits postings whose k-mer index falls inside it, so
/// two workers never write the same bucket. The windows must partition
/// `[0, table_size)`; [`crate::builder::split_windows`] produces such a
/// partition.
///
/// The filters driving this pass (threshold and scores, or the neighborhood
/// generator) must be identical to the ones the counting pass ran with, or
/// buckets end up with unused or missing slots. A masked bucket is skipped
/// through its zero-length window; masked k-mers are a declaration that the
/// upstream filter suppresses those k-mers in this pass too.
pub struct TableFiller {
    offsets: BucketOffsets,
    store: EntryStore,
    alphabet_size: usize,
    kmer_size: usize,
}

impl TableFiller {
    pub(crate) fn new(
        offsets: BucketOffsets,
        total: u64,
        alphabet_size: usize,
        kmer_size: usize,
    ) -> Result<Self, IndexError> {
        Ok(Self {
            offsets,
            store: EntryStore::allocate(total)?,
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

    /// Postings the entry store was sized for.
    #[inline]
    pub fn total_postings(&self) -> u64 {
        self.store.len() as u64
    }

    /// Write one sequence's postings, exact emission, for the bucket window
    /// `window`. Fails only when the scratch buffer cannot grow.
    pub fn add_sequence(
        &self,
        seq: &Sequence,
        indexer: &Indexer,
        scratch: &mut Vec<BuildPosting>,
        window: &Range<u32>,
        threshold: i32,
        diagonal_scores: &[i8],
    ) -> Result<(), IndexError> {
        scratch.clear();
        reserve_scratch(scratch, seq.kmer_count(self.kmer_size))?;
        for (position, kmer) in seq.kmers(self.kmer_size) {
            let idx = indexer.encode(kmer);
            if !window.contains(&idx) {
                continue;
            }
            // A masked bucket carries a zero-length window: nothing to add.
            if self.offsets.bucket_is_empty(idx) {
                continue;
            }
            if threshold > 0 && diagonal_score(kmer, diagonal_scores) < threshold {
                continue;
            }
            scratch.push(BuildPosting {
                kmer: idx,
                seq_id: seq.id(),
                position,
            });
        }
        self.write_deduped(scratch);
        Ok(())
    }

    /// Write one sequence's postings, neighborhood emission, for the bucket
    /// window `window`. Each expanded k-mer is posted at the position of the
    /// window it was expanded from.
    pub fn add_similar_sequence<G: KmerGenerator + ?Sized>(
        &self,
        seq: &Sequence,
        generator: &mut G,
        scratch: &mut Vec<BuildPosting>,
        window: &Range<u32>,
    ) -> Result<(), IndexError> {
        scratch.clear();
        reserve_scratch(
            scratch,
            seq.kmer_count(self.kmer_size) * generator.fanout_hint(),
        )?;
        for (position, kmer) in seq.kmers(self.kmer_size) {
            let expanded = generator.expand(kmer);
            reserve_scratch(scratch, expanded.len())?;
            for &idx in expanded {
                if !window.contains(&idx) {
                    continue;
                }
                if self.offsets.bucket_is_empty(idx) {
                    continue;
                }
                scratch.push(BuildPosting {
                    kmer: idx,
                    seq_id: seq.id(),
                    position,
                });
            }
        }
        self.write_deduped(scratch);
        Ok(())
    }

    /// Sort the scratch buffer by (k-mer, position) and write the first
    /// occurrence of each k-mer; later occurrences within the sequence are
    /// duplicates and are dropped.
    fn write_deduped(&self, scratch: &mut [BuildPosting]) {
        if scratch.len() > 1 {
            scratch.sort_unstable_by_key(|p| p.sort_key());
        }
        let mut prev = u32::MAX;
        for &p in scratch.iter() {
            let kmer = p.kmer;
            if kmer != prev {
                let slot = self.offsets.advance(kmer);
                self.store.write(slot as usize, Posting::from(p));
            }
            prev = kmer;
        }
    }

    /// Close the fill phase: rewind the cursors back to start offsets and
    /// freeze both buffers into the read-only table. All fill workers must
    /// have been joined; the join is the fence that publishes their writes.
    pub fn into_table(
        self,
        num_sequences: usize,
        lookup: Option<SequenceLookup>,
    ) -> IndexTable<'static> {
        let Self {
            mut offsets,
            store,
            alphabet_size,
            kmer_size,
        } = self;
        offsets.rewind();
        IndexTable::from_owned(
            alphabet_size,
            kmer_size,
            num_sequences,
            offsets.into_offsets(),
            store.into_entries(),
            lookup,
        )
    }
}
