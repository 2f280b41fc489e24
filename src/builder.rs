//! Two-pass parallel build drivers.

use std::ops::Range;

use log::debug;
use rayon::prelude::*;

use crate::count::KmerCounter;
use crate::error::IndexError;
use crate::generator::KmerGenerator;
use crate::indexer::Indexer;
use crate::seq::{Sequence, SequenceLookup};
use crate::table::IndexTable;

/// Build-time configuration.
#[derive(Clone, Default)]
pub struct BuildConfig {
    threshold: i32,
    diagonal_scores: Vec<i8>,
    windows: usize,
    masked: Vec<u32>,
    keep_lookup: bool,
}

impl BuildConfig {
    /// Drop k-mers whose summed per-symbol `scores` fall below `threshold`.
    /// Applies to exact builds only; neighborhood builds filter inside the
    /// generator.
    pub fn score_filter(mut self, threshold: i32, scores: Vec<i8>) -> Self {
        self.threshold = threshold;
        self.diagonal_scores = scores;
        self
    }

    /// Number of disjoint bucket windows for the fill pass (default: the
    /// rayon thread count).
    pub fn windows(mut self, n: usize) -> Self {
        self.windows = n;
        self
    }

    /// Buckets to mask out between the counting and fill passes.
    pub fn masked(mut self, kmers: Vec<u32>) -> Self {
        self.masked = kmers;
        self
    }

    /// Attach a [`SequenceLookup`] over the ingested sequences to the
    /// finished table.
    pub fn keep_lookup(mut self, yes: bool) -> Self {
        self.keep_lookup = yes;
        self
    }

    fn effective_windows(&self) -> usize {
        if self.windows == 0 {
            rayon::current_num_threads()
        } else {
            self.windows
        }
    }

    fn validate(&self, alphabet_size: usize) -> Result<(), IndexError> {
        if self.threshold > 0 && self.diagonal_scores.len() != alphabet_size {
            return Err(IndexError::ContractViolation(format!(
                "score filter needs {} per-symbol scores, got {}",
                alphabet_size,
                self.diagonal_scores.len()
            )));
        }
        Ok(())
    }
}

/// Partition `[0, table_size)` into at most `n` contiguous bucket windows.
pub fn split_windows(table_size: usize, n: usize) -> Vec<Range<u32>> {
    let chunk = table_size.div_ceil(n.max(1)).max(1);
    (0..table_size)
        .step_by(chunk)
        .map(|from| from as u32..(from + chunk).min(table_size) as u32)
        .collect()
}

/// Build a table from `sequences` with exact k-mer emission.
///
/// Sequence ids should be the slice ordinals; they become the `seq_id` of
/// every posting and, when `keep_lookup` is set, the lookup ordinals.
pub fn build_exact(
    sequences: &[Sequence],
    alphabet_size: usize,
    kmer_size: usize,
    cfg: &BuildConfig,
) -> Result<IndexTable<'static>, IndexError> {
    cfg.validate(alphabet_size)?;
    let indexer = Indexer::new(alphabet_size, kmer_size);
    let counter = KmerCounter::new(alphabet_size, kmer_size)?;

    let distinct = sequences
        .par_iter()
        .map_init(Vec::new, |scratch, seq| {
            counter.count_sequence(
                seq,
                &indexer,
                scratch,
                cfg.threshold,
                &cfg.diagonal_scores,
                None,
            )
        })
        .try_reduce(|| 0usize, |a, b| Ok(a + b))?;
    debug!(
        "counted {} postings over {} sequences",
        distinct,
        sequences.len()
    );

    let filler = counter.into_filler(&cfg.masked)?;
    debug!("entry store holds {} postings", filler.total_postings());

    split_windows(filler.table_size(), cfg.effective_windows())
        .into_par_iter()
        .try_for_each_init(Vec::new, |scratch, window| {
            for seq in sequences {
                filler.add_sequence(
                    seq,
                    &indexer,
                    scratch,
                    &window,
                    cfg.threshold,
                    &cfg.diagonal_scores,
                )?;
            }
            Ok::<(), IndexError>(())
        })?;

    let lookup = cfg
        .keep_lookup
        .then(|| SequenceLookup::from_sequences(sequences));
    Ok(filler.into_table(sequences.len(), lookup))
}

/// Build a table from `sequences` with neighborhood k-mer emission: every
/// sequence posts all similar k-mers the generator yields. Each worker runs
/// its own clone of `generator`; both passes see the same expansion.
pub fn build_similar<G>(
    sequences: &[Sequence],
    alphabet_size: usize,
    kmer_size: usize,
    generator: &G,
    cfg: &BuildConfig,
) -> Result<IndexTable<'static>, IndexError>
where
    G: KmerGenerator + Clone + Send + Sync,
{
    cfg.validate(alphabet_size)?;
    let counter = KmerCounter::new(alphabet_size, kmer_size)?;

    let distinct = sequences
        .par_iter()
        .map_init(
            || (generator.clone(), Vec::new()),
            |(generator, scratch), seq| {
                counter.count_similar_sequence(seq, generator, scratch, None)
            },
        )
        .try_reduce(|| 0usize, |a, b| Ok(a + b))?;
    debug!(
        "counted {} postings over {} sequences (neighborhood emission)",
        distinct,
        sequences.len()
    );

    let filler = counter.into_filler(&cfg.masked)?;
    debug!("entry store holds {} postings", filler.total_postings());

    split_windows(filler.table_size(), cfg.effective_windows())
        .into_par_iter()
        .try_for_each_init(
            || (generator.clone(), Vec::new()),
            |(generator, scratch), window| {
                for seq in sequences {
                    filler.add_similar_sequence(seq, generator, scratch, &window)?;
                }
                Ok::<(), IndexError>(())
            },
        )?;

    let lookup = cfg
        .keep_lookup
        .then(|| SequenceLookup::from_sequences(sequences));
    Ok(filler.into_table(sequences.len(), lookup))
}
