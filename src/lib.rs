//! Inverted k-mer index for sequence-search prefiltering.
//!
//! For every possible k-mer over a fixed alphabet the table stores the packed
//! list of `(sequence id, position)` postings of the database sequences
//! containing it. The build runs in two parallel passes over one shared,
//! lock-free structure:
//!
//! 1. **counting** — workers split the sequences and bump per-bucket atomic
//!    counters ([`KmerCounter`]);
//! 2. **fill** — after an in-place prefix sum (and optional bucket masking),
//!    workers own disjoint bucket windows and write postings behind
//!    fetch-add cursors ([`TableFiller`]).
//!
//! The frozen [`IndexTable`] is two flat buffers: 64-bit bucket offsets and
//! 6-byte packed entries. Both can be written to disk and adopted zero-copy
//! by a later process ([`io`], [`IndexTable::from_external`]).
//!
//! K-mers are emitted either exactly or expanded into their scoring
//! neighborhood ([`KmerGenerator`]); a per-symbol score threshold can prune
//! low-information k-mers. Both passes must run with identical filters.

mod alphabet;
pub mod builder;
mod count;
mod error;
mod fill;
mod generator;
mod indexer;
pub mod io;
mod offsets;
mod posting;
mod seq;
mod stats;
mod store;
mod table;

pub use alphabet::Alphabet;
pub use builder::{BuildConfig, build_exact, build_similar, split_windows};
pub use count::KmerCounter;
pub use error::IndexError;
pub use fill::TableFiller;
pub use generator::{KmerGenerator, SubstitutionGenerator};
pub use indexer::Indexer;
pub use posting::{BuildPosting, Posting};
pub use seq::{Sequence, SequenceLookup};
pub use stats::{TOP_N, TableStatistics, report};
pub use table::{IndexTable, MAX_KMER_SIZE, compute_kmer_size};
