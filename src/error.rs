use thiserror::Error;

/// Errors surfaced by the index table.
///
/// Construction-time failures are returned to the caller; there is no
/// recoverable mid-build failure (a partially built table is never
/// observable) and lookups on a valid k-mer are infallible.
#[derive(Debug, Error)]
pub enum IndexError {
    /// An offsets, entries, or scratch allocation could not be satisfied.
    #[error("could not allocate {what} ({requested} bytes)")]
    AllocFailed {
        /// Which buffer failed to allocate.
        what: &'static str,
        /// Requested size in bytes.
        requested: usize,
    },
    /// `alphabet_size^kmer_size` does not fit the k-mer index space.
    #[error("alphabet size {alphabet_size} with k = {kmer_size} overflows the k-mer index space")]
    AlphabetTooLarge {
        /// Alphabet cardinality requested.
        alphabet_size: usize,
        /// K-mer length requested.
        kmer_size: usize,
    },
    /// K-mer length outside the supported `1..=7` range.
    #[error("invalid k-mer size {0}, supported sizes are 1..=7")]
    InvalidKmerSize(usize),
    /// Caller-side misuse: mismatched buffers, out-of-range ids, oversized
    /// sequences. Diagnostic only.
    #[error("contract violation: {0}")]
    ContractViolation(String),
    /// I/O error while writing or mapping the raw buffers.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// A mapped buffer could not be reinterpreted as its record type.
    #[error("cast error: {0}")]
    Cast(String),
}
