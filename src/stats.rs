//! Table introspection. Diagnostic only, never in a hot path.

use log::info;

use crate::alphabet::Alphabet;
use crate::indexer::Indexer;
use crate::posting::Posting;
use crate::table::IndexTable;

/// Buckets retained by the top-N scan.
pub const TOP_N: usize = 10;

/// Aggregate bucket statistics of a frozen table.
#[derive(Clone, Debug)]
pub struct TableStatistics {
    /// Total postings across all buckets.
    pub total_postings: u64,
    /// Buckets holding no posting.
    pub empty_buckets: u64,
    /// Smallest bucket size; zero whenever any bucket is empty.
    pub min_bucket: u64,
    /// Mean bucket size.
    pub avg_bucket: f64,
    /// The [`TOP_N`] largest buckets as `(kmer, size)`, descending; ties keep
    /// the first-encountered bucket.
    pub top: Vec<(u32, u64)>,
}

impl IndexTable<'_> {
    /// Scan the offset array once and collect [`TableStatistics`].
    pub fn statistics(&self) -> TableStatistics {
        let offsets = self.offsets();
        let mut total = 0u64;
        let mut empty = 0u64;
        let mut min = u64::MAX;
        let mut top: Vec<(u32, u64)> = Vec::with_capacity(TOP_N + 1);

        for (kmer, pair) in offsets.windows(2).enumerate() {
            let size = pair[1] - pair[0];
            total += size;
            min = min.min(size);
            if size == 0 {
                empty += 1;
                continue;
            }
            let floor = top.last().map_or(0, |&(_, s)| s);
            if top.len() == TOP_N && size <= floor {
                continue;
            }
            let at = top.partition_point(|&(_, s)| s >= size);
            top.insert(at, (kmer as u32, size));
            top.truncate(TOP_N);
        }

        let buckets = self.bucket_count();
        TableStatistics {
            total_postings: total,
            empty_buckets: empty,
            min_bucket: if buckets == 0 { 0 } else { min },
            avg_bucket: if buckets == 0 {
                0.0
            } else {
                total as f64 / buckets as f64
            },
            top,
        }
    }
}

/// Log a statistics report, decoding the top buckets back into residue
/// letters.
pub fn report(table: &IndexTable<'_>, alphabet: &Alphabet) {
    let stats = table.statistics();
    let indexer = Indexer::new(table.alphabet_size(), table.kmer_size());
    let mut kmer = vec![0u8; table.kmer_size()];

    info!("index statistics");
    info!("  entries:        {}", stats.total_postings);
    info!(
        "  size:           {} bytes",
        stats.total_postings as usize * size_of::<Posting>() + table.offsets().len() * 8
    );
    info!("  avg bucket:     {:.2}", stats.avg_bucket);
    info!("  min bucket:     {}", stats.min_bucket);
    info!("  empty buckets:  {}", stats.empty_buckets);
    info!("  top {} buckets", TOP_N);
    for &(idx, size) in &stats.top {
        indexer.decode(idx, &mut kmer);
        info!("    {}  {}", alphabet.render(&kmer), size);
    }
}
