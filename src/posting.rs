//! Packed posting records.

use bytemuck::{Pod, Zeroable};

/// Posting entry: sequence `seq_id` contains the current k-mer at `position`.
///
/// Packed to 6 bytes; the default layout would pad to 8 and waste a third of
/// the entry store. Positions are 16 bit, so sequences longer than 65,535
/// residues must be split upstream.
#[repr(C, packed)]
#[derive(Copy, Clone, Default, Pod, Zeroable, PartialEq, Eq, Debug)]
pub struct Posting {
    /// Sequence ordinal id (0-based).
    pub seq_id: u32,
    /// Offset of the k-mer within the sequence (0-based).
    pub position: u16,
}

const _: () = assert!(size_of::<Posting>() == 6);

/// Scratch record used only inside a worker's fill buffer: the destination
/// bucket rides along so a single sort groups one sequence's postings by
/// k-mer before deduplication. Opaque to callers, who only ever hand an
/// (initially empty) scratch vector to the fill phase; never persisted.
#[repr(C, packed)]
#[derive(Copy, Clone, Default, Debug)]
pub struct BuildPosting {
    pub(crate) kmer: u32,
    pub(crate) seq_id: u32,
    pub(crate) position: u16,
}

const _: () = assert!(size_of::<BuildPosting>() == 10);

impl BuildPosting {
    /// Sort order of the fill buffer: k-mer ascending, then position
    /// ascending, so the first record of each run is the sequence's earliest
    /// occurrence.
    #[inline]
    pub(crate) fn sort_key(self) -> (u32, u16) {
        (self.kmer, self.position)
    }
}

impl From<BuildPosting> for Posting {
    #[inline]
    fn from(b: BuildPosting) -> Self {
        Posting {
            seq_id: b.seq_id,
            position: b.position,
        }
    }
}
