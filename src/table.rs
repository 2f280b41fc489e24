//! The frozen index table: per-bucket offsets plus the packed entry store,
//! owned, memory-mapped, or borrowed.

use memmap2::Mmap;

use crate::error::IndexError;
use crate::posting::Posting;
use crate::seq::SequenceLookup;

/// Largest supported k-mer length; beyond this the index space outgrows the
/// dense offset array for every alphabet of interest.
pub const MAX_KMER_SIZE: usize = 7;

/// Residue count below which a 6-mer index is still well-populated.
const KMER6_RESIDUE_BOUND: u64 = 3_350_000_000;

/// Pick the k-mer length for a database of `residue_count` residues.
pub fn compute_kmer_size(residue_count: u64) -> usize {
    if residue_count < KMER6_RESIDUE_BOUND { 6 } else { 7 }
}

/// Validated `alphabet_size^kmer_size`.
///
/// The k-mer index must fit `u32` (postings and scratch records carry it as
/// one) and the offset array must be addressable, so the product is capped at
/// `u32::MAX`.
pub(crate) fn table_size(alphabet_size: usize, kmer_size: usize) -> Result<usize, IndexError> {
    if kmer_size == 0 || kmer_size > MAX_KMER_SIZE {
        return Err(IndexError::InvalidKmerSize(kmer_size));
    }
    let too_large = || IndexError::AlphabetTooLarge {
        alphabet_size,
        kmer_size,
    };
    if alphabet_size == 0 {
        return Err(too_large());
    }
    let size = (alphabet_size as u64)
        .checked_pow(kmer_size as u32)
        .ok_or_else(too_large)?;
    if size > u32::MAX as u64 {
        return Err(too_large());
    }
    Ok(size as usize)
}

/// Where the two buffers live. `Owned` comes out of a build, `Mmap` out of
/// [`crate::io::open_mmap`], `Borrowed` out of [`IndexTable::from_external`];
/// only the owned variant frees anything.
#[derive(Debug)]
enum Storage<'a> {
    Owned {
        offsets: Box<[u64]>,
        entries: Box<[Posting]>,
    },
    Mmap {
        offsets: Mmap,
        entries: Mmap,
    },
    Borrowed {
        offsets: &'a [u64],
        entries: &'a [Posting],
    },
}

/// Read-only k-mer index table. Built through [`crate::builder`] (or the
/// phase types directly), or adopted zero-copy from buffers a previous
/// process materialized.
#[derive(Debug)]
pub struct IndexTable<'a> {
    alphabet_size: usize,
    kmer_size: usize,
    table_size: usize,
    num_sequences: usize,
    storage: Storage<'a>,
    lookup: Option<SequenceLookup>,
}

impl IndexTable<'static> {
    pub(crate) fn from_owned(
        alphabet_size: usize,
        kmer_size: usize,
        num_sequences: usize,
        offsets: Box<[u64]>,
        entries: Box<[Posting]>,
        lookup: Option<SequenceLookup>,
    ) -> Self {
        Self {
            alphabet_size,
            kmer_size,
            table_size: offsets.len() - 1,
            num_sequences,
            storage: Storage::Owned { offsets, entries },
            lookup,
        }
    }

    pub(crate) fn from_mmap(
        alphabet_size: usize,
        kmer_size: usize,
        num_sequences: usize,
        offsets: Mmap,
        entries: Mmap,
    ) -> Result<Self, IndexError> {
        let table_size = table_size(alphabet_size, kmer_size)?;
        let offset_view: &[u64] = bytemuck::try_cast_slice(&offsets[..])
            .map_err(|e| IndexError::Cast(format!("offsets buffer: {e:?}")))?;
        validate_buffers(
            table_size,
            offset_view,
            &entries[..],
        )?;
        Ok(Self {
            alphabet_size,
            kmer_size,
            table_size,
            num_sequences,
            storage: Storage::Mmap { offsets, entries },
            lookup: None,
        })
    }
}

impl<'a> IndexTable<'a> {
    /// Bind a table to externally owned buffers, typically carved out of a
    /// memory-mapped file. The table never frees them; all lookups read the
    /// provided memory directly.
    pub fn from_external(
        alphabet_size: usize,
        kmer_size: usize,
        num_sequences: usize,
        offsets: &'a [u64],
        entries: &'a [Posting],
        lookup: Option<SequenceLookup>,
    ) -> Result<Self, IndexError> {
        let table_size = table_size(alphabet_size, kmer_size)?;
        validate_buffers(table_size, offsets, bytemuck::cast_slice(entries))?;
        Ok(Self {
            alphabet_size,
            kmer_size,
            table_size,
            num_sequences,
            storage: Storage::Borrowed { offsets, entries },
            lookup,
        })
    }

    /// Start offsets of every bucket; `offsets[table_size]` is the total
    /// posting count.
    #[inline]
    pub fn offsets(&self) -> &[u64] {
        match &self.storage {
            Storage::Owned { offsets, .. } => offsets,
            // Validated at construction; the map cannot shrink.
            Storage::Mmap { offsets, .. } => bytemuck::cast_slice(&offsets[..]),
            Storage::Borrowed { offsets, .. } => offsets,
        }
    }

    /// The packed entry store.
    #[inline]
    pub fn entries(&self) -> &[Posting] {
        match &self.storage {
            Storage::Owned { entries, .. } => entries,
            Storage::Mmap { entries, .. } => bytemuck::cast_slice(&entries[..]),
            Storage::Borrowed { entries, .. } => entries,
        }
    }

    /// Postings of every sequence containing `kmer`. Infallible for
    /// `kmer < bucket_count()`; within a bucket, sequences appear in fill
    /// completion order.
    #[inline]
    pub fn lookup(&self, kmer: u32) -> &[Posting] {
        let offsets = self.offsets();
        let start = offsets[kmer as usize] as usize;
        let end = offsets[kmer as usize + 1] as usize;
        &self.entries()[start..end]
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
    pub fn bucket_count(&self) -> usize {
        self.table_size
    }

    #[inline]
    pub fn num_sequences(&self) -> usize {
        self.num_sequences
    }

    #[inline]
    pub fn total_postings(&self) -> u64 {
        self.offsets()[self.table_size]
    }

    /// The opaque sequence-lookup handle attached at build or adoption time.
    #[inline]
    pub fn sequence_lookup(&self) -> Option<&SequenceLookup> {
        self.lookup.as_ref()
    }

    /// The two raw buffers, in the stable in-memory layout: 64-bit offset
    /// cells and packed 6-byte entries. Serialize them independently; framing
    /// is the caller's concern.
    pub fn raw_buffers(&self) -> (&[u64], &[u8]) {
        (self.offsets(), bytemuck::cast_slice(self.entries()))
    }
}

fn validate_buffers(
    table_size: usize,
    offsets: &[u64],
    entry_bytes: &[u8],
) -> Result<(), IndexError> {
    if offsets.len() != table_size + 1 {
        return Err(IndexError::ContractViolation(format!(
            "offset buffer holds {} cells, table needs {}",
            offsets.len(),
            table_size + 1
        )));
    }
    if offsets[0] != 0 {
        return Err(IndexError::ContractViolation(
            "offset buffer does not start at zero".into(),
        ));
    }
    let total = offsets[table_size] as usize;
    let expected = total * size_of::<Posting>();
    if entry_bytes.len() != expected {
        return Err(IndexError::ContractViolation(format!(
            "entry buffer holds {} bytes, offsets promise {}",
            entry_bytes.len(),
            expected
        )));
    }
    Ok(())
}
