//! Serialization of the two raw buffers and zero-copy adoption from disk.
//!
//! A table is stored as two independent, independently mappable files with no
//! header: the offset array as `table_size + 1` little-endian 64-bit cells,
//! and the entry store as packed 6-byte records. Geometry (alphabet size,
//! k-mer size, sequence count) is the caller's framing concern.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use byteorder::{LittleEndian as LE, WriteBytesExt};
use memmap2::Mmap;

use crate::error::IndexError;
use crate::table::IndexTable;

/// Write `table`'s offset and entry buffers to the two paths.
pub fn write_buffers(
    table: &IndexTable<'_>,
    offsets_path: &Path,
    entries_path: &Path,
) -> Result<(), IndexError> {
    let (offsets, entry_bytes) = table.raw_buffers();

    let mut w = BufWriter::new(File::create(offsets_path)?);
    for &cell in offsets {
        w.write_u64::<LE>(cell)?;
    }
    w.flush()?;

    let mut w = BufWriter::new(File::create(entries_path)?);
    w.write_all(entry_bytes)?;
    w.flush()?;
    Ok(())
}

/// Map the two buffer files and adopt them as a read-only table. The mapped
/// pages are borrowed from the kernel for the table's lifetime; nothing is
/// copied or freed.
pub fn open_mmap(
    offsets_path: &Path,
    entries_path: &Path,
    alphabet_size: usize,
    kmer_size: usize,
    num_sequences: usize,
) -> Result<IndexTable<'static>, IndexError> {
    let offsets_file = File::open(offsets_path)?;
    let entries_file = File::open(entries_path)?;
    let offsets = unsafe { Mmap::map(&offsets_file)? };
    let entries = unsafe { Mmap::map(&entries_file)? };
    IndexTable::from_mmap(alphabet_size, kmer_size, num_sequences, offsets, entries)
}
