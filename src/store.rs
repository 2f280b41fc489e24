//! Contiguous posting storage written concurrently at disjoint slots.

use std::cell::UnsafeCell;

use bytemuck::Zeroable;

use crate::error::IndexError;
use crate::posting::Posting;

/// One flat buffer of [`Posting`] records. During the fill pass every worker
/// writes through a shared reference; slot uniqueness comes from the atomic
/// bucket cursors, so the writes themselves need no synchronization.
pub(crate) struct EntryStore {
    slots: Box<[UnsafeCell<Posting>]>,
}

// Writers never alias a slot: each slot index is handed out exactly once by
// BucketOffsets::advance.
unsafe impl Sync for EntryStore {}

impl EntryStore {
    pub fn allocate(total: u64) -> Result<Self, IndexError> {
        let len = usize::try_from(total).map_err(|_| IndexError::AllocFailed {
            what: "posting entries",
            requested: usize::MAX,
        })?;
        let mut slots = Vec::new();
        slots
            .try_reserve_exact(len)
            .map_err(|_| IndexError::AllocFailed {
                what: "posting entries",
                requested: len * size_of::<Posting>(),
            })?;
        slots.extend((0..len).map(|_| UnsafeCell::new(Posting::zeroed())));
        Ok(Self {
            slots: slots.into_boxed_slice(),
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Place `posting` at `slot`. The caller must hold a freshly claimed
    /// cursor value for `slot`; no two writers may ever target the same slot.
    #[inline]
    pub fn write(&self, slot: usize, posting: Posting) {
        unsafe {
            *self.slots[slot].get() = posting;
        }
    }

    /// Freeze the store for the read stage.
    pub fn into_entries(self) -> Box<[Posting]> {
        let Self { slots } = self;
        // UnsafeCell<T> has the same in-memory representation as T.
        unsafe { Box::from_raw(Box::into_raw(slots) as *mut [Posting]) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_freeze() {
        let store = EntryStore::allocate(3).unwrap();
        store.write(
            1,
            Posting {
                seq_id: 7,
                position: 42,
            },
        );
        let entries = store.into_entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(
            entries[1],
            Posting {
                seq_id: 7,
                position: 42
            }
        );
        assert_eq!(entries[0], Posting::zeroed());
    }
}
