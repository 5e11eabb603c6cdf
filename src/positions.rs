use alloc::vec::Vec;

use crate::error::{Error, Result};
use crate::reading::ReadingId;

/// Maps each reading handle to the heap slot it currently occupies.
///
/// `None` means the reading is not in the heap: either it was never inserted
/// or it has since been deleted or expired. The table grows with the reading
/// store and is only ever addressed by handles the store issued.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PositionTable {
    slots: Vec<Option<usize>>,
}

impl PositionTable {
    pub const fn new() -> PositionTable {
        PositionTable { slots: Vec::new() }
    }

    /// Grows the table so it covers `len` readings; new entries are absent.
    pub fn cover(&mut self, len: usize) {
        if len > self.slots.len() {
            self.slots.resize(len, None);
        }
    }

    /// Current slot of `id`, or `None` if the reading is absent from the heap.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use heatwatch::{PositionTable, Reading, ReadingStore};
    ///
    /// let mut store = ReadingStore::new();
    /// let id = store.push(Reading::new(1, 0, 20.0));
    ///
    /// let mut table = PositionTable::new();
    /// assert!(table.get(id).is_err());
    ///
    /// table.cover(store.len());
    /// assert_eq!(table.get(id), Ok(None));
    /// ```
    pub fn get(&self, id: ReadingId) -> Result<Option<usize>> {
        self.slots
            .get(id.index())
            .copied()
            .ok_or(Error::IndexOutOfRange {
                index: id.index(),
                len: self.slots.len(),
            })
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Records that `id` now sits at `slot`.
    ///
    /// Callers only pass handles already covered by the table.
    pub(crate) fn set(&mut self, id: ReadingId, slot: usize) {
        self.slots[id.index()] = Some(slot);
    }

    pub(crate) fn clear(&mut self, id: ReadingId) {
        self.slots[id.index()] = None;
    }

    /// Number of readings currently marked present.
    pub fn present(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }
}
