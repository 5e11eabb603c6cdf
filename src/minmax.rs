//! Double-ended priority queue over reading handles.
//!
//! The heap is a complete binary tree stored in a dense array. Even levels
//! (the root included) obey the min ordering and odd levels the max ordering,
//! so the root is the coldest active reading and the hottest one is a child
//! of the root. Every structural change is either a swap of two slots or a
//! pop of the last slot, and both keep the [`PositionTable`] in step with the
//! array before control returns to the caller.

use alloc::vec::Vec;

use log::warn;

use crate::error::{Error, Result};
use crate::positions::PositionTable;
use crate::reading::{ReadingId, ReadingStore};

/// Ordering role of a tree level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Level {
    Min,
    Max,
}

impl Level {
    /// Level of `slot`, from `floor(log2(slot + 1))`.
    fn of(slot: usize) -> Level {
        if (slot + 1).ilog2() % 2 == 0 {
            Level::Min
        } else {
            Level::Max
        }
    }

    fn opposite(self) -> Level {
        match self {
            Level::Min => Level::Max,
            Level::Max => Level::Min,
        }
    }

    /// Whether a value `a` belongs closer to the root than `b` on this level.
    fn favours(self, a: f64, b: f64) -> bool {
        match self {
            Level::Min => a < b,
            Level::Max => a > b,
        }
    }
}

/// A reversible structural change, recorded while a top-k query runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edit {
    Swap(usize, usize),
    Pop(ReadingId),
}

const fn parent(slot: usize) -> usize {
    (slot - 1) / 2
}

/// Children and grandchildren of `slot` that exist in a heap of `len` slots.
fn descendants(slot: usize, len: usize) -> heapless::Vec<usize, 6> {
    let mut found = heapless::Vec::new();
    let children = 2 * slot + 1..=2 * slot + 2;
    let grandchildren = 4 * slot + 3..=4 * slot + 6;
    for candidate in children.chain(grandchildren) {
        if candidate < len {
            let _ = found.push(candidate);
        }
    }
    found
}

/// Min-max heap of reading handles, ordered by the readings' temperatures.
///
/// The heap does not own readings. Every operation that compares takes the
/// [`ReadingStore`] the handles were issued by.
///
/// # Examples
///
/// ```rust
/// use heatwatch::{MinMaxHeap, Reading, ReadingStore};
///
/// let mut store = ReadingStore::new();
/// let mut heap = MinMaxHeap::new();
///
/// for (sensor, temperature) in [50.0, 10.0, 40.0, 30.0, 20.0].into_iter().enumerate() {
///     let id = store.push(Reading::new(sensor as u32, 0, temperature));
///     heap.insert(&store, id).unwrap();
/// }
///
/// assert_eq!(heap.find_min().map(|id| id.index()), Some(1));
/// assert_eq!(heap.find_max(&store).map(|id| id.index()), Some(0));
/// ```
#[derive(Debug, Clone, Default)]
pub struct MinMaxHeap {
    slots: Vec<ReadingId>,
    positions: PositionTable,
    journal: Option<Vec<Edit>>,
}

impl MinMaxHeap {
    pub const fn new() -> MinMaxHeap {
        MinMaxHeap {
            slots: Vec::new(),
            positions: PositionTable::new(),
            journal: None,
        }
    }

    /// Number of readings in the heap.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Slot currently holding `id`, `None` if it is not in the heap.
    ///
    /// Fails with [`Error::IndexOutOfRange`] when `id` was never covered by
    /// the position table.
    pub fn position(&self, id: ReadingId) -> Result<Option<usize>> {
        self.positions.get(id)
    }

    /// Whether `id` is in the heap; handles the table never covered are absent.
    pub fn contains(&self, id: ReadingId) -> bool {
        matches!(self.positions.get(id), Ok(Some(_)))
    }

    /// The backing array, root first.
    pub fn as_slice(&self) -> &[ReadingId] {
        &self.slots
    }

    /// Heap members in slot order, which is not sorted order.
    pub fn iter(&self) -> impl Iterator<Item = ReadingId> + '_ {
        self.slots.iter().copied()
    }

    /// Inserts a stored reading.
    ///
    /// # Errors
    ///
    /// * [`Error::IndexOutOfRange`] - `id` is not in `store`
    /// * [`Error::DuplicateInsert`] - `id` is already present; the heap is left
    ///   untouched and a warning is logged
    pub fn insert(&mut self, store: &ReadingStore, id: ReadingId) -> Result<()> {
        store.get(id)?;
        self.positions.cover(store.len());

        if self.positions.get(id)?.is_some() {
            warn!("reading {} is already in the heap, insert ignored", id.index());
            return Err(Error::DuplicateInsert { index: id.index() });
        }

        let slot = self.slots.len();
        self.slots.push(id);
        self.positions.set(id, slot);
        self.bubble_up(store, slot);
        Ok(())
    }

    /// Handle of the coldest reading.
    pub fn find_min(&self) -> Option<ReadingId> {
        self.slots.first().copied()
    }

    /// Handle of the hottest reading.
    pub fn find_max(&self, store: &ReadingStore) -> Option<ReadingId> {
        self.max_slot(store).map(|slot| self.slots[slot])
    }

    /// Removes and returns the coldest reading.
    pub fn delete_min(&mut self, store: &ReadingStore) -> Option<ReadingId> {
        self.delete_at(store, 0)
    }

    /// Removes and returns the hottest reading.
    pub fn delete_max(&mut self, store: &ReadingStore) -> Option<ReadingId> {
        let slot = self.max_slot(store)?;
        self.delete_at(store, slot)
    }

    /// Removes `id` if present, looking its slot up in the position table.
    ///
    /// Returns `Ok(false)` when the reading was not in the heap.
    pub fn remove(&mut self, store: &ReadingStore, id: ReadingId) -> Result<bool> {
        match self.positions.get(id)? {
            Some(slot) => Ok(self.delete_at(store, slot).is_some()),
            None => Ok(false),
        }
    }

    /// Removes whatever sits at `slot` and returns it.
    ///
    /// The last element is moved into the vacated slot and then sifted up and
    /// down; only one of the two directions can move it. A slot past the end
    /// is a no-op returning `None`.
    pub fn delete_at(&mut self, store: &ReadingStore, slot: usize) -> Option<ReadingId> {
        if slot >= self.slots.len() {
            return None;
        }

        let last = self.slots.len() - 1;
        self.swap(slot, last);
        let removed = self.pop_last()?;

        if slot < self.slots.len() {
            self.bubble_up(store, slot);
            self.bubble_down(store, slot);
        }
        Some(removed)
    }

    /// Up to `k` coldest readings, coldest first.
    ///
    /// The heap is left exactly as it was found, slot for slot.
    pub fn top_k_min(&mut self, store: &ReadingStore, k: usize) -> Vec<ReadingId> {
        self.extract_and_restore(store, k, |heap, _| (!heap.is_empty()).then_some(0))
    }

    /// Up to `k` hottest readings, hottest first.
    ///
    /// The heap is left exactly as it was found, slot for slot.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use heatwatch::{MinMaxHeap, Reading, ReadingStore};
    ///
    /// let mut store = ReadingStore::new();
    /// let mut heap = MinMaxHeap::new();
    /// for temperature in [41.0, 43.5, 40.2, 80.1, 12.0] {
    ///     let id = store.push(Reading::new(1, 0, temperature));
    ///     heap.insert(&store, id).unwrap();
    /// }
    ///
    /// let before = heap.as_slice().to_vec();
    /// let hottest: Vec<usize> = heap.top_k_max(&store, 2).iter().map(|id| id.index()).collect();
    ///
    /// assert_eq!(hottest, vec![3, 1]);
    /// assert_eq!(heap.as_slice(), &before[..]);
    /// ```
    pub fn top_k_max(&mut self, store: &ReadingStore, k: usize) -> Vec<ReadingId> {
        self.extract_and_restore(store, k, |heap, store| heap.max_slot(store))
    }

    /// Pulls up to `k` extremes out one by one, then replays the journal of
    /// swaps and pops backwards to put every handle back in its original slot.
    fn extract_and_restore<F>(&mut self, store: &ReadingStore, k: usize, pick: F) -> Vec<ReadingId>
    where
        F: Fn(&MinMaxHeap, &ReadingStore) -> Option<usize>,
    {
        let mut extracted = Vec::with_capacity(k.min(self.len()));
        self.journal = Some(Vec::new());

        while extracted.len() < k {
            let Some(slot) = pick(self, store) else {
                break;
            };
            match self.delete_at(store, slot) {
                Some(id) => extracted.push(id),
                None => break,
            }
        }

        self.rewind();
        extracted
    }

    fn rewind(&mut self) {
        let Some(journal) = self.journal.take() else {
            return;
        };

        for edit in journal.into_iter().rev() {
            match edit {
                Edit::Swap(a, b) => self.swap(a, b),
                Edit::Pop(id) => {
                    let slot = self.slots.len();
                    self.slots.push(id);
                    self.positions.set(id, slot);
                }
            }
        }
    }

    fn max_slot(&self, store: &ReadingStore) -> Option<usize> {
        match self.slots.len() {
            0 => None,
            1 => Some(0),
            2 => Some(1),
            _ if self.key(store, 2) > self.key(store, 1) => Some(2),
            _ => Some(1),
        }
    }

    fn key(&self, store: &ReadingStore, slot: usize) -> f64 {
        store.temperature(self.slots[slot])
    }

    fn swap(&mut self, a: usize, b: usize) {
        self.slots.swap(a, b);
        self.positions.set(self.slots[a], a);
        self.positions.set(self.slots[b], b);
        if let Some(journal) = self.journal.as_mut() {
            journal.push(Edit::Swap(a, b));
        }
    }

    fn pop_last(&mut self) -> Option<ReadingId> {
        let id = self.slots.pop()?;
        self.positions.clear(id);
        if let Some(journal) = self.journal.as_mut() {
            journal.push(Edit::Pop(id));
        }
        Some(id)
    }

    fn bubble_up(&mut self, store: &ReadingStore, slot: usize) {
        if slot == 0 {
            return;
        }

        let level = Level::of(slot);
        let up = parent(slot);

        // A value that belongs on the parent's level swaps into it first and
        // then climbs that level's grandparent chain.
        if level
            .opposite()
            .favours(self.key(store, slot), self.key(store, up))
        {
            self.swap(slot, up);
            self.bubble_up_level(store, up, level.opposite());
        } else {
            self.bubble_up_level(store, slot, level);
        }
    }

    fn bubble_up_level(&mut self, store: &ReadingStore, mut slot: usize, level: Level) {
        // slots 0..=2 have no grandparent
        while slot > 2 {
            let grandparent = parent(parent(slot));
            if !level.favours(self.key(store, slot), self.key(store, grandparent)) {
                break;
            }
            self.swap(slot, grandparent);
            slot = grandparent;
        }
    }

    fn bubble_down(&mut self, store: &ReadingStore, mut slot: usize) {
        let level = Level::of(slot);

        loop {
            let candidates = descendants(slot, self.slots.len());
            let Some(&first) = candidates.first() else {
                return;
            };

            let best = candidates.iter().copied().fold(first, |best, candidate| {
                if level.favours(self.key(store, candidate), self.key(store, best)) {
                    candidate
                } else {
                    best
                }
            });

            if !level.favours(self.key(store, best), self.key(store, slot)) {
                return;
            }
            self.swap(slot, best);

            if best <= 2 * slot + 2 {
                return;
            }

            let up = parent(best);
            if level
                .opposite()
                .favours(self.key(store, best), self.key(store, up))
            {
                self.swap(best, up);
            }
            slot = best;
        }
    }
}
