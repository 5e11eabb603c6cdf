use alloc::collections::BinaryHeap;
use core::cmp::Reverse;

use log::{debug, trace};

use crate::error::Result;
use crate::minmax::MinMaxHeap;
use crate::reading::{Reading, ReadingId, ReadingStore};

/// Pending expiries, soonest first.
///
/// Entries are never updated or deduplicated. An entry whose reading has
/// already left the heap is stale and is dropped when it comes due.
#[derive(Debug, Clone, Default)]
pub struct ExpirationSchedule {
    pending: BinaryHeap<Reverse<(i64, ReadingId)>>,
}

impl ExpirationSchedule {
    pub fn new() -> ExpirationSchedule {
        ExpirationSchedule {
            pending: BinaryHeap::new(),
        }
    }

    /// Queues `id` to leave the active set once time reaches `expires_at`.
    pub fn schedule(&mut self, id: ReadingId, expires_at: i64) {
        self.pending.push(Reverse((expires_at, id)));
    }

    /// Earliest pending expiry time.
    pub fn next_expiry(&self) -> Option<i64> {
        self.pending.peek().map(|Reverse((at, _))| *at)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Pops every entry due at or before `now` and deletes its reading from
    /// `heap`.
    ///
    /// `on_expire` runs for each reading as soon as it leaves the heap, so a
    /// caller keeping totals stays in step even if a later entry fails.
    ///
    /// # Returns
    ///
    /// The number of readings actually removed. Stale entries are dropped
    /// without being counted.
    ///
    /// # Errors
    ///
    /// [`Error::IndexOutOfRange`](crate::Error::IndexOutOfRange) if a due entry
    /// names a reading the heap's position table does not cover. Readings
    /// removed before that entry stay removed.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use heatwatch::{ExpirationSchedule, MinMaxHeap, Reading, ReadingStore};
    ///
    /// let mut store = ReadingStore::new();
    /// let mut heap = MinMaxHeap::new();
    /// let mut schedule = ExpirationSchedule::new();
    ///
    /// let id = store.push(Reading::new(1, 1_000, 42.0));
    /// heap.insert(&store, id).unwrap();
    /// schedule.schedule(id, 61_000);
    ///
    /// assert_eq!(schedule.drain_expired(60_999, &mut heap, &store, |_, _| {}), Ok(0));
    ///
    /// let mut gone = Vec::new();
    /// let drained = schedule.drain_expired(61_000, &mut heap, &store, |id, _| gone.push(id));
    /// assert_eq!(drained, Ok(1));
    /// assert_eq!(gone, vec![id]);
    /// assert!(heap.is_empty());
    /// ```
    pub fn drain_expired<F>(
        &mut self,
        now: i64,
        heap: &mut MinMaxHeap,
        store: &ReadingStore,
        mut on_expire: F,
    ) -> Result<usize>
    where
        F: FnMut(ReadingId, &Reading),
    {
        let mut expired = 0;

        while let Some(&Reverse((at, id))) = self.pending.peek() {
            if at > now {
                break;
            }
            self.pending.pop();

            match heap.position(id)? {
                Some(slot) => {
                    heap.delete_at(store, slot);
                    debug!("reading {} expired at {}", id.index(), at);
                    on_expire(id, store.get(id)?);
                    expired += 1;
                }
                None => trace!("dropping stale expiry for reading {}", id.index()),
            }
        }

        Ok(expired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn setup(readings: &[(i64, f64)]) -> (ReadingStore, MinMaxHeap, ExpirationSchedule) {
        let mut store = ReadingStore::new();
        let mut heap = MinMaxHeap::new();
        let mut schedule = ExpirationSchedule::new();
        for (i, (timestamp, temperature)) in readings.iter().enumerate() {
            let id = store.push(Reading::new(i as u32, *timestamp, *temperature));
            heap.insert(&store, id).unwrap();
            schedule.schedule(id, timestamp + 100);
        }
        (store, heap, schedule)
    }

    fn drain(
        schedule: &mut ExpirationSchedule,
        now: i64,
        heap: &mut MinMaxHeap,
        store: &ReadingStore,
    ) -> Result<Vec<ReadingId>> {
        let mut expired = Vec::new();
        schedule.drain_expired(now, heap, store, |id, _| expired.push(id))?;
        Ok(expired)
    }

    #[test]
    fn drains_only_due_entries() {
        let (store, mut heap, mut schedule) = setup(&[(0, 40.0), (50, 41.0), (120, 42.0)]);

        let expired = drain(&mut schedule, 150, &mut heap, &store).unwrap();
        assert_eq!(expired, vec![ReadingId(0), ReadingId(1)]);
        assert_eq!(heap.len(), 1);
        assert_eq!(schedule.len(), 1);
        assert_eq!(schedule.next_expiry(), Some(220));
    }

    #[test]
    fn expiry_boundary_is_inclusive() {
        let (store, mut heap, mut schedule) = setup(&[(0, 40.0)]);

        assert!(drain(&mut schedule, 99, &mut heap, &store).unwrap().is_empty());
        assert!(heap.contains(ReadingId(0)));

        assert_eq!(
            drain(&mut schedule, 100, &mut heap, &store).unwrap(),
            vec![ReadingId(0)]
        );
        assert!(!heap.contains(ReadingId(0)));
    }

    #[test]
    fn stale_entries_are_discarded() {
        let (store, mut heap, mut schedule) = setup(&[(0, 40.0), (10, 41.0)]);
        heap.remove(&store, ReadingId(0)).unwrap();
        schedule.schedule(ReadingId(1), 50);

        let expired = drain(&mut schedule, 1_000, &mut heap, &store).unwrap();
        assert_eq!(expired, vec![ReadingId(1)]);
        assert!(schedule.is_empty());
        assert!(heap.is_empty());
    }

    #[test]
    fn unknown_reading_is_an_error() {
        let (store, mut heap, mut schedule) = setup(&[(0, 40.0)]);
        schedule.schedule(ReadingId(9), 0);

        assert_eq!(
            drain(&mut schedule, 0, &mut heap, &store),
            Err(Error::IndexOutOfRange { index: 9, len: 1 })
        );
    }

    #[test]
    fn readings_removed_before_a_failure_are_reported() {
        let (store, mut heap, mut schedule) = setup(&[(0, 40.0), (0, 44.0)]);
        schedule.schedule(ReadingId(9), 150);

        let mut removed = 0.0;
        let result = schedule.drain_expired(200, &mut heap, &store, |_, reading| {
            removed += reading.temperature;
        });

        assert_eq!(result, Err(Error::IndexOutOfRange { index: 9, len: 2 }));
        assert_eq!(removed, 84.0);
        assert!(heap.is_empty());
    }

    #[test]
    fn expiring_interior_reading_keeps_extremes() {
        let (store, mut heap, mut schedule) =
            setup(&[(0, 45.0), (200, 10.0), (200, 90.0), (200, 50.0), (200, 30.0)]);

        drain(&mut schedule, 100, &mut heap, &store).unwrap();
        assert_eq!(heap.find_min(), Some(ReadingId(1)));
        assert_eq!(heap.find_max(&store), Some(ReadingId(2)));
        assert_eq!(heap.len(), 4);
    }
}
