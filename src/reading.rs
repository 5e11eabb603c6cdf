use alloc::vec::Vec;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A single temperature sample reported by a sensor.
///
/// Readings are immutable once created. Inside the monitor they are addressed
/// by the [`ReadingId`] handed out by the [`ReadingStore`] on insertion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Identifier of the reporting sensor
    pub sensor_id: u32,
    /// Sample time in epoch milliseconds
    pub timestamp: i64,
    /// Temperature in °C
    pub temperature: f64,
}

impl Reading {
    /// Creates a new reading.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use heatwatch::Reading;
    ///
    /// let reading = Reading::new(3, 1_700_000_000_000, 42.5);
    /// assert_eq!(reading.sensor_id, 3);
    /// ```
    pub const fn new(sensor_id: u32, timestamp: i64, temperature: f64) -> Reading {
        Reading {
            sensor_id,
            timestamp,
            temperature,
        }
    }
}

/// Stable handle to a reading in the [`ReadingStore`].
///
/// Handles are assigned in insertion order and never reused, so the heap,
/// the position table and the expiration schedule can all refer to a reading
/// without owning it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ReadingId(pub(crate) usize);

impl ReadingId {
    /// The insertion-order index behind this handle.
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Append-only arena of every reading ever ingested.
///
/// Readings are never removed from the store; expiry only takes them out of
/// the active heap view.
#[derive(Debug, Clone, Default)]
pub struct ReadingStore {
    readings: Vec<Reading>,
}

impl ReadingStore {
    pub const fn new() -> ReadingStore {
        ReadingStore {
            readings: Vec::new(),
        }
    }

    /// Appends a reading and returns its handle.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use heatwatch::{Reading, ReadingStore};
    ///
    /// let mut store = ReadingStore::new();
    /// let first = store.push(Reading::new(1, 0, 20.0));
    /// let second = store.push(Reading::new(2, 5, 21.0));
    ///
    /// assert_eq!(first.index(), 0);
    /// assert_eq!(second.index(), 1);
    /// assert_eq!(store.len(), 2);
    /// ```
    pub fn push(&mut self, reading: Reading) -> ReadingId {
        self.readings.push(reading);
        ReadingId(self.readings.len() - 1)
    }

    /// Looks up a reading by handle.
    pub fn get(&self, id: ReadingId) -> Result<&Reading> {
        self.readings.get(id.0).ok_or(Error::IndexOutOfRange {
            index: id.0,
            len: self.readings.len(),
        })
    }

    /// Temperature of a reading already known to be in the store.
    ///
    /// Handles reach the heap only after being checked against the store,
    /// so this indexes directly.
    pub(crate) fn temperature(&self, id: ReadingId) -> f64 {
        self.readings[id.0].temperature
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ReadingId, &Reading)> {
        self.readings
            .iter()
            .enumerate()
            .map(|(i, r)| (ReadingId(i), r))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_follow_insertion_order() {
        let mut store = ReadingStore::new();
        let ids: Vec<ReadingId> = (0..4)
            .map(|i| store.push(Reading::new(i, i as i64 * 10, 20.0 + i as f64)))
            .collect();

        assert_eq!(
            ids.iter().map(|id| id.index()).collect::<Vec<_>>(),
            vec![0, 1, 2, 3]
        );
        assert_eq!(store.get(ids[2]).unwrap().sensor_id, 2);
        assert_eq!(store.temperature(ids[3]), 23.0);
    }

    #[test]
    fn get_unknown_handle_fails() {
        let mut other = ReadingStore::new();
        other.push(Reading::new(1, 0, 20.0));
        let foreign = other.push(Reading::new(1, 1, 20.0));

        let store = ReadingStore::new();
        assert_eq!(
            store.get(foreign),
            Err(Error::IndexOutOfRange { index: 1, len: 0 })
        );
    }

    #[test]
    fn iter_yields_handles_and_readings() {
        let mut store = ReadingStore::new();
        store.push(Reading::new(7, 100, 30.0));
        store.push(Reading::new(8, 200, 31.0));

        let collected: Vec<(usize, u32)> = store
            .iter()
            .map(|(id, r)| (id.index(), r.sensor_id))
            .collect();
        assert_eq!(collected, vec![(0, 7), (1, 8)]);
    }
}
