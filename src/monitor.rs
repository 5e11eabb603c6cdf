use alloc::vec::Vec;

use log::{debug, warn};

use crate::config::MonitorConfig;
use crate::detector::{Alert, AnomalyDetector, LastSeen, SensorTable};
use crate::error::{Error, Result};
use crate::expiry::ExpirationSchedule;
use crate::minmax::MinMaxHeap;
use crate::reading::{Reading, ReadingId, ReadingStore};

/// Running totals over the active readings.
///
/// Updated on every insertion and confirmed expiry, never recomputed.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Aggregates {
    pub sum: f64,
    pub count: usize,
}

impl Aggregates {
    fn add(&mut self, temperature: f64) {
        self.sum += temperature;
        self.count += 1;
    }

    fn remove(&mut self, temperature: f64) {
        self.sum -= temperature;
        self.count -= 1;
    }

    /// Mean active temperature, `None` when nothing is active.
    pub fn average(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}

/// Owns every piece of live state for one reading stream.
///
/// A monitor is single-writer: callers serialize access to it, and each
/// call runs to completion without blocking or doing I/O.
///
/// # Examples
///
/// ```rust
/// use heatwatch::{Monitor, MonitorConfig, Reading};
///
/// let mut monitor = Monitor::new(MonitorConfig::default()).unwrap();
///
/// for sensor in 1..=5 {
///     assert!(monitor.ingest(Reading::new(sensor, 1_000, 40.0)).unwrap().is_empty());
/// }
///
/// let alerts = monitor.ingest(Reading::new(3, 1_100, 60.0)).unwrap();
/// assert_eq!(alerts.len(), 1);
/// assert_eq!(alerts[0].sensor_id, 3);
/// ```
#[derive(Debug, Clone)]
pub struct Monitor {
    config: MonitorConfig,
    store: ReadingStore,
    heap: MinMaxHeap,
    schedule: ExpirationSchedule,
    aggregates: Aggregates,
    sensors: SensorTable,
    detector: AnomalyDetector,
}

impl Monitor {
    /// Builds an empty monitor.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidConfig`] when `config` fails validation.
    pub fn new(config: MonitorConfig) -> Result<Monitor> {
        config.validate()?;
        Ok(Monitor {
            store: ReadingStore::new(),
            heap: MinMaxHeap::new(),
            schedule: ExpirationSchedule::new(),
            aggregates: Aggregates::default(),
            sensors: SensorTable::new(&config),
            detector: AnomalyDetector::new(&config),
            config,
        })
    }

    /// Feeds one reading through the monitor and returns the alerts it raised.
    ///
    /// In order: readings due to expire at the new reading's timestamp are
    /// evicted, the reading is stored, inserted and scheduled, the aggregates
    /// and the sensor's last-seen entry are updated, and the hottest readings
    /// are checked for isolated spikes.
    ///
    /// Readings with a non-finite temperature are dropped with a warning.
    ///
    /// # Errors
    ///
    /// [`Error::IndexOutOfRange`] if the internal tables fall out of step.
    pub fn ingest(&mut self, reading: Reading) -> Result<Vec<Alert>> {
        if !reading.temperature.is_finite() {
            warn!(
                "dropping reading from sensor {} with temperature {}",
                reading.sensor_id, reading.temperature
            );
            return Ok(Vec::new());
        }

        self.expire(reading.timestamp)?;

        let id = self.store.push(reading);
        self.admit(id, reading)?;

        if !self.sensors.record(&reading) {
            warn!(
                "sensor {} is outside [{}, {}], not tracked as a neighbor",
                reading.sensor_id, self.config.min_sensor_id, self.config.max_sensor_id
            );
        }

        self.detector.check(&mut self.heap, &self.store, &self.sensors)
    }

    /// Inserts a stored reading into the active set, schedules its expiry and
    /// counts it in the aggregates.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - The reading joined the active set
    /// * `Ok(false)` - The reading was already active, nothing changed
    fn admit(&mut self, id: ReadingId, reading: Reading) -> Result<bool> {
        match self.heap.insert(&self.store, id) {
            Ok(()) => {}
            Err(Error::DuplicateInsert { .. }) => return Ok(false),
            Err(e) => return Err(e),
        }
        self.schedule
            .schedule(id, reading.timestamp.saturating_add(self.config.ttl_ms));
        self.aggregates.add(reading.temperature);
        Ok(true)
    }

    /// Evicts every reading whose expiry time is at or before `now`.
    ///
    /// The aggregates are adjusted per eviction, so they stay in step with
    /// the active set even when the drain stops on an error.
    ///
    /// # Returns
    ///
    /// The number of readings that left the active set.
    pub fn expire(&mut self, now: i64) -> Result<usize> {
        let aggregates = &mut self.aggregates;
        let expired = self
            .schedule
            .drain_expired(now, &mut self.heap, &self.store, |_, reading| {
                aggregates.remove(reading.temperature)
            })?;
        if expired > 0 {
            debug!(
                "expired {} readings, {} still active",
                expired, self.aggregates.count
            );
        }
        Ok(expired)
    }

    /// Up to `k` hottest active readings, hottest first.
    pub fn hottest(&mut self, k: usize) -> Vec<Reading> {
        let ids = self.heap.top_k_max(&self.store, k);
        self.resolve(&ids)
    }

    /// Up to `k` coldest active readings, coldest first.
    pub fn coldest(&mut self, k: usize) -> Vec<Reading> {
        let ids = self.heap.top_k_min(&self.store, k);
        self.resolve(&ids)
    }

    fn resolve(&self, ids: &[ReadingId]) -> Vec<Reading> {
        ids.iter()
            .filter_map(|id| self.store.get(*id).ok())
            .copied()
            .collect()
    }

    /// Coldest active reading.
    pub fn min(&self) -> Option<&Reading> {
        self.heap.find_min().and_then(|id| self.store.get(id).ok())
    }

    /// Hottest active reading.
    pub fn max(&self) -> Option<&Reading> {
        self.heap
            .find_max(&self.store)
            .and_then(|id| self.store.get(id).ok())
    }

    /// Mean temperature of the active readings.
    pub fn average(&self) -> Option<f64> {
        self.aggregates.average()
    }

    pub fn aggregates(&self) -> Aggregates {
        self.aggregates
    }

    /// Number of readings currently in the active set.
    pub fn active_len(&self) -> usize {
        self.heap.len()
    }

    /// Number of readings ever ingested, expired ones included.
    pub fn total_ingested(&self) -> usize {
        self.store.len()
    }

    /// Latest reading recorded for `sensor_id`, whether or not it is still active.
    pub fn last_seen(&self, sensor_id: u32) -> Option<LastSeen> {
        self.sensors.get(sensor_id)
    }

    /// Looks up any reading ever ingested.
    ///
    /// # Returns
    ///
    /// * `Ok(&Reading)` - The stored reading, active or expired
    /// * `Err(Error::IndexOutOfRange)` - `id` was never handed out by this monitor
    pub fn reading(&self, id: ReadingId) -> Result<&Reading> {
        self.store.get(id)
    }

    pub fn is_active(&self, id: ReadingId) -> bool {
        self.heap.contains(id)
    }

    /// Configuration the monitor was built with.
    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }
}
