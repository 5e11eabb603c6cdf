use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use core::fmt;

use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};

use crate::config::MonitorConfig;
use crate::error::Result;
use crate::minmax::MinMaxHeap;
use crate::reading::{Reading, ReadingStore};

/// Most recent sample seen from one sensor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LastSeen {
    pub temperature: f64,
    pub timestamp: i64,
}

/// Last known temperature per sensor, over the configured id range.
///
/// Only sensors that have reported are stored, so the table stays small no
/// matter how wide the configured range is. Entries are overwritten by every
/// new reading and never expire, so a neighbor's value may be older than the
/// active window.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorTable {
    min_sensor_id: u32,
    max_sensor_id: u32,
    entries: BTreeMap<u32, LastSeen>,
}

impl SensorTable {
    pub fn new(config: &MonitorConfig) -> SensorTable {
        SensorTable {
            min_sensor_id: config.min_sensor_id,
            max_sensor_id: config.max_sensor_id,
            entries: BTreeMap::new(),
        }
    }

    fn covers(&self, sensor_id: u32) -> bool {
        (self.min_sensor_id..=self.max_sensor_id).contains(&sensor_id)
    }

    /// Remembers `reading` as its sensor's latest sample.
    ///
    /// # Returns
    ///
    /// * `true` - The sample was recorded
    /// * `false` - The sensor is outside the table's range and was ignored
    pub fn record(&mut self, reading: &Reading) -> bool {
        if !self.covers(reading.sensor_id) {
            return false;
        }
        self.entries.insert(
            reading.sensor_id,
            LastSeen {
                temperature: reading.temperature,
                timestamp: reading.timestamp,
            },
        );
        true
    }

    /// Latest sample for `sensor_id`, if one was ever recorded.
    pub fn get(&self, sensor_id: u32) -> Option<LastSeen> {
        self.entries.get(&sensor_id).copied()
    }

    /// Number of sensors heard from so far.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertKind {
    /// A hot reading whose neighboring sensors are not hot
    IsolatedHighSpike,
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertKind::IsolatedHighSpike => f.write_str("Isolated High Spike"),
        }
    }
}

/// Structured alert produced by the monitor. Formatting and delivery are up to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// Timestamp of the offending reading, epoch milliseconds
    pub timestamp: i64,
    pub sensor_id: u32,
    pub temperature: f64,
    pub kind: AlertKind,
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[ALERT] Time: ")?;
        match DateTime::<Utc>::from_timestamp_millis(self.timestamp) {
            Some(at) => write!(f, "{}", at.format("%Y-%m-%d %H:%M:%S%.3f UTC"))?,
            None => write!(f, "{} ms", self.timestamp)?,
        }
        write!(
            f,
            " | Sensor: {} | Type: {} | Temp: {:.2} C",
            self.sensor_id, self.kind, self.temperature
        )?;
        match self.kind {
            AlertKind::IsolatedHighSpike => f.write_str(" [Note] Neighboring sensors are normal."),
        }
    }
}

/// Flags hot readings among the current top-k whose neighbors are normal.
#[derive(Debug, Clone, PartialEq)]
pub struct AnomalyDetector {
    check_width: usize,
    high_threshold: f64,
    min_sensor_id: u32,
    max_sensor_id: u32,
}

impl AnomalyDetector {
    pub fn new(config: &MonitorConfig) -> AnomalyDetector {
        AnomalyDetector {
            check_width: config.check_width,
            high_threshold: config.high_threshold,
            min_sensor_id: config.min_sensor_id,
            max_sensor_id: config.max_sensor_id,
        }
    }

    pub fn is_hot(&self, temperature: f64) -> bool {
        temperature > self.high_threshold
    }

    /// Whether the sensors directly below and above `sensor_id` both look normal.
    ///
    /// A neighbor outside the id range, or one never heard from, counts as normal.
    pub fn is_isolated(&self, sensors: &SensorTable, sensor_id: u32) -> bool {
        let normal = |neighbor: u32| {
            sensors
                .get(neighbor)
                .map_or(true, |seen| !self.is_hot(seen.temperature))
        };

        let below = sensor_id <= self.min_sensor_id || normal(sensor_id - 1);
        let above = sensor_id >= self.max_sensor_id || normal(sensor_id + 1);
        below && above
    }

    /// Runs the spike check over the hottest active readings.
    ///
    /// Nothing is checked until the heap holds at least `check_width` readings.
    /// The heap is restored to its exact prior layout before returning.
    pub fn check(
        &self,
        heap: &mut MinMaxHeap,
        store: &ReadingStore,
        sensors: &SensorTable,
    ) -> Result<Vec<Alert>> {
        if heap.len() < self.check_width {
            return Ok(Vec::new());
        }

        let mut alerts = Vec::new();
        for id in heap.top_k_max(store, self.check_width) {
            let reading = store.get(id)?;
            if !self.is_hot(reading.temperature) {
                continue;
            }
            if !self.is_isolated(sensors, reading.sensor_id) {
                continue;
            }

            let alert = Alert {
                timestamp: reading.timestamp,
                sensor_id: reading.sensor_id,
                temperature: reading.temperature,
                kind: AlertKind::IsolatedHighSpike,
            };
            info!("{alert}");
            alerts.push(alert);
        }
        Ok(alerts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> MonitorConfig {
        MonitorConfig::default()
    }

    fn table_with(readings: &[(u32, f64)]) -> SensorTable {
        let mut table = SensorTable::new(&config());
        for (sensor, temperature) in readings {
            table.record(&Reading::new(*sensor, 0, *temperature));
        }
        table
    }

    #[test]
    fn sensor_table_overwrites_and_bounds() {
        let mut table = SensorTable::new(&config());

        assert!(table.record(&Reading::new(3, 10, 40.0)));
        assert!(table.record(&Reading::new(3, 20, 41.0)));
        assert_eq!(
            table.get(3),
            Some(LastSeen {
                temperature: 41.0,
                timestamp: 20
            })
        );

        assert!(!table.record(&Reading::new(0, 0, 40.0)));
        assert!(!table.record(&Reading::new(16, 0, 40.0)));
        assert_eq!(table.get(0), None);
        assert_eq!(table.get(16), None);
        assert_eq!(table.get(7), None);
    }

    #[test]
    fn full_u32_range_stores_only_reporting_sensors() {
        let wide = MonitorConfig::default().with_sensor_range(0, u32::MAX);
        assert_eq!(wide.validate(), Ok(()));

        let mut table = SensorTable::new(&wide);
        assert!(table.is_empty());
        assert!(table.record(&Reading::new(0, 1, 40.0)));
        assert!(table.record(&Reading::new(u32::MAX, 2, 70.0)));

        assert_eq!(table.len(), 2);
        assert_eq!(table.get(u32::MAX).map(|seen| seen.temperature), Some(70.0));
        assert_eq!(table.get(12), None);

        let detector = AnomalyDetector::new(&wide);
        assert!(detector.is_isolated(&table, u32::MAX));
        assert!(detector.is_isolated(&table, 0));
    }

    #[test]
    fn threshold_is_exclusive() {
        let detector = AnomalyDetector::new(&config());
        assert!(!detector.is_hot(48.0));
        assert!(detector.is_hot(48.01));
    }

    #[test]
    fn isolated_when_neighbors_normal_or_unknown() {
        let detector = AnomalyDetector::new(&config());

        let table = table_with(&[(2, 40.0), (3, 60.0), (4, 48.0)]);
        assert!(detector.is_isolated(&table, 3));

        let table = table_with(&[(3, 60.0)]);
        assert!(detector.is_isolated(&table, 3));
    }

    #[test]
    fn not_isolated_when_a_neighbor_is_hot() {
        let detector = AnomalyDetector::new(&config());

        let table = table_with(&[(2, 60.0), (3, 60.0), (4, 40.0)]);
        assert!(!detector.is_isolated(&table, 3));
        assert!(!detector.is_isolated(&table, 2));

        let table = table_with(&[(3, 40.0), (4, 70.0), (5, 40.0)]);
        assert!(!detector.is_isolated(&table, 3));
    }

    #[test]
    fn edge_sensors_ignore_missing_side() {
        let detector = AnomalyDetector::new(&config());
        let table = table_with(&[(1, 60.0), (2, 40.0), (14, 40.0), (15, 60.0)]);

        assert!(detector.is_isolated(&table, 1));
        assert!(detector.is_isolated(&table, 15));
    }

    #[test]
    fn check_waits_for_full_width() {
        let detector = AnomalyDetector::new(&config());
        let mut store = ReadingStore::new();
        let mut heap = MinMaxHeap::new();
        let mut table = SensorTable::new(&config());

        for sensor in 1..=4 {
            let reading = Reading::new(sensor, 0, 90.0);
            table.record(&reading);
            let id = store.push(reading);
            heap.insert(&store, id).unwrap();
        }
        assert!(detector.check(&mut heap, &store, &table).unwrap().is_empty());
    }

    #[test]
    fn check_reports_isolated_spike() {
        let detector = AnomalyDetector::new(&config());
        let mut store = ReadingStore::new();
        let mut heap = MinMaxHeap::new();
        let mut table = SensorTable::new(&config());

        let readings = [
            (1, 40.0),
            (2, 40.0),
            (3, 40.0),
            (4, 40.0),
            (5, 40.0),
            (9, 75.0),
        ];
        for (sensor, temperature) in readings {
            let reading = Reading::new(sensor, 1_000, temperature);
            table.record(&reading);
            let id = store.push(reading);
            heap.insert(&store, id).unwrap();
        }

        let alerts = detector.check(&mut heap, &store, &table).unwrap();
        assert_eq!(
            alerts,
            vec![Alert {
                timestamp: 1_000,
                sensor_id: 9,
                temperature: 75.0,
                kind: AlertKind::IsolatedHighSpike,
            }]
        );
        assert_eq!(heap.len(), 6);
    }

    #[test]
    fn alert_renders_as_log_line() {
        let alert = Alert {
            timestamp: 0,
            sensor_id: 4,
            temperature: 80.5,
            kind: AlertKind::IsolatedHighSpike,
        };

        assert_eq!(
            alert.to_string(),
            "[ALERT] Time: 1970-01-01 00:00:00.000 UTC | Sensor: 4 | Type: Isolated High Spike \
             | Temp: 80.50 C [Note] Neighboring sensors are normal."
        );
    }
}
