#![deny(unsafe_code)]
#![cfg_attr(not(test), no_std)]

//! Sliding-window temperature monitoring for `no_std` environments.
//!
//! This library keeps the currently active readings of a sensor stream in a
//! min-max heap, so both the hottest and the coldest readings are available at
//! any moment, and evicts readings a fixed time after they were taken without
//! ever rescanning the window.
//!
//! # Features
//!
//! - **No-std compatible**: Only needs `alloc`, performs no I/O
//! - **Memory safe**: Uses `#![deny(unsafe_code)]` for guaranteed memory safety
//! - **Double-ended**: O(1) access to both extremes, O(log n) insert and delete
//! - **Arbitrary deletion**: A position table locates any reading's heap slot directly
//! - **Lazy expiry**: Readings are evicted when the next reading arrives
//! - **Spike detection**: Hot readings whose neighboring sensors are normal raise alerts
//!
//! # Example
//!
//! ```rust
//! use heatwatch::{Monitor, MonitorConfig, Reading};
//!
//! let config = MonitorConfig::default().with_ttl_ms(60_000);
//! let mut monitor = Monitor::new(config).unwrap();
//!
//! monitor.ingest(Reading::new(1, 0, 41.0)).unwrap();
//! monitor.ingest(Reading::new(2, 10, 12.5)).unwrap();
//! monitor.ingest(Reading::new(3, 20, 44.0)).unwrap();
//!
//! assert_eq!(monitor.max().map(|r| r.sensor_id), Some(3));
//! assert_eq!(monitor.min().map(|r| r.sensor_id), Some(2));
//!
//! // The first reading expires once a reading at or past its expiry arrives
//! monitor.ingest(Reading::new(4, 60_000, 40.0)).unwrap();
//! assert_eq!(monitor.active_len(), 3);
//! ```

extern crate alloc;

pub mod config;
pub mod detector;
pub mod error;
pub mod expiry;
pub mod minmax;
pub mod monitor;
pub mod positions;
pub mod reading;

pub use config::MonitorConfig;
pub use detector::{Alert, AlertKind, AnomalyDetector, LastSeen, SensorTable};
pub use error::{Error, Result};
pub use expiry::ExpirationSchedule;
pub use minmax::MinMaxHeap;
pub use monitor::{Aggregates, Monitor};
pub use positions::PositionTable;
pub use reading::{Reading, ReadingId, ReadingStore};
