use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Readings stay active for one minute after their timestamp.
pub const DEFAULT_TTL_MS: i64 = 60_000;
/// Number of hottest readings inspected on every ingestion.
pub const DEFAULT_CHECK_WIDTH: usize = 5;
/// Temperatures strictly above this are considered hot, in °C.
pub const DEFAULT_HIGH_THRESHOLD: f64 = 48.0;
pub const DEFAULT_MIN_SENSOR_ID: u32 = 1;
pub const DEFAULT_MAX_SENSOR_ID: u32 = 15;

/// Tunables injected into a [`Monitor`](crate::Monitor) at construction.
///
/// # Examples
///
/// ```rust
/// use heatwatch::MonitorConfig;
///
/// let config = MonitorConfig::default()
///     .with_ttl_ms(30_000)
///     .with_high_threshold(55.0);
///
/// assert!(config.validate().is_ok());
/// assert_eq!(config.check_width, 5);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// How long a reading stays in the active set, in milliseconds
    pub ttl_ms: i64,
    /// How many of the hottest readings are checked for spikes
    pub check_width: usize,
    /// Temperature above which a reading counts as hot
    pub high_threshold: f64,
    /// Lowest valid sensor identifier
    pub min_sensor_id: u32,
    /// Highest valid sensor identifier
    pub max_sensor_id: u32,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        MonitorConfig {
            ttl_ms: DEFAULT_TTL_MS,
            check_width: DEFAULT_CHECK_WIDTH,
            high_threshold: DEFAULT_HIGH_THRESHOLD,
            min_sensor_id: DEFAULT_MIN_SENSOR_ID,
            max_sensor_id: DEFAULT_MAX_SENSOR_ID,
        }
    }
}

impl MonitorConfig {
    /// Sets how long a reading stays active.
    ///
    /// # Parameters
    ///
    /// * `ttl_ms` - Lifetime of a reading in milliseconds, must be positive
    pub fn with_ttl_ms(mut self, ttl_ms: i64) -> Self {
        self.ttl_ms = ttl_ms;
        self
    }

    /// Sets how many of the hottest readings each ingestion checks.
    pub fn with_check_width(mut self, check_width: usize) -> Self {
        self.check_width = check_width;
        self
    }

    /// Sets the temperature above which a reading is hot.
    pub fn with_high_threshold(mut self, high_threshold: f64) -> Self {
        self.high_threshold = high_threshold;
        self
    }

    /// Sets the inclusive range of valid sensor identifiers.
    ///
    /// # Parameters
    ///
    /// * `min_sensor_id` - Lowest valid identifier, its lower neighbor is never checked
    /// * `max_sensor_id` - Highest valid identifier, its upper neighbor is never checked
    pub fn with_sensor_range(mut self, min_sensor_id: u32, max_sensor_id: u32) -> Self {
        self.min_sensor_id = min_sensor_id;
        self.max_sensor_id = max_sensor_id;
        self
    }

    /// Checks the configuration before it is handed to a monitor.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - Every value is usable
    /// * `Err(Error::InvalidConfig)` - The ttl is not positive, the check width
    ///   is zero, the threshold is not finite or the sensor range is inverted
    pub fn validate(&self) -> Result<()> {
        if self.ttl_ms <= 0 {
            return Err(Error::InvalidConfig("ttl must be positive"));
        }
        if self.check_width == 0 {
            return Err(Error::InvalidConfig("check width must be at least one"));
        }
        if !self.high_threshold.is_finite() {
            return Err(Error::InvalidConfig("high threshold must be finite"));
        }
        if self.min_sensor_id > self.max_sensor_id {
            return Err(Error::InvalidConfig("sensor range is empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = MonitorConfig::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!((config.min_sensor_id, config.max_sensor_id), (1, 15));
    }

    #[test]
    fn rejects_bad_values() {
        let base = MonitorConfig::default();

        assert!(base.clone().with_ttl_ms(0).validate().is_err());
        assert!(base.clone().with_check_width(0).validate().is_err());
        assert!(base.clone().with_high_threshold(f64::NAN).validate().is_err());
        assert_eq!(
            base.with_sensor_range(5, 4).validate(),
            Err(Error::InvalidConfig("sensor range is empty"))
        );
    }
}
