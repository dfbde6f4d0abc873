use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::monitor::error::MonitorError;

/// Runtime settings for a monitoring session. Presets are stored as JSON; the
/// defaults match the instrument's factory configuration.
///
/// Validation rejects, never clamps: an out-of-range preset is an operator
/// mistake to surface, not to paper over.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Most recent samples kept per channel for display.
    pub buffer_capacity: usize,
    /// Defect detection threshold in millivolts, shared across channels.
    pub threshold_mv: f64,
    /// Markers on one channel closer together than this are one event.
    pub dedup_epsilon_secs: f64,
    /// Milliseconds between ticks.
    pub cadence_ms: u64,
    /// Samples generated per channel per tick.
    pub samples_per_tick: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: 500,
            threshold_mv: 80.0,
            dedup_epsilon_secs: 0.01,
            cadence_ms: 100,
            samples_per_tick: 10,
        }
    }
}

impl MonitorConfig {
    pub fn validate(&self) -> Result<(), MonitorError> {
        if self.buffer_capacity == 0 {
            return Err(MonitorError::InvalidCapacity);
        }
        if !self.threshold_mv.is_finite() {
            return Err(MonitorError::NonFiniteThreshold(self.threshold_mv));
        }
        if !self.dedup_epsilon_secs.is_finite() || self.dedup_epsilon_secs <= 0.0 {
            return Err(MonitorError::InvalidEpsilon(self.dedup_epsilon_secs));
        }
        if self.cadence_ms == 0 {
            return Err(MonitorError::InvalidCadence);
        }
        if self.samples_per_tick == 0 {
            return Err(MonitorError::InvalidBatchSize);
        }
        Ok(())
    }

    /// Loads and validates a JSON preset.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, MonitorError> {
        let file = File::open(path)?;
        let config: MonitorConfig = serde_json::from_reader(BufReader::new(file))?;
        config.validate()?;
        Ok(config)
    }
}
