use crate::monitor::error::MonitorError;
use crate::monitor::sample::{DefectMarker, Sample};

/// Default de-duplication window in seconds: crossings closer together than
/// this on one channel are the same physical flaw.
pub const DEFAULT_DEDUP_EPSILON_SECS: f64 = 0.01;

/// Stateful threshold classifier with a de-duplication window.
///
/// A defect event is a cluster, not every crossing sample: the first sample
/// above the threshold produces a marker, and further crossings on the same
/// channel within `epsilon_secs` of any recorded marker are folded into it.
pub struct DefectDetector {
    threshold_mv: f64,
    epsilon_secs: f64,
    markers: Vec<DefectMarker>,
}

impl DefectDetector {
    pub fn new(threshold_mv: f64, epsilon_secs: f64) -> Result<Self, MonitorError> {
        if !threshold_mv.is_finite() {
            return Err(MonitorError::NonFiniteThreshold(threshold_mv));
        }
        if !epsilon_secs.is_finite() || epsilon_secs <= 0.0 {
            return Err(MonitorError::InvalidEpsilon(epsilon_secs));
        }
        Ok(Self {
            threshold_mv,
            epsilon_secs,
            markers: Vec::new(),
        })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold_mv
    }

    /// Hot-swaps the threshold; takes effect on the next `classify` call.
    /// Already-processed samples are never re-evaluated.
    pub fn set_threshold(&mut self, value: f64) -> Result<(), MonitorError> {
        if !value.is_finite() {
            return Err(MonitorError::NonFiniteThreshold(value));
        }
        self.threshold_mv = value;
        Ok(())
    }

    /// Returns a marker iff the sample strictly exceeds the threshold and no
    /// earlier marker on the same channel sits within the epsilon window.
    ///
    /// NaN and infinite amplitudes never trigger; they are logged and treated
    /// as below threshold so a bad reading cannot crash the tick path.
    pub fn classify(&mut self, sample: &Sample) -> Option<DefectMarker> {
        if !sample.amplitude_mv.is_finite() {
            log::warn!(
                "non-finite amplitude {} on {} at t={:.3}s, ignoring",
                sample.amplitude_mv,
                sample.channel,
                sample.timestamp_secs
            );
            return None;
        }
        if !(sample.amplitude_mv > self.threshold_mv) {
            return None;
        }
        let duplicate = self.markers.iter().any(|m| {
            m.channel == sample.channel
                && (m.timestamp_secs - sample.timestamp_secs).abs() < self.epsilon_secs
        });
        if duplicate {
            return None;
        }
        let marker = DefectMarker::from_sample(sample);
        self.markers.push(marker);
        Some(marker)
    }

    /// All markers produced this session, in detection order.
    pub fn markers(&self) -> &[DefectMarker] {
        &self.markers
    }

    pub fn clear(&mut self) {
        self.markers.clear();
    }
}
