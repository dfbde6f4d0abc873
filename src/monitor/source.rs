use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::monitor::error::MonitorError;
use crate::monitor::sample::{Channel, Sample};

/// Something that can yield the next batch of timestamped samples on demand:
/// a simulator here, an acquisition hardware driver in production.
///
/// Returned samples carry their channel; channel One samples precede channel
/// Two within a batch, and timestamps are non-decreasing per channel starting
/// at `since_secs`.
pub trait SampleSource {
    fn next_batch(&mut self, count: usize, since_secs: f64) -> Result<Vec<Sample>, MonitorError>;
}

/// Sine carrier with noise and occasional flaw spikes, standing in for the
/// probe electronics. Channel Two tracks channel One attenuated to 80% with
/// its own noise floor.
pub struct SimulatedSource {
    rng: StdRng,
    base_amplitude_mv: f64,
    sample_period_secs: f64,
    phase: f64,
}

impl SimulatedSource {
    pub fn new(base_amplitude_mv: f64, sample_period_secs: f64) -> Self {
        Self::with_rng(base_amplitude_mv, sample_period_secs, StdRng::from_entropy())
    }

    /// Deterministic variant for tests and playback.
    pub fn seeded(base_amplitude_mv: f64, sample_period_secs: f64, seed: u64) -> Self {
        Self::with_rng(
            base_amplitude_mv,
            sample_period_secs,
            StdRng::seed_from_u64(seed),
        )
    }

    fn with_rng(base_amplitude_mv: f64, sample_period_secs: f64, rng: StdRng) -> Self {
        Self {
            rng,
            base_amplitude_mv,
            sample_period_secs,
            phase: 0.0,
        }
    }

    fn carrier(&mut self) -> f64 {
        let noise = (self.rng.gen::<f64>() - 0.5) * 5.0;
        let mut signal = self.base_amplitude_mv * self.phase.sin() + noise;
        // Rare flaw spike on top of the carrier.
        if self.rng.gen::<f64>() > 0.95 {
            signal += self.base_amplitude_mv * 0.5;
        }
        self.phase += 0.1;
        signal
    }
}

impl SampleSource for SimulatedSource {
    fn next_batch(&mut self, count: usize, since_secs: f64) -> Result<Vec<Sample>, MonitorError> {
        let mut batch = Vec::with_capacity(count * 2);
        let mut ch1 = Vec::with_capacity(count);
        for i in 0..count {
            let t = since_secs + i as f64 * self.sample_period_secs;
            ch1.push(Sample::new(t, Channel::One, self.carrier()));
        }
        batch.extend_from_slice(&ch1);
        for sample in &ch1 {
            let attenuated = sample.amplitude_mv * 0.8 + self.rng.gen::<f64>() * 10.0;
            batch.push(Sample::new(sample.timestamp_secs, Channel::Two, attenuated));
        }
        Ok(batch)
    }
}

/// In-memory queue of pre-built batches, for tests and deterministic playback.
pub struct ManualSource {
    queue: VecDeque<Vec<Sample>>,
}

impl ManualSource {
    pub fn new(batches: impl IntoIterator<Item = Vec<Sample>>) -> Self {
        Self {
            queue: batches.into_iter().collect(),
        }
    }

    pub fn empty() -> Self {
        Self {
            queue: VecDeque::new(),
        }
    }
}

impl SampleSource for ManualSource {
    fn next_batch(&mut self, _count: usize, _since_secs: f64) -> Result<Vec<Sample>, MonitorError> {
        Ok(self.queue.pop_front().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_has_both_channels_in_order() {
        let mut source = SimulatedSource::seeded(50.0, 0.01, 7);
        let batch = source.next_batch(10, 0.0).unwrap();
        assert_eq!(batch.len(), 20);
        assert!(batch[..10].iter().all(|s| s.channel == Channel::One));
        assert!(batch[10..].iter().all(|s| s.channel == Channel::Two));
    }

    #[test]
    fn timestamps_start_at_since_and_advance() {
        let mut source = SimulatedSource::seeded(50.0, 0.01, 7);
        let batch = source.next_batch(5, 2.0).unwrap();
        assert_eq!(batch[0].timestamp_secs, 2.0);
        for pair in batch[..5].windows(2) {
            assert!(pair[1].timestamp_secs > pair[0].timestamp_secs);
        }
        // Channel Two mirrors channel One's timeline.
        assert_eq!(batch[5].timestamp_secs, 2.0);
    }

    #[test]
    fn seeded_source_is_deterministic() {
        let mut a = SimulatedSource::seeded(50.0, 0.01, 42);
        let mut b = SimulatedSource::seeded(50.0, 0.01, 42);
        assert_eq!(a.next_batch(8, 0.0).unwrap(), b.next_batch(8, 0.0).unwrap());
    }

    #[test]
    fn manual_source_drains_then_yields_empty() {
        let batch = vec![Sample::new(0.0, Channel::One, 1.0)];
        let mut source = ManualSource::new(vec![batch.clone()]);
        assert_eq!(source.next_batch(1, 0.0).unwrap(), batch);
        assert!(source.next_batch(1, 0.0).unwrap().is_empty());
    }
}
