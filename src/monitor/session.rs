use std::sync::mpsc::Sender;
use std::time::Duration;

use crate::config::MonitorConfig;
use crate::monitor::buffer::{WaveformBuffer, WaveformFrame};
use crate::monitor::detector::DefectDetector;
use crate::monitor::error::MonitorError;
use crate::monitor::sample::{Channel, DefectMarker, Sample};
use crate::monitor::source::SampleSource;

/// Messages the session publishes on the tick path. Consumers (chart, defect
/// UI, persistence glue) subscribe through an mpsc channel; a gone or slow
/// consumer never aborts a tick.
#[derive(Clone, Debug)]
pub enum MonitorEvent {
    /// Running-state change.
    Status(bool),
    /// Automatic threshold-crossing detection.
    DefectDetected(DefectMarker),
    /// Manual operator annotation of a rendered point.
    DefectMarked(DefectMarker),
    /// End-of-tick snapshot for the renderer.
    Frame(WaveformFrame),
    /// CSV defect recording opened or closed.
    RecordingStatus(bool),
}

/// Orchestrates generation, buffering and classification: the only component
/// with a state machine (`Idle ⇄ Running`).
///
/// The session owns the buffer, the detector and the marker list exclusively;
/// all mutation happens on the tick path, and everything that leaves does so
/// as an owned copy.
pub struct MonitorSession<S: SampleSource> {
    source: S,
    buffer: WaveformBuffer,
    detector: DefectDetector,
    markers: Vec<DefectMarker>,
    events: Sender<MonitorEvent>,
    samples_per_tick: usize,
    cadence: Duration,
    running: bool,
    sim_clock_secs: f64,
    active_channel: Channel,
}

impl<S: SampleSource> MonitorSession<S> {
    pub fn new(
        source: S,
        config: &MonitorConfig,
        events: Sender<MonitorEvent>,
    ) -> Result<Self, MonitorError> {
        config.validate()?;
        Ok(Self {
            source,
            buffer: WaveformBuffer::new(config.buffer_capacity)?,
            detector: DefectDetector::new(config.threshold_mv, config.dedup_epsilon_secs)?,
            markers: Vec::new(),
            events,
            samples_per_tick: config.samples_per_tick,
            cadence: Duration::from_millis(config.cadence_ms),
            running: false,
            sim_clock_secs: 0.0,
            active_channel: Channel::One,
        })
    }

    /// Idle → Running. Resets the simulation clock; buffered samples survive
    /// (resume, not reset). Starting while running is a logged no-op.
    pub fn start(&mut self, cadence_ms: u64) -> Result<(), MonitorError> {
        if cadence_ms == 0 {
            return Err(MonitorError::InvalidCadence);
        }
        if self.running {
            log::debug!("start ignored: session already running");
            return Ok(());
        }
        self.cadence = Duration::from_millis(cadence_ms);
        self.sim_clock_secs = 0.0;
        self.running = true;
        log::info!("monitoring started, cadence {cadence_ms}ms");
        self.events.send(MonitorEvent::Status(true)).ok();
        Ok(())
    }

    /// Running → Idle. Deterministic: after this returns, `tick` is a no-op.
    /// Stopping while idle is a logged no-op.
    pub fn stop(&mut self) {
        if !self.running {
            log::debug!("stop ignored: session already idle");
            return;
        }
        self.running = false;
        log::info!("monitoring stopped at t={:.1}s", self.sim_clock_secs);
        self.events.send(MonitorEvent::Status(false)).ok();
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn cadence(&self) -> Duration {
        self.cadence
    }

    pub fn sim_clock_secs(&self) -> f64 {
        self.sim_clock_secs
    }

    /// One generate → append → classify cycle. Channel One is appended and
    /// classified before channel Two; marker emission follows generation
    /// order. Runs to completion, never overlaps itself.
    pub fn tick(&mut self) -> Result<(), MonitorError> {
        if !self.running {
            return Ok(());
        }
        let batch = self
            .source
            .next_batch(self.samples_per_tick, self.sim_clock_secs)?;
        for channel in Channel::ALL {
            let lane: Vec<Sample> = batch
                .iter()
                .filter(|s| s.channel == channel)
                .copied()
                .collect();
            self.buffer.append(channel, &lane);
            for sample in &lane {
                if let Some(marker) = self.detector.classify(sample) {
                    log::info!(
                        "defect detected on {} at t={:.3}s, {:.2}mV",
                        marker.channel,
                        marker.timestamp_secs,
                        marker.amplitude_mv
                    );
                    self.markers.push(marker);
                    self.events.send(MonitorEvent::DefectDetected(marker)).ok();
                }
            }
        }
        self.events.send(MonitorEvent::Frame(self.buffer.frame())).ok();
        self.sim_clock_secs += self.cadence.as_secs_f64();
        Ok(())
    }

    /// Flips which channel is emphasised on screen and returns the new active
    /// channel. Acquisition is unaffected; both channels keep flowing.
    pub fn toggle_channel(&mut self) -> Channel {
        self.active_channel = self.active_channel.other();
        self.buffer.set_visibility(self.active_channel, 1.0);
        self.buffer.set_visibility(self.active_channel.other(), 0.2);
        self.active_channel
    }

    pub fn active_channel(&self) -> Channel {
        self.active_channel
    }

    /// Manual annotation path: the operator clicked a rendered point. Records
    /// the marker regardless of the threshold and publishes it separately
    /// from automatic detection.
    pub fn mark_defect(&mut self, timestamp_secs: f64, amplitude_mv: f64, channel: Channel) {
        let marker = DefectMarker {
            timestamp_secs,
            amplitude_mv,
            channel,
        };
        log::info!(
            "operator marked defect on {} at t={:.3}s, {:.2}mV",
            channel,
            timestamp_secs,
            amplitude_mv
        );
        self.markers.push(marker);
        self.events.send(MonitorEvent::DefectMarked(marker)).ok();
    }

    pub fn set_threshold(&mut self, value: f64) -> Result<(), MonitorError> {
        self.detector.set_threshold(value)
    }

    pub fn threshold(&self) -> f64 {
        self.detector.threshold()
    }

    pub fn set_visibility(&mut self, channel: Channel, opacity: f64) {
        self.buffer.set_visibility(channel, opacity);
    }

    /// Clears buffers, detector state and the session marker list.
    pub fn clear(&mut self) {
        self.buffer.clear(None);
        self.detector.clear();
        self.markers.clear();
    }

    pub fn frame(&self) -> WaveformFrame {
        self.buffer.frame()
    }

    /// Session markers in emission order: automatic detections and manual
    /// annotations interleaved as they happened.
    pub fn markers(&self) -> &[DefectMarker] {
        &self.markers
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc::{channel, Receiver};

    use super::*;
    use crate::monitor::source::ManualSource;

    fn config() -> MonitorConfig {
        MonitorConfig {
            threshold_mv: 80.0,
            ..MonitorConfig::default()
        }
    }

    fn session_with(
        batches: Vec<Vec<Sample>>,
        cfg: MonitorConfig,
    ) -> (MonitorSession<ManualSource>, Receiver<MonitorEvent>) {
        let (tx, rx) = channel();
        let session = MonitorSession::new(ManualSource::new(batches), &cfg, tx).unwrap();
        (session, rx)
    }

    fn flat(channel: Channel, timestamps: &[f64], amplitude: f64) -> Vec<Sample> {
        timestamps
            .iter()
            .map(|&t| Sample::new(t, channel, amplitude))
            .collect()
    }

    fn detected(rx: &Receiver<MonitorEvent>) -> Vec<DefectMarker> {
        rx.try_iter()
            .filter_map(|e| match e {
                MonitorEvent::DefectDetected(m) => Some(m),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn capacity_five_eviction_scenario() {
        let mut cfg = config();
        cfg.buffer_capacity = 5;
        let batch = flat(Channel::One, &[0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 0.0);
        let (mut session, rx) = session_with(vec![batch], cfg);
        session.start(100).unwrap();
        session.tick().unwrap();
        let trace = session.frame().trace(Channel::One).clone();
        let times: Vec<f64> = trace.samples.iter().map(|s| s.timestamp_secs).collect();
        assert_eq!(times, vec![2.0, 3.0, 4.0, 5.0, 6.0]);
        assert!(detected(&rx).is_empty());
        assert!(session.markers().is_empty());
    }

    #[test]
    fn first_crossing_wins_scenario() {
        let batch = vec![
            Sample::new(1.0, Channel::One, 85.0),
            Sample::new(1.005, Channel::One, 90.0),
        ];
        let (mut session, rx) = session_with(vec![batch], config());
        session.start(100).unwrap();
        session.tick().unwrap();
        let markers = detected(&rx);
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].timestamp_secs, 1.0);
        assert_eq!(session.markers(), markers.as_slice());
    }

    #[test]
    fn start_then_stop_before_any_tick() {
        let (mut session, _rx) = session_with(vec![flat(Channel::One, &[0.0], 0.0)], config());
        session.start(100).unwrap();
        session.stop();
        assert!(!session.is_running());
        // tick is a no-op while idle, so nothing is ingested.
        session.tick().unwrap();
        assert!(session.frame().trace(Channel::One).samples.is_empty());
        assert!(session.frame().trace(Channel::Two).samples.is_empty());
    }

    #[test]
    fn stop_is_idempotent() {
        let (mut session, rx) = session_with(vec![], config());
        session.start(100).unwrap();
        session.stop();
        let drained: Vec<_> = rx.try_iter().collect();
        session.stop();
        // Second stop changes nothing and publishes nothing.
        assert!(!session.is_running());
        assert!(rx.try_iter().next().is_none());
        assert_eq!(drained.len(), 2); // Status(true), Status(false)
    }

    #[test]
    fn start_while_running_is_noop() {
        let (mut session, _rx) = session_with(
            vec![flat(Channel::One, &[0.0], 0.0), flat(Channel::One, &[0.1], 0.0)],
            config(),
        );
        session.start(100).unwrap();
        session.tick().unwrap();
        let clock_before = session.sim_clock_secs();
        session.start(50).unwrap();
        // Cadence and clock survive the ignored restart.
        assert_eq!(session.cadence(), Duration::from_millis(100));
        assert_eq!(session.sim_clock_secs(), clock_before);
    }

    #[test]
    fn start_rejects_zero_cadence() {
        let (mut session, _rx) = session_with(vec![], config());
        assert!(matches!(session.start(0), Err(MonitorError::InvalidCadence)));
        assert!(!session.is_running());
    }

    #[test]
    fn channel_one_markers_precede_channel_two() {
        // Channel Two first in the raw batch; the tick still classifies One first.
        let batch = vec![
            Sample::new(0.0, Channel::Two, 95.0),
            Sample::new(0.0, Channel::One, 90.0),
        ];
        let (mut session, rx) = session_with(vec![batch], config());
        session.start(100).unwrap();
        session.tick().unwrap();
        let markers = detected(&rx);
        assert_eq!(markers.len(), 2);
        assert_eq!(markers[0].channel, Channel::One);
        assert_eq!(markers[1].channel, Channel::Two);
    }

    #[test]
    fn stop_keeps_buffers_for_resume() {
        let (mut session, _rx) = session_with(
            vec![flat(Channel::One, &[0.0, 0.1], 0.0), flat(Channel::One, &[0.2], 0.0)],
            config(),
        );
        session.start(100).unwrap();
        session.tick().unwrap();
        session.stop();
        assert_eq!(session.frame().trace(Channel::One).samples.len(), 2);
        session.start(100).unwrap();
        session.tick().unwrap();
        assert_eq!(session.frame().trace(Channel::One).samples.len(), 3);
    }

    #[test]
    fn sim_clock_advances_by_cadence() {
        let (mut session, _rx) =
            session_with(vec![Vec::new(), Vec::new(), Vec::new()], config());
        session.start(100).unwrap();
        session.tick().unwrap();
        session.tick().unwrap();
        assert!((session.sim_clock_secs() - 0.2).abs() < 1e-9);
    }

    #[test]
    fn toggle_channel_flips_emphasis_only() {
        let (mut session, _rx) = session_with(vec![flat(Channel::Two, &[0.0], 0.0)], config());
        assert_eq!(session.active_channel(), Channel::One);
        let now_active = session.toggle_channel();
        assert_eq!(now_active, Channel::Two);
        let frame = session.frame();
        assert_eq!(frame.trace(Channel::Two).opacity, 1.0);
        assert_eq!(frame.trace(Channel::One).opacity, 0.2);
        // Both channels keep acquiring regardless of emphasis.
        session.start(100).unwrap();
        session.tick().unwrap();
        assert_eq!(session.frame().trace(Channel::Two).samples.len(), 1);
    }

    #[test]
    fn manual_mark_bypasses_threshold() {
        let (mut session, rx) = session_with(vec![], config());
        session.mark_defect(3.2, 12.0, Channel::Two);
        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(session.markers().len(), 1);
        assert_eq!(session.markers()[0].amplitude_mv, 12.0);
        assert!(matches!(events[0], MonitorEvent::DefectMarked(_)));
    }

    #[test]
    fn tick_survives_dropped_event_consumer() {
        let batch = flat(Channel::One, &[1.0], 90.0);
        let (mut session, rx) = session_with(vec![batch], config());
        session.start(100).unwrap();
        drop(rx);
        // Publication failures are swallowed; the tick still classifies.
        session.tick().unwrap();
        assert_eq!(session.markers().len(), 1);
    }

    #[test]
    fn threshold_hot_swap_applies_to_next_tick() {
        let (mut session, rx) = session_with(
            vec![flat(Channel::One, &[0.0], 70.0), flat(Channel::One, &[0.5], 70.0)],
            config(),
        );
        session.start(100).unwrap();
        session.tick().unwrap();
        assert!(detected(&rx).is_empty());
        session.set_threshold(60.0).unwrap();
        session.tick().unwrap();
        let markers = detected(&rx);
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].timestamp_secs, 0.5);
    }

    #[test]
    fn clear_resets_data_but_not_state() {
        let (mut session, _rx) = session_with(vec![flat(Channel::One, &[1.0], 90.0)], config());
        session.start(100).unwrap();
        session.tick().unwrap();
        session.clear();
        assert!(session.frame().trace(Channel::One).samples.is_empty());
        assert!(session.markers().is_empty());
        assert!(session.is_running());
    }
}
