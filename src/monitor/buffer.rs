use std::collections::VecDeque;

use crate::monitor::error::MonitorError;
use crate::monitor::sample::{Channel, Sample};

/// Owned copy of one channel's buffered samples at a point in time.
///
/// Snapshots are what the renderer consumes; it never sees a live reference
/// into the buffer, so a tick can never expose a half-appended state.
#[derive(Clone, Debug)]
pub struct ChannelTrace {
    pub channel: Channel,
    /// Display emphasis in `[0, 1]`; rendering honors it, the data ignores it.
    pub opacity: f64,
    pub samples: Vec<Sample>,
}

impl ChannelTrace {
    pub fn peak_mv(&self) -> Option<f64> {
        self.samples
            .iter()
            .map(|s| s.amplitude_mv)
            .fold(None, |acc, v| match acc {
                Some(max) if max >= v => Some(max),
                _ => Some(v),
            })
    }

    pub fn latest(&self) -> Option<&Sample> {
        self.samples.last()
    }
}

/// Both channels' traces, taken in the same call.
#[derive(Clone, Debug)]
pub struct WaveformFrame {
    pub traces: [ChannelTrace; 2],
}

impl WaveformFrame {
    pub fn trace(&self, channel: Channel) -> &ChannelTrace {
        &self.traces[channel.index()]
    }
}

struct ChannelBuffer {
    data: VecDeque<Sample>,
    opacity: f64,
}

/// Bounded rolling buffer of recent samples, one lane per channel.
///
/// Eviction is drop-oldest: after an append the buffer keeps the most recent
/// `capacity` samples. Insertion order is time order; the buffer never
/// reorders what the source produced.
pub struct WaveformBuffer {
    channels: [ChannelBuffer; 2],
    capacity: usize,
}

impl WaveformBuffer {
    pub fn new(capacity: usize) -> Result<Self, MonitorError> {
        if capacity == 0 {
            return Err(MonitorError::InvalidCapacity);
        }
        let channel = || ChannelBuffer {
            data: VecDeque::with_capacity(capacity),
            opacity: 1.0,
        };
        Ok(Self {
            channels: [channel(), channel()],
            capacity,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self, channel: Channel) -> usize {
        self.channels[channel.index()].data.len()
    }

    pub fn is_empty(&self, channel: Channel) -> bool {
        self.channels[channel.index()].data.is_empty()
    }

    /// Appends samples in order, evicting the oldest beyond capacity.
    /// Samples on a different channel than `channel` are skipped with a log
    /// line rather than misfiled.
    pub fn append(&mut self, channel: Channel, samples: &[Sample]) {
        if samples.is_empty() {
            return;
        }
        let lane = &mut self.channels[channel.index()];
        for sample in samples {
            if sample.channel != channel {
                log::warn!(
                    "dropping sample tagged {} appended to {}",
                    sample.channel,
                    channel
                );
                continue;
            }
            if lane.data.len() == self.capacity {
                lane.data.pop_front();
            }
            lane.data.push_back(*sample);
        }
    }

    /// Owned point-in-time copy of one channel.
    pub fn snapshot(&self, channel: Channel) -> ChannelTrace {
        let lane = &self.channels[channel.index()];
        ChannelTrace {
            channel,
            opacity: lane.opacity,
            samples: lane.data.iter().copied().collect(),
        }
    }

    /// Both channels in one call, for the renderer.
    pub fn frame(&self) -> WaveformFrame {
        WaveformFrame {
            traces: [self.snapshot(Channel::One), self.snapshot(Channel::Two)],
        }
    }

    /// Empties one channel, or all of them on `None`. Used on session reset.
    pub fn clear(&mut self, channel: Option<Channel>) {
        match channel {
            Some(ch) => self.channels[ch.index()].data.clear(),
            None => {
                for lane in &mut self.channels {
                    lane.data.clear();
                }
            }
        }
    }

    /// Display-only attribute; stored samples are untouched.
    pub fn set_visibility(&mut self, channel: Channel, opacity: f64) {
        self.channels[channel.index()].opacity = opacity.clamp(0.0, 1.0);
    }

    pub fn visibility(&self, channel: Channel) -> f64 {
        self.channels[channel.index()].opacity
    }
}
