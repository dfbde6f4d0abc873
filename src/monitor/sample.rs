use serde::{Deserialize, Serialize};

/// One of the two magnetization signal lanes acquired by the probe head.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    One,
    Two,
}

impl Channel {
    /// Tick-path ordering: channel One is always generated and classified
    /// before channel Two.
    pub const ALL: [Channel; 2] = [Channel::One, Channel::Two];

    pub fn number(self) -> u8 {
        match self {
            Channel::One => 1,
            Channel::Two => 2,
        }
    }

    pub fn index(self) -> usize {
        (self.number() - 1) as usize
    }

    pub fn other(self) -> Channel {
        match self {
            Channel::One => Channel::Two,
            Channel::Two => Channel::One,
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CH{}", self.number())
    }
}

/// One timestamped amplitude reading. Immutable once produced by the source.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Simulated-clock seconds, monotonically non-decreasing per channel.
    pub timestamp_secs: f64,
    pub channel: Channel,
    /// Amplitude in millivolts.
    pub amplitude_mv: f64,
}

impl Sample {
    pub fn new(timestamp_secs: f64, channel: Channel, amplitude_mv: f64) -> Self {
        Self {
            timestamp_secs,
            channel,
            amplitude_mv,
        }
    }
}

/// A distinct above-threshold event (or manual operator annotation), handed to
/// the persistence collaborator as a record.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DefectMarker {
    pub timestamp_secs: f64,
    pub amplitude_mv: f64,
    pub channel: Channel,
}

impl DefectMarker {
    pub fn from_sample(sample: &Sample) -> Self {
        Self {
            timestamp_secs: sample.timestamp_secs,
            amplitude_mv: sample.amplitude_mv,
            channel: sample.channel,
        }
    }
}
