pub mod buffer;
pub mod detector;
pub mod error;
pub mod plot;
pub mod sample;
pub mod session;
pub mod source;

pub use buffer::{ChannelTrace, WaveformBuffer, WaveformFrame};
pub use detector::{DefectDetector, DEFAULT_DEDUP_EPSILON_SECS};
pub use error::MonitorError;
pub use plot::{render_waveform_png, PlotStyle};
pub use sample::{Channel, DefectMarker, Sample};
pub use session::{MonitorEvent, MonitorSession};
pub use source::{ManualSource, SampleSource, SimulatedSource};
