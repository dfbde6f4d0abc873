pub mod config;
pub mod engine;
pub mod monitor;
pub mod recorder;

pub use config::MonitorConfig;
pub use engine::MonitorCommand;
pub use monitor::{
    Channel, DefectDetector, DefectMarker, ManualSource, MonitorError, MonitorEvent,
    MonitorSession, Sample, SampleSource, SimulatedSource, WaveformBuffer, WaveformFrame,
};
pub use recorder::DefectRecorder;
