use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::monitor::DefectMarker;

/// Streams detected markers to a CSV file so an inspection run leaves an
/// on-disk record the reporting side can pick up.
pub struct DefectRecorder {
    writer: Option<BufWriter<File>>,
    path: Option<PathBuf>,
}

impl DefectRecorder {
    pub fn new() -> Self {
        Self {
            writer: None,
            path: None,
        }
    }

    /// Opens `defects_<label>_<unix>.csv` and writes the header. Restarting
    /// while recording rolls over to a new file.
    pub fn start(&mut self, label: &str) -> io::Result<PathBuf> {
        self.stop()?;
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let path = PathBuf::from(format!("defects_{label}_{stamp}.csv"));
        let mut writer = BufWriter::new(File::create(&path)?);
        writeln!(writer, "timestamp_s,channel,amplitude_mv")?;
        log::info!("recording defects to {}", path.display());
        self.writer = Some(writer);
        self.path = Some(path.clone());
        Ok(path)
    }

    pub fn write_marker(&mut self, marker: &DefectMarker) -> io::Result<()> {
        if let Some(writer) = &mut self.writer {
            writeln!(
                writer,
                "{:.4},{},{:.2}",
                marker.timestamp_secs,
                marker.channel.number(),
                marker.amplitude_mv
            )?;
        }
        Ok(())
    }

    /// Flushes and closes the current file, if any.
    pub fn stop(&mut self) -> io::Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
            if let Some(path) = self.path.take() {
                log::info!("defect record saved: {}", path.display());
            }
        }
        Ok(())
    }

    pub fn is_recording(&self) -> bool {
        self.writer.is_some()
    }
}

impl Default for DefectRecorder {
    fn default() -> Self {
        Self::new()
    }
}
