use std::sync::mpsc::channel;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

use magscope::engine::{self, MonitorCommand};
use magscope::monitor::{render_waveform_png, MonitorEvent, PlotStyle};
use magscope::MonitorConfig;

/// Demo session: runs the simulated instrument for a few seconds, logs
/// detections, then writes a PNG snapshot of the final waveform.
fn main() -> Result<()> {
    env_logger::init();

    let config = match std::env::args().nth(1) {
        Some(path) => MonitorConfig::from_json_file(&path)
            .with_context(|| format!("loading config preset {path}"))?,
        None => MonitorConfig::default(),
    };
    log::info!(
        "threshold {:.1}mV, capacity {}, cadence {}ms",
        config.threshold_mv,
        config.buffer_capacity,
        config.cadence_ms
    );

    let (tx_evt, rx_evt) = channel();
    let (tx_cmd, rx_cmd) = channel();
    let cadence_ms = config.cadence_ms;
    let handle = engine::spawn(config, tx_evt, rx_cmd);

    tx_cmd
        .send(MonitorCommand::StartRecording("session".into()))
        .ok();
    tx_cmd.send(MonitorCommand::Start { cadence_ms }).ok();

    let run_for = Duration::from_secs(5);
    let started = Instant::now();
    let mut last_frame = None;
    let mut detections = 0usize;
    while started.elapsed() < run_for {
        match rx_evt.recv_timeout(Duration::from_millis(200)) {
            Ok(MonitorEvent::DefectDetected(marker)) => {
                detections += 1;
                println!(
                    "defect #{detections}: {} t={:.3}s {:.2}mV",
                    marker.channel, marker.timestamp_secs, marker.amplitude_mv
                );
            }
            Ok(MonitorEvent::Frame(frame)) => last_frame = Some(frame),
            Ok(_) => {}
            Err(_) => {}
        }
    }

    tx_cmd.send(MonitorCommand::Stop).ok();
    tx_cmd.send(MonitorCommand::StopRecording).ok();
    tx_cmd.send(MonitorCommand::Shutdown).ok();
    handle.join().ok();

    if let Some(frame) = last_frame {
        let png = render_waveform_png(&frame, &[], PlotStyle::default())
            .context("rendering final waveform")?;
        std::fs::write("waveform.png", &png).context("writing waveform.png")?;
        println!("wrote waveform.png ({} bytes), {detections} defects detected", png.len());
    } else {
        println!("no frames received, {detections} defects detected");
    }
    Ok(())
}
