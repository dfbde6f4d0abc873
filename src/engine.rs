use std::sync::mpsc::{Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::config::MonitorConfig;
use crate::monitor::{
    Channel, MonitorEvent, MonitorSession, SampleSource, SimulatedSource,
};
use crate::recorder::DefectRecorder;

/// Idle poll interval while the session is stopped.
const IDLE_POLL: Duration = Duration::from_millis(50);

/// Console-side requests to the engine thread.
#[derive(Clone, Debug)]
pub enum MonitorCommand {
    Start { cadence_ms: u64 },
    Stop,
    ToggleChannel,
    SetThreshold(f64),
    MarkDefect {
        timestamp_secs: f64,
        amplitude_mv: f64,
        channel: Channel,
    },
    SetVisibility { channel: Channel, opacity: f64 },
    Clear,
    StartRecording(String),
    StopRecording,
    Shutdown,
}

/// Spawns the engine over the built-in simulated source.
pub fn spawn(
    config: MonitorConfig,
    tx: Sender<MonitorEvent>,
    rx_cmd: Receiver<MonitorCommand>,
) -> JoinHandle<()> {
    let period = Duration::from_millis(config.cadence_ms).as_secs_f64()
        / config.samples_per_tick.max(1) as f64;
    let source = SimulatedSource::new(50.0, period);
    spawn_with_source(source, config, tx, rx_cmd)
}

/// Runs a [`MonitorSession`] on a dedicated thread: commands in, events out.
///
/// One iteration drains pending commands, then runs at most one tick and
/// sleeps the cadence. Ticks run to completion on this single thread, so two
/// ticks can never overlap and a `Stop` is always handled between ticks.
pub fn spawn_with_source<S: SampleSource + Send + 'static>(
    source: S,
    config: MonitorConfig,
    tx: Sender<MonitorEvent>,
    rx_cmd: Receiver<MonitorCommand>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let mut session = match MonitorSession::new(source, &config, tx.clone()) {
            Ok(session) => session,
            Err(err) => {
                log::error!("engine refused to start: {err}");
                return;
            }
        };
        let mut recorder = DefectRecorder::new();
        let mut recorded = 0usize;

        'run: loop {
            // Drain a bounded burst of commands so a chatty UI cannot starve
            // the tick.
            for _ in 0..10 {
                match rx_cmd.try_recv() {
                    Ok(cmd) => {
                        if handle_command(cmd, &mut session, &mut recorder, &tx) {
                            break 'run;
                        }
                    }
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => break 'run,
                }
            }

            if session.is_running() {
                if let Err(err) = session.tick() {
                    log::error!("tick failed: {err}");
                }
            }

            // Persist anything new, whether it came from a tick or a manual
            // annotation command.
            if recorder.is_recording() {
                for marker in &session.markers()[recorded.min(session.markers().len())..] {
                    if let Err(err) = recorder.write_marker(marker) {
                        log::error!("failed to record marker: {err}");
                    }
                }
            }
            recorded = session.markers().len();

            thread::sleep(if session.is_running() {
                session.cadence()
            } else {
                IDLE_POLL
            });
        }

        session.stop();
        if let Err(err) = recorder.stop() {
            log::error!("failed to close defect record: {err}");
        }
        log::info!("engine thread shut down");
    })
}

/// Applies one command; returns true on shutdown.
fn handle_command<S: SampleSource>(
    cmd: MonitorCommand,
    session: &mut MonitorSession<S>,
    recorder: &mut DefectRecorder,
    tx: &Sender<MonitorEvent>,
) -> bool {
    match cmd {
        MonitorCommand::Start { cadence_ms } => {
            if let Err(err) = session.start(cadence_ms) {
                log::error!("start rejected: {err}");
            }
        }
        MonitorCommand::Stop => session.stop(),
        MonitorCommand::ToggleChannel => {
            let active = session.toggle_channel();
            log::info!("display emphasis switched to {active}");
        }
        MonitorCommand::SetThreshold(value) => {
            if let Err(err) = session.set_threshold(value) {
                log::error!("threshold rejected: {err}");
            }
        }
        MonitorCommand::MarkDefect {
            timestamp_secs,
            amplitude_mv,
            channel,
        } => session.mark_defect(timestamp_secs, amplitude_mv, channel),
        MonitorCommand::SetVisibility { channel, opacity } => {
            session.set_visibility(channel, opacity)
        }
        MonitorCommand::Clear => session.clear(),
        MonitorCommand::StartRecording(label) => match recorder.start(&label) {
            Ok(_) => {
                tx.send(MonitorEvent::RecordingStatus(true)).ok();
            }
            Err(err) => log::error!("could not start recording: {err}"),
        },
        MonitorCommand::StopRecording => {
            if let Err(err) = recorder.stop() {
                log::error!("could not close recording: {err}");
            }
            tx.send(MonitorEvent::RecordingStatus(false)).ok();
        }
        MonitorCommand::Shutdown => return true,
    }
    false
}
