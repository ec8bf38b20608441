use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, info, warn};

use super::history::RateHistory;
use super::session::{FinalReport, FrameUpdate, SessionMachine, SessionState};
use crate::config::Config;
use crate::error::{PulseError, Result};
use crate::roi::Frame;

/// Capture collaborator: a camera, a recording, or a simulation.
pub trait FrameSource: Send {
    /// Fails with `PulseError::CaptureUnavailable` when no device can be opened.
    fn open(&mut self) -> Result<()>;

    /// Blocks until the next frame. `None` once the source is exhausted.
    fn next_frame(&mut self) -> Option<Frame>;

    fn release(&mut self) {}
}

/// Messages posted from the worker to the foreground. Each carries owned data only.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerEvent {
    Update(FrameUpdate),
    Finished(FinalReport),
    /// Ended by a stop request or an exhausted source, without a final value.
    Stopped { history: RateHistory },
}

#[derive(Clone, Debug, Default)]
pub struct StopHandle {
    flag: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

pub struct MeasurementWorker {
    stop: StopHandle,
    handle: Option<JoinHandle<SessionState>>,
}

impl MeasurementWorker {
    /// Opens `source` and starts measuring on a background thread. If the source cannot
    /// be opened nothing is spawned and the error is returned.
    pub fn spawn<S>(mut source: S, config: Config) -> Result<(Self, Receiver<WorkerEvent>)>
    where
        S: FrameSource + 'static,
    {
        let mut machine = SessionMachine::new(config)?;
        source.open()?;
        machine.start_on_next_frame()?;

        let (sender, receiver) = mpsc::channel();
        let stop = StopHandle::default();
        let worker_stop = stop.clone();

        let handle = thread::Builder::new()
            .name("measurement".to_string())
            .spawn(move || run_measurement(machine, source, sender, worker_stop))?;

        Ok((
            Self {
                stop,
                handle: Some(handle),
            },
            receiver,
        ))
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn stop(&self) {
        self.stop.stop();
    }

    /// Waits for the worker and returns the state the session ended in.
    pub fn join(mut self) -> Result<SessionState> {
        match self.handle.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| PulseError::WorkerPanicked),
            None => Ok(SessionState::Idle),
        }
    }
}

impl Drop for MeasurementWorker {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.stop.stop();
            let _ = handle.join();
        }
    }
}

fn run_measurement<S: FrameSource>(
    mut machine: SessionMachine,
    mut source: S,
    sender: Sender<WorkerEvent>,
    stop: StopHandle,
) -> SessionState {
    let verbose = machine.config().processor.verbose;

    loop {
        if stop.is_stopped() {
            info!("stop requested");
            finish_stopped(&mut machine, &sender);
            break;
        }

        let Some(frame) = source.next_frame() else {
            info!("frame source exhausted");
            finish_stopped(&mut machine, &sender);
            break;
        };

        let mut update = machine.process_frame(&frame);
        if let Some(report) = update.report.take() {
            let _ = sender.send(WorkerEvent::Update(update));
            let _ = sender.send(WorkerEvent::Finished(report));
            break;
        }

        if verbose || update.new_estimate {
            if sender.send(WorkerEvent::Update(update)).is_err() {
                // Foreground is gone.
                debug!("event receiver dropped");
                let _ = machine.stop();
                break;
            }
        }
    }

    source.release();
    machine.state()
}

fn finish_stopped(machine: &mut SessionMachine, sender: &Sender<WorkerEvent>) {
    if let Err(e) = machine.stop() {
        warn!("stop ignored: {}", e);
        return;
    }
    let history = machine
        .session()
        .map(|s| s.history().clone())
        .unwrap_or_default();
    let _ = sender.send(WorkerEvent::Stopped { history });
}
