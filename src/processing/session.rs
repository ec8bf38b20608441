use chrono::{DateTime, Local};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::buffer::SignalBuffer;
use super::conditioning::{condition_breath, condition_pulse};
use super::detectors::{StabilityDetector, StabilityDetectorConfig};
use super::effort::{breath_gate_open, EffortState};
use super::estimator::FrequencyEstimator;
use super::filters::{BandPassFilter, LowPassFilter, ZeroPhaseFilter};
use super::history::{median, RateHistory};
use crate::config::Config;
use crate::error::{PulseError, Result};
use crate::roi::Frame;
use crate::utils::log::log_to_file;

pub const PULSE_BUFFER_CAPACITY: usize = 300;
pub const BREATH_BUFFER_CAPACITY: usize = 256;
/// Pulse estimation starts once this many samples are buffered.
pub const PULSE_MIN_SAMPLES: usize = 128;
/// Breath estimation starts once more than this many samples are buffered.
pub const BREATH_MIN_SAMPLES: usize = 64;

const SESSION_LOG: &str = "session.log";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Measuring,
    FinalizedStable,
    FinalizedTimeout,
    /// Ended by a stop request before any finalization.
    Stopped,
}

impl SessionState {
    pub fn is_finalized(&self) -> bool {
        matches!(
            self,
            SessionState::FinalizedStable | SessionState::FinalizedTimeout
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Finalization {
    Stable,
    Timeout,
}

/// Result of a finished measurement, handed to reporting and export collaborators.
#[derive(Debug, Clone, PartialEq)]
pub struct FinalReport {
    pub reason: Finalization,
    pub pulse: f64,
    pub breath: Option<f64>,
    pub elapsed_secs: f64,
    pub started_at: DateTime<Local>,
    pub history: RateHistory,
}

impl FinalReport {
    /// One-line record of the session, e.g. for a plain-text history file.
    pub fn summary_line(&self) -> String {
        let mut line = format!(
            "{} - Final pulse: {:.1} BPM",
            self.started_at.format("%Y-%m-%d %H:%M:%S"),
            self.pulse
        );
        if let Some(breath) = self.breath {
            line.push_str(&format!(" | Respiration: {:.1} RPM", breath));
        }
        line
    }
}

/// Immutable view of the machine after one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameUpdate {
    pub state: SessionState,
    pub elapsed_secs: f64,
    pub face_detected: bool,
    /// A pulse estimate was produced on this frame.
    pub new_estimate: bool,
    pub pulse: Option<f64>,
    pub breath: Option<f64>,
    pub effort: Option<EffortState>,
    pub report: Option<FinalReport>,
}

/// Everything owned by one measurement. Replaced wholesale on every start.
#[derive(Debug, Clone)]
pub struct Session {
    /// Clock origin on the frame source clock. `None` until the first frame arrives
    /// when the session was started with `start_on_next_frame`.
    started_at: Option<Duration>,
    started_wall: DateTime<Local>,
    pulse_buffer: SignalBuffer,
    breath_buffer: SignalBuffer,
    history: RateHistory,
    current_pulse: Option<f64>,
    current_breath: Option<f64>,
    final_pulse: Option<f64>,
    final_breath: Option<f64>,
    elapsed_secs: f64,
}

impl Session {
    fn new(started_at: Option<Duration>) -> Self {
        Self {
            started_at,
            started_wall: Local::now(),
            pulse_buffer: SignalBuffer::new(PULSE_BUFFER_CAPACITY),
            breath_buffer: SignalBuffer::new(BREATH_BUFFER_CAPACITY),
            history: RateHistory::new(),
            current_pulse: None,
            current_breath: None,
            final_pulse: None,
            final_breath: None,
            elapsed_secs: 0.0,
        }
    }

    pub fn pulse_buffer(&self) -> &SignalBuffer {
        &self.pulse_buffer
    }

    pub fn breath_buffer(&self) -> &SignalBuffer {
        &self.breath_buffer
    }

    pub fn history(&self) -> &RateHistory {
        &self.history
    }

    pub fn current_pulse(&self) -> Option<f64> {
        self.current_pulse
    }

    pub fn current_breath(&self) -> Option<f64> {
        self.current_breath
    }

    pub fn final_pulse(&self) -> Option<f64> {
        self.final_pulse
    }

    pub fn final_breath(&self) -> Option<f64> {
        self.final_breath
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed_secs
    }
}

// SESSION STATE MACHINE -------------------------------------------------------

pub struct SessionMachine {
    config: Config,
    pulse_filter: BandPassFilter,
    breath_filter: LowPassFilter,
    estimator: FrequencyEstimator,
    stability: StabilityDetector,
    state: SessionState,
    session: Option<Session>,
}

impl SessionMachine {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let fs = config.processor.fps;
        let stability = StabilityDetector::new(StabilityDetectorConfig {
            window: config.measurement.stable_window,
            threshold: config.measurement.stable_threshold,
        });

        Ok(Self {
            pulse_filter: BandPassFilter::pulse(fs),
            breath_filter: LowPassFilter::breath(fs),
            estimator: FrequencyEstimator::new(fs),
            stability,
            state: SessionState::Idle,
            session: None,
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Begins a fresh session whose clock origin is `at` on the frame source clock.
    pub fn start(&mut self, at: Duration) -> Result<()> {
        self.begin(Some(at))
    }

    /// Begins a fresh session timed from the first frame it receives. Used when the
    /// source clock has an arbitrary origin, such as a recording with absolute timestamps.
    pub fn start_on_next_frame(&mut self) -> Result<()> {
        self.begin(None)
    }

    fn begin(&mut self, origin: Option<Duration>) -> Result<()> {
        if self.state == SessionState::Measuring {
            return Err(PulseError::AlreadyMeasuring);
        }
        let session = Session::new(origin);
        info!(
            started = %session.started_wall.format("%H:%M:%S"),
            fps = self.config.processor.fps,
            "measurement started"
        );
        self.session = Some(session);
        self.state = SessionState::Measuring;
        self.debug_log("measurement started");
        Ok(())
    }

    /// Halts a running measurement without finalizing it. The history is kept.
    pub fn stop(&mut self) -> Result<()> {
        if self.state != SessionState::Measuring {
            return Err(PulseError::NotMeasuring);
        }
        self.state = SessionState::Stopped;
        info!("measurement stopped before finalization");
        self.debug_log("measurement stopped");
        Ok(())
    }

    /// Advances the pipeline by one frame. Frames outside a measurement, and frames
    /// without a pulse ROI, never touch the buffers or the history.
    pub fn process_frame(&mut self, frame: &Frame) -> FrameUpdate {
        if self.state != SessionState::Measuring {
            return self.update(false, false, None);
        }
        let Some(session) = self.session.as_mut() else {
            return self.update(false, false, None);
        };

        let origin = *session.started_at.get_or_insert(frame.timestamp);
        let raw_elapsed = frame.timestamp.saturating_sub(origin).as_secs_f64();
        if raw_elapsed < session.elapsed_secs {
            warn!(
                elapsed = raw_elapsed,
                previous = session.elapsed_secs,
                "frame timestamp went backwards"
            );
        }
        // Session time never runs backwards, whatever the source reports.
        let elapsed = raw_elapsed.max(session.elapsed_secs);
        session.elapsed_secs = elapsed;

        let face_detected = frame.pulse_roi.is_some();
        let mut new_estimate = false;
        let mut report = None;

        if let Some(roi) = &frame.pulse_roi {
            session.pulse_buffer.push(roi.pulse_sample());

            if session.pulse_buffer.len() >= PULSE_MIN_SAMPLES {
                let pulse = estimate_pulse(
                    &session.pulse_buffer,
                    &self.pulse_filter,
                    &mut self.estimator,
                );
                session.history.push(elapsed, pulse);
                session.current_pulse = Some(pulse);
                new_estimate = true;
                if pulse == 0.0 {
                    warn!(elapsed, "no dominant pulse frequency in window");
                } else {
                    debug!(elapsed, bpm = pulse, "pulse estimate");
                }

                if breath_gate_open(pulse, &self.config.bpm_thresholds) {
                    if let Some(breath_roi) = &frame.breath_roi {
                        session.breath_buffer.push(breath_roi.breath_sample());
                        if session.breath_buffer.len() > BREATH_MIN_SAMPLES {
                            let breath = estimate_breath(
                                &session.breath_buffer,
                                &self.breath_filter,
                                &mut self.estimator,
                            );
                            debug!(elapsed, rpm = breath, "breath estimate");
                            session.current_breath = Some(breath);
                            session.final_breath = (breath > 0.0).then_some(breath);
                        }
                    }
                }

                if let Some(convergence) = self.stability.check(&session.history) {
                    session.final_pulse = Some(convergence.rate);
                    self.state = SessionState::FinalizedStable;
                    info!(
                        bpm = convergence.rate,
                        peak_to_peak = convergence.peak_to_peak,
                        elapsed,
                        "pulse converged"
                    );
                    report = Some(final_report(session, Finalization::Stable));
                }
            }
        }

        // Stability is checked first; a converged session never times out.
        if self.state == SessionState::Measuring
            && elapsed >= self.config.measurement.duration_secs
            && session.final_pulse.is_none()
        {
            let pulse = median(&session.history.rates()).unwrap_or(0.0);
            session.final_pulse = Some(pulse);
            self.state = SessionState::FinalizedTimeout;
            info!(
                bpm = pulse,
                estimates = session.history.len(),
                elapsed,
                "measurement timed out"
            );
            report = Some(final_report(session, Finalization::Timeout));
        }

        if let Some(report) = &report {
            self.debug_log(&report.summary_line());
        } else if new_estimate && self.config.processor.enable_debug_logging {
            let message = format!(
                "elapsed: {:.3}, pulse: {:?}, breath: {:?}",
                elapsed, session.current_pulse, session.current_breath
            );
            self.debug_log(&message);
        }

        self.update(face_detected, new_estimate, report)
    }

    fn update(
        &self,
        face_detected: bool,
        new_estimate: bool,
        report: Option<FinalReport>,
    ) -> FrameUpdate {
        let session = self.session.as_ref();
        let pulse = session.and_then(|s| s.current_pulse);
        FrameUpdate {
            state: self.state,
            elapsed_secs: session.map_or(0.0, |s| s.elapsed_secs),
            face_detected,
            new_estimate,
            pulse,
            breath: session.and_then(|s| s.current_breath),
            effort: pulse.map(|bpm| EffortState::classify(bpm, &self.config.bpm_thresholds)),
            report,
        }
    }

    fn debug_log(&self, message: &str) {
        if !self.config.processor.enable_debug_logging {
            return;
        }
        if let Err(e) = log_to_file(SESSION_LOG, message) {
            warn!("failed to write session log: {}", e);
        }
    }
}

fn final_report(session: &Session, reason: Finalization) -> FinalReport {
    FinalReport {
        reason,
        pulse: session.final_pulse.unwrap_or(0.0),
        breath: session.final_breath,
        elapsed_secs: session.elapsed_secs,
        started_at: session.started_wall,
        history: session.history.clone(),
    }
}

/// Mean removal, smoothing, bandpass and peak picking over the pulse window.
pub fn estimate_pulse(
    buffer: &SignalBuffer,
    filter: &BandPassFilter,
    estimator: &mut FrequencyEstimator,
) -> f64 {
    let window = buffer.snapshot();
    debug_assert!(window.len() >= filter.min_len());
    let conditioned = condition_pulse(&window);
    let filtered = filter.apply(&conditioned);
    estimator.rate_per_minute(&filtered)
}

/// Mean removal, lowpass and peak picking over the breath window.
pub fn estimate_breath(
    buffer: &SignalBuffer,
    filter: &LowPassFilter,
    estimator: &mut FrequencyEstimator,
) -> f64 {
    let window = buffer.snapshot();
    debug_assert!(window.len() >= filter.min_len());
    let conditioned = condition_breath(&window);
    let filtered = filter.apply(&conditioned);
    estimator.rate_per_minute(&filtered)
}
