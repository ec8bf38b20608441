use std::f64::consts::PI;
use std::thread;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

use crate::error::{PulseError, Result};
use crate::processing::worker::FrameSource;
use crate::roi::Frame;

// -----------------------------------------------------------------------------
// SETUP FOR THE SIMULATED SIGNALS
// -----------------------------------------------------------------------------

const PULSE_BASELINE: f64 = 120.0;
const BREATH_BASELINE: f64 = 90.0;

#[derive(Debug, Clone)]
pub struct SimulationParams {
    pub fps: f64,
    pub pulse_bpm: f64,
    pub pulse_amplitude: f64,
    /// Respiration rate of the lower-face signal; `None` gives a flat signal.
    pub breath_rpm: Option<f64>,
    pub breath_amplitude: f64,
    /// Half-width of the uniform noise added to both signals.
    pub noise: f64,
    /// Length of the recording; `None` never runs out.
    pub duration_secs: Option<f64>,
    /// Sleep one frame period between frames, like a live camera.
    pub realtime: bool,
    pub seed: Option<u64>,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            fps: 30.0,
            pulse_bpm: 72.0,
            pulse_amplitude: 1.0,
            breath_rpm: Some(15.0),
            breath_amplitude: 3.0,
            noise: 0.2,
            duration_secs: None,
            realtime: false,
            seed: None,
        }
    }
}

// -----------------------------------------------------------------------------
// SIMULATED FRAME SOURCE
// -----------------------------------------------------------------------------

/// Synthetic face ROI means: a pulse-band sinusoid on the forehead and a slow
/// breathing sinusoid on the lower face, both with uniform noise.
pub struct SimulatedSource {
    params: SimulationParams,
    rng: StdRng,
    index: u64,
    opened: bool,
}

impl SimulatedSource {
    pub fn new(params: SimulationParams) -> Self {
        let rng = match params.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            params,
            rng,
            index: 0,
            opened: false,
        }
    }

    fn noise(&mut self) -> f64 {
        if self.params.noise > 0.0 {
            self.rng.gen_range(-self.params.noise..self.params.noise)
        } else {
            0.0
        }
    }

    fn frame_at(&mut self, t: f64) -> Frame {
        let pulse_hz = self.params.pulse_bpm / 60.0;
        let pulse = PULSE_BASELINE
            + self.params.pulse_amplitude * (2.0 * PI * pulse_hz * t).sin()
            + self.noise();

        let breath_wave = match self.params.breath_rpm {
            Some(rpm) => self.params.breath_amplitude * (2.0 * PI * rpm / 60.0 * t).sin(),
            None => 0.0,
        };
        let breath = BREATH_BASELINE + breath_wave + self.noise();

        Frame::from_means(Duration::from_secs_f64(t), Some(pulse), Some(breath))
    }
}

impl FrameSource for SimulatedSource {
    fn open(&mut self) -> Result<()> {
        if !(self.params.fps.is_finite() && self.params.fps > 0.0) {
            return Err(PulseError::CaptureUnavailable(format!(
                "simulated camera cannot run at {} fps",
                self.params.fps
            )));
        }
        info!(
            bpm = self.params.pulse_bpm,
            rpm = ?self.params.breath_rpm,
            "simulated camera opened"
        );
        self.index = 0;
        self.opened = true;
        Ok(())
    }

    fn next_frame(&mut self) -> Option<Frame> {
        if !self.opened {
            return None;
        }
        let t = self.index as f64 / self.params.fps;
        if let Some(limit) = self.params.duration_secs {
            if t >= limit {
                return None;
            }
        }
        if self.params.realtime && self.index > 0 {
            thread::sleep(Duration::from_secs_f64(1.0 / self.params.fps));
        }
        self.index += 1;
        Some(self.frame_at(t))
    }

    fn release(&mut self) {
        self.opened = false;
    }
}
