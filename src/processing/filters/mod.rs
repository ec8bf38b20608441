pub mod bandpass;
pub mod lowpass;

pub use bandpass::BandPassFilter;
pub use lowpass::LowPassFilter;

/// Pulse passband, 42-180 BPM.
pub const PULSE_BAND_LOW_HZ: f64 = 0.7;
pub const PULSE_BAND_HIGH_HZ: f64 = 3.0;
/// Breath cutoff, up to 30 RPM.
pub const BREATH_CUTOFF_HZ: f64 = 0.5;

/// A filter applied forward then backward over a whole window, leaving no phase shift.
pub trait ZeroPhaseFilter: Send {
    fn id(&self) -> &str;

    /// Shortest window the filter may be run on.
    fn min_len(&self) -> usize;

    fn apply(&self, signal: &[f64]) -> Vec<f64>;
}

// SECOND ORDER SECTION --------------------------------------------------------

/// Biquad in direct form I. Coefficients are stored normalized so that `a[0] == 1`.
#[derive(Clone, Debug)]
pub struct SecondOrderFilter {
    a: [f64; 3],
    b: [f64; 3],
    x: [f64; 2],
    y: [f64; 2],
}

impl SecondOrderFilter {
    pub fn from_coefficients(b: [f64; 3], a: [f64; 3]) -> Self {
        let a0 = a[0];
        SecondOrderFilter {
            a: [1.0, a[1] / a0, a[2] / a0],
            b: [b[0] / a0, b[1] / a0, b[2] / a0],
            x: [0.0, 0.0],
            y: [0.0, 0.0],
        }
    }

    /// Butterworth low-pass biquad (Q = sqrt(2)/2) with its cutoff prewarped to `f0`.
    pub fn butterworth_lowpass(f0: f64, fs: f64) -> Self {
        let q = (2.0f64).sqrt() / 2.0;
        let omega = 2.0 * std::f64::consts::PI * f0 / fs;
        let alpha = f64::sin(omega) / (2.0 * q);
        let cos = f64::cos(omega);

        Self::from_coefficients(
            [(1.0 - cos) / 2.0, 1.0 - cos, (1.0 - cos) / 2.0],
            [1.0 + alpha, -2.0 * cos, 1.0 - alpha],
        )
    }

    pub fn dc_gain(&self) -> f64 {
        (self.b[0] + self.b[1] + self.b[2]) / (self.a[0] + self.a[1] + self.a[2])
    }

    /// Loads the state a constant input of `input` would settle into.
    pub fn prime(&mut self, input: f64) {
        let output = self.dc_gain() * input;
        self.x = [input, input];
        self.y = [output, output];
    }

    pub fn calculate_output(&mut self, input: f64) -> f64 {
        let output = self.b[0] * input + self.b[1] * self.x[0] + self.b[2] * self.x[1]
            - self.a[1] * self.y[0]
            - self.a[2] * self.y[1];

        self.x[1] = self.x[0];
        self.x[0] = input;
        self.y[1] = self.y[0];
        self.y[0] = output;

        output
    }
}

// ZERO PHASE DRIVER -----------------------------------------------------------

/// Odd-reflection pad length used for a cascade of `sections` biquads.
pub fn pad_len(sections: usize) -> usize {
    3 * (2 * sections + 1)
}

/// Forward-backward run of a biquad cascade with odd-reflection padding and
/// steady-state initial conditions.
pub fn filtfilt(sections: &[SecondOrderFilter], signal: &[f64]) -> Vec<f64> {
    let n = signal.len();
    if n < 2 || sections.is_empty() {
        return signal.to_vec();
    }
    let pad = pad_len(sections.len()).min(n - 1);
    let extended = odd_extend(signal, pad);

    let mut forward = run_cascade(sections, &extended);
    forward.reverse();
    let mut backward = run_cascade(sections, &forward);
    backward.reverse();

    backward[pad..pad + n].to_vec()
}

fn run_cascade(sections: &[SecondOrderFilter], signal: &[f64]) -> Vec<f64> {
    let mut output = signal.to_vec();
    let Some(&first) = signal.first() else {
        return output;
    };

    let mut settled = first;
    for template in sections {
        let mut section = template.clone();
        section.prime(settled);
        settled *= section.dc_gain();
        for sample in output.iter_mut() {
            *sample = section.calculate_output(*sample);
        }
    }
    output
}

fn odd_extend(signal: &[f64], pad: usize) -> Vec<f64> {
    let n = signal.len();
    let first = signal[0];
    let last = signal[n - 1];

    let mut extended = Vec::with_capacity(n + 2 * pad);
    extended.extend((1..=pad).rev().map(|i| 2.0 * first - signal[i]));
    extended.extend_from_slice(signal);
    extended.extend((1..=pad).map(|i| 2.0 * last - signal[n - 1 - i]));
    extended
}
