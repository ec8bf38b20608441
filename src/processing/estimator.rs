use rustfft::{num_complex::Complex, FftPlanner};

/// Picks the dominant spectral bin of a filtered window and reports it per minute.
pub struct FrequencyEstimator {
    fs: f64,
    planner: FftPlanner<f64>,
}

impl FrequencyEstimator {
    pub fn new(fs: f64) -> Self {
        Self {
            fs,
            planner: FftPlanner::new(),
        }
    }

    /// Index of the strongest non-DC bin in the first half of the spectrum. The first of
    /// equal maxima wins. `None` when there is no such bin.
    pub fn dominant_bin(&mut self, signal: &[f64]) -> Option<usize> {
        let n = signal.len();
        let half = n / 2;
        if half < 2 {
            return None;
        }

        let mut buffer: Vec<Complex<f64>> =
            signal.iter().map(|&x| Complex::new(x, 0.0)).collect();
        let fft = self.planner.plan_fft_forward(n);
        fft.process(&mut buffer);

        let mut peak_bin = None;
        let mut peak_magnitude = 0.0;
        for (bin, value) in buffer.iter().enumerate().take(half).skip(1) {
            let magnitude = value.norm();
            if magnitude > peak_magnitude {
                peak_magnitude = magnitude;
                peak_bin = Some(bin);
            }
        }
        peak_bin
    }

    /// Dominant frequency in cycles per minute, or 0 when no usable peak exists.
    pub fn rate_per_minute(&mut self, signal: &[f64]) -> f64 {
        let n = signal.len();
        let rate = match self.dominant_bin(signal) {
            Some(bin) => bin as f64 * self.fs / n as f64 * 60.0,
            None => 0.0,
        };

        if rate > 0.0 && rate.is_finite() {
            rate
        } else {
            0.0
        }
    }
}
