use std::f64::consts::PI;

use rustfft::num_complex::Complex;
use serde::{Deserialize, Serialize};

use super::{filtfilt, pad_len, SecondOrderFilter, ZeroPhaseFilter};
use super::{PULSE_BAND_HIGH_HZ, PULSE_BAND_LOW_HZ};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BandPassFilterConfig {
    pub id: String,
    pub f_low: f64,
    pub f_high: f64,
}

impl BandPassFilterConfig {
    pub fn pulse() -> Self {
        Self {
            id: "pulse_bandpass".to_string(),
            f_low: PULSE_BAND_LOW_HZ,
            f_high: PULSE_BAND_HIGH_HZ,
        }
    }
}

/// Fourth-order Butterworth bandpass (a second-order prototype) run as two biquads.
pub struct BandPassFilter {
    config: BandPassFilterConfig,
    sections: [SecondOrderFilter; 2],
}

impl BandPassFilter {
    pub fn new(config: BandPassFilterConfig, fs: f64) -> Self {
        let sections = butterworth_bandpass(config.f_low, config.f_high, fs);
        BandPassFilter { config, sections }
    }

    pub fn pulse(fs: f64) -> Self {
        Self::new(BandPassFilterConfig::pulse(), fs)
    }
}

impl ZeroPhaseFilter for BandPassFilter {
    fn id(&self) -> &str {
        &self.config.id
    }

    fn min_len(&self) -> usize {
        pad_len(self.sections.len()) + 1
    }

    fn apply(&self, signal: &[f64]) -> Vec<f64> {
        filtfilt(&self.sections, signal)
    }
}

/// Second-order Butterworth prototype, shifted to a band around the prewarped edges
/// and mapped with the bilinear transform. Each section holds one conjugate pole pair
/// and zeros at z = 1 and z = -1. The overall gain sits on the first section.
pub fn butterworth_bandpass(f_low: f64, f_high: f64, fs: f64) -> [SecondOrderFilter; 2] {
    // Bilinear transform with the sample rate normalized to 2, so 2 * fs = 4.
    let k: f64 = 4.0;
    let nyquist = fs / 2.0;
    let warp = |f: f64| k * (PI * f / nyquist / 2.0).tan();
    let (w_low, w_high) = (warp(f_low), warp(f_high));
    let bandwidth = w_high - w_low;
    let centre_sq = w_low * w_high;

    let prototype = -Complex::from_polar(1.0, -PI / 4.0);
    let shifted = prototype * (bandwidth / 2.0);
    let root = (shifted * shifted - centre_sq).sqrt();
    let analog = [shifted + root, shifted - root];

    // Conjugate poles contribute |k - p|^2, the two analog zeros at s = 0 contribute k^2.
    let denominator: f64 = analog.iter().map(|p| (k - *p).norm_sqr()).product();
    let gain = bandwidth * bandwidth * k * k / denominator;

    let section = |pole: Complex<f64>, g: f64| {
        let z = (k + pole) / (k - pole);
        SecondOrderFilter::from_coefficients([g, 0.0, -g], [1.0, -2.0 * z.re, z.norm_sqr()])
    };
    [section(analog[0], gain), section(analog[1], 1.0)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn sine(freq: f64, fs: f64, n: usize) -> Vec<f64> {
        (0..n).map(|i| (2.0 * PI * freq * i as f64 / fs).sin()).collect()
    }

    fn rms(signal: &[f64]) -> f64 {
        (signal.iter().map(|x| x * x).sum::<f64>() / signal.len() as f64).sqrt()
    }

    #[test]
    fn passes_pulse_band_without_phase_shift() {
        let filter = BandPassFilter::pulse(30.0);
        let input = sine(1.2, 30.0, 300);
        let output = filter.apply(&input);
        assert_eq!(output.len(), input.len());

        for i in 60..240 {
            if input[i].abs() > 0.9 {
                let ratio = output[i] / input[i];
                assert!(ratio > 0.7 && ratio < 1.05, "ratio {} at {}", ratio, i);
            }
        }
    }

    #[test]
    fn rejects_out_of_band() {
        let filter = BandPassFilter::pulse(30.0);
        let slow = filter.apply(&sine(0.1, 30.0, 300));
        let fast = filter.apply(&sine(10.0, 30.0, 300));
        assert!(rms(&slow[60..240]) < 0.1);
        assert!(rms(&fast[60..240]) < 0.1);
    }

    #[test]
    fn half_power_at_band_edges() {
        let fs = 30.0;
        let sections = butterworth_bandpass(PULSE_BAND_LOW_HZ, PULSE_BAND_HIGH_HZ, fs);
        let response = |f: f64| {
            let z = Complex::from_polar(1.0, 2.0 * PI * f / fs);
            sections
                .iter()
                .map(|s| {
                    let (b, a) = (s.b, s.a);
                    (b[0] + b[1] / z + b[2] / (z * z)) / (a[0] + a[1] / z + a[2] / (z * z))
                })
                .fold(Complex::new(1.0, 0.0), |acc, h| acc * h)
                .norm()
        };

        let half_power = std::f64::consts::FRAC_1_SQRT_2;
        assert!((response(PULSE_BAND_LOW_HZ) - half_power).abs() < 1e-9);
        assert!((response(PULSE_BAND_HIGH_HZ) - half_power).abs() < 1e-9);
        let centre = (PULSE_BAND_LOW_HZ * PULSE_BAND_HIGH_HZ).sqrt();
        assert!(response(centre) > 0.99);
        assert!(response(0.1) < 0.02);
        assert!(response(10.0) < 0.03);
    }

    #[test]
    fn sections_are_stable_and_block_dc() {
        for section in butterworth_bandpass(0.7, 3.0, 30.0) {
            assert!(section.a[2] < 1.0 && section.a[2] > 0.0);
            assert!(section.dc_gain().abs() < 1e-12);
        }
    }

    #[test]
    fn min_len_covers_padding() {
        let filter = BandPassFilter::pulse(30.0);
        assert_eq!(filter.min_len(), 16);
        assert!(filter.min_len() < 128);
        assert_eq!(filter.id(), "pulse_bandpass");
    }
}
