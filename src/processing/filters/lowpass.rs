use super::{filtfilt, pad_len, SecondOrderFilter, ZeroPhaseFilter};
use super::BREATH_CUTOFF_HZ;

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LowPassFilterConfig {
    pub id: String,
    pub cutoff: f64,
}

impl LowPassFilterConfig {
    pub fn breath() -> Self {
        Self {
            id: "breath_lowpass".to_string(),
            cutoff: BREATH_CUTOFF_HZ,
        }
    }
}

pub struct LowPassFilter {
    config: LowPassFilterConfig,
    section: SecondOrderFilter,
}

impl LowPassFilter {
    pub fn new(config: LowPassFilterConfig, fs: f64) -> Self {
        let section = SecondOrderFilter::butterworth_lowpass(config.cutoff, fs);
        LowPassFilter { config, section }
    }

    pub fn breath(fs: f64) -> Self {
        Self::new(LowPassFilterConfig::breath(), fs)
    }
}

impl ZeroPhaseFilter for LowPassFilter {
    fn id(&self) -> &str {
        &self.config.id
    }

    fn min_len(&self) -> usize {
        pad_len(1) + 1
    }

    fn apply(&self, signal: &[f64]) -> Vec<f64> {
        filtfilt(std::slice::from_ref(&self.section), signal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn keeps_slow_breathing_and_drops_pulse() {
        let fs = 30.0;
        let filter = LowPassFilter::breath(fs);
        let breathing: Vec<f64> = (0..256)
            .map(|i| (2.0 * PI * 0.25 * i as f64 / fs).sin())
            .collect();
        let pulse: Vec<f64> = (0..256)
            .map(|i| (2.0 * PI * 2.0 * i as f64 / fs).sin())
            .collect();

        let kept = filter.apply(&breathing);
        let dropped = filter.apply(&pulse);

        let peak = |s: &[f64]| s[64..192].iter().fold(0.0f64, |m, v| m.max(v.abs()));
        assert!(peak(&kept) > 0.7);
        assert!(peak(&dropped) < 0.05);
    }

    #[test]
    fn min_len_is_small() {
        assert_eq!(LowPassFilter::breath(30.0).min_len(), 10);
    }
}
