use crate::processing::history::{median, RateHistory};

pub const DEFAULT_STABLE_WINDOW: usize = 10;
pub const DEFAULT_STABLE_THRESHOLD: f64 = 2.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StabilityDetectorConfig {
    pub window: usize,
    /// Peak-to-peak BPM range the trailing window must stay below.
    pub threshold: f64,
}

impl Default for StabilityDetectorConfig {
    fn default() -> Self {
        Self {
            window: DEFAULT_STABLE_WINDOW,
            threshold: DEFAULT_STABLE_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Convergence {
    /// Median of the trailing window.
    pub rate: f64,
    pub peak_to_peak: f64,
}

pub struct StabilityDetector {
    config: StabilityDetectorConfig,
}

impl StabilityDetector {
    pub fn new(config: StabilityDetectorConfig) -> Self {
        Self { config }
    }

    /// Converged once the last `window` estimates span less than `threshold`.
    pub fn check(&self, history: &RateHistory) -> Option<Convergence> {
        let window = history.trailing(self.config.window)?;
        let peak_to_peak = peak_to_peak(&window);
        if peak_to_peak < self.config.threshold {
            let rate = median(&window)?;
            Some(Convergence { rate, peak_to_peak })
        } else {
            None
        }
    }
}

pub fn peak_to_peak(values: &[f64]) -> f64 {
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    if values.is_empty() {
        0.0
    } else {
        max - min
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history_of(rates: &[f64]) -> RateHistory {
        let mut history = RateHistory::new();
        for (i, &bpm) in rates.iter().enumerate() {
            history.push(i as f64 * 0.1, bpm);
        }
        history
    }

    #[test]
    fn constant_window_converges_to_median() {
        let detector = StabilityDetector::new(StabilityDetectorConfig::default());
        let history = history_of(&[75.0; 10]);
        let result = detector.check(&history).unwrap();
        assert_eq!(result.rate, 75.0);
        assert_eq!(result.peak_to_peak, 0.0);
    }

    #[test]
    fn wide_window_does_not_converge() {
        let detector = StabilityDetector::new(StabilityDetectorConfig::default());
        let rates = [70.0, 75.0, 72.0, 73.0, 71.0, 74.0, 72.0, 73.0, 70.0, 75.0];
        assert_eq!(peak_to_peak(&rates), 5.0);
        assert!(detector.check(&history_of(&rates)).is_none());
    }

    #[test]
    fn needs_full_window() {
        let detector = StabilityDetector::new(StabilityDetectorConfig::default());
        assert!(detector.check(&history_of(&[75.0; 9])).is_none());
    }

    #[test]
    fn only_trailing_entries_count() {
        let detector = StabilityDetector::new(StabilityDetectorConfig::default());
        let mut rates = vec![40.0, 160.0, 0.0];
        rates.extend_from_slice(&[80.0, 81.0, 80.5, 82.0, 81.0, 80.0, 81.5, 80.0, 81.0, 82.0]);
        let result = detector.check(&history_of(&rates)).unwrap();
        assert_eq!(result.rate, 81.0);
    }

    #[test]
    fn range_equal_to_threshold_is_not_stable() {
        let detector = StabilityDetector::new(StabilityDetectorConfig::default());
        let mut rates = vec![75.0; 9];
        rates.push(77.5);
        assert!(detector.check(&history_of(&rates)).is_none());
    }
}
