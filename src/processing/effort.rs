use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::BpmThresholds;

/// Presentation band for the latest pulse estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffortState {
    Relaxed,
    Moderate,
    High,
}

impl EffortState {
    /// Below `relax` is relaxed, up to and including `moderate` is moderate, above is high.
    pub fn classify(bpm: f64, thresholds: &BpmThresholds) -> Self {
        if bpm < thresholds.relax {
            EffortState::Relaxed
        } else if bpm <= thresholds.moderate {
            EffortState::Moderate
        } else {
            EffortState::High
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            EffortState::Relaxed => "Relaxed",
            EffortState::Moderate => "Moderate",
            EffortState::High => "High effort",
        }
    }

    pub fn advice(&self) -> &'static str {
        match self {
            EffortState::Relaxed => "Normal resting state. Pulse within resting limits.",
            EffortState::Moderate => {
                "Elevated pulse, indicating light physical activity or stress."
            }
            EffortState::High => "High pulse, respiration is being monitored.",
        }
    }
}

impl fmt::Display for EffortState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Breath sampling only runs while the pulse is in the high effort band.
pub fn breath_gate_open(bpm: f64, thresholds: &BpmThresholds) -> bool {
    bpm > thresholds.moderate
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_threshold_labels() {
        let thresholds = BpmThresholds::default();
        assert_eq!(EffortState::classify(79.0, &thresholds).label(), "Relaxed");
        assert_eq!(EffortState::classify(80.0, &thresholds).label(), "Moderate");
        assert_eq!(EffortState::classify(120.0, &thresholds).label(), "Moderate");
        assert_eq!(EffortState::classify(121.0, &thresholds).label(), "High effort");
    }

    #[test]
    fn gate_matches_high_band() {
        let thresholds = BpmThresholds {
            relax: 60.0,
            moderate: 100.0,
        };
        assert!(!breath_gate_open(100.0, &thresholds));
        assert!(breath_gate_open(100.5, &thresholds));
        assert_eq!(EffortState::classify(100.5, &thresholds), EffortState::High);
        assert_eq!(EffortState::High.to_string(), "High effort");
    }
}
