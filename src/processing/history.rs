use serde::{Deserialize, Serialize};

/// One accepted pulse estimate and the session time it was produced at.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateSample {
    pub elapsed_secs: f64,
    pub bpm: f64,
}

/// Append-only pulse estimates of a single session, ordered by elapsed time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RateHistory {
    samples: Vec<RateSample>,
}

impl RateHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, elapsed_secs: f64, bpm: f64) {
        debug_assert!(
            self.samples
                .last()
                .map_or(true, |last| last.elapsed_secs <= elapsed_secs),
            "rate history must be ordered by elapsed time"
        );
        self.samples.push(RateSample { elapsed_secs, bpm });
    }

    pub fn samples(&self) -> &[RateSample] {
        &self.samples
    }

    pub fn rates(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.bpm).collect()
    }

    /// The last `n` rates, or `None` while fewer than `n` exist.
    pub fn trailing(&self, n: usize) -> Option<Vec<f64>> {
        if n == 0 || self.samples.len() < n {
            return None;
        }
        Some(
            self.samples[self.samples.len() - n..]
                .iter()
                .map(|s| s.bpm)
                .collect(),
        )
    }

    pub fn latest(&self) -> Option<RateSample> {
        self.samples.last().copied()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Median of `values`; the mean of the two middle values for even lengths.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}
