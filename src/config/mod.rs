// src/config/mod.rs
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{PulseError, Result};
use crate::processing::filters::{PULSE_BAND_HIGH_HZ, PULSE_BAND_LOW_HZ};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub processor: ProcessorConfig,
    pub bpm_thresholds: BpmThresholds,
    pub measurement: MeasurementConfig,
    pub gamma: GammaConfig,
    pub roi: RoiConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ProcessorConfig {
    /// Sampling rate assumed for every channel. Real frame intervals are not measured.
    pub fps: f64,
    pub enable_debug_logging: bool,
    pub verbose: bool,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            fps: 30.0,
            enable_debug_logging: false,
            verbose: false,
        }
    }
}

/// Shared by the effort label and the breath gating condition.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct BpmThresholds {
    pub relax: f64,
    pub moderate: f64,
}

impl Default for BpmThresholds {
    fn default() -> Self {
        Self {
            relax: 80.0,
            moderate: 120.0,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct MeasurementConfig {
    pub duration_secs: f64,
    pub stable_window: usize,
    pub stable_threshold: f64,
}

impl Default for MeasurementConfig {
    fn default() -> Self {
        Self {
            duration_secs: 30.0,
            stable_window: 10,
            stable_threshold: 2.5,
        }
    }
}

// Consumed by the image enhancement collaborator, not by the pipeline.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct GammaConfig {
    pub low_light: f64,
    pub medium_light: f64,
    pub high_light: f64,
}

impl Default for GammaConfig {
    fn default() -> Self {
        Self {
            low_light: 1.8,
            medium_light: 1.4,
            high_light: 0.8,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct RoiConfig {
    pub forehead_fraction: f64,
    pub lower_face_start: f64,
}

impl Default for RoiConfig {
    fn default() -> Self {
        Self {
            forehead_fraction: 0.15,
            lower_face_start: 0.7,
        }
    }
}

impl Config {
    /// Reads `path`, falling back to the built-in defaults when it is missing or unreadable.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match load_config(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(
                    "using default configuration, {} not loaded: {}",
                    path.as_ref().display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Checked once before any session is built, so the filters can never be designed
    /// with an out-of-range cutoff.
    pub fn validate(&self) -> Result<()> {
        let fps = self.processor.fps;
        if !fps.is_finite() || fps <= 0.0 {
            return Err(PulseError::InvalidConfig(format!(
                "fps must be a positive number, got {}",
                fps
            )));
        }
        if fps / 2.0 <= PULSE_BAND_HIGH_HZ {
            return Err(PulseError::InvalidConfig(format!(
                "fps {} too low for the {}-{} Hz pulse band",
                fps, PULSE_BAND_LOW_HZ, PULSE_BAND_HIGH_HZ
            )));
        }

        let thresholds = &self.bpm_thresholds;
        if !(thresholds.relax < thresholds.moderate) {
            return Err(PulseError::InvalidConfig(format!(
                "bpm_thresholds.relax ({}) must be below bpm_thresholds.moderate ({})",
                thresholds.relax, thresholds.moderate
            )));
        }

        let measurement = &self.measurement;
        if measurement.stable_window == 0 {
            return Err(PulseError::InvalidConfig(
                "measurement.stable_window must be at least 1".to_string(),
            ));
        }
        if !(measurement.stable_threshold > 0.0) {
            return Err(PulseError::InvalidConfig(format!(
                "measurement.stable_threshold must be positive, got {}",
                measurement.stable_threshold
            )));
        }
        if !(measurement.duration_secs > 0.0) {
            return Err(PulseError::InvalidConfig(format!(
                "measurement.duration_secs must be positive, got {}",
                measurement.duration_secs
            )));
        }

        for (name, value) in [
            ("roi.forehead_fraction", self.roi.forehead_fraction),
            ("roi.lower_face_start", self.roi.lower_face_start),
        ] {
            if !(value > 0.0 && value < 1.0) {
                return Err(PulseError::InvalidConfig(format!(
                    "{} must be inside (0, 1), got {}",
                    name, value
                )));
            }
        }

        Ok(())
    }
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let config_str = fs::read_to_string(path)?;
    let config: Config = serde_yaml::from_str(&config_str)?;
    Ok(config)
}

pub fn save_config<P: AsRef<Path>>(config: &Config, path: P) -> Result<()> {
    let yaml = serde_yaml::to_string(config)?;
    fs::write(path, yaml)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.processor.fps, 30.0);
        assert_eq!(config.bpm_thresholds.relax, 80.0);
        assert_eq!(config.bpm_thresholds.moderate, 120.0);
    }

    #[test]
    fn partial_yaml_uses_defaults() {
        let yaml = "processor:\n  fps: 25.0\nbpm_thresholds:\n  moderate: 110.0\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.processor.fps, 25.0);
        assert_eq!(config.bpm_thresholds.relax, 80.0);
        assert_eq!(config.bpm_thresholds.moderate, 110.0);
        assert_eq!(config.measurement.stable_window, 10);
    }

    #[test]
    fn save_then_load() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut config = Config::default();
        config.processor.fps = 60.0;
        config.gamma.low_light = 2.0;
        save_config(&config, file.path()).unwrap();
        let loaded = load_config(file.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn missing_file_falls_back() {
        let config = Config::load_or_default("/definitely/not/here.yaml");
        assert_eq!(config, Config::default());
        assert!(load_config("/definitely/not/here.yaml").is_err());
    }

    #[test]
    fn rejects_low_fps() {
        let mut config = Config::default();
        config.processor.fps = 6.0;
        assert!(matches!(
            config.validate(),
            Err(PulseError::InvalidConfig(_))
        ));
    }

    #[test]
    fn rejects_inverted_thresholds() {
        let mut config = Config::default();
        config.bpm_thresholds.relax = 130.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_empty_stability_window() {
        let mut config = Config::default();
        config.measurement.stable_window = 0;
        assert!(config.validate().is_err());
    }
}
