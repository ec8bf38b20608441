use std::time::Duration;

use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;

use crate::config::{load_config, Config};
use crate::error::PulseError;
use crate::processing::effort::EffortState;
use crate::processing::session::SessionMachine;
use crate::roi::Frame;

impl From<PulseError> for PyErr {
    fn from(err: PulseError) -> PyErr {
        match err {
            PulseError::InvalidConfig(_) | PulseError::ConfigParse(_) => {
                PyValueError::new_err(err.to_string())
            }
            _ => PyRuntimeError::new_err(err.to_string()),
        }
    }
}

fn to_duration(elapsed: f64) -> PyResult<Duration> {
    if !elapsed.is_finite() || elapsed < 0.0 {
        return Err(PyValueError::new_err(format!(
            "elapsed must be a non-negative number of seconds, got {}",
            elapsed
        )));
    }
    Ok(Duration::from_secs_f64(elapsed))
}

/// Session machine driven from Python with per-frame ROI means.
#[pyclass]
pub struct PySessionMachine {
    machine: SessionMachine,
}

#[pymethods]
impl PySessionMachine {
    #[new]
    #[pyo3(signature = (config_path=None))]
    pub fn new(config_path: Option<String>) -> PyResult<Self> {
        let config = match config_path {
            Some(path) => load_config(path)?,
            None => Config::default(),
        };
        Ok(PySessionMachine {
            machine: SessionMachine::new(config)?,
        })
    }

    #[pyo3(signature = (elapsed=0.0))]
    pub fn start(&mut self, elapsed: f64) -> PyResult<()> {
        self.machine.start(to_duration(elapsed)?)?;
        Ok(())
    }

    pub fn stop(&mut self) -> PyResult<()> {
        self.machine.stop()?;
        Ok(())
    }

    /// Feeds one frame. `None` for `pulse_mean` means no face was found.
    /// Returns the latest pulse estimate.
    #[pyo3(signature = (elapsed, pulse_mean=None, breath_mean=None))]
    pub fn push_means(
        &mut self,
        elapsed: f64,
        pulse_mean: Option<f64>,
        breath_mean: Option<f64>,
    ) -> PyResult<Option<f64>> {
        let frame = Frame::from_means(to_duration(elapsed)?, pulse_mean, breath_mean);
        Ok(self.machine.process_frame(&frame).pulse)
    }

    #[getter]
    pub fn state(&self) -> String {
        format!("{:?}", self.machine.state())
    }

    #[getter]
    pub fn finalized(&self) -> bool {
        self.machine.state().is_finalized()
    }

    #[getter]
    pub fn pulse(&self) -> Option<f64> {
        self.machine.session().and_then(|s| s.current_pulse())
    }

    #[getter]
    pub fn breath(&self) -> Option<f64> {
        self.machine.session().and_then(|s| s.current_breath())
    }

    #[getter]
    pub fn final_pulse(&self) -> Option<f64> {
        self.machine.session().and_then(|s| s.final_pulse())
    }

    #[getter]
    pub fn final_breath(&self) -> Option<f64> {
        self.machine.session().and_then(|s| s.final_breath())
    }

    #[getter]
    pub fn effort(&self) -> Option<String> {
        let thresholds = &self.machine.config().bpm_thresholds;
        self.pulse()
            .map(|bpm| EffortState::classify(bpm, thresholds).label().to_string())
    }

    /// `(elapsed_secs, bpm)` pairs in estimation order.
    pub fn history(&self) -> Vec<(f64, f64)> {
        self.machine
            .session()
            .map(|s| {
                s.history()
                    .samples()
                    .iter()
                    .map(|sample| (sample.elapsed_secs, sample.bpm))
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[pymodule]
pub fn pulse_breath_monitor(_py: Python<'_>, m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PySessionMachine>()?;
    Ok(())
}
