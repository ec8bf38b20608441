use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::{info, warn};

use crate::error::{PulseError, Result};
use crate::processing::worker::FrameSource;
use crate::roi::Frame;

/// One line of a recorded session. An empty cell means the ROI was absent on that frame.
#[derive(Debug, Deserialize)]
struct ReplayRecord {
    timestamp_secs: f64,
    pulse_mean: Option<f64>,
    breath_mean: Option<f64>,
}

/// Replays ROI means recorded as CSV with the columns
/// `timestamp_secs,pulse_mean,breath_mean`.
pub struct ReplaySource {
    path: PathBuf,
    reader: Option<csv::Reader<File>>,
    line: usize,
    last_timestamp: Option<f64>,
}

impl ReplaySource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            reader: None,
            line: 0,
            last_timestamp: None,
        }
    }
}

impl FrameSource for ReplaySource {
    fn open(&mut self) -> Result<()> {
        if !self.path.exists() {
            return Err(PulseError::CaptureUnavailable(format!(
                "recording not found at {}",
                self.path.display()
            )));
        }
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(&self.path)?;
        info!(path = %self.path.display(), "replaying recording");
        self.reader = Some(reader);
        self.line = 0;
        self.last_timestamp = None;
        Ok(())
    }

    fn next_frame(&mut self) -> Option<Frame> {
        let reader = self.reader.as_mut()?;
        loop {
            let mut records = reader.deserialize::<ReplayRecord>();
            let record = records.next()?;
            self.line += 1;
            match record {
                Ok(r) => {
                    if !r.timestamp_secs.is_finite() || r.timestamp_secs < 0.0 {
                        warn!(line = self.line, "skipping record with bad timestamp");
                        continue;
                    }
                    if self.last_timestamp.is_some_and(|last| r.timestamp_secs < last) {
                        warn!(
                            line = self.line,
                            timestamp = r.timestamp_secs,
                            "skipping record earlier than the previous frame"
                        );
                        continue;
                    }
                    self.last_timestamp = Some(r.timestamp_secs);
                    return Some(Frame::from_means(
                        Duration::from_secs_f64(r.timestamp_secs),
                        r.pulse_mean,
                        r.breath_mean,
                    ));
                }
                Err(e) => {
                    warn!(line = self.line, "skipping malformed record: {}", e);
                }
            }
        }
    }

    fn release(&mut self) {
        self.reader = None;
    }
}
