use chrono::Local;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::processing::history::RateHistory;

pub const LOG_DIR: &str = "logs";

fn log_path(filename: &str) -> io::Result<PathBuf> {
    let log_dir = Path::new(LOG_DIR);
    if !log_dir.exists() {
        std::fs::create_dir_all(log_dir)?;
    }
    Ok(log_dir.join(filename))
}

/// Appends a timestamped entry to `logs/<filename>`.
pub fn log_to_file(filename: &str, message: &str) -> io::Result<()> {
    let path = log_path(filename)?;
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;

    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
    writeln!(file, "[{}] {}", timestamp, message)?;
    file.flush()?;

    Ok(())
}

/// Writes the elapsed-time/BPM pairs of a session as CSV to `logs/<filename>`.
/// Returns the path written.
pub fn log_rate_history(filename: &str, history: &RateHistory) -> Result<PathBuf> {
    let path = log_path(filename)?;
    write_rate_history(&path, history)?;
    Ok(path)
}

pub fn write_rate_history<P: AsRef<Path>>(path: P, history: &RateHistory) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["elapsed_secs", "bpm"])?;
    for sample in history.samples() {
        writer.write_record(&[
            format!("{:.3}", sample.elapsed_secs),
            format!("{:.1}", sample.bpm),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_csv_has_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.csv");
        let mut history = RateHistory::new();
        history.push(4.25, 72.04);
        history.push(4.5, 73.96);

        write_rate_history(&path, &history).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "elapsed_secs,bpm\n4.250,72.0\n4.500,74.0\n");
    }
}
