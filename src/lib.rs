pub mod config;
pub mod error;
pub mod local;
pub mod processing;
pub mod roi;
pub mod utils;

#[cfg(feature = "python")]
pub mod bindings;

pub use config::Config;
pub use error::{PulseError, Result};
pub use processing::session::{FinalReport, FrameUpdate, SessionMachine, SessionState};
pub use processing::worker::{FrameSource, MeasurementWorker, StopHandle, WorkerEvent};
pub use roi::Frame;
