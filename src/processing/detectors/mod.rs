pub mod stability;

pub use stability::{Convergence, StabilityDetector, StabilityDetectorConfig};
