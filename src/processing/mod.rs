pub mod buffer;
pub mod conditioning;
pub mod detectors;
pub mod effort;
pub mod estimator;
pub mod filters;
pub mod history;
pub mod session;
pub mod worker;
