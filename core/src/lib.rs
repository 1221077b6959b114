//! Capture, detection and alerting core for the AviGuard edge station.
//!
//! Each cycle records a short video segment, folds the per-frame detector
//! output into a [`detection::DetectionSummary`], decides whether the object
//! count crosses the alert threshold and, when it does, pulses the alarm
//! output and uploads the evidence with a bounded retry budget.

pub mod capture;
pub mod detection;
pub mod hardware;
pub mod inference;
pub mod math;
pub mod prelude;
pub mod processing;
pub mod telemetry;
pub mod upload;

pub use prelude::{PipelineError, PipelineResult};
