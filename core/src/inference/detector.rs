use crate::detection::{Detection, Frame};
use crate::prelude::PipelineResult;

/// Object-detection capability backed by an external model.
///
/// Implementations return every detection in the frame; filtering to the
/// monitored class happens in the aggregator.
pub trait Detector {
    fn detect(&mut self, frame: &Frame) -> PipelineResult<Vec<Detection>>;

    /// Brings back a detector that stopped after a failure. Returns `true`
    /// when a restart happened.
    fn restart_if_stopped(&mut self) -> PipelineResult<bool> {
        Ok(false)
    }

    /// Releases the model handle. Called once at process teardown.
    fn shutdown(&mut self) {}
}
