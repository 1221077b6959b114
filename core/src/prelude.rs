use crate::upload::UploadAttempt;

/// Error taxonomy shared by every pipeline stage.
///
/// All variants are recoverable at the supervisor boundary: the cycle that
/// produced them is skipped or finished early, the process keeps running.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("capture failed: {0}")]
    CaptureFailed(String),
    #[error("empty segment: {0}")]
    EmptySegment(String),
    #[error("detector failed: {0}")]
    DetectorFailed(String),
    #[error("annotation failed: {0}")]
    AnnotationFailed(String),
    #[error("missing evidence: {0}")]
    MissingEvidence(String),
    #[error("retryable upload failure: {0}")]
    UploadRetryable(String),
    #[error("upload failed after {} attempt(s): {reason}", .attempts.len())]
    UploadFailed {
        attempts: Vec<UploadAttempt>,
        reason: String,
    },
    #[error("hardware output failed: {0}")]
    HardwareFailed(String),
}

impl PipelineError {
    /// Stable identifier used in structured log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::CaptureFailed(_) => "CaptureFailed",
            PipelineError::EmptySegment(_) => "EmptySegment",
            PipelineError::DetectorFailed(_) => "DetectorFailed",
            PipelineError::AnnotationFailed(_) => "AnnotationFailed",
            PipelineError::MissingEvidence(_) => "MissingEvidence",
            PipelineError::UploadRetryable(_) => "UploadRetryable",
            PipelineError::UploadFailed { .. } => "UploadFailed",
            PipelineError::HardwareFailed(_) => "HardwareFailed",
        }
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;
