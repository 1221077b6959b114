use crate::detection::{AlertDecision, DetectionSummary};

/// Triggered iff the best frame holds more than `threshold` objects.
pub fn evaluate(summary: DetectionSummary, threshold: usize) -> AlertDecision {
    AlertDecision {
        triggered: summary.best.object_count > threshold,
        summary,
    }
}
