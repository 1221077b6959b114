use crate::math::StatsHelper;
use serde::{Deserialize, Serialize};

/// Axis-aligned box in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

/// One object reported by the detector for a single frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub class_id: u32,
    pub confidence: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<BoundingBox>,
}

impl Detection {
    pub fn new(class_id: u32, confidence: f32) -> Self {
        Self {
            class_id,
            confidence,
            bbox: None,
        }
    }

    pub fn with_bbox(mut self, bbox: BoundingBox) -> Self {
        self.bbox = Some(bbox);
        self
    }
}

/// Per-frame count and confidence range for the monitored class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameRecord {
    pub frame_index: usize,
    pub object_count: usize,
    pub confidence_min: f32,
    pub confidence_max: f32,
    pub confidence_avg: f32,
}

impl FrameRecord {
    /// Confidences are zero when `scores` is empty.
    pub fn from_confidences(frame_index: usize, scores: &[f32]) -> Self {
        let stats = StatsHelper::confidence(scores);
        Self {
            frame_index,
            object_count: scores.len(),
            confidence_min: stats.min,
            confidence_max: stats.max,
            confidence_avg: stats.avg,
        }
    }
}

/// Aggregated view of one segment.
///
/// `best` is the first record holding the maximum `object_count`, and
/// `best_frame_image` is that frame's annotated JPEG.
#[derive(Debug, Clone)]
pub struct DetectionSummary {
    pub records: Vec<FrameRecord>,
    pub best: FrameRecord,
    pub best_frame_image: Vec<u8>,
}

/// Outcome of comparing a summary against the alert threshold.
#[derive(Debug, Clone)]
pub struct AlertDecision {
    pub triggered: bool,
    pub summary: DetectionSummary,
}

/// First record with the highest object count.
pub fn best_record(records: &[FrameRecord]) -> Option<&FrameRecord> {
    records.iter().fold(None, |best: Option<&FrameRecord>, record| match best {
        Some(current) if current.object_count >= record.object_count => Some(current),
        _ => Some(record),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_frame_has_zero_confidences() {
        let record = FrameRecord::from_confidences(3, &[]);
        assert_eq!(record.object_count, 0);
        assert_eq!(record.confidence_min, 0.0);
        assert_eq!(record.confidence_max, 0.0);
        assert_eq!(record.confidence_avg, 0.0);
    }

    #[test]
    fn best_record_prefers_earliest_maximum() {
        let records = vec![
            FrameRecord::from_confidences(0, &[0.4]),
            FrameRecord::from_confidences(1, &[0.5, 0.6]),
            FrameRecord::from_confidences(2, &[0.9, 0.9]),
            FrameRecord::from_confidences(3, &[]),
        ];
        let best = best_record(&records).unwrap();
        assert_eq!(best.frame_index, 1);
        assert_eq!(best.object_count, 2);
        assert!(best_record(&[]).is_none());
    }

    #[test]
    fn detection_parses_without_bbox() {
        let detection: Detection =
            serde_json::from_str(r#"{"class_id": 14, "confidence": 0.8}"#).unwrap();
        assert_eq!(detection, Detection::new(14, 0.8));
    }
}
