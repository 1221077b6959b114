pub mod record;
pub mod segment;

pub use image::RgbImage;
pub use record::{
    best_record, AlertDecision, BoundingBox, Detection, DetectionSummary, FrameRecord,
};
pub use segment::{Frame, VideoSegment, STAMP_FORMAT};
