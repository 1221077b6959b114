use chrono::{DateTime, Local};
use image::RgbImage;
use std::path::PathBuf;
use std::time::Duration;

/// Timestamp layout used in segment names and cycle identifiers.
pub const STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Video file produced by one recording cycle.
#[derive(Debug, Clone)]
pub struct VideoSegment {
    pub path: PathBuf,
    pub duration: Duration,
    pub created_at: DateTime<Local>,
}

impl VideoSegment {
    pub fn stamp(&self) -> String {
        self.created_at.format(STAMP_FORMAT).to_string()
    }
}

/// A decoded frame. `source` points at an on-disk copy when the decoder has one.
#[derive(Debug, Clone)]
pub struct Frame {
    pub image: RgbImage,
    pub source: Option<PathBuf>,
}

impl Frame {
    pub fn in_memory(image: RgbImage) -> Self {
        Self {
            image,
            source: None,
        }
    }
}
