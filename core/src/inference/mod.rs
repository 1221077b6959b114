pub mod detector;
pub mod sidecar;

pub use detector::Detector;
pub use sidecar::SidecarDetector;
