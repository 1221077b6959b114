pub mod aggregator;
pub mod alert;
pub mod annotate;
pub mod artifacts;

pub use aggregator::DetectionAggregator;
pub use alert::evaluate;
pub use annotate::{annotate, encode_jpeg};
pub use artifacts::{frame_file_name, ArtifactSink, FrameDirectory, NoArtifacts};
