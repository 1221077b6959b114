pub mod command;
pub mod frames;
pub mod recorder;

pub use command::{CaptureSettings, CommandCapture, CommandTemplate, RemuxSettings};
pub use frames::{FfmpegDecoder, FrameDecoder, Frames};
pub use recorder::{CaptureDevice, SegmentRecorder};
