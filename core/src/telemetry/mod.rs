pub mod log;
pub mod metrics;

pub use self::log::{CycleLog, CycleStage};
pub use self::metrics::{MetricsRecorder, MetricsSnapshot};
