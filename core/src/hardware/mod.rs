pub mod output;
pub mod signaler;

#[cfg(feature = "rpi")]
pub use output::GpioOutput;
pub use output::{DigitalOutput, LoggingOutput};
pub use signaler::AlarmSignaler;
