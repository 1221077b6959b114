use crate::hardware::DigitalOutput;
use crate::prelude::PipelineResult;
use log::{error, info};
use std::thread;
use std::time::Duration;

/// Drives the alarm line. The line is LOW whenever no pulse is in progress,
/// and is driven LOW again when the signaler is released or dropped.
pub struct AlarmSignaler {
    output: Box<dyn DigitalOutput>,
    released: bool,
}

/// Alarm held HIGH; driven LOW when finished or dropped.
struct ActiveAlarm<'a> {
    output: &'a mut Box<dyn DigitalOutput>,
    armed: bool,
}

impl ActiveAlarm<'_> {
    fn finish(mut self) -> PipelineResult<()> {
        self.armed = false;
        self.output.set(false)
    }
}

impl Drop for ActiveAlarm<'_> {
    fn drop(&mut self) {
        if self.armed {
            if let Err(err) = self.output.set(false) {
                error!("could not release alarm pin {}: {}", self.output.pin(), err);
            }
        }
    }
}

impl AlarmSignaler {
    pub fn new(mut output: Box<dyn DigitalOutput>) -> PipelineResult<Self> {
        output.set(false)?;
        Ok(Self {
            output,
            released: false,
        })
    }

    pub fn pin(&self) -> u8 {
        self.output.pin()
    }

    /// HIGH for `duration`, then LOW on every exit path.
    pub fn pulse(&mut self, duration: Duration) -> PipelineResult<()> {
        let active = ActiveAlarm {
            output: &mut self.output,
            armed: true,
        };
        active.output.set(true)?;
        thread::sleep(duration);
        active.finish()
    }

    pub fn release(&mut self) -> PipelineResult<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        info!("releasing alarm pin {}", self.output.pin());
        self.output.set(false)
    }
}

impl Drop for AlarmSignaler {
    fn drop(&mut self) {
        if let Err(err) = self.release() {
            error!("alarm release on drop failed: {}", err);
        }
    }
}
