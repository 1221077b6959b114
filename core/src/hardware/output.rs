use crate::prelude::PipelineResult;
use log::info;

/// A single digital output line (BCM numbering on the Raspberry Pi).
pub trait DigitalOutput {
    fn pin(&self) -> u8;

    fn set(&mut self, high: bool) -> PipelineResult<()>;
}

/// Stand-in output for hosts without GPIO; every transition is logged.
pub struct LoggingOutput {
    pin: u8,
    high: bool,
}

impl LoggingOutput {
    pub fn new(pin: u8) -> Self {
        Self { pin, high: false }
    }

    pub fn is_high(&self) -> bool {
        self.high
    }
}

impl DigitalOutput for LoggingOutput {
    fn pin(&self) -> u8 {
        self.pin
    }

    fn set(&mut self, high: bool) -> PipelineResult<()> {
        if self.high != high {
            info!(
                "[mock] pin {} -> {}",
                self.pin,
                if high { "HIGH" } else { "LOW" }
            );
        }
        self.high = high;
        Ok(())
    }
}

#[cfg(feature = "rpi")]
mod gpio {
    use super::DigitalOutput;
    use crate::prelude::{PipelineError, PipelineResult};
    use rppal::gpio::{Gpio, OutputPin};

    /// Raspberry Pi output pin. The pin returns to its previous mode when dropped.
    pub struct GpioOutput {
        pin: OutputPin,
    }

    impl GpioOutput {
        pub fn acquire(bcm_pin: u8) -> PipelineResult<Self> {
            let gpio = Gpio::new()
                .map_err(|err| PipelineError::HardwareFailed(format!("opening GPIO: {}", err)))?;
            let mut pin = gpio
                .get(bcm_pin)
                .map_err(|err| {
                    PipelineError::HardwareFailed(format!("claiming pin {}: {}", bcm_pin, err))
                })?
                .into_output_low();
            pin.set_reset_on_drop(true);
            Ok(Self { pin })
        }
    }

    impl DigitalOutput for GpioOutput {
        fn pin(&self) -> u8 {
            self.pin.pin()
        }

        fn set(&mut self, high: bool) -> PipelineResult<()> {
            if high {
                self.pin.set_high();
            } else {
                self.pin.set_low();
            }
            Ok(())
        }
    }
}

#[cfg(feature = "rpi")]
pub use gpio::GpioOutput;
