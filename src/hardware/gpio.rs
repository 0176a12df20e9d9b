//! GPIO (General Purpose Input/Output) access for the relay lines.
//!
//! The real backend uses rppal and is feature-gated so the crate still
//! compiles on machines without a Raspberry Pi header.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Electrical level of a GPIO line.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Level {
    /// Line driven to ground
    Low,
    /// Line driven to 3.3V
    High,
}

impl Level {
    pub fn is_low(self) -> bool {
        self == Level::Low
    }

    pub fn is_high(self) -> bool {
        self == Level::High
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Low => f.write_str("LOW"),
            Level::High => f.write_str("HIGH"),
        }
    }
}

/// Trait for GPIO operations.
pub trait GpioProvider: Send {
    /// Claim `pin` as an output and drive it to `initial`.
    fn setup_output(&mut self, pin: u8, initial: Level) -> Result<()>;

    /// Drive an output pin to `level`.
    fn set_output(&mut self, pin: u8, level: Level) -> Result<()>;

    /// Read the current level of a pin.
    ///
    /// For a claimed output this is the level it is being driven to.
    fn read_input(&mut self, pin: u8) -> Result<Level>;

    /// Release every claimed pin.
    fn cleanup(&mut self);
}

#[cfg(feature = "gpio")]
mod raspberry_pi {
    use super::*;
    use crate::error::PanelError;
    use rppal::gpio::{Gpio, OutputPin};
    use std::collections::HashMap;

    /// Raspberry Pi GPIO provider using rppal.
    pub struct RaspberryPiGpio {
        gpio: Gpio,
        outputs: HashMap<u8, OutputPin>,
    }

    impl RaspberryPiGpio {
        /// Create a new Raspberry Pi GPIO provider.
        pub fn new() -> Result<Self> {
            let gpio = Gpio::new().map_err(|e| {
                PanelError::gpio_error(format!("Failed to initialize GPIO: {}", e))
            })?;

            Ok(Self {
                gpio,
                outputs: HashMap::new(),
            })
        }
    }

    fn to_rppal(level: Level) -> rppal::gpio::Level {
        match level {
            Level::Low => rppal::gpio::Level::Low,
            Level::High => rppal::gpio::Level::High,
        }
    }

    fn from_rppal(level: rppal::gpio::Level) -> Level {
        match level {
            rppal::gpio::Level::Low => Level::Low,
            rppal::gpio::Level::High => Level::High,
        }
    }

    impl GpioProvider for RaspberryPiGpio {
        fn setup_output(&mut self, pin: u8, initial: Level) -> Result<()> {
            // Re-claiming a pin first releases the previous handle
            self.outputs.remove(&pin);

            let gpio_pin = self.gpio.get(pin).map_err(|e| {
                PanelError::gpio_error(format!("Failed to access pin {}: {}", pin, e))
            })?;

            let output = match initial {
                Level::Low => gpio_pin.into_output_low(),
                Level::High => gpio_pin.into_output_high(),
            };
            self.outputs.insert(pin, output);
            Ok(())
        }

        fn set_output(&mut self, pin: u8, level: Level) -> Result<()> {
            let output = self.outputs.get_mut(&pin).ok_or_else(|| {
                PanelError::gpio_error(format!("Pin {} is not configured as output", pin))
            })?;
            output.write(to_rppal(level));
            Ok(())
        }

        fn read_input(&mut self, pin: u8) -> Result<Level> {
            if let Some(output) = self.outputs.get(&pin) {
                return Ok(if output.is_set_high() {
                    Level::High
                } else {
                    Level::Low
                });
            }

            let gpio_pin = self.gpio.get(pin).map_err(|e| {
                PanelError::gpio_error(format!("Failed to access pin {}: {}", pin, e))
            })?;
            Ok(from_rppal(gpio_pin.read()))
        }

        fn cleanup(&mut self) {
            // Dropping an OutputPin restores the pin's previous mode
            self.outputs.clear();
        }
    }
}

#[cfg(feature = "gpio")]
pub use raspberry_pi::RaspberryPiGpio;
