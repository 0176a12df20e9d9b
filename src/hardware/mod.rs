//! Hardware capabilities used by the panel.
//!
//! Every device is reached through a small trait so the panel logic can run
//! against the real Raspberry Pi drivers (feature `gpio` for relays and the
//! DHT22, feature `rpicam` for the camera) or the in-memory mocks.

pub mod camera;
pub mod dht;
pub mod gpio;
pub mod mock;

// Re-export commonly used items
pub use camera::{CameraConfig, CameraDevice, MjpegSplitter, Resolution, Transform};
pub use dht::{HumiditySensor, Measurement};
pub use gpio::{GpioProvider, Level};

use crate::error::Result;

/// Open the GPIO provider for this build.
pub fn open_gpio() -> Result<Box<dyn GpioProvider>> {
    #[cfg(feature = "gpio")]
    {
        Ok(Box::new(gpio::RaspberryPiGpio::new()?))
    }

    #[cfg(not(feature = "gpio"))]
    {
        tracing::debug!("GPIO feature not compiled, using in-memory pins");
        Ok(Box::new(mock::MockGpio::new()))
    }
}

/// Open the temperature/humidity sensor on `data_pin` for this build.
pub fn open_sensor(data_pin: u8) -> Result<Box<dyn HumiditySensor>> {
    #[cfg(feature = "gpio")]
    {
        Ok(Box::new(dht::Dht22::new(data_pin)?))
    }

    #[cfg(not(feature = "gpio"))]
    {
        tracing::debug!("GPIO feature not compiled, simulating sensor on pin {}", data_pin);
        Ok(Box::new(mock::MockSensor::default()))
    }
}

/// Open the camera for this build. Nothing is started until configured.
pub fn open_camera() -> Result<Box<dyn CameraDevice>> {
    #[cfg(feature = "rpicam")]
    {
        Ok(Box::new(camera::RpiCamera::new()))
    }

    #[cfg(not(feature = "rpicam"))]
    {
        tracing::debug!("rpicam feature not compiled, streaming placeholder frames");
        Ok(Box::new(mock::MockCamera::new()))
    }
}

/// Cargo features compiled into this build.
pub fn compiled_features() -> Vec<&'static str> {
    let mut features = Vec::new();
    if cfg!(feature = "gpio") {
        features.push("gpio");
    }
    if cfg!(feature = "rpicam") {
        features.push("rpicam");
    }
    features
}
