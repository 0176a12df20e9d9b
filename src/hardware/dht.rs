//! DHT22 / AM2302 temperature and humidity sensor.
//!
//! The sensor speaks a single-wire protocol: the host pulls the data line
//! low to request a measurement, the sensor answers with an 80µs low /
//! 80µs high preamble, then sends 40 bits. Every bit is a ~50µs low pulse
//! followed by a high pulse whose width carries the value (~27µs for 0,
//! ~70µs for 1). The last byte is a checksum of the first four.

use crate::error::SensorError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// High pulses longer than this decode as a 1 bit.
pub const BIT_THRESHOLD: Duration = Duration::from_micros(48);

/// Minimum time between two physical reads of the sensor.
pub const MIN_READ_INTERVAL: Duration = Duration::from_secs(2);

/// Number of pulses carrying the 40 data bits.
const DATA_PULSES: usize = 80;

/// Below this many pulses the sensor did not answer at all.
const MIN_RESPONSE_PULSES: usize = 10;

/// Trait for humidity/temperature sensors.
pub trait HumiditySensor: Send {
    /// Temperature in degrees Celsius.
    fn read_temperature(&mut self) -> std::result::Result<f32, SensorError>;

    /// Relative humidity in percent.
    fn read_humidity(&mut self) -> std::result::Result<f32, SensorError>;

    /// Temperature and humidity from a single measurement.
    ///
    /// Sensors that deliver both values in one frame should override this
    /// so the pair never mixes two frames.
    fn read(&mut self) -> std::result::Result<Measurement, SensorError> {
        Ok(Measurement {
            temperature: self.read_temperature()?,
            humidity: self.read_humidity()?,
        })
    }

    /// Release the data pin. Later reads fail with [`SensorError::Released`].
    fn release(&mut self);
}

/// One decoded sensor frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub temperature: f32,
    pub humidity: f32,
}

/// Turn the captured pulse widths into the five raw frame bytes.
///
/// A complete capture is the preamble, 80 data pulses and a trailing low
/// pulse, so the data is taken as the 80 pulses before the last one.
pub fn pulses_to_frame(pulses: &[Duration]) -> std::result::Result<[u8; 5], SensorError> {
    if pulses.len() < MIN_RESPONSE_PULSES {
        return Err(SensorError::NotFound);
    }
    if pulses.len() < DATA_PULSES + 3 {
        return Err(SensorError::IncompleteFrame(pulses.len()));
    }

    let end = pulses.len() - 1;
    let data = &pulses[end - DATA_PULSES..end];

    let mut frame = [0u8; 5];
    for (bit_index, pair) in data.chunks_exact(2).enumerate() {
        // pair[0] is the low separator, pair[1] carries the bit
        if pair[1] > BIT_THRESHOLD {
            frame[bit_index / 8] |= 0x80 >> (bit_index % 8);
        }
    }
    Ok(frame)
}

/// Validate the checksum and convert a raw DHT22 frame.
pub fn decode_frame(frame: [u8; 5]) -> std::result::Result<Measurement, SensorError> {
    let expected = frame[..4]
        .iter()
        .fold(0u8, |sum, byte| sum.wrapping_add(*byte));
    if expected != frame[4] {
        return Err(SensorError::Checksum {
            expected,
            actual: frame[4],
        });
    }

    let humidity = u16::from_be_bytes([frame[0], frame[1]]) as f32 / 10.0;
    let magnitude = u16::from_be_bytes([frame[2] & 0x7f, frame[3]]) as f32 / 10.0;
    let temperature = if frame[2] & 0x80 != 0 {
        -magnitude
    } else {
        magnitude
    };

    Ok(Measurement {
        temperature,
        humidity,
    })
}

#[cfg(feature = "gpio")]
mod raspberry_pi {
    use super::*;
    use crate::error::{PanelError, Result};
    use rppal::gpio::{Gpio, IoPin, Level as PinLevel, Mode};
    use std::thread;
    use std::time::Instant;

    /// Host start pulse; the DHT22 needs at least 1ms.
    const START_SIGNAL: Duration = Duration::from_micros(1100);

    /// A full frame takes under 5ms; the window leaves room for preemption.
    const CAPTURE_WINDOW: Duration = Duration::from_millis(250);

    /// Preamble, data and trailer, with slack for a spurious edge.
    const MAX_PULSES: usize = 90;

    /// DHT22 read by bit-banging an rppal I/O pin.
    pub struct Dht22 {
        pin: Option<IoPin>,
        last: Option<(Instant, Measurement)>,
    }

    impl Dht22 {
        pub fn new(data_pin: u8) -> Result<Self> {
            let gpio = Gpio::new().map_err(|e| {
                PanelError::gpio_error(format!("Failed to initialize GPIO: {}", e))
            })?;
            let pin = gpio
                .get(data_pin)
                .map_err(|e| {
                    PanelError::gpio_error(format!(
                        "Failed to access sensor pin {}: {}",
                        data_pin, e
                    ))
                })?
                .into_io(Mode::Input);

            Ok(Self {
                pin: Some(pin),
                last: None,
            })
        }

        fn measure(&mut self) -> std::result::Result<Measurement, SensorError> {
            if let Some((taken_at, measurement)) = self.last {
                if taken_at.elapsed() < MIN_READ_INTERVAL {
                    return Ok(measurement);
                }
            }

            let pulses = self.capture_pulses()?;
            let measurement = decode_frame(pulses_to_frame(&pulses)?)?;
            self.last = Some((Instant::now(), measurement));
            Ok(measurement)
        }

        fn capture_pulses(&mut self) -> std::result::Result<Vec<Duration>, SensorError> {
            let pin = self.pin.as_mut().ok_or(SensorError::Released)?;

            pin.set_mode(Mode::Output);
            pin.set_high();
            thread::sleep(Duration::from_millis(10));
            pin.set_low();
            thread::sleep(START_SIGNAL);
            pin.set_high();
            pin.set_mode(Mode::Input);

            let mut pulses = Vec::with_capacity(MAX_PULSES);
            let started = Instant::now();
            let mut level = pin.read();
            let mut last_edge = started;

            while pulses.len() < MAX_PULSES && started.elapsed() < CAPTURE_WINDOW {
                let current: PinLevel = pin.read();
                if current != level {
                    let now = Instant::now();
                    pulses.push(now - last_edge);
                    last_edge = now;
                    level = current;
                }
            }

            Ok(pulses)
        }
    }

    impl HumiditySensor for Dht22 {
        fn read_temperature(&mut self) -> std::result::Result<f32, SensorError> {
            self.measure().map(|m| m.temperature)
        }

        fn read_humidity(&mut self) -> std::result::Result<f32, SensorError> {
            self.measure().map(|m| m.humidity)
        }

        fn read(&mut self) -> std::result::Result<Measurement, SensorError> {
            self.measure()
        }

        fn release(&mut self) {
            self.pin = None;
            self.last = None;
        }
    }
}

#[cfg(feature = "gpio")]
pub use raspberry_pi::Dht22;
