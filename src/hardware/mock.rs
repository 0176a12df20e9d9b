//! In-memory hardware for development machines and tests.
//!
//! Each mock keeps its observable state behind an `Arc` so a test can
//! keep a probe after the device itself has been moved into a [`Panel`].
//!
//! [`Panel`]: crate::panel::Panel

use super::camera::{CameraConfig, CameraDevice};
use super::dht::{HumiditySensor, Measurement};
use super::gpio::{GpioProvider, Level};
use crate::error::{PanelError, Result, SensorError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Shared pin table of a [`MockGpio`].
pub type PinTable = Arc<Mutex<HashMap<u8, Level>>>;

/// GPIO provider that records pin levels in a map.
#[derive(Debug, Default)]
pub struct MockGpio {
    pins: PinTable,
    fail_setup: bool,
}

impl MockGpio {
    pub fn new() -> Self {
        Self::default()
    }

    /// A provider whose `setup_output` always fails.
    pub fn failing() -> Self {
        Self {
            fail_setup: true,
            ..Self::default()
        }
    }

    /// Handle on the pin table that outlives the provider.
    pub fn pins(&self) -> PinTable {
        Arc::clone(&self.pins)
    }

    fn table(&self) -> Result<std::sync::MutexGuard<'_, HashMap<u8, Level>>> {
        self.pins
            .lock()
            .map_err(|_| PanelError::gpio_error("mock pin table poisoned"))
    }
}

impl GpioProvider for MockGpio {
    fn setup_output(&mut self, pin: u8, initial: Level) -> Result<()> {
        if self.fail_setup {
            return Err(PanelError::gpio_error(format!(
                "mock setup of pin {} refused",
                pin
            )));
        }
        self.table()?.insert(pin, initial);
        Ok(())
    }

    fn set_output(&mut self, pin: u8, level: Level) -> Result<()> {
        match self.table()?.get_mut(&pin) {
            Some(current) => {
                *current = level;
                Ok(())
            }
            None => Err(PanelError::gpio_error(format!(
                "Pin {} is not configured as output",
                pin
            ))),
        }
    }

    fn read_input(&mut self, pin: u8) -> Result<Level> {
        self.table()?
            .get(&pin)
            .copied()
            .ok_or_else(|| PanelError::gpio_error(format!("Pin {} is not available", pin)))
    }

    fn cleanup(&mut self) {
        if let Ok(mut pins) = self.pins.lock() {
            pins.clear();
        }
    }
}

/// Counters shared between a [`MockSensor`] and the test observing it.
#[derive(Debug, Default)]
pub struct SensorProbe {
    pub reads: AtomicUsize,
    pub releases: AtomicUsize,
}

/// Sensor returning a fixed measurement after a scripted number of faults.
#[derive(Debug)]
pub struct MockSensor {
    measurement: Measurement,
    transient_failures: usize,
    fatal: Option<SensorError>,
    released: bool,
    probe: Arc<SensorProbe>,
}

impl MockSensor {
    pub fn new(temperature: f32, humidity: f32) -> Self {
        Self {
            measurement: Measurement {
                temperature,
                humidity,
            },
            transient_failures: 0,
            fatal: None,
            released: false,
            probe: Arc::new(SensorProbe::default()),
        }
    }

    /// Fail the next `count` temperature reads with a recoverable error.
    pub fn with_transient_failures(mut self, count: usize) -> Self {
        self.transient_failures = count;
        self
    }

    /// Fail every read with `error`.
    pub fn with_fatal_error(mut self, error: SensorError) -> Self {
        self.fatal = Some(error);
        self
    }

    pub fn probe(&self) -> Arc<SensorProbe> {
        Arc::clone(&self.probe)
    }

    fn check(&self) -> std::result::Result<(), SensorError> {
        if self.released {
            return Err(SensorError::Released);
        }
        match &self.fatal {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

impl Default for MockSensor {
    fn default() -> Self {
        Self::new(21.5, 45.0)
    }
}

impl HumiditySensor for MockSensor {
    fn read_temperature(&mut self) -> std::result::Result<f32, SensorError> {
        self.probe.reads.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        if self.transient_failures > 0 {
            self.transient_failures -= 1;
            return Err(SensorError::IncompleteFrame(0));
        }
        Ok(self.measurement.temperature)
    }

    fn read_humidity(&mut self) -> std::result::Result<f32, SensorError> {
        self.check()?;
        Ok(self.measurement.humidity)
    }

    fn release(&mut self) {
        self.released = true;
        self.probe.releases.fetch_add(1, Ordering::SeqCst);
    }
}

/// Smallest byte sequence carrying JPEG start and end markers.
pub const PLACEHOLDER_FRAME: &[u8] = &[0xff, 0xd8, 0xff, 0xe0, 0x00, 0x00, 0xff, 0xd9];

/// Counters shared between a [`MockCamera`] and the test observing it.
#[derive(Debug, Default)]
pub struct CameraProbe {
    pub configures: AtomicUsize,
    pub starts: AtomicUsize,
    pub stops: AtomicUsize,
    pub closes: AtomicUsize,
    pub captures: AtomicUsize,
    running: AtomicBool,
}

impl CameraProbe {
    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// Camera producing a placeholder frame per capture.
#[derive(Debug)]
pub struct MockCamera {
    frame: Vec<u8>,
    fail_after: Option<usize>,
    fail_start: bool,
    probe: Arc<CameraProbe>,
}

impl MockCamera {
    pub fn new() -> Self {
        Self::with_probe(Arc::new(CameraProbe::default()))
    }

    /// Build a camera reporting into an existing probe, so a factory can
    /// hand out several devices that are all observed together.
    pub fn with_probe(probe: Arc<CameraProbe>) -> Self {
        Self {
            frame: PLACEHOLDER_FRAME.to_vec(),
            fail_after: None,
            fail_start: false,
            probe,
        }
    }

    pub fn with_frame(mut self, frame: impl Into<Vec<u8>>) -> Self {
        self.frame = frame.into();
        self
    }

    /// Let `count` captures succeed, then fail every capture.
    pub fn failing_after(mut self, count: usize) -> Self {
        self.fail_after = Some(count);
        self
    }

    pub fn failing_start(mut self) -> Self {
        self.fail_start = true;
        self
    }

    pub fn probe(&self) -> Arc<CameraProbe> {
        Arc::clone(&self.probe)
    }
}

impl Default for MockCamera {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraDevice for MockCamera {
    fn configure(&mut self, _config: &CameraConfig) -> Result<()> {
        self.probe.configures.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn start(&mut self) -> Result<()> {
        if self.fail_start {
            return Err(PanelError::camera_error("mock camera refused to start"));
        }
        self.probe.starts.fetch_add(1, Ordering::SeqCst);
        self.probe.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.probe.stops.fetch_add(1, Ordering::SeqCst);
        self.probe.running.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn close(&mut self) {
        self.probe.closes.fetch_add(1, Ordering::SeqCst);
    }

    fn capture_frame(&mut self) -> Result<Vec<u8>> {
        if !self.probe.is_running() {
            return Err(PanelError::camera_error("mock camera is not running"));
        }
        let taken = self.probe.captures.fetch_add(1, Ordering::SeqCst);
        if matches!(self.fail_after, Some(limit) if taken >= limit) {
            return Err(PanelError::camera_error("mock capture failed"));
        }
        Ok(self.frame.clone())
    }
}
