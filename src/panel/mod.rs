//! The control panel: relay-switched lights, climate sensor and camera.
//!
//! A [`Panel`] is built once at startup, shared with the request handlers
//! and torn down once on exit.

pub mod data;
pub mod reader;
pub mod relay;
pub mod streamer;

// Re-export commonly used items
pub use data::SensorReading;
pub use reader::{SensorReader, SensorRetryPolicy};
pub use relay::{BoxName, RelayAction, RelayController, RelayOutcome};
pub use streamer::{CameraState, CameraStreamer};

use crate::error::Result;
use crate::hardware::{self, CameraConfig};
use futures_util::stream::BoxStream;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, info};

/// Owns every hardware resource of the panel.
pub struct Panel {
    relays: RelayController,
    reader: SensorReader,
    camera: CameraStreamer,
    torn_down: AtomicBool,
}

impl Panel {
    pub fn new(relays: RelayController, reader: SensorReader, camera: CameraStreamer) -> Self {
        Self {
            relays,
            reader,
            camera,
            torn_down: AtomicBool::new(false),
        }
    }

    /// Build a panel on the hardware compiled into this binary.
    ///
    /// The camera is only opened by the first stream request.
    pub fn with_default_hardware(policy: SensorRetryPolicy) -> Result<Self> {
        let relays = RelayController::initialize(hardware::open_gpio)?;
        let sensor = hardware::open_sensor(crate::SENSOR_DATA_PIN)?;
        info!("Sensor ready on pin {}", crate::SENSOR_DATA_PIN);

        Ok(Self::new(
            relays,
            SensorReader::new(sensor, policy),
            CameraStreamer::new(hardware::open_camera, CameraConfig::default()),
        ))
    }

    /// Build a panel on in-memory hardware, whatever features are compiled.
    pub fn simulated() -> Result<Self> {
        let relays = RelayController::initialize(|| {
            Ok(Box::new(hardware::mock::MockGpio::new()) as Box<dyn hardware::GpioProvider>)
        })?;

        Ok(Self::new(
            relays,
            SensorReader::new(
                Box::new(hardware::mock::MockSensor::default()),
                SensorRetryPolicy::default(),
            ),
            CameraStreamer::new(
                || Ok(Box::new(hardware::mock::MockCamera::new()) as Box<dyn hardware::CameraDevice>),
                CameraConfig::default(),
            ),
        ))
    }

    pub fn relays(&self) -> &RelayController {
        &self.relays
    }

    pub fn reader(&self) -> &SensorReader {
        &self.reader
    }

    pub fn camera(&self) -> &CameraStreamer {
        &self.camera
    }

    /// Climate reading with both relay levels.
    pub async fn read_sensor(&self) -> Result<SensorReading> {
        self.reader.read(&self.relays).await
    }

    /// Switch a light given raw route parameters.
    pub async fn set_relay(&self, box_name: &str, action: &str) -> Result<RelayOutcome> {
        self.relays.apply(box_name, action).await
    }

    /// Start the camera if needed and return its frame stream.
    pub async fn video_stream(&self) -> Result<BoxStream<'static, Result<axum::body::Bytes>>> {
        self.camera.initialize().await?;
        Ok(self.camera.frames())
    }

    /// Signal open streams to finish; resources stay up until [`Panel::shutdown`].
    pub fn begin_shutdown(&self) {
        self.camera.begin_shutdown();
    }

    /// Release camera, sensor and relay lines.
    ///
    /// Runs once; later calls return immediately. Safe when the camera
    /// was never started.
    pub async fn shutdown(&self) {
        if self.torn_down.swap(true, Ordering::SeqCst) {
            return;
        }

        info!("Releasing panel hardware");
        if let Err(e) = self.camera.shutdown().await {
            error!("Camera shutdown failed: {}", e);
        }
        self.reader.release().await;
        self.relays.release().await;
    }

    pub fn is_shut_down(&self) -> bool {
        self.torn_down.load(Ordering::SeqCst)
    }
}
