//! Polling the climate sensor until it produces a valid reading.
//!
//! DHT-class sensors regularly fail a read. Recoverable failures are
//! retried after a fixed pause; any other failure is returned at once.

use crate::error::{PanelError, Result, SensorError};
use crate::hardware::HumiditySensor;
use crate::panel::{data::SensorReading, relay::RelayController};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Retry behaviour for sensor reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorRetryPolicy {
    /// Pause after each recoverable failure.
    pub interval: Duration,

    /// Total attempts before giving up; `None` retries until success.
    pub max_attempts: Option<u32>,
}

impl Default for SensorRetryPolicy {
    /// 2s pause, retrying until the sensor answers.
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(crate::SENSOR_RETRY_INTERVAL_MS),
            max_attempts: None,
        }
    }
}

impl SensorRetryPolicy {
    /// Give up with [`PanelError::SensorTimeout`] after `max_attempts` reads.
    pub fn with_max_attempts(mut self, max_attempts: Option<u32>) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

/// Owns the climate sensor.
pub struct SensorReader {
    sensor: Arc<Mutex<Box<dyn HumiditySensor>>>,
    policy: SensorRetryPolicy,
}

impl SensorReader {
    pub fn new(sensor: Box<dyn HumiditySensor>, policy: SensorRetryPolicy) -> Self {
        Self {
            sensor: Arc::new(Mutex::new(sensor)),
            policy,
        }
    }

    pub fn policy(&self) -> &SensorRetryPolicy {
        &self.policy
    }

    /// Read temperature and humidity, retrying recoverable failures, and
    /// combine them with the current relay levels.
    pub async fn read(&self, relays: &RelayController) -> Result<SensorReading> {
        let mut attempts = 0u32;

        loop {
            attempts += 1;

            match self.read_climate().await? {
                Ok((temperature, humidity)) => {
                    let (relay1, relay2) = relays.states().await?;
                    if attempts > 1 {
                        debug!("Sensor answered after {} attempts", attempts);
                    }
                    return Ok(SensorReading::new(temperature, humidity, relay1, relay2));
                }
                Err(e) if e.is_recoverable() => {
                    if matches!(self.policy.max_attempts, Some(max) if attempts >= max) {
                        warn!("Sensor still failing after {} attempts: {}", attempts, e);
                        return Err(PanelError::SensorTimeout { attempts });
                    }
                    debug!(
                        "Sensor read attempt {} failed: {}. Retrying in {:?}",
                        attempts, e, self.policy.interval
                    );
                    sleep(self.policy.interval).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// One physical read on the blocking pool.
    ///
    /// The outer error is a failed task, the inner one a sensor fault.
    async fn read_climate(
        &self,
    ) -> Result<std::result::Result<(f32, f32), SensorError>> {
        let sensor = Arc::clone(&self.sensor);
        tokio::task::spawn_blocking(move || {
            let measurement = sensor.blocking_lock().read()?;
            Ok::<_, SensorError>((measurement.temperature, measurement.humidity))
        })
        .await
        .map_err(|e| PanelError::system_error(format!("Sensor task failed: {}", e)))
    }

    /// Release the sensor's data pin.
    pub async fn release(&self) {
        self.sensor.lock().await.release();
        debug!("Sensor released");
    }
}
