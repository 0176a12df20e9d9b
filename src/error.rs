//! Error handling for the boxpanel crate.

/// A specialized `Result` type for panel operations.
pub type Result<T> = std::result::Result<T, PanelError>;

/// The main error type for panel operations.
#[derive(Debug, thiserror::Error)]
pub enum PanelError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// GPIO operation failed
    #[error("GPIO error: {0}")]
    Gpio(String),

    /// Sensor read failed with an error the retry loop does not absorb
    #[error("Sensor error: {0}")]
    Sensor(#[from] SensorError),

    /// Sensor produced no valid reading within the retry bound
    #[error("Sensor gave no valid reading after {attempts} attempts")]
    SensorTimeout { attempts: u32 },

    /// Camera operation failed
    #[error("Camera error: {0}")]
    Camera(String),

    /// Camera has been torn down and cannot be started again
    #[error("Camera has been stopped")]
    CameraStopped,

    /// A frame was requested before the camera was initialized
    #[error("Camera is not active")]
    CameraNotActive,

    /// Web server error
    #[error("Web server error: {0}")]
    WebServer(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Page rendering failed
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),

    /// Generic system error
    #[error("System error: {0}")]
    System(String),
}

impl PanelError {
    /// Create a new GPIO error
    pub fn gpio_error(msg: impl Into<String>) -> Self {
        Self::Gpio(msg.into())
    }

    /// Create a new camera error
    pub fn camera_error(msg: impl Into<String>) -> Self {
        Self::Camera(msg.into())
    }

    /// Create a new web server error
    pub fn web_server_error(msg: impl Into<String>) -> Self {
        Self::WebServer(msg.into())
    }

    /// Create a new configuration error
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new generic system error
    pub fn system_error(msg: impl Into<String>) -> Self {
        Self::System(msg.into())
    }
}

#[cfg(feature = "gpio")]
impl From<rppal::gpio::Error> for PanelError {
    fn from(err: rppal::gpio::Error) -> Self {
        Self::Gpio(err.to_string())
    }
}

/// Failures reported by a humidity/temperature sensor.
///
/// DHT-class sensors fail often: the single-wire protocol is timing
/// sensitive and a preempted read loses edges. Those faults are
/// recoverable and a later read usually succeeds; see
/// [`SensorError::is_recoverable`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SensorError {
    /// No response from the sensor at all
    #[error("sensor not found, check wiring")]
    NotFound,

    /// Fewer edges were captured than a full frame needs
    #[error("incomplete frame: captured {0} pulses")]
    IncompleteFrame(usize),

    /// Frame arrived but the checksum byte did not match
    #[error("checksum mismatch: expected {expected:#04x}, got {actual:#04x}")]
    Checksum { expected: u8, actual: u8 },

    /// The data pin could not be driven or read
    #[error("sensor hardware error: {0}")]
    Hardware(String),

    /// The sensor has already been released
    #[error("sensor has been released")]
    Released,
}

impl SensorError {
    /// Whether a retry after a short pause is expected to succeed.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::NotFound | Self::IncompleteFrame(_) | Self::Checksum { .. }
        )
    }
}
