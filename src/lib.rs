//! # Boxpanel - Raspberry Pi Home-Automation Panel
//!
//! A small web control panel for a Raspberry Pi: two relay-switched lights,
//! a DHT22 temperature/humidity sensor and a live camera feed.
//!
//! ## Features
//!
//! - **Light switching**: `/lightleft/on`, `/lightright/off`, ... on active-low relays
//! - **Climate readings**: DHT22 reads retried until the sensor answers
//! - **Live video**: MJPEG stream served as `multipart/x-mixed-replace`
//! - **Hardware optional**: without the `gpio`/`rpicam` features the panel
//!   runs on in-memory devices
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use boxpanel::{start_web_server, Panel, SensorRetryPolicy, WebConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let panel = Panel::with_default_hardware(SensorRetryPolicy::default())?;
//!
//!     // Serve on 0.0.0.0:5000 until Ctrl-C
//!     start_web_server(WebConfig::default(), Arc::new(panel)).await?;
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod hardware;
pub mod panel;
pub mod web;

// Re-export public API
pub use error::{PanelError, Result, SensorError};
pub use hardware::{CameraConfig, CameraDevice, GpioProvider, HumiditySensor, Level};
pub use panel::{
    BoxName, CameraState, Panel, RelayAction, RelayOutcome, SensorReading, SensorRetryPolicy,
};
pub use web::{serve_until, start_web_server, WebConfig};

/// BCM pin driving the left light relay
pub const RELAY_LEFT_PIN: u8 = 23;

/// BCM pin driving the right light relay
pub const RELAY_RIGHT_PIN: u8 = 24;

/// BCM pin wired to the DHT22 data line (board pin D4)
pub const SENSOR_DATA_PIN: u8 = 4;

/// The default web server port
pub const DEFAULT_WEB_PORT: u16 = 5000;

/// Pause between sensor read attempts in milliseconds
pub const SENSOR_RETRY_INTERVAL_MS: u64 = 2000;

/// Camera capture width in pixels
pub const CAMERA_WIDTH: u32 = 1024;

/// Camera capture height in pixels
pub const CAMERA_HEIGHT: u32 = 768;

/// Camera capture program used by the `rpicam` backend
pub const RPICAM_PROGRAM: &str = "rpicam-vid";
