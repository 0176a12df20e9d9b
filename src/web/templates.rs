//! HTML pages rendered with askama.
//!
//! Template sources live in `templates/` at the crate root.

use crate::hardware::CameraConfig;
use crate::panel::{BoxName, SensorReading};
use askama::Template;

/// Status page with the live feed and light switches.
#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate<'a> {
    pub reading: &'a SensorReading,
    pub left: &'static str,
    pub right: &'static str,
}

impl<'a> IndexTemplate<'a> {
    pub fn new(reading: &'a SensorReading) -> Self {
        Self {
            reading,
            left: BoxName::LightLeft.as_str(),
            right: BoxName::LightRight.as_str(),
        }
    }
}

/// Read-only view of the wiring.
#[derive(Template)]
#[template(path = "config.html")]
pub struct ConfigTemplate {
    pub left_pin: u8,
    pub right_pin: u8,
    pub sensor_pin: u8,
    pub width: u32,
    pub height: u32,
    pub hflip: bool,
    pub vflip: bool,
    pub retry_interval_ms: u64,
}

impl ConfigTemplate {
    pub fn new(camera: &CameraConfig) -> Self {
        Self {
            left_pin: BoxName::LightLeft.pin(),
            right_pin: BoxName::LightRight.pin(),
            sensor_pin: crate::SENSOR_DATA_PIN,
            width: camera.resolution.width,
            height: camera.resolution.height,
            hflip: camera.transform.hflip,
            vflip: camera.transform.vflip,
            retry_interval_ms: crate::SENSOR_RETRY_INTERVAL_MS,
        }
    }
}

#[derive(Template, Default)]
#[template(path = "help.html")]
pub struct HelpTemplate;
