//! Data structures for panel readings.

use crate::hardware::Level;
use serde::{Deserialize, Serialize};

/// Climate reading plus the current relay line levels.
///
/// Produced fresh for every status request and never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    /// Timestamp when this reading was taken (Unix timestamp in milliseconds)
    pub timestamp: u64,
    /// Temperature in degrees Celsius
    pub temperature: f32,
    /// Relative humidity in percent
    pub humidity: f32,
    /// Level of the left light relay line
    pub relay1_state: Level,
    /// Level of the right light relay line
    pub relay2_state: Level,
}

impl SensorReading {
    pub fn new(temperature: f32, humidity: f32, relay1_state: Level, relay2_state: Level) -> Self {
        Self {
            timestamp: chrono::Utc::now().timestamp_millis().max(0) as u64,
            temperature,
            humidity,
            relay1_state,
            relay2_state,
        }
    }

    /// Whether the left light is on. Relays are active-low.
    pub fn left_on(&self) -> bool {
        self.relay1_state.is_low()
    }

    /// Whether the right light is on. Relays are active-low.
    pub fn right_on(&self) -> bool {
        self.relay2_state.is_low()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reading_reports_active_low_lights() {
        let reading = SensorReading::new(21.0, 40.0, Level::Low, Level::High);
        assert!(reading.timestamp > 0);
        assert!(reading.left_on());
        assert!(!reading.right_on());
    }

    #[test]
    fn test_reading_json_field_names() {
        let reading = SensorReading::new(21.0, 40.0, Level::Low, Level::High);
        let json = serde_json::to_value(&reading).unwrap();
        assert_eq!(json["relay1_state"], "LOW");
        assert_eq!(json["relay2_state"], "HIGH");
        assert!(json.get("temperature").is_some());
        assert!(json.get("humidity").is_some());
    }
}
