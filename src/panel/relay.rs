//! Relay-switched lights.
//!
//! The relay board is active-low: driving a line low energizes the relay
//! and turns the light on, driving it high turns it off.

use crate::error::{PanelError, Result};
use crate::hardware::{GpioProvider, Level};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Symbolic name of a relay-switched light, as used in URLs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum BoxName {
    LightLeft,
    LightRight,
}

impl BoxName {
    pub const ALL: [BoxName; 2] = [BoxName::LightLeft, BoxName::LightRight];

    pub fn as_str(self) -> &'static str {
        match self {
            BoxName::LightLeft => "lightleft",
            BoxName::LightRight => "lightright",
        }
    }

    /// Physical output line wired to this relay.
    pub fn pin(self) -> u8 {
        match self {
            BoxName::LightLeft => crate::RELAY_LEFT_PIN,
            BoxName::LightRight => crate::RELAY_RIGHT_PIN,
        }
    }
}

impl fmt::Display for BoxName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BoxName {
    type Err = PanelError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "lightleft" => Ok(BoxName::LightLeft),
            "lightright" => Ok(BoxName::LightRight),
            other => Err(PanelError::config_error(format!("unknown box '{}'", other))),
        }
    }
}

/// Requested relay action.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RelayAction {
    On,
    Off,
}

impl RelayAction {
    /// Line level for this action under the active-low wiring.
    pub fn level(self) -> Level {
        match self {
            RelayAction::On => Level::Low,
            RelayAction::Off => Level::High,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RelayAction::On => "on",
            RelayAction::Off => "off",
        }
    }
}

impl FromStr for RelayAction {
    type Err = PanelError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "on" => Ok(RelayAction::On),
            "off" => Ok(RelayAction::Off),
            other => Err(PanelError::config_error(format!(
                "unknown action '{}'",
                other
            ))),
        }
    }
}

/// Result of applying an action given as raw strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    Applied(BoxName, RelayAction),
    UnknownBox,
    UnknownAction,
}

/// Owns the GPIO provider and the two relay lines.
pub struct RelayController {
    gpio: Arc<Mutex<Box<dyn GpioProvider>>>,
}

impl RelayController {
    /// Set up both relay lines, driven high (lights off).
    ///
    /// `open` creates a fresh GPIO provider. If setup fails, the provider is
    /// cleaned up and dropped and setup runs once more on a new provider; a
    /// second failure is returned.
    pub fn initialize<F>(mut open: F) -> Result<Self>
    where
        F: FnMut() -> Result<Box<dyn GpioProvider>>,
    {
        let gpio = match Self::setup_lines(&mut open) {
            Ok(gpio) => gpio,
            Err(first) => {
                error!("GPIO setup failed: {}", first);
                warn!("Reinitializing GPIO and retrying relay setup");
                Self::setup_lines(&mut open).map_err(|second| {
                    PanelError::gpio_error(format!(
                        "relay setup failed twice (first: {}; second: {})",
                        first, second
                    ))
                })?
            }
        };

        info!(
            "Relay lines ready: {} on pin {}, {} on pin {}",
            BoxName::LightLeft,
            BoxName::LightLeft.pin(),
            BoxName::LightRight,
            BoxName::LightRight.pin()
        );

        Ok(Self {
            gpio: Arc::new(Mutex::new(gpio)),
        })
    }

    fn setup_lines<F>(open: &mut F) -> Result<Box<dyn GpioProvider>>
    where
        F: FnMut() -> Result<Box<dyn GpioProvider>>,
    {
        let mut gpio = open()?;
        for name in BoxName::ALL {
            if let Err(e) = gpio.setup_output(name.pin(), RelayAction::Off.level()) {
                gpio.cleanup();
                return Err(e);
            }
        }
        Ok(gpio)
    }

    /// Drive the line for `name` to the level for `action`.
    pub async fn set_relay(&self, name: BoxName, action: RelayAction) -> Result<()> {
        let mut gpio = self.gpio.lock().await;
        gpio.set_output(name.pin(), action.level())?;
        debug!("{} switched {} (pin {})", name, action.as_str(), name.pin());
        Ok(())
    }

    /// Apply an action given as raw route parameters.
    ///
    /// Unknown names or actions leave every line untouched.
    pub async fn apply(&self, box_name: &str, action: &str) -> Result<RelayOutcome> {
        let Ok(name) = box_name.parse::<BoxName>() else {
            debug!("Ignoring action for unknown box '{}'", box_name);
            return Ok(RelayOutcome::UnknownBox);
        };
        let Ok(action) = action.parse::<RelayAction>() else {
            debug!("Ignoring unknown action '{}' for {}", action, name);
            return Ok(RelayOutcome::UnknownAction);
        };

        self.set_relay(name, action).await?;
        Ok(RelayOutcome::Applied(name, action))
    }

    /// Current level of one relay line.
    pub async fn level(&self, name: BoxName) -> Result<Level> {
        self.gpio.lock().await.read_input(name.pin())
    }

    /// Levels of the left and right relay lines.
    pub async fn states(&self) -> Result<(Level, Level)> {
        let mut gpio = self.gpio.lock().await;
        let left = gpio.read_input(BoxName::LightLeft.pin())?;
        let right = gpio.read_input(BoxName::LightRight.pin())?;
        Ok((left, right))
    }

    /// Release both relay lines.
    pub async fn release(&self) {
        self.gpio.lock().await.cleanup();
        debug!("Relay lines released");
    }
}
