use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{NavError, NavResult};

pub const DEFAULT_PREPARE_DISTANCE_M: f64 = 30.0;
pub const DEFAULT_TURN_DISTANCE_M: f64 = 15.0;
/// Out-of-band value, distinct from every maneuver sign
pub const DEFAULT_PREPARE_SIGNAL: i32 = 99;

/// Navigation thresholds and peripheral signal values
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavConfig {
    /// Below this distance the walker gets the advance warning
    pub prepare_distance_m: f64,
    /// Below this distance the maneuver is executed and the route advances
    pub turn_distance_m: f64,
    pub prepare_signal: i32,
    /// Sent by the tracker when a route starts. Off unless set.
    pub start_signal: Option<i32>,
}

impl Default for NavConfig {
    fn default() -> Self {
        Self {
            prepare_distance_m: DEFAULT_PREPARE_DISTANCE_M,
            turn_distance_m: DEFAULT_TURN_DISTANCE_M,
            prepare_signal: DEFAULT_PREPARE_SIGNAL,
            start_signal: None,
        }
    }
}

impl NavConfig {
    /// Load from a JSON file; missing fields take their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> NavResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            NavError::InvalidConfig(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: NavConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> NavResult<()> {
        for (name, value) in [
            ("prepare_distance_m", self.prepare_distance_m),
            ("turn_distance_m", self.turn_distance_m),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(NavError::InvalidConfig(format!(
                    "{} must be a positive distance, got {}",
                    name, value
                )));
            }
        }

        if self.turn_distance_m >= self.prepare_distance_m {
            return Err(NavError::InvalidConfig(format!(
                "turn_distance_m ({}) must be below prepare_distance_m ({})",
                self.turn_distance_m, self.prepare_distance_m
            )));
        }

        let signals = std::iter::once(("prepare_signal", self.prepare_signal))
            .chain(self.start_signal.map(|s| ("start_signal", s)));
        for (name, value) in signals {
            if i8::try_from(value).is_err() {
                return Err(NavError::InvalidConfig(format!(
                    "{} {} does not fit in one signed byte",
                    name, value
                )));
            }
        }

        Ok(())
    }
}
