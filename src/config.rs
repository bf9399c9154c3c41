//! # Line tracker configuration
//!
//! Feedback gains and default cruise limits for the trapezoidal line tracker.
//!
//! ## Example: TOML Configuration
//!
//! ```toml
//! pos_gains = [2.5, 2.5, 5.0]
//! vel_gains = [2.2, 2.2, 4.0]
//! default_cruise_speed = 0.5
//! default_cruise_accel = 0.5
//! goal_tolerance = 0.1
//! yaw_rate_frame = "world"
//! ```
//!
//! Every key is optional; missing keys take the defaults shown above.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Invalid value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Frame in which the measured angular velocity is expressed.
///
/// Decides how yaw rate is derived when the flat state is seeded from odometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum YawRateFrame {
    /// The z component is already the world-frame yaw rate
    #[default]
    World,
    /// Body rates, converted through the ZYX Euler kinematics
    Body,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TrackerConfig {
    #[serde(default = "default_pos_gains")]
    pub pos_gains: [f64; 3],
    #[serde(default = "default_vel_gains")]
    pub vel_gains: [f64; 3],
    #[serde(default = "default_cruise_speed")]
    pub default_cruise_speed: f64,
    #[serde(default = "default_cruise_accel")]
    pub default_cruise_accel: f64,
    #[serde(default = "default_goal_tolerance")]
    pub goal_tolerance: f64,
    #[serde(default)]
    pub yaw_rate_frame: YawRateFrame,
}

fn default_pos_gains() -> [f64; 3] {
    [2.5, 2.5, 5.0]
}
fn default_vel_gains() -> [f64; 3] {
    [2.2, 2.2, 4.0]
}
fn default_cruise_speed() -> f64 {
    0.5
}
fn default_cruise_accel() -> f64 {
    0.5
}
fn default_goal_tolerance() -> f64 {
    0.1
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            pos_gains: default_pos_gains(),
            vel_gains: default_vel_gains(),
            default_cruise_speed: default_cruise_speed(),
            default_cruise_accel: default_cruise_accel(),
            goal_tolerance: default_goal_tolerance(),
            yaw_rate_frame: YawRateFrame::default(),
        }
    }
}

impl TrackerConfig {
    /// Parse a configuration from TOML text and validate it
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: TrackerConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Check that the cruise defaults can plan a profile
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("default_cruise_speed", self.default_cruise_speed)?;
        positive("default_cruise_accel", self.default_cruise_accel)?;
        if !(self.goal_tolerance.is_finite() && self.goal_tolerance >= 0.0) {
            return Err(ConfigError::Invalid {
                field: "goal_tolerance",
                reason: format!("expected a non-negative number, got {}", self.goal_tolerance),
            });
        }
        let gains_finite = self
            .pos_gains
            .iter()
            .chain(self.vel_gains.iter())
            .all(|k| k.is_finite());
        if !gains_finite {
            return Err(ConfigError::Invalid {
                field: "gains",
                reason: "feedback gains must be finite".to_string(),
            });
        }
        Ok(())
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: format!("expected a positive number, got {}", value),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config = TrackerConfig::from_toml_str("").unwrap();
        assert_eq!(config, TrackerConfig::default());
        assert_eq!(config.pos_gains, [2.5, 2.5, 5.0]);
        assert_eq!(config.yaw_rate_frame, YawRateFrame::World);
    }

    #[test]
    fn partial_file_overrides_given_keys() {
        let config = TrackerConfig::from_toml_str(
            "default_cruise_speed = 2.0\nyaw_rate_frame = \"body\"\n",
        )
        .unwrap();
        assert_eq!(config.default_cruise_speed, 2.0);
        assert_eq!(config.default_cruise_accel, 0.5);
        assert_eq!(config.yaw_rate_frame, YawRateFrame::Body);
    }

    #[test]
    fn rejects_non_positive_cruise_accel() {
        let err = TrackerConfig::from_toml_str("default_cruise_accel = 0.0").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid { field: "default_cruise_accel", .. }
        ));
    }

    #[test]
    fn rejects_malformed_toml() {
        let err = TrackerConfig::from_toml_str("pos_gains = \"fast\"").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }
}
