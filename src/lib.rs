//! Trapezoidal line tracker for multirotor flat-output commands
pub mod common;
pub mod config;
pub mod control;
pub mod lifecycle;

pub use crate::common::{LineGoal, Odometry, PositionCommand, TrackerStatus, Vec3};
pub use crate::config::{ConfigError, TrackerConfig, YawRateFrame};
pub use crate::control::{FlatState, LineTrackerTrapezoid, TrapezoidalProfile};
pub use crate::lifecycle::Tracker;
