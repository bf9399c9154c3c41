//! Lifecycle interface between trajectory trackers and the host control loop

use crate::common::{Odometry, PositionCommand, TrackerStatus};
use crate::config::{ConfigError, TrackerConfig};

/// Trait for trajectory trackers driven by a periodic host loop.
///
/// The host serializes every call; implementations never see two callbacks
/// at once.
pub trait Tracker: Send {
    /// Load gains and defaults before the first activation
    fn initialize(&mut self, config: &TrackerConfig) -> Result<(), ConfigError>;

    /// Become the active tracker. Returns whether activation was accepted.
    ///
    /// `seed` is the last command of the previously active tracker, if any.
    fn activate(&mut self, seed: Option<&PositionCommand>) -> bool;

    /// Hand control back to the host
    fn deactivate(&mut self);

    /// Process one measurement and produce this tick's command
    fn update(&mut self, odom: &Odometry) -> Option<PositionCommand>;

    /// Progress of the current goal, `None` while inactive
    fn status(&self) -> Option<TrackerStatus>;

    /// Get the name of this tracker
    fn name(&self) -> &str;
}
