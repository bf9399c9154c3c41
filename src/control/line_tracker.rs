//! Line tracker following a trapezoidal speed profile
//!
//! Flies a straight line from the current flat state to the goal. Every
//! emitted command is fed back into the [`FlatState`], so a goal arriving
//! mid-flight replans from the command stream instead of from odometry.

use super::flat_state::FlatState;
use super::trajectory::TrapezoidalProfile;
use crate::common::{LineGoal, Odometry, PositionCommand, TrackerStatus, Vec3};
use crate::config::{ConfigError, TrackerConfig};
use crate::lifecycle::Tracker;
use std::time::Duration;

/// Goal waiting for the next tick to be planned
#[derive(Debug, Clone, Copy, PartialEq)]
struct PendingGoal {
    target: Vec3,
    cruise_speed: f64,
    cruise_accel: f64,
}

#[derive(Debug, Clone, Copy)]
enum Mode {
    /// No goal
    Idle,
    /// Goal received, profile not yet planned
    Planned(PendingGoal),
    /// Executing a profile stamped at `start`
    Tracking {
        profile: TrapezoidalProfile,
        start: Duration,
    },
    /// Holding the goal after the profile finished
    Reached { goal: Vec3, yaw: f64 },
}

/// Measured pose from the latest odometry
#[derive(Debug, Clone, Copy, PartialEq)]
struct Pose {
    position: Vec3,
    yaw: f64,
}

/// Trapezoidal line tracker
#[derive(Debug)]
pub struct LineTrackerTrapezoid {
    config: TrackerConfig,
    flat_state: FlatState,
    mode: Mode,
    active: bool,
    measured: Option<Pose>,
    activation_pose: Option<Pose>,
}

impl LineTrackerTrapezoid {
    /// Create a tracker with the given configuration
    pub fn new(config: TrackerConfig) -> Self {
        LineTrackerTrapezoid {
            flat_state: FlatState::new(config.yaw_rate_frame),
            config,
            mode: Mode::Idle,
            active: false,
            measured: None,
            activation_pose: None,
        }
    }

    /// Accept a new goal, superseding any goal in flight.
    ///
    /// Takes effect on the next call to `update`.
    pub fn on_goal(&mut self, goal: &LineGoal) {
        let offset = goal.offset();
        if !offset.iter().all(|c| c.is_finite()) {
            tracing::warn!("Ignoring line goal with non-finite target {:?}", offset);
            return;
        }

        let target = if goal.relative {
            offset + self.flat_state.position()
        } else {
            offset
        };
        let cruise_speed = usable_limit(goal.v_des, self.config.default_cruise_speed);
        let cruise_accel = usable_limit(goal.a_des, self.config.default_cruise_accel);

        tracing::info!(
            "Line goal ({:.3}, {:.3}, {:.3}) v_des={} a_des={}",
            target.x,
            target.y,
            target.z,
            cruise_speed,
            cruise_accel
        );

        self.mode = Mode::Planned(PendingGoal {
            target,
            cruise_speed,
            cruise_accel,
        });
    }

    /// Whether the host has activated this tracker
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// The cached initial condition for the next profile
    pub fn flat_state(&self) -> &FlatState {
        &self.flat_state
    }

    /// Target of the current goal, if one has been received
    pub fn goal(&self) -> Option<Vec3> {
        match &self.mode {
            Mode::Idle => None,
            Mode::Planned(pending) => Some(pending.target),
            Mode::Tracking { profile, .. } => Some(profile.goal()),
            Mode::Reached { goal, .. } => Some(*goal),
        }
    }

    /// Measured position and yaw cached when the tracker was last activated
    pub fn activation_pose(&self) -> Option<(Vec3, f64)> {
        self.activation_pose.map(|p| (p.position, p.yaw))
    }

    fn command(&self, odom: &Odometry, position: Vec3, yaw: f64) -> PositionCommand {
        let mut cmd = PositionCommand::hold(odom.stamp, &odom.frame_id, position, yaw);
        cmd.kx = self.config.pos_gains;
        cmd.kv = self.config.vel_gains;
        cmd
    }

    fn elapsed(now: Duration, start: Duration) -> f64 {
        match now.checked_sub(start) {
            Some(dt) => dt.as_secs_f64(),
            None => {
                tracing::warn!(
                    "Measurement stamp {:?} precedes trajectory start {:?}",
                    now,
                    start
                );
                0.0
            }
        }
    }

    fn check_arrival(&self, goal: Vec3) {
        if let Some(measured) = self.measured {
            let error = (measured.position - goal).norm();
            if error > self.config.goal_tolerance {
                tracing::warn!(
                    "Trajectory finished {:.3} m from goal (tolerance {:.3} m)",
                    error,
                    self.config.goal_tolerance
                );
            }
        }
    }
}

/// Goal-supplied limit if it is a finite positive number, else the default
fn usable_limit(requested: f64, default: f64) -> f64 {
    if requested.is_finite() && requested > 0.0 {
        requested
    } else {
        default
    }
}

impl Tracker for LineTrackerTrapezoid {
    fn initialize(&mut self, config: &TrackerConfig) -> Result<(), ConfigError> {
        config.validate()?;
        self.config = config.clone();
        self.flat_state = FlatState::new(config.yaw_rate_frame);
        tracing::info!(
            "Initialized {} with default v_des={} a_des={}",
            self.name(),
            config.default_cruise_speed,
            config.default_cruise_accel
        );
        Ok(())
    }

    fn activate(&mut self, seed: Option<&PositionCommand>) -> bool {
        let goal_pending = matches!(self.mode, Mode::Planned(_));
        match self.measured {
            Some(pose) if goal_pending => {
                if let Some(cmd) = seed {
                    tracing::debug!("Previous tracker last commanded {:?}", cmd.position);
                }
                self.activation_pose = Some(pose);
                self.active = true;
                tracing::info!("Activated {}", self.name());
            }
            _ => {
                tracing::debug!(
                    "Refusing activation: goal pending={} measurement seen={}",
                    goal_pending,
                    self.measured.is_some()
                );
            }
        }
        self.active
    }

    fn deactivate(&mut self) {
        self.flat_state.reset();
        self.mode = Mode::Idle;
        self.active = false;
        tracing::info!("Deactivated {}", self.name());
    }

    fn update(&mut self, odom: &Odometry) -> Option<PositionCommand> {
        if !odom.is_finite() {
            tracing::warn!("Ignoring non-finite odometry at {:?}", odom.stamp);
            return None;
        }

        self.measured = Some(Pose {
            position: odom.position,
            yaw: odom.yaw(),
        });
        self.flat_state.ingest_measurement(odom);

        if !self.active {
            return None;
        }

        let (profile, start) = match &self.mode {
            Mode::Idle => return None,
            Mode::Planned(pending) => {
                let profile = TrapezoidalProfile::plan(
                    self.flat_state.position(),
                    pending.target,
                    self.flat_state.yaw(),
                    pending.cruise_speed,
                    pending.cruise_accel,
                );
                (profile, odom.stamp)
            }
            Mode::Tracking { profile, start } => (*profile, *start),
            Mode::Reached { goal, yaw } => {
                let cmd = self.command(odom, *goal, *yaw);
                self.flat_state.ingest_command(&cmd);
                return Some(cmd);
            }
        };

        let sample = profile.sample(Self::elapsed(odom.stamp, start));

        let mut cmd = self.command(odom, sample.position, profile.yaw());
        cmd.velocity = sample.velocity;
        cmd.acceleration = sample.acceleration;

        if !cmd.is_finite() {
            tracing::warn!("Dropping non-finite command at {:?}", odom.stamp);
            return None;
        }

        if sample.is_complete() {
            tracing::info!("Reached goal {:?}", profile.goal());
            self.check_arrival(profile.goal());
            self.mode = Mode::Reached {
                goal: profile.goal(),
                yaw: profile.yaw(),
            };
        } else {
            self.mode = Mode::Tracking { profile, start };
        }

        self.flat_state.ingest_command(&cmd);
        Some(cmd)
    }

    fn status(&self) -> Option<TrackerStatus> {
        if !self.active {
            return None;
        }
        match self.mode {
            Mode::Reached { .. } => Some(TrackerStatus::Succeeded),
            _ => Some(TrackerStatus::Active),
        }
    }

    fn name(&self) -> &str {
        "LineTrackerTrapezoid"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn odom_at(secs: f64, position: Vec3) -> Odometry {
        Odometry::at_rest(Duration::from_secs_f64(secs), position, 0.0)
    }

    #[test]
    fn refuses_activation_without_goal() {
        let mut tracker = LineTrackerTrapezoid::new(TrackerConfig::default());
        tracker.update(&odom_at(0.0, Vec3::zeros()));
        assert!(!tracker.activate(None));
        assert_eq!(tracker.status(), None);
    }

    #[test]
    fn refuses_activation_without_measurement() {
        let mut tracker = LineTrackerTrapezoid::new(TrackerConfig::default());
        tracker.on_goal(&LineGoal::absolute(1.0, 0.0, 0.0));
        assert!(!tracker.activate(None));
    }

    #[test]
    fn activation_caches_measured_pose() {
        let mut tracker = LineTrackerTrapezoid::new(TrackerConfig::default());
        tracker.on_goal(&LineGoal::absolute(1.0, 0.0, 0.0));
        tracker.update(&odom_at(0.0, Vec3::new(0.2, 0.1, 1.0)));
        assert!(tracker.activate(None));
        assert_eq!(tracker.activation_pose(), Some((Vec3::new(0.2, 0.1, 1.0), 0.0)));
        assert_eq!(tracker.status(), Some(TrackerStatus::Active));
    }

    #[test]
    fn inactive_tracker_emits_nothing() {
        let mut tracker = LineTrackerTrapezoid::new(TrackerConfig::default());
        tracker.on_goal(&LineGoal::absolute(1.0, 0.0, 0.0));
        assert!(tracker.update(&odom_at(0.0, Vec3::zeros())).is_none());
    }

    #[test]
    fn goal_limits_fall_back_to_defaults() {
        let config = TrackerConfig {
            default_cruise_speed: 2.0,
            default_cruise_accel: 1.0,
            ..TrackerConfig::default()
        };
        let mut tracker = LineTrackerTrapezoid::new(config);
        tracker.update(&odom_at(0.0, Vec3::zeros()));
        tracker.on_goal(&LineGoal::absolute(10.0, 0.0, 0.0).with_limits(-1.0, f64::NAN));
        assert!(tracker.activate(None));
        tracker.update(&odom_at(0.0, Vec3::zeros()));

        let cmd = tracker.update(&odom_at(3.0, Vec3::zeros())).unwrap();
        assert_relative_eq!(cmd.velocity, Vec3::new(2.0, 0.0, 0.0));
    }

    #[test]
    fn non_finite_goal_is_ignored() {
        let mut tracker = LineTrackerTrapezoid::new(TrackerConfig::default());
        tracker.on_goal(&LineGoal::absolute(f64::INFINITY, 0.0, 0.0));
        assert_eq!(tracker.goal(), None);
    }

    #[test]
    fn infinite_goal_limits_fall_back_to_defaults() {
        let mut tracker = LineTrackerTrapezoid::new(TrackerConfig::default());
        tracker.update(&odom_at(0.0, Vec3::zeros()));
        tracker.on_goal(
            &LineGoal::absolute(1.0, 0.0, 0.0).with_limits(f64::INFINITY, f64::INFINITY),
        );
        assert!(tracker.activate(None));

        let cmd = tracker.update(&odom_at(0.0, Vec3::zeros())).unwrap();
        assert!(cmd.is_finite());
        assert_eq!(cmd.position, Vec3::zeros());
        assert_relative_eq!(cmd.acceleration, Vec3::new(0.5, 0.0, 0.0));
        assert!(tracker.flat_state().is_committed());

        let cmd = tracker.update(&odom_at(1.0, Vec3::zeros())).unwrap();
        assert_relative_eq!(cmd.velocity, Vec3::new(0.5, 0.0, 0.0));
    }

    #[test]
    fn non_finite_odometry_is_ignored() {
        let mut tracker = LineTrackerTrapezoid::new(TrackerConfig::default());
        let mut odom = odom_at(0.0, Vec3::zeros());
        odom.position.y = f64::NAN;
        tracker.on_goal(&LineGoal::absolute(1.0, 0.0, 0.0));
        assert!(tracker.update(&odom).is_none());
        assert!(!tracker.activate(None));
    }

    #[test]
    fn command_carries_gains_and_frame() {
        let mut tracker = LineTrackerTrapezoid::new(TrackerConfig::default());
        tracker.on_goal(&LineGoal::absolute(1.0, 0.0, 0.0));
        let mut odom = odom_at(0.0, Vec3::zeros());
        odom.frame_id = "odom".to_string();
        tracker.update(&odom);
        tracker.activate(None);

        let cmd = tracker.update(&odom).unwrap();
        assert_eq!(cmd.frame_id, "odom");
        assert_eq!(cmd.kx, [2.5, 2.5, 5.0]);
        assert_eq!(cmd.kv, [2.2, 2.2, 4.0]);
        assert_eq!(cmd.yaw_rate, 0.0);
    }

    #[test]
    fn stamp_before_start_evaluates_at_start() {
        let mut tracker = LineTrackerTrapezoid::new(TrackerConfig::default());
        tracker.on_goal(&LineGoal::absolute(1.0, 0.0, 0.0));
        tracker.update(&odom_at(5.0, Vec3::zeros()));
        tracker.activate(None);
        tracker.update(&odom_at(5.0, Vec3::zeros()));

        let cmd = tracker.update(&odom_at(4.0, Vec3::zeros())).unwrap();
        assert_eq!(cmd.position, Vec3::zeros());
        assert_eq!(cmd.velocity, Vec3::zeros());
    }

    #[test]
    fn initialize_rejects_invalid_config() {
        let mut tracker = LineTrackerTrapezoid::new(TrackerConfig::default());
        let bad = TrackerConfig {
            default_cruise_speed: 0.0,
            ..TrackerConfig::default()
        };
        assert!(tracker.initialize(&bad).is_err());
        assert!(tracker.initialize(&TrackerConfig::default()).is_ok());
    }
}
