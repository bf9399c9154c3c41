//! Initial-condition cache for consecutive trajectories
//!
//! Holds the last commanded flat output so that a new trajectory starts where
//! the previous command left off rather than at the measured state. Anchoring
//! to odometry would make the command jump whenever the vehicle lags behind it.

use crate::common::{Odometry, PositionCommand, Vec3};
use crate::config::YawRateFrame;

/// Where the cached flat state came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Seed {
    /// Mirrors the latest measurement until a command is committed
    Uninitialized,
    /// Holds the last emitted command; measurements are ignored
    Committed,
}

/// Flat-output state used as the initial condition of the next trajectory
#[derive(Debug, Clone)]
pub struct FlatState {
    pos: Vec3,
    vel: Vec3,
    acc: Vec3,
    jrk: Vec3,
    snp: Vec3,
    yaw: f64,
    yaw_rate: f64,
    yaw_acc: f64,
    seed: Seed,
    yaw_rate_frame: YawRateFrame,
}

impl FlatState {
    pub fn new(yaw_rate_frame: YawRateFrame) -> Self {
        FlatState {
            pos: Vec3::zeros(),
            vel: Vec3::zeros(),
            acc: Vec3::zeros(),
            jrk: Vec3::zeros(),
            snp: Vec3::zeros(),
            yaw: 0.0,
            yaw_rate: 0.0,
            yaw_acc: 0.0,
            seed: Seed::Uninitialized,
            yaw_rate_frame,
        }
    }

    /// Commit an emitted command as the initial condition
    pub fn ingest_command(&mut self, cmd: &PositionCommand) {
        if !cmd.is_finite() {
            tracing::warn!("Non-finite position command received, not setting initial condition");
            return;
        }

        self.pos = cmd.position;
        self.vel = cmd.velocity;
        self.acc = cmd.acceleration;
        self.jrk = cmd.jerk;
        self.snp = cmd.snap;
        self.yaw = cmd.yaw;
        self.yaw_rate = cmd.yaw_rate;
        self.yaw_acc = cmd.yaw_acceleration;
        self.seed = Seed::Committed;
    }

    /// Track the measured state until a command has been committed
    pub fn ingest_measurement(&mut self, odom: &Odometry) {
        match self.seed {
            Seed::Committed => {}
            Seed::Uninitialized => {
                self.pos = odom.position;
                self.vel = odom.linear_velocity;
                self.acc = Vec3::zeros();
                self.jrk = Vec3::zeros();
                self.snp = Vec3::zeros();
                self.yaw = odom.yaw();
                self.yaw_rate = measured_yaw_rate(odom, self.yaw_rate_frame);
                self.yaw_acc = 0.0;
            }
        }
    }

    /// Forget the committed command so the next activation starts from odometry
    pub fn reset(&mut self) {
        self.seed = Seed::Uninitialized;
    }

    /// Whether the cache holds an emitted command rather than odometry
    pub fn is_committed(&self) -> bool {
        self.seed == Seed::Committed
    }

    pub fn position(&self) -> Vec3 {
        self.pos
    }

    pub fn velocity(&self) -> Vec3 {
        self.vel
    }

    pub fn acceleration(&self) -> Vec3 {
        self.acc
    }

    pub fn jerk(&self) -> Vec3 {
        self.jrk
    }

    pub fn snap(&self) -> Vec3 {
        self.snp
    }

    pub fn yaw(&self) -> f64 {
        self.yaw
    }

    pub fn yaw_rate(&self) -> f64 {
        self.yaw_rate
    }

    pub fn yaw_acceleration(&self) -> f64 {
        self.yaw_acc
    }
}

/// Yaw rate implied by the measured angular velocity
fn measured_yaw_rate(odom: &Odometry, frame: YawRateFrame) -> f64 {
    let w = odom.angular_velocity;
    match frame {
        YawRateFrame::World => w.z,
        YawRateFrame::Body => {
            let (roll, pitch, _) = odom.orientation.euler_angles();
            let cos_pitch = pitch.cos();
            // Euler rates are singular at +-90 deg pitch
            if cos_pitch.abs() < 1e-6 {
                return w.z;
            }
            (roll.sin() * w.y + roll.cos() * w.z) / cos_pitch
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::UnitQuaternion;
    use std::time::Duration;

    fn odom(position: Vec3, yaw: f64) -> Odometry {
        let mut odom = Odometry::at_rest(Duration::from_secs(1), position, yaw);
        odom.linear_velocity = Vec3::new(0.3, -0.1, 0.0);
        odom.angular_velocity = Vec3::new(0.0, 0.0, 0.4);
        odom
    }

    #[test]
    fn starts_uninitialized_at_origin() {
        let state = FlatState::new(YawRateFrame::World);
        assert!(!state.is_committed());
        assert_eq!(state.position(), Vec3::zeros());
        assert_eq!(state.yaw(), 0.0);
    }

    #[test]
    fn measurement_seeds_position_velocity_and_yaw() {
        let mut state = FlatState::new(YawRateFrame::World);
        state.ingest_measurement(&odom(Vec3::new(1.0, 2.0, 3.0), 0.7));

        assert_eq!(state.position(), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(state.velocity(), Vec3::new(0.3, -0.1, 0.0));
        assert_eq!(state.acceleration(), Vec3::zeros());
        assert_relative_eq!(state.yaw(), 0.7, epsilon = 1e-12);
        assert_relative_eq!(state.yaw_rate(), 0.4);
        assert!(!state.is_committed());
    }

    #[test]
    fn committed_command_is_not_overwritten_by_measurement() {
        let mut state = FlatState::new(YawRateFrame::World);
        let mut cmd = PositionCommand::hold(Duration::ZERO, "world", Vec3::new(5.0, 0.0, 1.0), 0.2);
        cmd.velocity = Vec3::new(1.0, 0.0, 0.0);
        cmd.acceleration = Vec3::new(0.5, 0.0, 0.0);
        state.ingest_command(&cmd);

        state.ingest_measurement(&odom(Vec3::new(4.0, 0.3, 0.9), 1.1));

        assert!(state.is_committed());
        assert_eq!(state.position(), Vec3::new(5.0, 0.0, 1.0));
        assert_eq!(state.velocity(), Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(state.acceleration(), Vec3::new(0.5, 0.0, 0.0));
        assert_eq!(state.yaw(), 0.2);
        assert_eq!(state.yaw_rate(), 0.0);
    }

    #[test]
    fn reset_lets_measurement_through_again() {
        let mut state = FlatState::new(YawRateFrame::World);
        state.ingest_command(&PositionCommand::hold(
            Duration::ZERO,
            "world",
            Vec3::new(5.0, 0.0, 1.0),
            0.0,
        ));
        state.reset();
        state.ingest_measurement(&odom(Vec3::new(-1.0, 0.0, 0.0), 0.0));

        assert!(!state.is_committed());
        assert_eq!(state.position(), Vec3::new(-1.0, 0.0, 0.0));
    }

    #[test]
    fn non_finite_command_is_ignored() {
        let mut state = FlatState::new(YawRateFrame::World);
        let mut cmd = PositionCommand::hold(Duration::ZERO, "world", Vec3::new(1.0, 1.0, 1.0), 0.0);
        cmd.velocity.x = f64::NAN;
        state.ingest_command(&cmd);

        assert!(!state.is_committed());
        assert_eq!(state.position(), Vec3::zeros());
    }

    #[test]
    fn body_frame_rate_matches_world_when_level() {
        let mut state = FlatState::new(YawRateFrame::Body);
        state.ingest_measurement(&odom(Vec3::zeros(), 0.3));
        assert_relative_eq!(state.yaw_rate(), 0.4, epsilon = 1e-12);
    }

    #[test]
    fn body_frame_rate_accounts_for_roll() {
        let mut state = FlatState::new(YawRateFrame::Body);
        let mut m = odom(Vec3::zeros(), 0.0);
        m.orientation = UnitQuaternion::from_euler_angles(std::f64::consts::FRAC_PI_2, 0.0, 0.0);
        m.angular_velocity = Vec3::new(0.0, 0.8, 0.0);
        state.ingest_measurement(&m);
        assert_relative_eq!(state.yaw_rate(), 0.8, epsilon = 1e-9);
    }
}
