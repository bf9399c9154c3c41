//! Common message types exchanged with the host control loop

use nalgebra::{UnitQuaternion, Vector3};
use std::time::Duration;

/// A 3D vector in the world frame
pub type Vec3 = Vector3<f64>;

/// State measurement delivered once per control tick
#[derive(Debug, Clone, PartialEq)]
pub struct Odometry {
    /// Monotonic timestamp of the measurement
    pub stamp: Duration,
    pub frame_id: String,
    pub position: Vec3,
    pub orientation: UnitQuaternion<f64>,
    /// Linear velocity in the world frame
    pub linear_velocity: Vec3,
    pub angular_velocity: Vec3,
}

impl Odometry {
    /// Create a measurement at rest with the given pose
    pub fn at_rest(stamp: Duration, position: Vec3, yaw: f64) -> Self {
        Odometry {
            stamp,
            frame_id: "world".to_string(),
            position,
            orientation: UnitQuaternion::from_euler_angles(0.0, 0.0, yaw),
            linear_velocity: Vec3::zeros(),
            angular_velocity: Vec3::zeros(),
        }
    }

    /// Heading about the vertical axis
    pub fn yaw(&self) -> f64 {
        self.orientation.euler_angles().2
    }

    /// Whether every numeric field is usable
    pub fn is_finite(&self) -> bool {
        all_finite(&self.position)
            && all_finite(&self.linear_velocity)
            && all_finite(&self.angular_velocity)
            && self.orientation.coords.iter().all(|c| c.is_finite())
    }
}

/// Flat-output command emitted to the position controller
#[derive(Debug, Clone, PartialEq)]
pub struct PositionCommand {
    pub stamp: Duration,
    pub frame_id: String,
    pub position: Vec3,
    pub velocity: Vec3,
    pub acceleration: Vec3,
    pub jerk: Vec3,
    pub snap: Vec3,
    pub yaw: f64,
    pub yaw_rate: f64,
    pub yaw_acceleration: f64,
    /// Position feedback gains per axis
    pub kx: [f64; 3],
    /// Velocity feedback gains per axis
    pub kv: [f64; 3],
}

impl PositionCommand {
    /// A command holding `position` with every derivative zeroed
    pub fn hold(stamp: Duration, frame_id: &str, position: Vec3, yaw: f64) -> Self {
        PositionCommand {
            stamp,
            frame_id: frame_id.to_string(),
            position,
            velocity: Vec3::zeros(),
            acceleration: Vec3::zeros(),
            jerk: Vec3::zeros(),
            snap: Vec3::zeros(),
            yaw,
            yaw_rate: 0.0,
            yaw_acceleration: 0.0,
            kx: [0.0; 3],
            kv: [0.0; 3],
        }
    }

    pub fn is_finite(&self) -> bool {
        all_finite(&self.position)
            && all_finite(&self.velocity)
            && all_finite(&self.acceleration)
            && all_finite(&self.jerk)
            && all_finite(&self.snap)
            && self.yaw.is_finite()
            && self.yaw_rate.is_finite()
            && self.yaw_acceleration.is_finite()
    }
}

/// Goal request for the line tracker
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineGoal {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Offset from the current flat position instead of an absolute target
    pub relative: bool,
    /// Cruise speed, non-positive selects the configured default
    pub v_des: f64,
    /// Cruise acceleration, non-positive selects the configured default
    pub a_des: f64,
}

impl LineGoal {
    /// Absolute goal using the configured cruise limits
    pub fn absolute(x: f64, y: f64, z: f64) -> Self {
        LineGoal {
            x,
            y,
            z,
            relative: false,
            v_des: 0.0,
            a_des: 0.0,
        }
    }

    /// Relative goal using the configured cruise limits
    pub fn relative(x: f64, y: f64, z: f64) -> Self {
        LineGoal {
            relative: true,
            ..LineGoal::absolute(x, y, z)
        }
    }

    /// Override the cruise speed and acceleration
    pub fn with_limits(mut self, v_des: f64, a_des: f64) -> Self {
        self.v_des = v_des;
        self.a_des = a_des;
        self
    }

    pub fn offset(&self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }
}

/// Progress reported to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerStatus {
    Active,
    Succeeded,
}

fn all_finite(v: &Vec3) -> bool {
    v.iter().all(|c| c.is_finite())
}
