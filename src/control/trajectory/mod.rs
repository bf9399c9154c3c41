//! Trajectory generation module
//!
//! Straight-line trapezoidal speed profiles: constant acceleration up to the
//! cruise speed, constant speed, then constant deceleration onto the goal.
//! Short moves that cannot reach the cruise speed degenerate to a triangular
//! profile with no cruise phase.

use crate::common::Vec3;

/// Segment of the profile a sample falls in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Accelerate,
    Cruise,
    Decelerate,
    /// Past the end of the profile, holding the goal
    Complete,
}

/// Kinematic state of the profile at one instant
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfileSample {
    pub position: Vec3,
    pub velocity: Vec3,
    pub acceleration: Vec3,
    pub phase: Phase,
}

impl ProfileSample {
    pub fn is_complete(&self) -> bool {
        self.phase == Phase::Complete
    }
}

/// A planned trapezoidal move from `start` to `goal`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrapezoidalProfile {
    start: Vec3,
    goal: Vec3,
    yaw: f64,
    direction: Vec3,
    distance: f64,
    accel: f64,
    t_accel: f64,
    t_const: f64,
}

impl TrapezoidalProfile {
    /// Plan a profile with the given cruise speed and acceleration magnitude.
    ///
    /// Both limits must be positive. Yaw is held at `yaw` for the whole move.
    pub fn plan(start: Vec3, goal: Vec3, yaw: f64, cruise_speed: f64, cruise_accel: f64) -> Self {
        debug_assert!(cruise_speed > 0.0 && cruise_accel > 0.0);

        let delta = goal - start;
        let distance = delta.norm();
        let direction = if distance > 0.0 {
            delta / distance
        } else {
            Vec3::zeros()
        };

        let (t_accel, t_const) = if distance > cruise_speed * cruise_speed / cruise_accel {
            (
                cruise_speed / cruise_accel,
                distance / cruise_speed - cruise_speed / cruise_accel,
            )
        } else {
            ((distance / cruise_accel).sqrt(), 0.0)
        };

        tracing::debug!(
            "Planned {:.3} m move: t_accel={:.3}s t_const={:.3}s",
            distance,
            t_accel,
            t_const
        );

        TrapezoidalProfile {
            start,
            goal,
            yaw,
            direction,
            distance,
            accel: cruise_accel,
            t_accel,
            t_const,
        }
    }

    pub fn start(&self) -> Vec3 {
        self.start
    }

    pub fn goal(&self) -> Vec3 {
        self.goal
    }

    pub fn yaw(&self) -> f64 {
        self.yaw
    }

    /// Unit vector from start to goal, zero for a zero-length move
    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    pub fn distance(&self) -> f64 {
        self.distance
    }

    pub fn accel_duration(&self) -> f64 {
        self.t_accel
    }

    pub fn cruise_duration(&self) -> f64 {
        self.t_const
    }

    /// Total time from start to arrival
    pub fn duration(&self) -> f64 {
        2.0 * self.t_accel + self.t_const
    }

    /// Highest speed reached along the profile
    pub fn peak_speed(&self) -> f64 {
        self.accel * self.t_accel
    }

    /// Evaluate the profile `tau` seconds after its start.
    ///
    /// Phase boundaries are inclusive on the earlier phase. A zero-duration
    /// profile is complete at every instant.
    pub fn sample(&self, tau: f64) -> ProfileSample {
        let dir = self.direction;
        let a = self.accel;
        let t1 = self.t_accel;
        let t2 = t1 + self.t_const;
        let t3 = t2 + t1;

        if t3 <= 0.0 || tau > t3 {
            return ProfileSample {
                position: self.goal,
                velocity: Vec3::zeros(),
                acceleration: Vec3::zeros(),
                phase: Phase::Complete,
            };
        }

        if tau <= t1 {
            ProfileSample {
                position: self.start + 0.5 * a * dir * tau * tau,
                velocity: a * dir * tau,
                acceleration: a * dir,
                phase: Phase::Accelerate,
            }
        } else if tau <= t2 {
            let dt = tau - t1;
            let v = a * dir * t1;
            ProfileSample {
                position: self.start + 0.5 * a * dir * t1 * t1 + v * dt,
                velocity: v,
                acceleration: Vec3::zeros(),
                phase: Phase::Cruise,
            }
        } else {
            let dt = tau - t2;
            ProfileSample {
                position: self.start
                    + 0.5 * a * dir * t1 * t1
                    + a * dir * t1 * self.t_const
                    + (a * dir * t1 * dt - 0.5 * a * dir * dt * dt),
                velocity: a * dir * t1 - a * dir * dt,
                acceleration: -a * dir,
                phase: Phase::Decelerate,
            }
        }
    }
}
