//! Velocity bookkeeping for entities that move under gravity.
//!
//! The body never moves anything itself. It computes the velocity the
//! physics engine should apply this frame and keeps it inside the
//! configured bounds on every write.

use crate::math::{Direction, Vec2};

/// Horizontal speed may exceed the walk speed by this factor (knockback,
/// stomp bounces) but never more.
pub const HORIZONTAL_SPEED_CAP: f32 = 1.5;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BodyParams {
    /// Vertical acceleration, negative (y points up).
    pub gravity: f32,
    /// Lowest allowed vertical velocity, negative.
    pub max_fall_speed: f32,
    /// Nominal walk speed, basis of the horizontal clamp.
    pub move_speed: f32,
}

#[derive(Clone, Debug)]
pub struct KinematicBody {
    params: BodyParams,
    velocity: Vec2,
    grounded: bool,
    facing: Direction,
}

impl KinematicBody {
    /// Create an airborne body at rest.
    pub fn new(params: BodyParams, facing: Direction) -> Self {
        Self {
            params,
            velocity: Vec2::ZERO,
            grounded: false,
            facing,
        }
    }

    /// Apply gravity unless grounded, then clamp.
    pub fn integrate(&mut self, dt: f32) {
        if !self.grounded {
            self.velocity.y += self.params.gravity * dt;
        }
        self.clamp();
    }

    /// Landing (false -> true) zeroes vertical velocity. Any other change
    /// only records the flag.
    pub fn set_grounded(&mut self, grounded: bool) {
        if grounded && !self.grounded {
            self.velocity.y = 0.0;
        }
        self.grounded = grounded;
    }

    /// Whether the body rests on ground.
    pub fn is_grounded(&self) -> bool {
        self.grounded
    }

    /// Current clamped velocity.
    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    /// Replace the velocity, then clamp.
    pub fn set_velocity(&mut self, velocity: Vec2) {
        self.velocity = velocity;
        self.clamp();
    }

    /// Replace the horizontal component, then clamp.
    pub fn set_vx(&mut self, vx: f32) {
        self.velocity.x = vx;
        self.clamp();
    }

    /// Replace the vertical component, then clamp.
    pub fn set_vy(&mut self, vy: f32) {
        self.velocity.y = vy;
        self.clamp();
    }

    pub fn facing(&self) -> Direction {
        self.facing
    }

    pub fn set_facing(&mut self, facing: Direction) {
        self.facing = facing;
    }

    /// Gravity, fall and speed limits of this body.
    pub fn params(&self) -> &BodyParams {
        &self.params
    }

    /// Largest horizontal speed the body will report.
    pub fn max_horizontal_speed(&self) -> f32 {
        HORIZONTAL_SPEED_CAP * self.params.move_speed
    }

    fn clamp(&mut self) {
        let max_vx = self.max_horizontal_speed();
        self.velocity.x = self.velocity.x.clamp(-max_vx, max_vx);
        self.velocity.y = self.velocity.y.max(self.params.max_fall_speed);
    }
}
