//! Small math helpers shared by the controllers.

use serde::{Deserialize, Serialize};

/// 2D vector type used throughout platcore.
pub use glam::Vec2;

/// Horizontal facing of an entity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Left,
    #[default]
    Right,
}

impl Direction {
    /// -1.0 for left, 1.0 for right.
    pub fn sign(self) -> f32 {
        match self {
            Direction::Left => -1.0,
            Direction::Right => 1.0,
        }
    }

    pub fn flipped(self) -> Self {
        match self {
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    /// Direction of a signed horizontal quantity. Zero yields `None`.
    pub fn from_sign(value: f32) -> Option<Self> {
        if value > 0.0 {
            Some(Direction::Right)
        } else if value < 0.0 {
            Some(Direction::Left)
        } else {
            None
        }
    }

    /// Direction pointing from `from` toward `to` on the x axis.
    pub fn toward(from: Vec2, to: Vec2) -> Option<Self> {
        Self::from_sign(to.x - from.x)
    }
}

/// Frame-rate independent blend of `current` toward `target`.
///
/// `rate` is expressed per second; the blend factor saturates at 1.
pub fn blend_toward(current: f32, target: f32, rate: f32, dt: f32) -> f32 {
    let t = (rate * dt).clamp(0.0, 1.0);
    current + (target - current) * t
}

/// Exponential friction decay toward zero. Values under `snap` collapse to 0.
pub fn apply_friction(value: f32, friction: f32, dt: f32, snap: f32) -> f32 {
    let decayed = value * (1.0 - (friction * dt).clamp(0.0, 1.0));
    if decayed.abs() < snap {
        0.0
    } else {
        decayed
    }
}

/// Axis-aligned box relative to an owner, used for melee hitboxes.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Hitbox {
    /// Center offset from the owner's position.
    pub offset: Vec2,
    /// Half extents of the box.
    pub half_extents: Vec2,
}

impl Hitbox {
    pub fn new(offset: Vec2, half_extents: Vec2) -> Self {
        Self {
            offset,
            half_extents,
        }
    }

    /// Mirrors the box so it sits in front of an owner facing `facing`.
    pub fn facing(self, facing: Direction) -> Self {
        Self {
            offset: Vec2::new(self.offset.x.abs() * facing.sign(), self.offset.y),
            half_extents: self.half_extents,
        }
    }

    pub fn contains(&self, owner: Vec2, point: Vec2) -> bool {
        let center = owner + self.offset;
        let d = (point - center).abs();
        d.x <= self.half_extents.x && d.y <= self.half_extents.y
    }
}
