//! Damage, knockback and health shared by the player and enemies.

use serde::{Deserialize, Serialize};

use crate::math::{Direction, Vec2};
use crate::world::EntityId;

/// Vertical share of the knockback force. Hits pop the victim slightly
/// upward as well as away from the source.
pub const KNOCKBACK_LIFT: f32 = 0.5;

/// One damage event, created by the attacker and consumed once.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HitInfo {
    pub damage: u32,
    pub knockback_force: f32,
    /// -1.0 pushes the victim left, 1.0 right.
    pub knockback_direction: f32,
    pub source: Option<EntityId>,
}

impl HitInfo {
    pub fn new(damage: u32, knockback_direction: f32, knockback_force: f32) -> Self {
        let knockback_direction = if knockback_direction < 0.0 {
            -1.0
        } else if knockback_direction > 0.0 {
            1.0
        } else {
            0.0
        };
        Self {
            damage,
            knockback_force: knockback_force.max(0.0),
            knockback_direction,
            source: None,
        }
    }

    pub fn with_source(mut self, source: EntityId) -> Self {
        self.source = Some(source);
        self
    }

    /// Velocity the victim takes on, damped by `resistance` in [0, 1].
    pub fn knockback_velocity(&self, resistance: f32) -> Vec2 {
        let scale = 1.0 - resistance.clamp(0.0, 1.0);
        let force = self.knockback_force * scale;
        Vec2::new(self.knockback_direction * force, force * KNOCKBACK_LIFT)
    }
}

/// Direction that pushes something at `victim` away from `source`.
/// Falls back to `fallback` when both share the same x.
pub fn push_direction(source: Vec2, victim: Vec2, fallback: Direction) -> f32 {
    Direction::toward(source, victim)
        .unwrap_or(fallback)
        .sign()
}

/// What `take_damage` did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DamageOutcome {
    /// Invulnerable, already dead, or otherwise immune.
    Ignored,
    Hurt { remaining: u32 },
    Killed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    current: u32,
    max: u32,
}

impl Health {
    pub fn new(max: u32) -> Self {
        Self { current: max, max }
    }

    pub fn current(&self) -> u32 {
        self.current
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    pub fn is_depleted(&self) -> bool {
        self.current == 0
    }

    /// Subtract `amount`, flooring at zero. Returns the amount removed.
    pub fn apply_damage(&mut self, amount: u32) -> u32 {
        let removed = amount.min(self.current);
        self.current -= removed;
        removed
    }

    /// Add `amount`, capped at max. Returns the amount restored.
    pub fn heal(&mut self, amount: u32) -> u32 {
        let restored = amount.min(self.max - self.current);
        self.current += restored;
        restored
    }
}

/// Anything that takes hits through the shared resolver.
///
/// A second lethal hit, or any hit after death, must return
/// [`DamageOutcome::Ignored`] so death side effects fire once.
pub trait Damageable {
    fn take_damage(&mut self, hit: HitInfo) -> DamageOutcome;

    fn health(&self) -> &Health;

    fn is_dead(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_floors_and_caps() {
        let mut h = Health::new(3);
        assert_eq!(h.apply_damage(5), 3);
        assert!(h.is_depleted());
        assert_eq!(h.heal(10), 3);
        assert_eq!(h.current(), 3);
        h.apply_damage(1);
        assert_eq!(h.heal(1), 1);
        assert_eq!(h.current(), h.max());
    }

    #[test]
    fn knockback_scales_with_resistance() {
        let hit = HitInfo::new(1, -3.0, 200.0);
        assert_eq!(hit.knockback_direction, -1.0);
        assert_eq!(hit.knockback_velocity(0.0), Vec2::new(-200.0, 100.0));
        assert_eq!(hit.knockback_velocity(0.75), Vec2::new(-50.0, 25.0));
        assert_eq!(hit.knockback_velocity(1.0), Vec2::ZERO);
    }

    #[test]
    fn push_direction_points_away() {
        let src = Vec2::new(10.0, 0.0);
        assert_eq!(push_direction(src, Vec2::new(0.0, 0.0), Direction::Right), -1.0);
        assert_eq!(push_direction(src, Vec2::new(20.0, 0.0), Direction::Left), 1.0);
        assert_eq!(push_direction(src, src, Direction::Left), -1.0);
    }
}
