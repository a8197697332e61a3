//! Archetype-specific attack strategies.
//!
//! Everything else about an enemy is data in `EnemyConfig`; the attack is
//! the one behavior that varies in kind, so it is a closed set of variants.

use serde::{Deserialize, Serialize};

use crate::combat::HitInfo;
use crate::events::CoreEvent;
use crate::math::{Direction, Hitbox, Vec2};
use crate::world::EntityId;

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttackStyle {
    /// Pause in place; damage comes from body contact only.
    #[default]
    Contact,
    /// Short-lived hitbox in front of the enemy.
    Melee {
        hitbox: Hitbox,
        damage: u32,
        knockback: f32,
    },
    /// Fire one projectile at the target.
    Ranged { projectile_speed: f32, damage: u32 },
}

/// What the attacking enemy knows when the attack starts.
#[derive(Clone, Copy, Debug)]
pub struct AttackContext {
    pub entity: EntityId,
    pub position: Vec2,
    pub facing: Direction,
    pub target: Option<Vec2>,
}

impl AttackStyle {
    /// Event announcing the attack's side effect, if the style has one.
    pub fn perform(&self, ctx: &AttackContext) -> Option<CoreEvent> {
        match *self {
            AttackStyle::Contact => None,
            AttackStyle::Melee { hitbox, damage, .. } => Some(CoreEvent::AttackSpawned {
                entity: ctx.entity,
                hitbox: hitbox.facing(ctx.facing),
                damage,
            }),
            AttackStyle::Ranged {
                projectile_speed,
                damage,
            } => {
                let forward = Vec2::new(ctx.facing.sign(), 0.0);
                let aim = ctx
                    .target
                    .map(|t| (t - ctx.position).normalize_or_zero())
                    .filter(|d| *d != Vec2::ZERO)
                    .unwrap_or(forward);
                Some(CoreEvent::ProjectileSpawned {
                    entity: ctx.entity,
                    origin: ctx.position,
                    velocity: aim * projectile_speed,
                    damage,
                })
            }
        }
    }

    /// Whether an `AttackEnded` event must close the attack.
    pub fn spawns_hitbox(&self) -> bool {
        matches!(self, AttackStyle::Melee { .. })
    }

    /// Hit dealt by the melee hitbox, for a victim pushed toward `facing`.
    pub fn melee_hit(&self, source: EntityId, facing: Direction) -> Option<HitInfo> {
        match *self {
            AttackStyle::Melee {
                damage, knockback, ..
            } => Some(HitInfo::new(damage, facing.sign(), knockback).with_source(source)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(target: Option<Vec2>) -> AttackContext {
        AttackContext {
            entity: EntityId::from_raw(7),
            position: Vec2::new(0.0, 0.0),
            facing: Direction::Left,
            target,
        }
    }

    #[test]
    fn contact_style_has_no_side_effect() {
        assert_eq!(AttackStyle::Contact.perform(&ctx(None)), None);
        assert!(!AttackStyle::Contact.spawns_hitbox());
    }

    #[test]
    fn ranged_aims_at_target() {
        let style = AttackStyle::Ranged {
            projectile_speed: 100.0,
            damage: 2,
        };
        match style.perform(&ctx(Some(Vec2::new(0.0, 50.0)))) {
            Some(CoreEvent::ProjectileSpawned { velocity, damage, .. }) => {
                assert_eq!(damage, 2);
                assert!((velocity - Vec2::new(0.0, 100.0)).length() < 1e-4);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn ranged_without_target_fires_forward() {
        let style = AttackStyle::Ranged {
            projectile_speed: 80.0,
            damage: 1,
        };
        match style.perform(&ctx(None)) {
            Some(CoreEvent::ProjectileSpawned { velocity, .. }) => {
                assert_eq!(velocity, Vec2::new(-80.0, 0.0));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn melee_hitbox_faces_forward() {
        let style = AttackStyle::Melee {
            hitbox: Hitbox::new(Vec2::new(18.0, 0.0), Vec2::new(10.0, 10.0)),
            damage: 2,
            knockback: 150.0,
        };
        assert!(style.spawns_hitbox());
        match style.perform(&ctx(None)) {
            Some(CoreEvent::AttackSpawned { hitbox, damage, .. }) => {
                assert_eq!(hitbox.offset.x, -18.0);
                assert_eq!(damage, 2);
            }
            other => panic!("unexpected {other:?}"),
        }
        let hit = style
            .melee_hit(EntityId::from_raw(7), Direction::Left)
            .unwrap();
        assert_eq!(hit.knockback_direction, -1.0);
    }
}
