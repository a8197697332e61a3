//! Contact events coming in from the physics layer.
//!
//! The physics engine owns broad-phase and overlap detection. It tags each
//! collider with a [`CollisionCategory`], uses [`route`] to decide whether a
//! pair matters to gameplay, classifies player/enemy touches with
//! [`classify_player_enemy`], and queues the resulting [`ContactEvent`] on the
//! simulation.

use serde::{Deserialize, Serialize};

use crate::combat::HitInfo;
use crate::math::Vec2;
use crate::world::EntityId;

/// How far (in world units) the player's feet may sit below the enemy's top
/// and still count as landing on it.
pub const STOMP_TOLERANCE: f32 = 6.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionCategory {
    Player,
    Ground,
    Enemy,
    PlayerAttack,
    EnemyProjectile,
    Hazard,
    Collectible,
    Trigger,
}

/// Gameplay handler a category pair is routed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContactRoute {
    Grounding,
    AttackHit,
    PlayerEnemy,
    Projectile,
    Hazard,
    Collectible,
    Trigger,
}

/// Route a pair of categories. Order does not matter; pairs with no
/// gameplay meaning yield `None`.
pub fn route(a: CollisionCategory, b: CollisionCategory) -> Option<ContactRoute> {
    use CollisionCategory as C;

    match (a, b) {
        (C::Player | C::Enemy, C::Ground) | (C::Ground, C::Player | C::Enemy) => {
            Some(ContactRoute::Grounding)
        }
        (C::PlayerAttack, C::Enemy) | (C::Enemy, C::PlayerAttack) => Some(ContactRoute::AttackHit),
        (C::Player, C::Enemy) | (C::Enemy, C::Player) => Some(ContactRoute::PlayerEnemy),
        (C::Player, other) | (other, C::Player) => match other {
            C::EnemyProjectile => Some(ContactRoute::Projectile),
            C::Hazard => Some(ContactRoute::Hazard),
            C::Collectible => Some(ContactRoute::Collectible),
            C::Trigger => Some(ContactRoute::Trigger),
            _ => None,
        },
        _ => None,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContactKind {
    /// Player came down on top of the enemy.
    Stomp,
    Side,
}

/// Geometry the physics layer reports for a player/enemy overlap.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StompProbe {
    /// Lowest point of the player's collider.
    pub player_bottom: f32,
    /// Highest point of the enemy's collider.
    pub enemy_top: f32,
    pub player_vy: f32,
}

/// Stomp when the player is descending and its feet are at or above the
/// enemy's top (within [`STOMP_TOLERANCE`]); side contact otherwise.
pub fn classify_player_enemy(probe: &StompProbe) -> ContactKind {
    let descending = probe.player_vy < 0.0;
    let above = probe.player_bottom >= probe.enemy_top - STOMP_TOLERANCE;
    if descending && above {
        ContactKind::Stomp
    } else {
        ContactKind::Side
    }
}

/// A classified contact, queued on the simulation and resolved after the
/// frame's kinematic updates.
#[derive(Clone, Debug, PartialEq)]
pub enum ContactEvent {
    /// Ground contact started or ended for a player or enemy.
    Ground { entity: EntityId, touching: bool },
    /// An active melee hitbox owned by `attacker` overlaps `victim`.
    AttackHit { attacker: EntityId, victim: EntityId },
    PlayerEnemy {
        player: EntityId,
        enemy: EntityId,
        kind: ContactKind,
    },
    /// A projectile or hazard hit the player.
    PlayerHit { player: EntityId, hit: HitInfo },
    Collectible { player: EntityId, heal: u32 },
    Checkpoint { player: EntityId, position: Vec2 },
}
