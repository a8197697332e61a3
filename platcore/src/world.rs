use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::math::{Direction, Vec2};

/// Unique identifier for a simulated entity.
///
/// Ids are never reused within a registry, so a stale id held by another
/// entity fails its liveness check instead of aliasing a newer entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(u32);

impl EntityId {
    /// Build an id from a raw integer (useful for collaborators and tests).
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Get the underlying integer ID (useful for debugging or serialization).
    pub const fn to_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What kind of controller sits behind an id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Player,
    Enemy,
}

/// Allocates entity ids and tracks which ones are alive.
pub struct EntityRegistry {
    next_id: u32,
    alive: HashMap<EntityId, EntityKind>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            alive: HashMap::new(),
        }
    }

    /// Allocate a fresh id for an entity of `kind`.
    pub fn spawn(&mut self, kind: EntityKind) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1).max(1);
        self.alive.insert(id, kind);
        id
    }

    /// Mark an entity as gone. Returns false if it was not alive.
    pub fn despawn(&mut self, entity: EntityId) -> bool {
        self.alive.remove(&entity).is_some()
    }

    pub fn is_alive(&self, entity: EntityId) -> bool {
        self.alive.contains_key(&entity)
    }

    pub fn kind(&self, entity: EntityId) -> Option<EntityKind> {
        self.alive.get(&entity).copied()
    }

    /// Number of alive entities.
    pub fn len(&self) -> usize {
        self.alive.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alive.is_empty()
    }
}

impl Default for EntityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only view of one live entity.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EntitySnapshot {
    pub id: EntityId,
    pub kind: EntityKind,
    pub position: Vec2,
}

/// Level geometry probe supplied by the scene.
pub trait Terrain {
    /// True when there is no floor just ahead of `position` in `facing`.
    fn check_edge(&self, position: Vec2, facing: Direction) -> bool;
}

impl<F> Terrain for F
where
    F: Fn(Vec2, Direction) -> bool,
{
    fn check_edge(&self, position: Vec2, facing: Direction) -> bool {
        self(position, facing)
    }
}

/// Queries an enemy makes about the world around it.
pub trait WorldQuery {
    fn live_entities(&self) -> Vec<EntitySnapshot>;

    /// Resolve a handle. `None` if the entity is gone.
    fn entity(&self, id: EntityId) -> Option<EntitySnapshot>;

    fn check_edge(&self, position: Vec2, facing: Direction) -> bool;
}
