use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::{EnemyController, PatrolPath};
use crate::config::EnemyConfig;
use crate::error::{ConfigError, SpawnError};
use crate::math::{Direction, Vec2};
use crate::world::EntityId;

/// Where and how to place one enemy in a level.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpawnDescriptor {
    pub type_id: String,
    pub position: Vec2,
    #[serde(default)]
    pub facing: Direction,
    #[serde(default)]
    pub waypoints: Vec<Vec2>,
}

impl SpawnDescriptor {
    pub fn new(type_id: impl Into<String>, position: Vec2) -> Self {
        Self {
            type_id: type_id.into(),
            position,
            facing: Direction::default(),
            waypoints: Vec::new(),
        }
    }

    pub fn facing(mut self, facing: Direction) -> Self {
        self.facing = facing;
        self
    }

    pub fn with_waypoints(mut self, waypoints: Vec<Vec2>) -> Self {
        self.waypoints = waypoints;
        self
    }
}

/// Registry of enemy archetypes keyed by type id.
///
/// Every instance of a type shares one `Arc<EnemyConfig>`.
#[derive(Default)]
pub struct EnemyFactory {
    archetypes: HashMap<String, Arc<EnemyConfig>>,
}

impl EnemyFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, type_id: impl Into<String>, config: EnemyConfig) -> Result<(), ConfigError> {
        let type_id = type_id.into();
        if type_id.trim().is_empty() {
            return Err(ConfigError::EmptyTypeId);
        }
        if self.archetypes.contains_key(&type_id) {
            return Err(ConfigError::DuplicateType(type_id));
        }
        log::debug!("registered enemy archetype '{}'", type_id);
        self.archetypes.insert(type_id, Arc::new(config.sanitized()));
        Ok(())
    }

    /// Build a factory from a JSON object mapping type ids to configs.
    pub fn from_json(json: &str) -> Result<Self> {
        let table: HashMap<String, EnemyConfig> =
            serde_json::from_str(json).context("parsing enemy archetypes")?;
        let mut factory = Self::new();
        let mut entries: Vec<_> = table.into_iter().collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        for (type_id, config) in entries {
            factory.register(type_id, config)?;
        }
        Ok(factory)
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::from_json(&json)
    }

    pub fn contains(&self, type_id: &str) -> bool {
        self.archetypes.contains_key(type_id)
    }

    pub fn config(&self, type_id: &str) -> Option<&Arc<EnemyConfig>> {
        self.archetypes.get(type_id)
    }

    /// Registered type ids, sorted.
    pub fn type_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.archetypes.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn spawn(&self, id: EntityId, desc: &SpawnDescriptor) -> Result<EnemyController, SpawnError> {
        let config = self
            .archetypes
            .get(&desc.type_id)
            .ok_or_else(|| SpawnError::UnknownType(desc.type_id.clone()))?;
        Ok(EnemyController::new(
            id,
            desc.type_id.clone(),
            Arc::clone(config),
            desc.position,
            desc.facing,
            PatrolPath::new(desc.waypoints.clone()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instances_share_config() {
        let mut factory = EnemyFactory::new();
        factory.register("slime", EnemyConfig::default()).unwrap();
        let desc = SpawnDescriptor::new("slime", Vec2::ZERO);
        let a = factory.spawn(EntityId::from_raw(1), &desc).unwrap();
        let b = factory.spawn(EntityId::from_raw(2), &desc).unwrap();
        assert!(Arc::ptr_eq(a.config(), b.config()));
        assert!(a.patrol().is_none());
    }

    #[test]
    fn unknown_type_is_rejected() {
        let factory = EnemyFactory::new();
        let err = factory
            .spawn(EntityId::from_raw(1), &SpawnDescriptor::new("ghost", Vec2::ZERO))
            .err()
            .unwrap();
        assert_eq!(err, SpawnError::UnknownType("ghost".into()));
    }

    #[test]
    fn duplicate_and_empty_ids_are_rejected() {
        let mut factory = EnemyFactory::new();
        factory.register("bat", EnemyConfig::default()).unwrap();
        assert_eq!(
            factory.register("bat", EnemyConfig::default()),
            Err(ConfigError::DuplicateType("bat".into()))
        );
        assert_eq!(
            factory.register("  ", EnemyConfig::default()),
            Err(ConfigError::EmptyTypeId)
        );
    }

    #[test]
    fn loads_archetype_table() {
        let factory = EnemyFactory::from_json(
            r#"{
                "walker": { "health": 2 },
                "turret": { "move_speed": 0.0, "stompable": false }
            }"#,
        )
        .unwrap();
        assert_eq!(factory.type_ids(), vec!["turret", "walker"]);
        assert_eq!(factory.config("walker").unwrap().health, 2);
        assert!(!factory.config("turret").unwrap().stompable);
    }

    #[test]
    fn descriptor_defaults() {
        let desc: SpawnDescriptor =
            serde_json::from_str(r#"{ "type_id": "walker", "position": [4.0, 8.0] }"#).unwrap();
        assert_eq!(desc.facing, Direction::Right);
        assert!(desc.waypoints.is_empty());
    }
}
