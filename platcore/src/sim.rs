//! Per-frame orchestration of the player, the enemies and queued contacts.

use std::collections::BTreeMap;
use std::time::Duration;

use crossbeam_channel::Receiver;

use crate::checkpoint::{CheckpointStore, RespawnPoints};
use crate::collision::{ContactEvent, ContactKind};
use crate::combat::Damageable;
use crate::config::PlayerConfig;
use crate::enemy::{EnemyController, EnemyFactory, SpawnDescriptor};
use crate::error::SpawnError;
use crate::events::{CoreEvent, EventBus};
use crate::math::{Direction, Vec2};
use crate::player::{PlayerController, PlayerState};
use crate::timer::FixedStep;
use crate::world::{EntityId, EntityKind, EntityRegistry, EntitySnapshot, Terrain, WorldQuery};

/// What enemies see of the scene during one step.
struct SceneView<'a> {
    entities: Vec<EntitySnapshot>,
    terrain: &'a dyn Terrain,
}

impl WorldQuery for SceneView<'_> {
    fn live_entities(&self) -> Vec<EntitySnapshot> {
        self.entities.clone()
    }

    fn entity(&self, id: EntityId) -> Option<EntitySnapshot> {
        self.entities.iter().copied().find(|e| e.id == id)
    }

    fn check_edge(&self, position: Vec2, facing: Direction) -> bool {
        self.terrain.check_edge(position, facing)
    }
}

/// Owns every controller of a level and advances them in lockstep.
///
/// Each step updates the player, then the enemies, then resolves the
/// contacts queued since the previous step, then publishes the events
/// controllers produced.
pub struct Simulation {
    registry: EntityRegistry,
    factory: EnemyFactory,
    player_config: PlayerConfig,
    player: Option<PlayerController>,
    enemies: BTreeMap<EntityId, EnemyController>,
    contacts: Vec<ContactEvent>,
    respawn: RespawnPoints,
    checkpoint_store: Option<Box<dyn CheckpointStore>>,
    bus: EventBus,
    clock: FixedStep,
    frame: u64,
    score: u64,
}

impl Simulation {
    pub fn new(player_config: PlayerConfig, factory: EnemyFactory, level_spawn: Vec2) -> Self {
        Self {
            registry: EntityRegistry::new(),
            factory,
            player_config: player_config.sanitized(),
            player: None,
            enemies: BTreeMap::new(),
            contacts: Vec::new(),
            respawn: RespawnPoints::new(level_spawn),
            checkpoint_store: None,
            bus: EventBus::new(),
            clock: FixedStep::from_hz(60),
            frame: 0,
            score: 0,
        }
    }

    pub fn with_checkpoint_store(mut self, store: Box<dyn CheckpointStore>) -> Self {
        self.checkpoint_store = Some(store);
        self
    }

    pub fn with_clock(mut self, clock: FixedStep) -> Self {
        self.clock = clock;
        self
    }

    /// Retain published events for [`Simulation::drain_events`]. Owners that
    /// only use callbacks or channels leave this off.
    pub fn with_event_queue(mut self) -> Self {
        self.bus.enable_queue();
        self
    }

    // ------------------------------
    // Spawning
    // ------------------------------

    /// Create the player at the resolved respawn point, replacing any
    /// previous one. Enemies holding the old id lose their target.
    pub fn spawn_player(&mut self, facing: Direction) -> EntityId {
        if let Some(old) = self.player.take() {
            self.registry.despawn(old.id());
        }
        let position = self.respawn.resolve(self.checkpoint_store.as_deref());
        let id = self.registry.spawn(EntityKind::Player);
        log::info!("player {} spawned at {:?}", id, position);
        self.player = Some(PlayerController::new(
            id,
            self.player_config.clone(),
            position,
            facing,
        ));
        id
    }

    /// Spawn a fresh player after death and announce it.
    pub fn respawn_player(&mut self) -> EntityId {
        let facing = self
            .player
            .as_ref()
            .map(PlayerController::facing)
            .unwrap_or_default();
        let id = self.spawn_player(facing);
        let position = self.respawn.resolve(self.checkpoint_store.as_deref());
        self.bus.publish(CoreEvent::Respawned {
            entity: id,
            position,
        });
        id
    }

    pub fn spawn_enemy(&mut self, desc: &SpawnDescriptor) -> Result<EntityId, SpawnError> {
        if !self.factory.contains(&desc.type_id) {
            log::warn!("cannot spawn unknown enemy type '{}'", desc.type_id);
            return Err(SpawnError::UnknownType(desc.type_id.clone()));
        }
        let id = self.registry.spawn(EntityKind::Enemy);
        let enemy = match self.factory.spawn(id, desc) {
            Ok(enemy) => enemy,
            Err(err) => {
                self.registry.despawn(id);
                return Err(err);
            }
        };
        log::debug!("spawned '{}' as {} at {:?}", desc.type_id, id, desc.position);
        self.enemies.insert(id, enemy);
        Ok(id)
    }

    /// Spawn every descriptor, skipping (and logging) unknown types.
    pub fn spawn_all(&mut self, descriptors: &[SpawnDescriptor]) -> Vec<EntityId> {
        descriptors
            .iter()
            .filter_map(|desc| self.spawn_enemy(desc).ok())
            .collect()
    }

    /// Remove an entity, typically once its death sequence has finished.
    pub fn despawn(&mut self, id: EntityId) -> bool {
        if !self.registry.despawn(id) {
            return false;
        }
        if self.player.as_ref().is_some_and(|p| p.id() == id) {
            self.player = None;
        } else {
            self.enemies.remove(&id);
        }
        log::debug!("despawned {}", id);
        true
    }

    // ------------------------------
    // Collaborator input
    // ------------------------------

    /// Queue a contact for resolution at the end of the next step.
    pub fn queue_contact(&mut self, contact: ContactEvent) {
        self.contacts.push(contact);
    }

    /// Position reported back by the physics layer.
    pub fn set_position(&mut self, id: EntityId, position: Vec2) {
        match self.player.as_mut() {
            Some(player) if player.id() == id => player.set_position(position),
            _ => {
                if let Some(enemy) = self.enemies.get_mut(&id) {
                    enemy.set_position(position);
                }
            }
        }
    }

    // ------------------------------
    // Stepping
    // ------------------------------

    /// Run as many fixed steps as `frame_time` covers. Returns the number
    /// of steps taken.
    pub fn advance(&mut self, frame_time: Duration, terrain: &dyn Terrain) -> u32 {
        self.clock.accumulate(frame_time);
        let dt = self.clock.dt();
        let mut steps = 0;
        while self.clock.should_step() {
            self.step(dt, terrain);
            steps += 1;
        }
        steps
    }

    pub fn step(&mut self, dt: f32, terrain: &dyn Terrain) {
        if let Some(player) = self.player.as_mut() {
            player.update(dt);
        }

        let view = SceneView {
            entities: self.snapshots(),
            terrain,
        };
        for enemy in self.enemies.values_mut() {
            enemy.update(dt, &view);
        }

        for contact in std::mem::take(&mut self.contacts) {
            self.resolve(contact);
        }

        self.flush_events();
        self.frame += 1;
    }

    fn snapshots(&self) -> Vec<EntitySnapshot> {
        let player = self
            .player
            .as_ref()
            .filter(|p| !p.is_dead())
            .map(|p| EntitySnapshot {
                id: p.id(),
                kind: EntityKind::Player,
                position: p.position(),
            });
        let enemies = self
            .enemies
            .values()
            .filter(|e| !e.is_dead())
            .map(|e| EntitySnapshot {
                id: e.id(),
                kind: EntityKind::Enemy,
                position: e.position(),
            });
        player.into_iter().chain(enemies).collect()
    }

    fn resolve(&mut self, contact: ContactEvent) {
        match contact {
            ContactEvent::Ground { entity, touching } => {
                if let Some(player) = self.player.as_mut().filter(|p| p.id() == entity) {
                    player.set_grounded(touching);
                } else if let Some(enemy) = self.enemies.get_mut(&entity) {
                    enemy.set_grounded(touching);
                }
            }
            ContactEvent::AttackHit { attacker, victim } => self.resolve_attack(attacker, victim),
            ContactEvent::PlayerEnemy {
                player,
                enemy,
                kind,
            } => {
                let (Some(p), Some(e)) = (
                    self.player.as_mut().filter(|p| p.id() == player),
                    self.enemies.get_mut(&enemy),
                ) else {
                    log::debug!("stale contact {} / {}", player, enemy);
                    return;
                };
                match kind {
                    ContactKind::Stomp => {
                        e.handle_stomp(p);
                    }
                    ContactKind::Side => {
                        e.deal_contact_damage(p);
                    }
                }
            }
            ContactEvent::PlayerHit { player, hit } => {
                if let Some(p) = self.player.as_mut().filter(|p| p.id() == player) {
                    p.take_damage(hit);
                }
            }
            ContactEvent::Collectible { player, heal } => {
                if let Some(p) = self.player.as_mut().filter(|p| p.id() == player) {
                    p.heal(heal);
                }
            }
            ContactEvent::Checkpoint { player, position } => {
                if self.player.as_ref().is_some_and(|p| p.id() == player) {
                    self.respawn.touch(position);
                    if let Some(store) = self.checkpoint_store.as_mut() {
                        store.record(position);
                    }
                }
            }
        }
    }

    /// Only an attack that is still active lands.
    fn resolve_attack(&mut self, attacker: EntityId, victim: EntityId) {
        let Some(player) = self.player.as_mut() else {
            return;
        };
        if player.id() == attacker {
            if player.state() != PlayerState::Attacking {
                return;
            }
            if let Some(enemy) = self.enemies.get_mut(&victim) {
                enemy.take_damage(player.melee_hit());
            }
        } else if player.id() == victim {
            let hit = self.enemies.get(&attacker).and_then(EnemyController::melee_hit);
            if let Some(hit) = hit {
                player.take_damage(hit);
            }
        }
    }

    fn flush_events(&mut self) {
        if let Some(player) = self.player.as_mut() {
            self.bus.publish_all(player.drain_events());
        }
        for enemy in self.enemies.values_mut() {
            for event in enemy.drain_events() {
                if let CoreEvent::Died { score_value, .. } = event {
                    self.score += u64::from(score_value);
                }
                self.bus.publish(event);
            }
        }
    }

    // ------------------------------
    // Queries and event access
    // ------------------------------

    pub fn player(&self) -> Option<&PlayerController> {
        self.player.as_ref()
    }

    /// Mutable access for input commands.
    pub fn player_mut(&mut self) -> Option<&mut PlayerController> {
        self.player.as_mut()
    }

    pub fn enemy(&self, id: EntityId) -> Option<&EnemyController> {
        self.enemies.get(&id)
    }

    pub fn enemy_mut(&mut self, id: EntityId) -> Option<&mut EnemyController> {
        self.enemies.get_mut(&id)
    }

    pub fn enemies(&self) -> impl Iterator<Item = &EnemyController> {
        self.enemies.values()
    }

    pub fn is_alive(&self, id: EntityId) -> bool {
        self.registry.is_alive(id)
    }

    pub fn factory(&self) -> &EnemyFactory {
        &self.factory
    }

    pub fn respawn_points(&self) -> &RespawnPoints {
        &self.respawn
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Sum of score values of enemies killed so far.
    pub fn score(&self) -> u64 {
        self.score
    }

    pub fn on_event<F>(&mut self, callback: F)
    where
        F: Fn(&CoreEvent) + Send + Sync + 'static,
    {
        self.bus.on_event(callback);
    }

    pub fn subscribe(&mut self) -> Receiver<CoreEvent> {
        self.bus.subscribe()
    }

    /// Events published since the last drain; empty without
    /// [`Simulation::with_event_queue`].
    pub fn drain_events(&mut self) -> Vec<CoreEvent> {
        self.bus.drain_events()
    }
}
