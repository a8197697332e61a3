//! Runs a small flat level without a window: a scripted player walks right
//! through three enemy archetypes while a stand-in physics layer moves
//! bodies and reports contacts.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use glam::Vec2;
use platcore::{
    classify_player_enemy, ContactEvent, CoreEvent, Direction, EnemyFactory, EntityId, FixedStep,
    HitInfo, PlayerConfig, PlayerState, Simulation, SpawnDescriptor, StompProbe,
};

const LEVEL_HALF_WIDTH: f32 = 480.0;
const BODY_HALF_WIDTH: f32 = 10.0;
const BODY_HEIGHT: f32 = 24.0;
const FRAME: Duration = Duration::from_millis(16);
const RUN_SECONDS: u32 = 20;

struct Projectile {
    owner: EntityId,
    position: Vec2,
    velocity: Vec2,
    damage: u32,
    ttl: f32,
}

/// Moves bodies by their velocity and turns overlaps into contacts.
#[derive(Default)]
struct StandInPhysics {
    positions: HashMap<EntityId, Vec2>,
    grounded: HashSet<EntityId>,
    projectiles: Vec<Projectile>,
    /// Enemies already struck by the current player swing.
    struck: HashSet<EntityId>,
}

impl StandInPhysics {
    fn track(&mut self, id: EntityId, position: Vec2) {
        self.positions.insert(id, position);
        self.grounded.remove(&id);
    }

    fn move_body(&mut self, sim: &mut Simulation, id: EntityId, velocity: Vec2, dt: f32) {
        let Some(pos) = self.positions.get_mut(&id) else {
            return;
        };
        *pos += velocity * dt;
        pos.x = pos.x.clamp(-LEVEL_HALF_WIDTH, LEVEL_HALF_WIDTH);

        let on_floor = pos.y <= 0.0 && velocity.y <= 0.0;
        if on_floor {
            pos.y = 0.0;
        }
        let was_grounded = self.grounded.contains(&id);
        if on_floor != was_grounded {
            if on_floor {
                self.grounded.insert(id);
            } else {
                self.grounded.remove(&id);
            }
            sim.queue_contact(ContactEvent::Ground {
                entity: id,
                touching: on_floor,
            });
        }
        sim.set_position(id, *pos);
    }

    fn step(&mut self, sim: &mut Simulation, dt: f32) {
        let Some((player_id, player_velocity, swing)) = sim.player().map(|p| {
            let swing = (p.state() == PlayerState::Attacking)
                .then(|| p.config().attack_hitbox.facing(p.facing()));
            (p.id(), p.velocity(), swing)
        }) else {
            return;
        };
        self.move_body(sim, player_id, player_velocity, dt);

        let enemies: Vec<(EntityId, Vec2, bool)> = sim
            .enemies()
            .map(|e| (e.id(), e.velocity(), e.collider_enabled()))
            .collect();
        for (id, velocity, _) in &enemies {
            self.move_body(sim, *id, *velocity, dt);
        }

        let Some(player_pos) = self.positions.get(&player_id).copied() else {
            return;
        };
        for (id, _, collider) in enemies {
            let Some(enemy_pos) = self.positions.get(&id).copied() else {
                continue;
            };
            if let Some(hitbox) = swing {
                if collider && hitbox.contains(player_pos, enemy_pos) && self.struck.insert(id) {
                    sim.queue_contact(ContactEvent::AttackHit {
                        attacker: player_id,
                        victim: id,
                    });
                }
            }
            let delta = player_pos - enemy_pos;
            if collider && delta.x.abs() < 2.0 * BODY_HALF_WIDTH && delta.y.abs() < BODY_HEIGHT {
                let kind = classify_player_enemy(&StompProbe {
                    player_bottom: player_pos.y,
                    enemy_top: enemy_pos.y + BODY_HEIGHT,
                    player_vy: player_velocity.y,
                });
                sim.queue_contact(ContactEvent::PlayerEnemy {
                    player: player_id,
                    enemy: id,
                    kind,
                });
            }
        }

        self.projectiles.retain_mut(|shot| {
            shot.position += shot.velocity * dt;
            shot.ttl -= dt;
            let hit = (shot.position - player_pos).abs();
            if hit.x < BODY_HALF_WIDTH && hit.y < BODY_HEIGHT {
                let direction = shot.velocity.x.signum();
                sim.queue_contact(ContactEvent::PlayerHit {
                    player: player_id,
                    hit: HitInfo::new(shot.damage, direction, 120.0).with_source(shot.owner),
                });
                return false;
            }
            shot.ttl > 0.0
        });
    }
}

/// Ledges at both ends of the level.
fn level_edge(position: Vec2, facing: Direction) -> bool {
    let ahead = position.x + facing.sign() * (BODY_HALF_WIDTH + 2.0);
    ahead.abs() > LEVEL_HALF_WIDTH
}

fn archetype_path() -> PathBuf {
    std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("assets/archetypes.json")
        })
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let path = archetype_path();
    let factory = EnemyFactory::load_from_file(&path)
        .with_context(|| format!("loading archetypes from {}", path.display()))?;
    log::info!("archetypes: {:?}", factory.type_ids());

    let mut sim = Simulation::new(PlayerConfig::default(), factory, Vec2::new(-400.0, 0.0))
        .with_clock(FixedStep::new(FRAME))
        .with_event_queue();
    let mut physics = StandInPhysics::default();

    let player = sim.spawn_player(Direction::Right);
    physics.track(player, Vec2::new(-400.0, 0.0));

    let level = [
        SpawnDescriptor::new("walker", Vec2::new(-150.0, 0.0))
            .facing(Direction::Left)
            .with_waypoints(vec![Vec2::new(-220.0, 0.0), Vec2::new(-80.0, 0.0)]),
        SpawnDescriptor::new("brute", Vec2::new(60.0, 0.0)).facing(Direction::Left),
        SpawnDescriptor::new("spitter", Vec2::new(300.0, 0.0)).facing(Direction::Left),
        SpawnDescriptor::new("phantom", Vec2::new(400.0, 0.0)),
    ];
    for desc in &level {
        match sim.spawn_enemy(desc) {
            Ok(id) => physics.track(id, desc.position),
            Err(err) => log::warn!("skipping spawn: {}", err),
        }
    }

    sim.on_event(|event| log::trace!("event {:?}", event));

    let mut pending_despawn: Vec<(EntityId, f32)> = Vec::new();
    let mut respawn_in: Option<f32> = None;
    let mut elapsed = 0.0f32;
    let dt = FRAME.as_secs_f32();

    for frame in 0..(RUN_SECONDS * 1000 / FRAME.as_millis() as u32) {
        elapsed += dt;
        drive_player(&mut sim, frame);

        let steps = sim.advance(FRAME, &level_edge);
        for _ in 0..steps {
            physics.step(&mut sim, dt);
        }

        for event in sim.drain_events() {
            match &event {
                CoreEvent::StateChanged { .. } | CoreEvent::Landed { .. } => {
                    log::debug!("{:?}", event)
                }
                CoreEvent::AttackEnded { entity } if Some(*entity) == sim.player().map(|p| p.id()) => {
                    physics.struck.clear();
                }
                CoreEvent::ProjectileSpawned {
                    entity,
                    origin,
                    velocity,
                    damage,
                } => physics.projectiles.push(Projectile {
                    owner: *entity,
                    position: *origin,
                    velocity: *velocity,
                    damage: *damage,
                    ttl: 3.0,
                }),
                CoreEvent::Died { entity, .. } => {
                    log::info!("{:?}", event);
                    if Some(*entity) == sim.player().map(|p| p.id()) {
                        respawn_in = Some(1.0);
                    } else {
                        pending_despawn.push((*entity, 0.5));
                    }
                }
                _ => log::info!("{:?}", event),
            }
        }

        pending_despawn.retain_mut(|(id, delay)| {
            *delay -= dt;
            if *delay > 0.0 {
                return true;
            }
            sim.despawn(*id);
            physics.positions.remove(id);
            false
        });

        if let Some(t) = respawn_in.as_mut() {
            *t -= dt;
            if *t <= 0.0 {
                respawn_in = None;
                let id = sim.respawn_player();
                if let Some(player) = sim.player() {
                    physics.track(id, player.position());
                }
            }
        }
    }

    log::info!(
        "finished after {:.1}s, {} frames simulated, score {}",
        elapsed,
        sim.frame(),
        sim.score()
    );
    Ok(())
}

/// Scripted input: walk right, hop every two seconds, swing when close.
fn drive_player(sim: &mut Simulation, frame: u32) {
    let nearest = sim.player().and_then(|p| {
        sim.enemies()
            .filter(|e| e.collider_enabled())
            .map(|e| (e.position() - p.position()).length())
            .min_by(|a, b| a.total_cmp(b))
    });
    let Some(player) = sim.player_mut() else {
        return;
    };
    player.set_move_axis(1.0);
    if frame % 120 == 0 {
        player.jump_press();
    } else if frame % 120 == 12 {
        player.jump_release();
    }
    if nearest.is_some_and(|d| d < 40.0) {
        player.attack_press();
    }
}
