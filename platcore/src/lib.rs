//! platcore - entity simulation core for 2D action platformers.
//!
//! Kinematic bodies, state-machine driven player and enemy controllers and
//! combat resolution. Rendering, input capture, level data and collision
//! broad-phase live outside; they talk to this crate through input
//! commands, [`collision::ContactEvent`]s, [`world::Terrain`] probes and the
//! [`events::CoreEvent`] stream.

pub mod checkpoint;
pub mod collision;
pub mod combat;
pub mod config;
pub mod enemy;
pub mod error;
pub mod events;
pub mod kinematics;
pub mod math;
pub mod player;
pub mod sim;
pub mod state;
pub mod timer;
pub mod world;

pub use crate::checkpoint::{CheckpointStore, RespawnPoints};
pub use crate::collision::{
    classify_player_enemy, route, CollisionCategory, ContactEvent, ContactKind, ContactRoute,
    StompProbe,
};
pub use crate::combat::{DamageOutcome, Damageable, Health, HitInfo};
pub use crate::config::{EnemyConfig, PlayerConfig};
pub use crate::enemy::{
    AttackStyle, EnemyController, EnemyFactory, EnemyState, PatrolPath, SpawnDescriptor,
};
pub use crate::error::{ConfigError, SpawnError};
pub use crate::events::{CoreEvent, EventBus, StateTag};
pub use crate::kinematics::{BodyParams, KinematicBody};
pub use crate::math::{Direction, Hitbox, Vec2};
pub use crate::player::{PlayerController, PlayerState};
pub use crate::sim::Simulation;
pub use crate::state::{MachineState, StateHooks, StateMachine};
pub use crate::timer::{Countdown, FixedStep};
pub use crate::world::{EntityId, EntityKind, Terrain, WorldQuery};
