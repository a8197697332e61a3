//! AI-driven enemy controller shared by every archetype.

mod behavior;
mod factory;

pub use behavior::{AttackContext, AttackStyle};
pub use factory::{EnemyFactory, SpawnDescriptor};

use std::sync::Arc;

use crate::combat::{push_direction, DamageOutcome, Damageable, Health, HitInfo};
use crate::config::EnemyConfig;
use crate::events::{CoreEvent, EventQueue, StateTag};
use crate::kinematics::KinematicBody;
use crate::math::{apply_friction, Direction, Vec2};
use crate::player::PlayerController;
use crate::state::{MachineState, StateHooks, StateMachine, TransitionGate};
use crate::timer::Countdown;
use crate::world::{EntityId, EntityKind, EntitySnapshot, WorldQuery};

/// Horizontal distance at which a waypoint counts as reached.
pub const WAYPOINT_ARRIVAL: f32 = 4.0;

/// Chase is abandoned beyond this multiple of the detection range.
pub const CHASE_GIVE_UP_FACTOR: f32 = 1.5;

/// Damage dealt to an enemy by a stomp.
pub const STOMP_DAMAGE: u32 = 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EnemyState {
    Idle,
    Patrol,
    Chase,
    Attack,
    Hurt,
    Dead,
}

impl MachineState for EnemyState {
    fn is_terminal(self) -> bool {
        self == EnemyState::Dead
    }

    fn is_hurt(self) -> bool {
        self == EnemyState::Hurt
    }

    fn is_recovery(self) -> bool {
        self == EnemyState::Idle
    }

    fn tag(self) -> StateTag {
        StateTag::Enemy(self)
    }
}

/// Ordered waypoints with a wrapping cursor.
#[derive(Clone, Debug, PartialEq)]
pub struct PatrolPath {
    waypoints: Vec<Vec2>,
    cursor: usize,
}

impl PatrolPath {
    /// `None` for an empty list.
    pub fn new(waypoints: Vec<Vec2>) -> Option<Self> {
        if waypoints.is_empty() {
            None
        } else {
            Some(Self {
                waypoints,
                cursor: 0,
            })
        }
    }

    /// Waypoint the enemy is walking toward.
    pub fn current(&self) -> Vec2 {
        self.waypoints[self.cursor]
    }

    /// Move to the next waypoint, wrapping at the end.
    pub fn advance(&mut self) {
        self.cursor = (self.cursor + 1) % self.waypoints.len();
    }

    /// Index of the current waypoint.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn waypoints(&self) -> &[Vec2] {
        &self.waypoints
    }
}

pub struct EnemyController {
    id: EntityId,
    type_id: String,
    config: Arc<EnemyConfig>,
    body: KinematicBody,
    machine: StateMachine<EnemyState>,
    health: Health,
    position: Vec2,
    outbox: EventQueue,

    patrol: Option<PatrolPath>,
    /// Non-owning handle to the chased player; re-resolved every use.
    target: Option<EntityId>,
    target_position: Option<Vec2>,
    collider_enabled: bool,

    idle_timer: Countdown,
    attack_timer: Countdown,
    attack_cooldown: Countdown,
    hurt_timer: Countdown,
}

impl EnemyController {
    /// Create an enemy in Idle with its idle wait already running.
    pub fn new(
        id: EntityId,
        type_id: impl Into<String>,
        config: Arc<EnemyConfig>,
        position: Vec2,
        facing: Direction,
        patrol: Option<PatrolPath>,
    ) -> Self {
        let mut idle_timer = Countdown::new();
        idle_timer.start(config.idle_wait);
        Self {
            id,
            type_id: type_id.into(),
            body: KinematicBody::new(config.body_params(), facing),
            machine: StateMachine::new(EnemyState::Idle),
            health: Health::new(config.health),
            position,
            outbox: EventQueue::new(),
            patrol,
            target: None,
            target_position: None,
            collider_enabled: true,
            idle_timer,
            attack_timer: Countdown::new(),
            attack_cooldown: Countdown::new(),
            hurt_timer: Countdown::new(),
            config,
        }
    }

    // ------------------------------
    // Per-frame update
    // ------------------------------

    /// Run one AI tick against `world`, then integrate the body.
    pub fn update(&mut self, dt: f32, world: &dyn WorldQuery) {
        let dt = dt.max(0.0);
        self.machine.tick(dt);
        self.idle_timer.tick(dt);
        self.attack_cooldown.tick(dt);
        let attack_done = self.attack_timer.tick(dt);
        let hurt_done = self.hurt_timer.tick(dt);

        match self.current_state() {
            EnemyState::Idle => self.update_idle(world),
            EnemyState::Patrol => self.update_patrol(world),
            EnemyState::Chase => self.update_chase(world),
            EnemyState::Attack => {
                self.body.set_vx(0.0);
                if attack_done {
                    self.change_state(EnemyState::Idle);
                }
            }
            EnemyState::Hurt => {
                self.decay(dt);
                if hurt_done {
                    self.change_state(EnemyState::Idle);
                }
            }
            EnemyState::Dead => self.decay(dt),
        }

        self.body.integrate(dt);
    }

    fn update_idle(&mut self, world: &dyn WorldQuery) {
        self.body.set_vx(0.0);
        if let Some(player) = self.detect_player(world) {
            self.latch(player);
            self.change_state(EnemyState::Chase);
        } else if !self.idle_timer.is_active() && self.patrol.is_some() {
            self.change_state(EnemyState::Patrol);
        }
    }

    fn update_patrol(&mut self, world: &dyn WorldQuery) {
        if let Some(player) = self.detect_player(world) {
            self.latch(player);
            self.change_state(EnemyState::Chase);
            return;
        }

        let Some(waypoint) = self.patrol.as_ref().map(PatrolPath::current) else {
            self.change_state(EnemyState::Idle);
            return;
        };
        let dx = waypoint.x - self.position.x;
        if dx.abs() <= WAYPOINT_ARRIVAL {
            if let Some(path) = self.patrol.as_mut() {
                path.advance();
            }
            self.body.set_vx(0.0);
            self.change_state(EnemyState::Idle);
            return;
        }

        // Check the ledge on the side of the waypoint, not the spawn facing.
        let facing = Direction::from_sign(dx).unwrap_or(self.body.facing());
        self.body.set_facing(facing);
        if world.check_edge(self.position, facing) {
            // The waypoint behind the edge is unreachable; aim for the next one.
            let reversed = facing.flipped();
            self.body.set_facing(reversed);
            self.body.set_vx(reversed.sign() * self.config.move_speed);
            if let Some(path) = self.patrol.as_mut() {
                path.advance();
            }
            return;
        }
        self.steer(dx);
    }

    fn update_chase(&mut self, world: &dyn WorldQuery) {
        let Some(target) = self.resolve_target(world) else {
            log::debug!("{} lost its target handle", self.id);
            self.drop_target();
            return;
        };
        self.target_position = Some(target.position);

        let distance = self.position.distance(target.position);
        if distance > CHASE_GIVE_UP_FACTOR * self.config.detection_range {
            self.drop_target();
            return;
        }
        if distance <= self.config.attack_range && !self.attack_cooldown.is_active() {
            self.change_state(EnemyState::Attack);
            return;
        }

        let dx = target.position.x - self.position.x;
        if dx.abs() <= WAYPOINT_ARRIVAL {
            self.body.set_vx(0.0);
            return;
        }
        if let Some(facing) = Direction::from_sign(dx) {
            self.body.set_facing(facing);
        }
        // Chasers stop at ledges instead of turning around.
        if world.check_edge(self.position, self.body.facing()) {
            self.body.set_vx(0.0);
        } else {
            self.steer(dx);
        }
    }

    fn steer(&mut self, dx: f32) {
        if let Some(facing) = Direction::from_sign(dx) {
            self.body.set_facing(facing);
            self.body.set_vx(facing.sign() * self.config.move_speed);
        }
    }

    fn decay(&mut self, dt: f32) {
        let vx = apply_friction(self.body.velocity().x, self.config.friction, dt, 1.0);
        self.body.set_vx(vx);
    }

    // ------------------------------
    // Perception
    // ------------------------------

    /// The player, if within detection range and visible.
    pub fn detect_player(&self, world: &dyn WorldQuery) -> Option<EntitySnapshot> {
        world.live_entities().into_iter().find(|e| {
            e.kind == EntityKind::Player
                && self.position.distance(e.position) <= self.config.detection_range
                && self.can_see_player(e.position)
        })
    }

    /// Vertical offset strictly below the sight height, and (unless already
    /// chasing) the player on the side the enemy faces.
    pub fn can_see_player(&self, player_position: Vec2) -> bool {
        let offset = player_position - self.position;
        if offset.y.abs() >= self.config.sight_height {
            return false;
        }
        if self.current_state() == EnemyState::Chase {
            return true;
        }
        match Direction::from_sign(offset.x) {
            Some(side) => side == self.body.facing(),
            None => true,
        }
    }

    fn resolve_target(&self, world: &dyn WorldQuery) -> Option<EntitySnapshot> {
        let id = self.target?;
        world
            .entity(id)
            .filter(|e| e.kind == EntityKind::Player)
    }

    fn latch(&mut self, player: EntitySnapshot) {
        self.target = Some(player.id);
        self.target_position = Some(player.position);
    }

    fn drop_target(&mut self) {
        self.target = None;
        self.target_position = None;
        let fallback = if self.patrol.is_some() {
            EnemyState::Patrol
        } else {
            EnemyState::Idle
        };
        self.change_state(fallback);
    }

    // ------------------------------
    // Combat
    // ------------------------------

    /// Body contact with the player. Suppressed while dead or hurt.
    pub fn deal_contact_damage(&self, player: &mut PlayerController) -> DamageOutcome {
        if !self.can_deal_damage() {
            return DamageOutcome::Ignored;
        }
        let direction = push_direction(self.position, player.position(), self.body.facing());
        let hit = HitInfo::new(
            self.config.contact_damage,
            direction,
            self.config.contact_knockback,
        )
        .with_source(self.id);
        player.take_damage(hit)
    }

    /// The player landed on top of this enemy. Returns what happened to the
    /// enemy; non-stompable archetypes hurt the player instead.
    pub fn handle_stomp(&mut self, player: &mut PlayerController) -> DamageOutcome {
        if self.is_dead() {
            return DamageOutcome::Ignored;
        }
        if !self.config.stompable {
            self.deal_contact_damage(player);
            return DamageOutcome::Ignored;
        }
        player.bounce(player.config().stomp_bounce_velocity);
        let direction = push_direction(player.position(), self.position, self.body.facing());
        self.take_damage(HitInfo::new(STOMP_DAMAGE, direction, 0.0).with_source(player.id()))
    }

    /// Hit dealt by this enemy's melee hitbox while an attack is active.
    pub fn melee_hit(&self) -> Option<HitInfo> {
        if self.current_state() != EnemyState::Attack {
            return None;
        }
        self.config.attack.melee_hit(self.id, self.body.facing())
    }

    fn can_deal_damage(&self) -> bool {
        self.collider_enabled
            && !matches!(self.current_state(), EnemyState::Dead | EnemyState::Hurt)
    }

    // ------------------------------
    // Collaborator entry points and queries
    // ------------------------------

    /// Ground contact reported by the physics collaborator.
    pub fn set_grounded(&mut self, grounded: bool) {
        self.body.set_grounded(grounded);
    }

    /// Position reported by the physics collaborator.
    pub fn set_position(&mut self, position: Vec2) {
        self.position = position;
    }

    /// Entity handle of this enemy.
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Archetype this enemy was spawned from.
    pub fn type_id(&self) -> &str {
        &self.type_id
    }

    /// Archetype tuning shared with other enemies of the same type.
    pub fn config(&self) -> &Arc<EnemyConfig> {
        &self.config
    }

    /// Current state.
    pub fn state(&self) -> EnemyState {
        self.current_state()
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    /// Velocity after the last update, already clamped.
    pub fn velocity(&self) -> Vec2 {
        self.body.velocity()
    }

    pub fn facing(&self) -> Direction {
        self.body.facing()
    }

    pub fn body(&self) -> &KinematicBody {
        &self.body
    }

    /// Player handle latched while chasing.
    pub fn target(&self) -> Option<EntityId> {
        self.target
    }

    /// Patrol route, if the enemy has one.
    pub fn patrol(&self) -> Option<&PatrolPath> {
        self.patrol.as_ref()
    }

    /// False once the enemy has died.
    pub fn collider_enabled(&self) -> bool {
        self.collider_enabled
    }

    /// Seconds until the next attack may start.
    pub fn attack_cooldown_remaining(&self) -> f32 {
        self.attack_cooldown.remaining()
    }

    /// Events produced since the last drain.
    pub fn events(&self) -> impl Iterator<Item = &CoreEvent> {
        self.outbox.iter()
    }

    /// Take the events produced since the last drain.
    pub fn drain_events(&mut self) -> Vec<CoreEvent> {
        self.outbox.drain()
    }
}

impl StateHooks for EnemyController {
    type State = EnemyState;

    fn entity(&self) -> EntityId {
        self.id
    }

    fn machine(&self) -> &StateMachine<EnemyState> {
        &self.machine
    }

    fn machine_mut(&mut self) -> &mut StateMachine<EnemyState> {
        &mut self.machine
    }

    fn gate(&self) -> TransitionGate {
        TransitionGate {
            invulnerable: false,
            hurt_elapsed: !self.hurt_timer.is_active(),
            lock_elapsed: true,
        }
    }

    fn outbox(&mut self) -> &mut EventQueue {
        &mut self.outbox
    }

    fn on_enter(&mut self, state: EnemyState) {
        match state {
            EnemyState::Idle => self.idle_timer.start(self.config.idle_wait),
            EnemyState::Attack => {
                self.body.set_vx(0.0);
                self.attack_timer.start(self.config.attack_duration);
                let ctx = AttackContext {
                    entity: self.id,
                    position: self.position,
                    facing: self.body.facing(),
                    target: self.target_position,
                };
                if let Some(event) = self.config.attack.perform(&ctx) {
                    self.outbox.push(event);
                }
            }
            EnemyState::Hurt => self.hurt_timer.start(self.config.hurt_duration),
            EnemyState::Dead => {
                self.collider_enabled = false;
                self.target = None;
                self.target_position = None;
                self.hurt_timer.clear();
                self.attack_timer.clear();
                log::info!(
                    "{} '{}' died, worth {}",
                    self.id,
                    self.type_id,
                    self.config.score_value
                );
                self.outbox.push(CoreEvent::ColliderDisabled { entity: self.id });
                self.outbox.push(CoreEvent::Died {
                    entity: self.id,
                    score_value: self.config.score_value,
                });
            }
            EnemyState::Patrol | EnemyState::Chase => {}
        }
    }

    fn on_exit(&mut self, state: EnemyState) {
        match state {
            EnemyState::Attack => {
                self.attack_timer.clear();
                self.attack_cooldown.start(self.config.attack_cooldown);
                if self.config.attack.spawns_hitbox() {
                    self.outbox.push(CoreEvent::AttackEnded { entity: self.id });
                }
            }
            EnemyState::Hurt => self.hurt_timer.clear(),
            _ => {}
        }
    }
}

impl Damageable for EnemyController {
    fn take_damage(&mut self, hit: HitInfo) -> DamageOutcome {
        if self.is_dead() {
            return DamageOutcome::Ignored;
        }

        let removed = self.health.apply_damage(hit.damage);
        let knockback = hit.knockback_velocity(self.config.knockback_resistance);
        if knockback.y > 0.0 {
            self.body.set_grounded(false);
        }
        self.body.set_velocity(knockback);
        self.outbox.push(CoreEvent::Damaged {
            entity: self.id,
            amount: removed,
            remaining: self.health.current(),
            max: self.health.max(),
        });

        if self.health.is_depleted() {
            self.change_state(EnemyState::Dead);
            return DamageOutcome::Killed;
        }
        if self.current_state() == EnemyState::Hurt {
            self.hurt_timer.start(self.config.hurt_duration);
        } else {
            self.change_state(EnemyState::Hurt);
        }
        DamageOutcome::Hurt {
            remaining: self.health.current(),
        }
    }

    fn health(&self) -> &Health {
        &self.health
    }

    fn is_dead(&self) -> bool {
        self.current_state() == EnemyState::Dead
    }
}
