//! Player character controller.
//!
//! Input commands arrive between ticks through [`PlayerController::set_move_axis`],
//! [`PlayerController::jump_press`], [`PlayerController::jump_release`] and
//! [`PlayerController::attack_press`]. Ground contact arrives through
//! [`PlayerController::set_grounded`]. `update` advances one frame.

use crate::combat::{DamageOutcome, Damageable, Health, HitInfo};
use crate::config::PlayerConfig;
use crate::events::{CoreEvent, EventQueue, StateTag};
use crate::kinematics::KinematicBody;
use crate::math::{apply_friction, blend_toward, Direction, Vec2};
use crate::state::{MachineState, StateHooks, StateMachine, TransitionGate};
use crate::timer::Countdown;
use crate::world::EntityId;

/// Horizontal speeds under this collapse to zero while decelerating.
const STOP_SPEED: f32 = 1.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PlayerState {
    Idle,
    Walking,
    Jumping,
    Falling,
    Attacking,
    Hurt,
    Dead,
}

impl PlayerState {
    /// States in which movement and facing ignore input.
    pub fn locks_movement(self) -> bool {
        matches!(
            self,
            PlayerState::Attacking | PlayerState::Hurt | PlayerState::Dead
        )
    }
}

impl MachineState for PlayerState {
    fn is_terminal(self) -> bool {
        self == PlayerState::Dead
    }

    fn is_hurt(self) -> bool {
        self == PlayerState::Hurt
    }

    fn is_recovery(self) -> bool {
        matches!(self, PlayerState::Idle | PlayerState::Falling)
    }

    fn is_locking(self) -> bool {
        self == PlayerState::Attacking
    }

    fn tag(self) -> StateTag {
        StateTag::Player(self)
    }
}

pub struct PlayerController {
    id: EntityId,
    config: PlayerConfig,
    body: KinematicBody,
    machine: StateMachine<PlayerState>,
    health: Health,
    position: Vec2,
    outbox: EventQueue,

    move_axis: f32,
    jump_held: bool,
    jump_hold_time: f32,
    /// Seconds since the body last left the ground.
    airborne_time: f32,
    coyote_used: bool,
    jump_buffer: Countdown,
    attack_timer: Countdown,
    attack_cooldown: Countdown,
    hurt_timer: Countdown,
    invulnerability: Countdown,
}

impl PlayerController {
    /// Create a player at `position`. It starts airborne until the first
    /// ground contact arrives.
    pub fn new(id: EntityId, config: PlayerConfig, position: Vec2, facing: Direction) -> Self {
        let config = config.sanitized();
        Self {
            id,
            body: KinematicBody::new(config.body_params(), facing),
            machine: StateMachine::new(PlayerState::Idle),
            health: Health::new(config.max_health),
            position,
            outbox: EventQueue::new(),
            move_axis: 0.0,
            jump_held: false,
            jump_hold_time: 0.0,
            airborne_time: 0.0,
            // No coyote allowance until the player has stood on something.
            coyote_used: true,
            jump_buffer: Countdown::new(),
            attack_timer: Countdown::new(),
            attack_cooldown: Countdown::new(),
            hurt_timer: Countdown::new(),
            invulnerability: Countdown::new(),
            config,
        }
    }

    // ------------------------------
    // Input commands
    // ------------------------------

    /// Horizontal input in [-1, 1]. Out-of-range values are clamped.
    pub fn set_move_axis(&mut self, value: f32) {
        self.move_axis = if value.is_finite() {
            value.clamp(-1.0, 1.0)
        } else {
            0.0
        };
    }

    /// Jump now if grounded or inside coyote time, otherwise buffer the press.
    pub fn jump_press(&mut self) {
        if self.is_dead() {
            return;
        }
        self.jump_held = true;
        self.jump_hold_time = 0.0;

        if !self.current_state().locks_movement() && self.can_jump() {
            let coyote = !self.body.is_grounded();
            self.perform_jump(coyote);
        } else {
            self.jump_buffer.start(self.config.jump_buffer_time);
        }
    }

    /// Releasing a held jump while rising cuts the ascent short.
    pub fn jump_release(&mut self) {
        if !self.jump_held {
            return;
        }
        self.jump_held = false;
        self.jump_hold_time = 0.0;
        if self.is_dead() {
            return;
        }
        let vy = self.body.velocity().y;
        if vy > 0.0 {
            self.body.set_vy(vy * self.config.jump_cut_multiplier);
        }
    }

    /// Start a melee attack. Returns false when the request is rejected.
    pub fn attack_press(&mut self) -> bool {
        match self.current_state() {
            PlayerState::Dead | PlayerState::Hurt | PlayerState::Attacking => return false,
            _ => {}
        }
        if self.attack_cooldown.is_active() {
            return false;
        }
        self.change_state(PlayerState::Attacking)
    }

    // ------------------------------
    // Collaborator entry points
    // ------------------------------

    /// Ground contact from the physics layer.
    pub fn set_grounded(&mut self, grounded: bool) {
        let was_grounded = self.body.is_grounded();
        self.body.set_grounded(grounded);

        if grounded && !was_grounded {
            self.airborne_time = 0.0;
            self.coyote_used = false;
            self.jump_hold_time = 0.0;
            self.outbox.push(CoreEvent::Landed { entity: self.id });
            self.consume_buffered_jump();
        } else if !grounded && was_grounded {
            self.airborne_time = 0.0;
        }
    }

    /// Upward bounce after stomping an enemy.
    pub fn bounce(&mut self, velocity: f32) {
        if self.is_dead() {
            return;
        }
        self.body.set_grounded(false);
        self.body.set_vy(velocity.abs());
        self.coyote_used = true;
        if !self.current_state().locks_movement() {
            self.change_state(PlayerState::Jumping);
        }
    }

    /// Restore health, capped at the maximum. Returns the amount restored.
    pub fn heal(&mut self, amount: u32) -> u32 {
        if self.is_dead() {
            return 0;
        }
        let restored = self.health.heal(amount);
        if restored > 0 {
            self.outbox.push(CoreEvent::Healed {
                entity: self.id,
                amount: restored,
                remaining: self.health.current(),
            });
        }
        restored
    }

    /// Position as last reported by the physics layer.
    pub fn set_position(&mut self, position: Vec2) {
        self.position = position;
    }

    /// Hit description for the player's current melee swing.
    pub fn melee_hit(&self) -> HitInfo {
        HitInfo::new(
            self.config.attack_damage,
            self.body.facing().sign(),
            self.config.attack_knockback,
        )
        .with_source(self.id)
    }

    // ------------------------------
    // Per-frame update
    // ------------------------------

    /// Advance timers, movement and state by `dt` seconds.
    pub fn update(&mut self, dt: f32) {
        let dt = dt.max(0.0);
        self.machine.tick(dt);

        if self.is_dead() {
            self.apply_horizontal(dt);
            self.body.integrate(dt);
            return;
        }

        self.tick_timers(dt);
        self.apply_horizontal(dt);
        self.apply_jump_hold(dt);
        if self.body.is_grounded() {
            self.consume_buffered_jump();
        }
        self.body.integrate(dt);

        if !self.current_state().locks_movement() {
            self.change_state(self.locomotion_state());
            let axis = self.effective_axis();
            if let Some(facing) = Direction::from_sign(axis) {
                self.body.set_facing(facing);
            }
        }
        log::trace!(
            "{} {:?} v={:?} grounded={}",
            self.id,
            self.current_state(),
            self.body.velocity(),
            self.body.is_grounded()
        );
    }

    fn tick_timers(&mut self, dt: f32) {
        if !self.body.is_grounded() {
            self.airborne_time += dt;
        }
        self.jump_buffer.tick(dt);
        self.attack_cooldown.tick(dt);
        let attack_done = self.attack_timer.tick(dt);
        let hurt_done = self.hurt_timer.tick(dt);
        self.invulnerability.tick(dt);

        if attack_done && self.current_state() == PlayerState::Attacking {
            self.change_state(self.locomotion_state());
        }
        if hurt_done && self.current_state() == PlayerState::Hurt {
            let recovery = if self.body.is_grounded() {
                PlayerState::Idle
            } else {
                PlayerState::Falling
            };
            self.change_state(recovery);
        }
    }

    fn apply_horizontal(&mut self, dt: f32) {
        let vx = self.body.velocity().x;
        let grounded = self.body.is_grounded();
        let state = self.current_state();

        let next = if state.locks_movement() {
            // Knockback carries through the air; attacks always skid to a stop.
            if grounded || state == PlayerState::Attacking {
                apply_friction(vx, self.config.ground_friction, dt, STOP_SPEED)
            } else {
                vx
            }
        } else {
            let axis = self.effective_axis();
            let target = axis * self.config.move_speed;
            if !grounded {
                blend_toward(vx, target, self.config.air_control, dt)
            } else if axis != 0.0 {
                target
            } else {
                apply_friction(vx, self.config.ground_friction, dt, STOP_SPEED)
            }
        };
        self.body.set_vx(next);
    }

    fn apply_jump_hold(&mut self, dt: f32) {
        if !self.jump_held || self.body.velocity().y <= 0.0 {
            return;
        }
        self.jump_hold_time += dt;
        if self.jump_hold_time > self.config.max_jump_hold_time {
            self.jump_release();
        }
    }

    fn consume_buffered_jump(&mut self) {
        if self.jump_buffer.is_active() && !self.current_state().locks_movement() {
            self.jump_buffer.clear();
            self.perform_jump(false);
        }
    }

    fn can_jump(&self) -> bool {
        self.body.is_grounded()
            || (!self.coyote_used && self.airborne_time <= self.config.coyote_time)
    }

    fn perform_jump(&mut self, coyote: bool) {
        self.body.set_grounded(false);
        self.body.set_vy(self.config.jump_velocity);
        self.coyote_used = true;
        self.jump_hold_time = 0.0;
        self.jump_buffer.clear();
        self.outbox.push(CoreEvent::Jumped {
            entity: self.id,
            coyote,
        });
        self.change_state(PlayerState::Jumping);
    }

    fn effective_axis(&self) -> f32 {
        if self.move_axis.abs() <= self.config.input_dead_zone {
            0.0
        } else {
            self.move_axis
        }
    }

    /// Free-movement state implied by contact, velocity and input.
    fn locomotion_state(&self) -> PlayerState {
        if self.body.is_grounded() {
            if self.effective_axis() != 0.0 {
                PlayerState::Walking
            } else {
                PlayerState::Idle
            }
        } else if self.body.velocity().y > 0.0 {
            PlayerState::Jumping
        } else {
            PlayerState::Falling
        }
    }

    // ------------------------------
    // Queries
    // ------------------------------

    /// Entity handle of this player.
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Current state.
    pub fn state(&self) -> PlayerState {
        self.current_state()
    }

    /// Last position reported by the physics collaborator.
    pub fn position(&self) -> Vec2 {
        self.position
    }

    /// Velocity after the last update, already clamped.
    pub fn velocity(&self) -> Vec2 {
        self.body.velocity()
    }

    /// Direction the player faces.
    pub fn facing(&self) -> Direction {
        self.body.facing()
    }

    /// Whether the player is standing on ground.
    pub fn is_grounded(&self) -> bool {
        self.body.is_grounded()
    }

    /// Kinematic state of the player.
    pub fn body(&self) -> &KinematicBody {
        &self.body
    }

    /// Tuning values (sanitized).
    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    /// Whether the post-hurt invulnerability window is running.
    pub fn is_invulnerable(&self) -> bool {
        self.invulnerability.is_active()
    }

    /// Seconds left in the invulnerability window.
    pub fn invulnerability_remaining(&self) -> f32 {
        self.invulnerability.remaining()
    }

    /// Seconds until another attack is accepted.
    pub fn attack_cooldown_remaining(&self) -> f32 {
        self.attack_cooldown.remaining()
    }

    /// Seconds a buffered jump press stays valid.
    pub fn jump_buffer_remaining(&self) -> f32 {
        self.jump_buffer.remaining()
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

impl StateHooks for PlayerController {
    type State = PlayerState;

    fn entity(&self) -> EntityId {
        self.id
    }

    fn machine(&self) -> &StateMachine<PlayerState> {
        &self.machine
    }

    fn machine_mut(&mut self) -> &mut StateMachine<PlayerState> {
        &mut self.machine
    }

    fn gate(&self) -> TransitionGate {
        TransitionGate {
            invulnerable: self.invulnerability.is_active(),
            hurt_elapsed: !self.hurt_timer.is_active(),
            lock_elapsed: !self.attack_timer.is_active(),
        }
    }

    fn outbox(&mut self) -> &mut EventQueue {
        &mut self.outbox
    }

    fn on_enter(&mut self, state: PlayerState) {
        match state {
            PlayerState::Attacking => {
                self.attack_timer.start(self.config.attack_duration);
                let hitbox = self.config.attack_hitbox.facing(self.body.facing());
                self.outbox.push(CoreEvent::AttackSpawned {
                    entity: self.id,
                    hitbox,
                    damage: self.config.attack_damage,
                });
            }
            PlayerState::Hurt => {
                self.hurt_timer.start(self.config.hurt_duration);
            }
            PlayerState::Dead => {
                self.hurt_timer.clear();
                self.jump_buffer.clear();
                log::info!("player {} died", self.id);
                self.outbox.push(CoreEvent::Died {
                    entity: self.id,
                    score_value: 0,
                });
            }
            _ => {}
        }
    }

    fn on_exit(&mut self, state: PlayerState) {
        match state {
            PlayerState::Attacking => {
                self.attack_timer.clear();
                self.attack_cooldown.start(self.config.attack_cooldown);
                self.outbox.push(CoreEvent::AttackEnded { entity: self.id });
            }
            PlayerState::Hurt => {
                self.hurt_timer.clear();
                self.invulnerability.start(self.config.invulnerability_time);
            }
            _ => {}
        }
    }
}

impl Damageable for PlayerController {
    /// Ignored while invulnerable or dead. A hit taken while already hurt
    /// restarts the hurt timer.
    fn take_damage(&mut self, hit: HitInfo) -> DamageOutcome {
        if self.current_state() == PlayerState::Dead || self.is_invulnerable() {
            return DamageOutcome::Ignored;
        }

        let removed = self.health.apply_damage(hit.damage);
        let knockback = hit.knockback_velocity(0.0);
        if knockback.y > 0.0 {
            self.body.set_grounded(false);
            self.coyote_used = true;
        }
        self.body.set_velocity(knockback);
        self.outbox.push(CoreEvent::Damaged {
            entity: self.id,
            amount: removed,
            remaining: self.health.current(),
            max: self.health.max(),
        });

        if self.health.is_depleted() {
            self.change_state(PlayerState::Dead);
            DamageOutcome::Killed
        } else {
            if self.current_state() == PlayerState::Hurt {
                self.hurt_timer.start(self.config.hurt_duration);
            } else {
                self.change_state(PlayerState::Hurt);
            }
            DamageOutcome::Hurt {
                remaining: self.health.current(),
            }
        }
    }

    fn health(&self) -> &Health {
        &self.health
    }

    fn is_dead(&self) -> bool {
        self.current_state() == PlayerState::Dead
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 64.0;

    fn config() -> PlayerConfig {
        PlayerConfig {
            coyote_time: 0.125,
            jump_buffer_time: 0.125,
            attack_duration: 0.25,
            attack_cooldown: 0.5,
            hurt_duration: 0.25,
            invulnerability_time: 1.0,
            ..PlayerConfig::default()
        }
    }

    fn grounded_player() -> PlayerController {
        let mut p = PlayerController::new(
            EntityId::from_raw(1),
            config(),
            Vec2::ZERO,
            Direction::Right,
        );
        p.set_grounded(true);
        p.update(DT);
        p.drain_events();
        p
    }

    #[test]
    fn walking_snaps_to_target_speed() {
        let mut p = grounded_player();
        p.set_move_axis(0.5);
        p.update(DT);
        assert_eq!(p.velocity().x, 100.0);
        assert_eq!(p.state(), PlayerState::Walking);

        p.set_move_axis(-3.0);
        p.update(DT);
        assert_eq!(p.velocity().x, -200.0);
        assert_eq!(p.facing(), Direction::Left);
    }

    #[test]
    fn friction_stops_the_player() {
        let mut p = grounded_player();
        p.set_move_axis(1.0);
        p.update(DT);
        p.set_move_axis(0.0);
        for _ in 0..120 {
            p.update(DT);
        }
        assert_eq!(p.velocity().x, 0.0);
        assert_eq!(p.state(), PlayerState::Idle);
    }

    #[test]
    fn air_control_blends_instead_of_snapping() {
        let mut p = grounded_player();
        p.jump_press();
        p.set_move_axis(1.0);
        p.update(DT);
        let vx = p.velocity().x;
        assert!(vx > 0.0 && vx < 200.0);
    }

    #[test]
    fn grounded_jump_sets_impulse() {
        let mut p = grounded_player();
        p.jump_press();
        assert_eq!(p.state(), PlayerState::Jumping);
        assert_eq!(p.velocity().y, p.config().jump_velocity);
        assert!(!p.is_grounded());
        assert!(p
            .drain_events()
            .contains(&CoreEvent::Jumped {
                entity: p.id(),
                coyote: false
            }));
    }

    #[test]
    fn release_cuts_only_while_rising() {
        let mut p = grounded_player();
        p.jump_press();
        p.update(DT);
        let vy = p.velocity().y;
        assert!(vy > 0.0);
        p.jump_release();
        assert!((p.velocity().y - vy * 0.5).abs() < 1e-3);

        let mut q = grounded_player();
        q.jump_press();
        while q.velocity().y > 0.0 {
            q.update(DT);
        }
        let falling = q.velocity().y;
        q.jump_release();
        assert_eq!(q.velocity().y, falling);
    }

    #[test]
    fn holding_past_the_limit_forces_release() {
        let mut p = grounded_player();
        p.jump_press();
        let mut steps = 0;
        while p.jump_held {
            p.update(DT);
            steps += 1;
            assert!(steps < 1000);
        }
        let hold_limit = p.config().max_jump_hold_time;
        assert!(steps as f32 * DT > hold_limit || p.velocity().y <= 0.0);
        // The physical release afterwards changes nothing.
        let vy = p.velocity().y;
        p.jump_release();
        assert_eq!(p.velocity().y, vy);
    }

    #[test]
    fn falling_is_derived_from_velocity() {
        let mut p = grounded_player();
        p.set_grounded(false);
        p.update(DT);
        assert_eq!(p.state(), PlayerState::Falling);
    }

    #[test]
    fn attack_cooldown_blocks_next_attack() {
        let mut p = grounded_player();
        assert!(p.attack_press());
        for _ in 0..16 {
            p.update(DT);
        }
        assert_eq!(p.state(), PlayerState::Idle);
        assert!(!p.attack_press());
        for _ in 0..32 {
            p.update(DT);
        }
        assert!(p.attack_press());
    }

    #[test]
    fn attack_ignores_movement_input() {
        let mut p = grounded_player();
        p.set_move_axis(1.0);
        p.update(DT);
        assert!(p.attack_press());
        let before = p.velocity().x;
        p.update(DT);
        assert!(p.velocity().x < before);
        assert_eq!(p.state(), PlayerState::Attacking);
        assert_eq!(p.facing(), Direction::Right);
    }

    #[test]
    fn attack_spawns_hitbox_in_facing_direction() {
        let mut p = grounded_player();
        p.set_move_axis(-1.0);
        p.update(DT);
        p.set_move_axis(0.0);
        p.drain_events();
        p.attack_press();
        let spawned = p.drain_events().into_iter().find_map(|e| match e {
            CoreEvent::AttackSpawned { hitbox, .. } => Some(hitbox),
            _ => None,
        });
        assert!(spawned.expect("hitbox event").offset.x < 0.0);
    }

    #[test]
    fn hurt_then_invulnerable() {
        let mut p = grounded_player();
        let hit = HitInfo::new(1, -1.0, 100.0);
        assert_eq!(p.take_damage(hit), DamageOutcome::Hurt { remaining: 4 });
        assert_eq!(p.state(), PlayerState::Hurt);
        assert!(p.velocity().x < 0.0);
        assert!(!p.is_invulnerable());

        // Halfway through the stagger a second hit lands and restarts it.
        p.set_grounded(true);
        for _ in 0..8 {
            p.update(DT);
        }
        assert_eq!(p.take_damage(hit), DamageOutcome::Hurt { remaining: 3 });
        p.set_grounded(true);
        for _ in 0..15 {
            p.update(DT);
        }
        assert_eq!(p.state(), PlayerState::Hurt);
        p.update(DT);
        assert_ne!(p.state(), PlayerState::Hurt);
        assert!(p.is_invulnerable());
        assert_eq!(p.take_damage(hit), DamageOutcome::Ignored);
        assert_ne!(p.state(), PlayerState::Hurt);
        assert_eq!(p.health().current(), 3);
    }

    #[test]
    fn attack_is_rejected_while_hurt() {
        let mut p = grounded_player();
        p.take_damage(HitInfo::new(1, 1.0, 0.0));
        assert!(!p.attack_press());
    }

    #[test]
    fn heal_is_capped() {
        let mut p = grounded_player();
        p.take_damage(HitInfo::new(2, 1.0, 0.0));
        assert_eq!(p.heal(10), 2);
        assert_eq!(p.health().current(), 5);
        assert_eq!(p.heal(1), 0);
    }

    #[test]
    fn dead_ignores_input() {
        let mut p = grounded_player();
        assert_eq!(p.take_damage(HitInfo::new(9, 1.0, 0.0)), DamageOutcome::Killed);
        p.jump_press();
        assert!(!p.attack_press());
        assert_eq!(p.heal(3), 0);
        p.update(DT);
        assert_eq!(p.state(), PlayerState::Dead);
        assert_eq!(p.health().current(), 0);
    }

    #[test]
    fn state_changes_are_reported_once_each() {
        let mut p = grounded_player();
        p.attack_press();
        let changes: Vec<_> = p
            .drain_events()
            .into_iter()
            .filter(|e| matches!(e, CoreEvent::StateChanged { .. }))
            .collect();
        assert_eq!(
            changes,
            vec![CoreEvent::StateChanged {
                entity: p.id(),
                from: StateTag::Player(PlayerState::Idle),
                to: StateTag::Player(PlayerState::Attacking),
            }]
        );
    }
}
