//! Static per-entity-type tuning.
//!
//! Both configs deserialize from JSON with every field optional. Values
//! outside their domain are clamped by `sanitized` rather than rejected.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::enemy::AttackStyle;
use crate::kinematics::BodyParams;
use crate::math::{Hitbox, Vec2};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub max_health: u32,
    pub move_speed: f32,
    pub gravity: f32,
    pub max_fall_speed: f32,
    pub jump_velocity: f32,
    pub jump_cut_multiplier: f32,
    pub max_jump_hold_time: f32,
    pub coyote_time: f32,
    pub jump_buffer_time: f32,
    /// Ground friction rate per second when there is no input.
    pub ground_friction: f32,
    /// Air steering rate per second.
    pub air_control: f32,
    pub input_dead_zone: f32,
    pub attack_duration: f32,
    pub attack_cooldown: f32,
    pub attack_damage: u32,
    pub attack_knockback: f32,
    pub attack_hitbox: Hitbox,
    pub hurt_duration: f32,
    pub invulnerability_time: f32,
    pub stomp_bounce_velocity: f32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            max_health: 5,
            move_speed: 200.0,
            gravity: -1400.0,
            max_fall_speed: -700.0,
            jump_velocity: 520.0,
            jump_cut_multiplier: 0.5,
            max_jump_hold_time: 0.35,
            coyote_time: 0.1,
            jump_buffer_time: 0.12,
            ground_friction: 14.0,
            air_control: 6.0,
            input_dead_zone: 0.1,
            attack_duration: 0.3,
            attack_cooldown: 0.35,
            attack_damage: 1,
            attack_knockback: 180.0,
            attack_hitbox: Hitbox::new(Vec2::new(22.0, 0.0), Vec2::new(16.0, 12.0)),
            hurt_duration: 0.4,
            invulnerability_time: 1.0,
            stomp_bounce_velocity: 380.0,
        }
    }
}

impl PlayerConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        Ok(config.sanitized())
    }

    pub fn load_from_file(path: &std::path::Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Clamp every field into its domain.
    pub fn sanitized(mut self) -> Self {
        self.max_health = self.max_health.max(1);
        self.move_speed = self.move_speed.abs();
        self.gravity = downward("player.gravity", self.gravity);
        self.max_fall_speed = downward("player.max_fall_speed", self.max_fall_speed);
        self.jump_velocity = self.jump_velocity.abs();
        self.jump_cut_multiplier = unit("player.jump_cut_multiplier", self.jump_cut_multiplier);
        self.input_dead_zone = self.input_dead_zone.clamp(0.0, 0.99);
        for t in [
            &mut self.max_jump_hold_time,
            &mut self.coyote_time,
            &mut self.jump_buffer_time,
            &mut self.attack_duration,
            &mut self.attack_cooldown,
            &mut self.hurt_duration,
            &mut self.invulnerability_time,
            &mut self.ground_friction,
            &mut self.air_control,
        ] {
            *t = t.max(0.0);
        }
        self
    }

    pub fn body_params(&self) -> BodyParams {
        BodyParams {
            gravity: self.gravity,
            max_fall_speed: self.max_fall_speed,
            move_speed: self.move_speed,
        }
    }
}

/// Tuning for one enemy archetype. Never mutated after construction;
/// instances share it through an `Arc`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnemyConfig {
    pub health: u32,
    pub contact_damage: u32,
    pub move_speed: f32,
    pub detection_range: f32,
    pub attack_range: f32,
    pub attack_cooldown: f32,
    pub score_value: u32,
    pub stompable: bool,
    /// Fraction of incoming knockback ignored, in [0, 1].
    pub knockback_resistance: f32,
    pub attack_duration: f32,
    pub hurt_duration: f32,
    pub idle_wait: f32,
    pub contact_knockback: f32,
    /// Largest vertical offset at which the player can be seen.
    pub sight_height: f32,
    pub friction: f32,
    pub gravity: f32,
    pub max_fall_speed: f32,
    pub attack: AttackStyle,
}

impl Default for EnemyConfig {
    fn default() -> Self {
        Self {
            health: 3,
            contact_damage: 1,
            move_speed: 60.0,
            detection_range: 200.0,
            attack_range: 40.0,
            attack_cooldown: 1.5,
            score_value: 100,
            stompable: true,
            knockback_resistance: 0.0,
            attack_duration: 0.5,
            hurt_duration: 0.3,
            idle_wait: 1.0,
            contact_knockback: 250.0,
            sight_height: 64.0,
            friction: 10.0,
            gravity: -1400.0,
            max_fall_speed: -700.0,
            attack: AttackStyle::Contact,
        }
    }
}

impl EnemyConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        Ok(config.sanitized())
    }

    /// Clamp every field into its domain.
    pub fn sanitized(mut self) -> Self {
        self.health = self.health.max(1);
        self.move_speed = self.move_speed.abs();
        self.knockback_resistance = unit("enemy.knockback_resistance", self.knockback_resistance);
        self.gravity = downward("enemy.gravity", self.gravity);
        self.max_fall_speed = downward("enemy.max_fall_speed", self.max_fall_speed);
        for v in [
            &mut self.detection_range,
            &mut self.attack_range,
            &mut self.attack_cooldown,
            &mut self.attack_duration,
            &mut self.hurt_duration,
            &mut self.idle_wait,
            &mut self.contact_knockback,
            &mut self.sight_height,
            &mut self.friction,
        ] {
            *v = v.max(0.0);
        }
        self
    }

    pub fn body_params(&self) -> BodyParams {
        BodyParams {
            gravity: self.gravity,
            max_fall_speed: self.max_fall_speed,
            move_speed: self.move_speed,
        }
    }
}

fn unit(name: &str, value: f32) -> f32 {
    let clamped = value.clamp(0.0, 1.0);
    if clamped != value {
        log::warn!("{} = {} outside [0, 1], clamped to {}", name, value, clamped);
    }
    clamped
}

/// Forces a vertical quantity to point down (y is up).
fn downward(name: &str, value: f32) -> f32 {
    if value > 0.0 {
        log::warn!("{} = {} points up, using {}", name, value, -value);
        -value
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_fills_defaults() {
        let cfg = PlayerConfig::from_json(r#"{ "move_speed": 150.0, "coyote_time": 0.2 }"#)
            .unwrap();
        assert_eq!(cfg.move_speed, 150.0);
        assert_eq!(cfg.coyote_time, 0.2);
        assert_eq!(cfg.max_health, PlayerConfig::default().max_health);
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let cfg = EnemyConfig::from_json(
            r#"{ "knockback_resistance": 1.7, "gravity": 900.0, "health": 0 }"#,
        )
        .unwrap();
        assert_eq!(cfg.knockback_resistance, 1.0);
        assert_eq!(cfg.gravity, -900.0);
        assert_eq!(cfg.health, 1);
    }

    #[test]
    fn attack_style_round_trips_by_name() {
        let cfg = EnemyConfig::from_json(
            r#"{ "attack": { "ranged": { "projectile_speed": 240.0, "damage": 2 } } }"#,
        )
        .unwrap();
        assert_eq!(
            cfg.attack,
            AttackStyle::Ranged {
                projectile_speed: 240.0,
                damage: 2
            }
        );
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(PlayerConfig::from_json("{ nope").is_err());
    }
}
