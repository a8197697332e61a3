use crate::math::Vec2;

/// Respawn position kept outside the level, e.g. by a save system.
pub trait CheckpointStore {
    fn respawn_point(&self) -> Option<Vec2>;

    /// A checkpoint was touched during play.
    fn record(&mut self, _position: Vec2) {}
}

/// Where the player comes back after dying.
///
/// Precedence: the external store, then the checkpoint touched last this
/// session, then the level spawn.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RespawnPoints {
    level_spawn: Vec2,
    session: Option<Vec2>,
}

impl RespawnPoints {
    pub fn new(level_spawn: Vec2) -> Self {
        Self {
            level_spawn,
            session: None,
        }
    }

    pub fn touch(&mut self, position: Vec2) {
        self.session = Some(position);
    }

    pub fn level_spawn(&self) -> Vec2 {
        self.level_spawn
    }

    pub fn session(&self) -> Option<Vec2> {
        self.session
    }

    /// Forget checkpoints touched this session (level reload).
    pub fn reset_session(&mut self) {
        self.session = None;
    }

    pub fn resolve(&self, store: Option<&dyn CheckpointStore>) -> Vec2 {
        store
            .and_then(|s| s.respawn_point())
            .or(self.session)
            .unwrap_or(self.level_spawn)
    }
}
