//! Outbound notifications for animation, HUD, scoring and the physics layer.
//!
//! Controllers push into their own [`EventQueue`] at the moment something
//! happens. The simulation forwards those into an [`EventBus`], which calls
//! registered callbacks, feeds channel subscribers and keeps a queue the
//! owner can drain once per frame.

use crossbeam_channel::{Receiver, Sender};

use crate::enemy::EnemyState;
use crate::math::{Hitbox, Vec2};
use crate::player::PlayerState;
use crate::world::EntityId;

/// A controller state, tagged with the machine it belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StateTag {
    Player(PlayerState),
    Enemy(EnemyState),
}

#[derive(Clone, Debug, PartialEq)]
pub enum CoreEvent {
    StateChanged {
        entity: EntityId,
        from: StateTag,
        to: StateTag,
    },
    Damaged {
        entity: EntityId,
        amount: u32,
        remaining: u32,
        max: u32,
    },
    Healed {
        entity: EntityId,
        amount: u32,
        remaining: u32,
    },
    Died {
        entity: EntityId,
        score_value: u32,
    },
    /// A melee hitbox should exist for the attack's lifetime.
    AttackSpawned {
        entity: EntityId,
        hitbox: Hitbox,
        damage: u32,
    },
    AttackEnded {
        entity: EntityId,
    },
    ProjectileSpawned {
        entity: EntityId,
        origin: Vec2,
        velocity: Vec2,
        damage: u32,
    },
    /// The entity's physics collider should stop reporting contacts.
    ColliderDisabled {
        entity: EntityId,
    },
    Jumped {
        entity: EntityId,
        coyote: bool,
    },
    Landed {
        entity: EntityId,
    },
    Respawned {
        entity: EntityId,
        position: Vec2,
    },
}

impl CoreEvent {
    /// The entity the event is about.
    pub fn entity(&self) -> EntityId {
        match *self {
            CoreEvent::StateChanged { entity, .. }
            | CoreEvent::Damaged { entity, .. }
            | CoreEvent::Healed { entity, .. }
            | CoreEvent::Died { entity, .. }
            | CoreEvent::AttackSpawned { entity, .. }
            | CoreEvent::AttackEnded { entity }
            | CoreEvent::ProjectileSpawned { entity, .. }
            | CoreEvent::ColliderDisabled { entity }
            | CoreEvent::Jumped { entity, .. }
            | CoreEvent::Landed { entity }
            | CoreEvent::Respawned { entity, .. } => entity,
        }
    }
}

/// Per-controller outbox.
#[derive(Debug, Default)]
pub struct EventQueue {
    events: Vec<CoreEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn push(&mut self, event: CoreEvent) {
        self.events.push(event);
    }

    /// Take everything queued since the last drain.
    pub fn drain(&mut self) -> Vec<CoreEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CoreEvent> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Optional callback for core events.
pub type EventCallback = Box<dyn Fn(&CoreEvent) + Send + Sync>;

/// Fans events out to callbacks, channel subscribers and, when enabled, a
/// queue the owner polls with [`EventBus::drain_events`].
pub struct EventBus {
    callbacks: Vec<EventCallback>,
    subscribers: Vec<Sender<CoreEvent>>,
    pending: Option<Vec<CoreEvent>>,
}

impl EventBus {
    /// A bus with no sinks. Events published before a sink exists are dropped.
    pub fn new() -> Self {
        Self {
            callbacks: Vec::new(),
            subscribers: Vec::new(),
            pending: None,
        }
    }

    /// Start retaining events for [`EventBus::drain_events`].
    pub fn enable_queue(&mut self) {
        if self.pending.is_none() {
            self.pending = Some(Vec::new());
        }
    }

    pub fn is_queue_enabled(&self) -> bool {
        self.pending.is_some()
    }

    /// Register a handler invoked synchronously for every event.
    pub fn on_event<F>(&mut self, callback: F)
    where
        F: Fn(&CoreEvent) + Send + Sync + 'static,
    {
        self.callbacks.push(Box::new(callback));
    }

    /// Open a channel that receives a copy of every future event.
    pub fn subscribe(&mut self) -> Receiver<CoreEvent> {
        let (send, recv) = crossbeam_channel::unbounded();
        self.subscribers.push(send);
        recv
    }

    pub fn publish(&mut self, event: CoreEvent) {
        for cb in &self.callbacks {
            cb(&event);
        }
        // Receivers that were dropped are forgotten.
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
        if let Some(pending) = self.pending.as_mut() {
            pending.push(event);
        }
    }

    pub fn publish_all(&mut self, events: impl IntoIterator<Item = CoreEvent>) {
        for event in events {
            self.publish(event);
        }
    }

    /// Drain events published since the last call. Always empty unless the
    /// queue was enabled.
    pub fn drain_events(&mut self) -> Vec<CoreEvent> {
        self.pending.as_mut().map(std::mem::take).unwrap_or_default()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn bus_fans_out_to_all_sinks() {
        let mut bus = EventBus::new();
        bus.enable_queue();
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        bus.on_event(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let rx = bus.subscribe();

        let id = EntityId::from_raw(3);
        bus.publish(CoreEvent::Landed { entity: id });
        bus.publish(CoreEvent::AttackEnded { entity: id });

        assert_eq!(seen.load(Ordering::SeqCst), 2);
        assert_eq!(rx.try_iter().count(), 2);
        let drained = bus.drain_events();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].entity(), id);
        assert!(bus.drain_events().is_empty());
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let mut bus = EventBus::new();
        let rx = bus.subscribe();
        drop(rx);
        bus.publish(CoreEvent::Landed {
            entity: EntityId::from_raw(1),
        });
        assert!(bus.subscribers.is_empty());
    }

    #[test]
    fn callback_only_bus_retains_nothing() {
        let mut bus = EventBus::new();
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        bus.on_event(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        for raw in 0..1000 {
            bus.publish(CoreEvent::Landed {
                entity: EntityId::from_raw(raw),
            });
        }
        assert_eq!(seen.load(Ordering::SeqCst), 1000);
        assert!(!bus.is_queue_enabled());
        assert!(bus.pending.is_none());
        assert!(bus.drain_events().is_empty());
    }
}
