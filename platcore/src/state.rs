use std::fmt;

use crate::events::{CoreEvent, EventQueue, StateTag};
use crate::world::EntityId;

/// A state set that can be driven by a [`StateMachine`].
///
/// The legality table is shared by every machine; implementors only say
/// which of their states play the terminal, hurt, recovery and locking roles.
pub trait MachineState: Copy + Eq + fmt::Debug {
    /// Absorbing state (Dead).
    fn is_terminal(self) -> bool;

    fn is_hurt(self) -> bool;

    /// States reachable from Hurt before the hurt timer elapses.
    fn is_recovery(self) -> bool;

    /// States that refuse to be left until their own timer elapses.
    fn is_locking(self) -> bool {
        false
    }

    fn tag(self) -> StateTag;
}

/// Timer and flag snapshot the legality table consults.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TransitionGate {
    pub invulnerable: bool,
    pub hurt_elapsed: bool,
    pub lock_elapsed: bool,
}

/// Shared transition legality table.
pub fn can_transition<S: MachineState>(from: S, to: S, gate: &TransitionGate) -> bool {
    if from.is_terminal() {
        return false;
    }
    if to.is_terminal() {
        return true;
    }
    if to.is_hurt() {
        return !gate.invulnerable;
    }
    if from.is_hurt() {
        return to.is_recovery() || gate.hurt_elapsed;
    }
    if from.is_locking() {
        return gate.lock_elapsed;
    }
    true
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transition<S> {
    pub from: S,
    pub to: S,
}

/// Finite automaton holding the current state of one controller.
///
/// Tracks the previous state and how long the current one has been active.
#[derive(Clone, Debug)]
pub struct StateMachine<S: MachineState> {
    current: S,
    previous: S,
    elapsed: f32,
}

impl<S: MachineState> StateMachine<S> {
    pub fn new(initial: S) -> Self {
        Self {
            current: initial,
            previous: initial,
            elapsed: 0.0,
        }
    }

    pub fn current(&self) -> S {
        self.current
    }

    pub fn previous(&self) -> S {
        self.previous
    }

    /// Seconds spent in the current state.
    pub fn time_in_state(&self) -> f32 {
        self.elapsed
    }

    pub fn tick(&mut self, dt: f32) {
        self.elapsed += dt;
    }

    pub fn can_transition(&self, to: S, gate: &TransitionGate) -> bool {
        can_transition(self.current, to, gate)
    }

    /// Switch to `to` if it differs from the current state and the table
    /// allows it.
    pub fn transition(&mut self, to: S, gate: &TransitionGate) -> Option<Transition<S>> {
        if to == self.current || !self.can_transition(to, gate) {
            return None;
        }
        let from = self.current;
        self.previous = from;
        self.current = to;
        self.elapsed = 0.0;
        Some(Transition { from, to })
    }
}

/// A controller that owns a [`StateMachine`] and reacts to its transitions.
pub trait StateHooks {
    type State: MachineState;

    fn entity(&self) -> EntityId;

    fn machine(&self) -> &StateMachine<Self::State>;

    fn machine_mut(&mut self) -> &mut StateMachine<Self::State>;

    fn gate(&self) -> TransitionGate;

    fn outbox(&mut self) -> &mut EventQueue;

    /// Called after the machine has switched into `state`.
    fn on_enter(&mut self, _state: Self::State) {}

    /// Called when `state` is left, before the new state is entered.
    fn on_exit(&mut self, _state: Self::State) {}

    fn current_state(&self) -> Self::State {
        self.machine().current()
    }

    /// Request a transition. Illegal requests are ignored.
    fn change_state(&mut self, to: Self::State) -> bool {
        let gate = self.gate();
        let Some(transition) = self.machine_mut().transition(to, &gate) else {
            return false;
        };
        let entity = self.entity();
        log::debug!(
            "{} state {:?} -> {:?}",
            entity,
            transition.from,
            transition.to
        );
        self.on_exit(transition.from);
        self.outbox().push(CoreEvent::StateChanged {
            entity,
            from: transition.from.tag(),
            to: transition.to.tag(),
        });
        self.on_enter(transition.to);
        true
    }
}
