//! Countdown timers driven by the per-frame delta, and the fixed-step clock
//! that produces that delta.

use std::time::Duration;

/// Remaining time below this is treated as elapsed. Absorbs float drift
/// from summing many small deltas.
const EPSILON: f32 = 1e-5;

/// A timer that counts down to zero and stays there.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Countdown {
    remaining: f32,
}

impl Countdown {
    pub fn new() -> Self {
        Self { remaining: 0.0 }
    }

    /// (Re)start the timer with `duration` seconds.
    pub fn start(&mut self, duration: f32) {
        self.remaining = duration.max(0.0);
    }

    pub fn clear(&mut self) {
        self.remaining = 0.0;
    }

    /// Advance by `dt`. Returns true on the tick the timer reaches zero.
    pub fn tick(&mut self, dt: f32) -> bool {
        if self.remaining <= 0.0 {
            return false;
        }
        self.remaining -= dt;
        if self.remaining <= EPSILON {
            self.remaining = 0.0;
            return true;
        }
        false
    }

    pub fn is_active(&self) -> bool {
        self.remaining > 0.0
    }

    pub fn remaining(&self) -> f32 {
        self.remaining
    }
}

/// Accumulates variable frame time and hands it out in fixed steps.
#[derive(Clone, Copy, Debug)]
pub struct FixedStep {
    step: Duration,
    accumulator: Duration,
    /// Steps granted per `accumulate` call at most; the rest is dropped.
    max_steps: u32,
}

impl FixedStep {
    /// A zero step is raised to one microsecond.
    pub fn new(step: Duration) -> Self {
        Self {
            step: step.max(Duration::from_micros(1)),
            accumulator: Duration::ZERO,
            max_steps: 8,
        }
    }

    pub fn from_hz(hz: u32) -> Self {
        Self::new(Duration::from_secs(1) / hz.max(1))
    }

    pub fn with_max_steps(mut self, max_steps: u32) -> Self {
        self.max_steps = max_steps.max(1);
        self
    }

    pub fn step(&self) -> Duration {
        self.step
    }

    pub fn dt(&self) -> f32 {
        self.step.as_secs_f32()
    }

    /// Add frame time. Backlog beyond `max_steps` is discarded so a long
    /// stall does not spiral.
    pub fn accumulate(&mut self, frame: Duration) {
        self.accumulator += frame;
        let cap = self.step * self.max_steps;
        if self.accumulator > cap {
            log::debug!(
                "dropping {:?} of simulation backlog",
                self.accumulator - cap
            );
            self.accumulator = cap;
        }
    }

    /// True while a whole step is available; consumes it.
    pub fn should_step(&mut self) -> bool {
        if self.accumulator >= self.step {
            self.accumulator -= self.step;
            true
        } else {
            false
        }
    }

    /// Fraction of a step left over, for render interpolation.
    pub fn alpha(&self) -> f32 {
        (self.accumulator.as_secs_f32() / self.step.as_secs_f32()).min(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_once_on_expiry() {
        let mut t = Countdown::new();
        t.start(0.25);
        assert!(!t.tick(0.1));
        assert!(!t.tick(0.1));
        assert!(t.tick(0.1));
        assert!(!t.is_active());
        assert!(!t.tick(0.1));
    }

    #[test]
    fn tolerates_accumulated_drift() {
        let mut t = Countdown::new();
        t.start(0.3);
        let fired = (0..3).filter(|_| t.tick(0.1)).count();
        assert_eq!(fired, 1);
    }

    #[test]
    fn fixed_step_hands_out_whole_steps() {
        let mut clock = FixedStep::new(Duration::from_millis(10));
        clock.accumulate(Duration::from_millis(25));
        let mut steps = 0;
        while clock.should_step() {
            steps += 1;
        }
        assert_eq!(steps, 2);
        assert!((clock.alpha() - 0.5).abs() < 1e-4);
    }

    #[test]
    fn fixed_step_caps_backlog() {
        let mut clock = FixedStep::new(Duration::from_millis(10)).with_max_steps(3);
        clock.accumulate(Duration::from_secs(2));
        let mut steps = 0;
        while clock.should_step() {
            steps += 1;
        }
        assert_eq!(steps, 3);
    }
}
