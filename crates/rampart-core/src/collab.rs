//! Per-tick collaborator hooks.
//!
//! The scheduler calls out to three collaborators whose internals live
//! outside the kernel: the AI ([`BotHook`], step 1), map scripting
//! ([`TriggerHook`], step 8) and a free-running [`CountdownTimer`] (step 9).
//!
//! Hooks get `&mut Simulation` and go through the same public API as any
//! command source, so their effects follow the usual notification order.

use serde::{Deserialize, Serialize};

use crate::error::KernelResult;
use crate::simulation::Simulation;

/// AI update, run first in every tick.
pub trait BotHook {
    /// Issues this tick's AI decisions.
    fn update(&mut self, sim: &mut Simulation) -> KernelResult<()>;
}

/// Map trigger/scripting update, run after the after-tick queue drains.
pub trait TriggerHook {
    /// Evaluates triggers for this tick.
    fn update(&mut self, sim: &mut Simulation) -> KernelResult<()>;
}

impl<F> BotHook for F
where
    F: FnMut(&mut Simulation) -> KernelResult<()>,
{
    fn update(&mut self, sim: &mut Simulation) -> KernelResult<()> {
        self(sim)
    }
}

impl<F> TriggerHook for F
where
    F: FnMut(&mut Simulation) -> KernelResult<()>,
{
    fn update(&mut self, sim: &mut Simulation) -> KernelResult<()> {
        self(sim)
    }
}

/// Mission countdown. Inactive until started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CountdownTimer {
    remaining_ticks: Option<u32>,
}

impl CountdownTimer {
    /// Creates an inactive timer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            remaining_ticks: None,
        }
    }

    /// (Re)starts the timer.
    pub fn start(&mut self, ticks: u32) {
        self.remaining_ticks = Some(ticks);
    }

    /// Stops the timer without expiring it.
    pub fn stop(&mut self) {
        self.remaining_ticks = None;
    }

    /// Ticks left, if running.
    #[must_use]
    pub const fn remaining(&self) -> Option<u32> {
        self.remaining_ticks
    }

    /// Returns true while running.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.remaining_ticks.is_some()
    }

    /// Advances one tick. Returns true exactly once, on the tick the timer
    /// reaches zero; the timer is inactive afterwards.
    pub fn update(&mut self) -> bool {
        match self.remaining_ticks {
            Some(0 | 1) => {
                self.remaining_ticks = None;
                true
            }
            Some(n) => {
                self.remaining_ticks = Some(n - 1);
                false
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inactive_timer_never_expires() {
        let mut timer = CountdownTimer::new();
        for _ in 0..10 {
            assert!(!timer.update());
        }
    }

    #[test]
    fn expires_once() {
        let mut timer = CountdownTimer::new();
        timer.start(3);
        assert!(!timer.update());
        assert!(!timer.update());
        assert!(timer.update());
        assert!(!timer.is_running());
        assert!(!timer.update());
    }

    #[test]
    fn zero_expires_on_first_update() {
        let mut timer = CountdownTimer::new();
        timer.start(0);
        assert!(timer.update());
    }

    #[test]
    fn stop_cancels() {
        let mut timer = CountdownTimer::new();
        timer.start(2);
        timer.stop();
        assert!(!timer.update());
        assert!(!timer.update());
        assert_eq!(timer.remaining(), None);
    }
}
