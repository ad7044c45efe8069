//! Named deadlines on the simulation clock (milliseconds)

use std::collections::HashMap;

/// Timers the game uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerId {
    /// Repeating: spawn one item per interval while playing
    ItemSpawn,
    /// One-shot: leave the game-over screen
    GameOverReset,
}

/// Deadline table keyed by `TimerId`
#[derive(Debug, Clone, Default)]
pub struct TimerManager {
    deadlines: HashMap<TimerId, u64>,
}

impl TimerManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm (or re-arm) `id` to fire `interval_ms` after `now_ms`
    pub fn set(&mut self, id: TimerId, now_ms: u64, interval_ms: u64) {
        self.deadlines.insert(id, now_ms.saturating_add(interval_ms));
    }

    /// Repeating check. An unarmed timer is armed and reports false; an
    /// elapsed timer is re-armed for the next cycle and reports true.
    pub fn check_repeating(&mut self, id: TimerId, now_ms: u64, interval_ms: u64) -> bool {
        match self.deadlines.get(&id) {
            None => {
                self.set(id, now_ms, interval_ms);
                false
            }
            Some(&deadline) if now_ms >= deadline => {
                self.set(id, now_ms, interval_ms);
                true
            }
            Some(_) => false,
        }
    }

    /// One-shot check. An elapsed timer is cleared and reports true; an
    /// unarmed timer never fires.
    pub fn check_once(&mut self, id: TimerId, now_ms: u64) -> bool {
        match self.deadlines.get(&id) {
            Some(&deadline) if now_ms >= deadline => {
                self.deadlines.remove(&id);
                true
            }
            _ => false,
        }
    }

    pub fn is_armed(&self, id: TimerId) -> bool {
        self.deadlines.contains_key(&id)
    }

    pub fn deadline(&self, id: TimerId) -> Option<u64> {
        self.deadlines.get(&id).copied()
    }

    pub fn cancel(&mut self, id: TimerId) {
        self.deadlines.remove(&id);
    }

    /// Drop every deadline (round reset)
    pub fn clear(&mut self) {
        self.deadlines.clear();
    }
}
