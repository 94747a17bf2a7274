//! Per-ability cooldowns and the shared action lock

use std::collections::HashMap;

/// Tracks when each ability is next ready, plus a single shared action lock
/// covering cast and attack animation time.
#[derive(Debug, Default)]
pub struct CooldownTracker {
    ready_at: HashMap<String, f64>,
    global_cooldown: f64,
}

impl CooldownTracker {
    pub fn new() -> Self {
        CooldownTracker::default()
    }

    /// An ability is ready when the action lock has elapsed and its own
    /// cooldown (if any was ever recorded) has elapsed.
    pub fn is_ready(&self, name: &str, now: f64) -> bool {
        if now < self.global_cooldown {
            return false;
        }
        match self.ready_at.get(name) {
            Some(ready) => now >= *ready,
            None => true,
        }
    }

    /// Starts an ability's cooldown, scaled by the caster's current haste
    /// multiplier.
    pub fn put_on_cooldown(&mut self, name: &str, base_cooldown: f64, haste_mult: f64, now: f64) {
        let real_cooldown = base_cooldown * haste_mult;
        self.ready_at.insert(name.to_string(), now + real_cooldown);
    }

    /// Extends the action lock to at least `now + duration`. Never shortens it.
    pub fn trigger_global(&mut self, duration: f64, now: f64) {
        self.global_cooldown = self.global_cooldown.max(now + duration);
    }

    pub fn global_cooldown(&self) -> f64 {
        self.global_cooldown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untracked_ability_is_ready() {
        let tracker = CooldownTracker::new();
        assert!(tracker.is_ready("mystic_shot", 0.0));
    }

    #[test]
    fn cooldown_scales_with_haste() {
        let mut tracker = CooldownTracker::new();
        // 100 haste halves a 4.5s cooldown to 2.25s.
        tracker.put_on_cooldown("mystic_shot", 4.5, 0.5, 0.0);
        assert!(!tracker.is_ready("mystic_shot", 2.2));
        assert!(tracker.is_ready("mystic_shot", 2.25));
    }

    #[test]
    fn action_lock_blocks_every_ability() {
        let mut tracker = CooldownTracker::new();
        tracker.trigger_global(0.25, 0.0);
        assert!(!tracker.is_ready("anything", 0.1));
        assert!(tracker.is_ready("anything", 0.25));
    }

    #[test]
    fn action_lock_never_shrinks() {
        let mut tracker = CooldownTracker::new();
        tracker.trigger_global(1.0, 0.0);
        tracker.trigger_global(0.1, 0.0);
        assert!((tracker.global_cooldown() - 1.0).abs() < f64::EPSILON);

        tracker.trigger_global(0.5, 0.8);
        assert!((tracker.global_cooldown() - 1.3).abs() < f64::EPSILON);
    }
}
