//! Timed stat modifiers: stacking, refresh and expiry

use crate::items::StatModifier;
use serde::{Deserialize, Serialize};

fn default_max_stacks() -> u32 {
    1
}

fn default_refresh() -> bool {
    true
}

/// Static definition of a buff or debuff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuffConfig {
    pub name: String,
    pub duration: f64,
    #[serde(default = "default_max_stacks")]
    pub max_stacks: u32,
    #[serde(default = "default_refresh")]
    pub refresh_on_stack: bool,
    #[serde(default)]
    pub modifiers: Vec<StatModifier>,
}

impl BuffConfig {
    pub fn new(name: impl Into<String>, duration: f64) -> Self {
        BuffConfig {
            name: name.into(),
            duration,
            max_stacks: 1,
            refresh_on_stack: true,
            modifiers: Vec::new(),
        }
    }

    pub fn with_max_stacks(mut self, max_stacks: u32) -> Self {
        self.max_stacks = max_stacks;
        self
    }

    pub fn with_refresh_on_stack(mut self, refresh: bool) -> Self {
        self.refresh_on_stack = refresh;
        self
    }

    pub fn with_modifier(mut self, modifier: StatModifier) -> Self {
        self.modifiers.push(modifier);
        self
    }
}

/// A live buff instance on one entity.
#[derive(Debug, Clone)]
pub struct ActiveBuff {
    pub config: BuffConfig,
    pub stacks: u32,
    pub applied_at: f64,
    pub expires_at: f64,
}

impl ActiveBuff {
    fn new(config: BuffConfig, now: f64) -> Self {
        let expires_at = now + config.duration;
        ActiveBuff {
            config,
            stacks: 1,
            applied_at: now,
            expires_at,
        }
    }

    fn add_stack(&mut self, now: f64) {
        if self.stacks < self.config.max_stacks {
            self.stacks += 1;
        }
        if self.config.refresh_on_stack {
            self.expires_at = now + self.config.duration;
        }
    }
}

/// Per-entity store of active buffs (attacker) or debuffs (target).
///
/// Backed by a Vec so iteration order is insertion order; the resolver walks
/// this every tick and the simulation's output must not depend on hash order.
#[derive(Debug, Default)]
pub struct BuffStore {
    active: Vec<ActiveBuff>,
}

impl BuffStore {
    pub fn new() -> Self {
        BuffStore::default()
    }

    /// Applies a buff: stacks an existing instance of the same name, or
    /// creates a new one at 1 stack.
    pub fn apply(&mut self, config: &BuffConfig, now: f64) {
        if let Some(existing) = self
            .active
            .iter_mut()
            .find(|buff| buff.config.name == config.name)
        {
            existing.add_stack(now);
            tracing::trace!(buff = %config.name, stacks = existing.stacks, time = now, "buff stacked");
        } else {
            tracing::debug!(buff = %config.name, time = now, "buff applied");
            self.active.push(ActiveBuff::new(config.clone(), now));
        }
    }

    /// Removes every buff whose expiration is at or before `now`.
    pub fn tick(&mut self, now: f64) {
        self.active.retain(|buff| {
            let keep = buff.expires_at > now;
            if !keep {
                tracing::debug!(buff = %buff.config.name, time = now, "buff expired");
            }
            keep
        });
    }

    /// Currently active buffs, for consumption by the stat resolver.
    pub fn snapshot(&self) -> &[ActiveBuff] {
        &self.active
    }

    pub fn stacks_of(&self, name: &str) -> u32 {
        self.active
            .iter()
            .find(|buff| buff.config.name == name)
            .map(|buff| buff.stacks)
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::items::StatModifier;
    use crate::stats::StatType;

    fn attack_speed_buff() -> BuffConfig {
        BuffConfig::new("frenzy", 3.0)
            .with_max_stacks(3)
            .with_modifier(StatModifier::percent_base(StatType::AttackSpeed, 0.10))
    }

    #[test]
    fn single_stack_buff_never_exceeds_one() {
        let config = BuffConfig::new("quicken", 2.0);
        let mut store = BuffStore::new();
        for i in 0..5 {
            store.apply(&config, i as f64 * 0.1);
        }
        assert_eq!(store.stacks_of("quicken"), 1);
    }

    #[test]
    fn stacking_caps_at_max() {
        let config = attack_speed_buff();
        let mut store = BuffStore::new();
        for i in 0..6 {
            store.apply(&config, i as f64 * 0.5);
        }
        assert_eq!(store.stacks_of("frenzy"), 3);
    }

    #[test]
    fn tick_removes_exactly_the_expired() {
        let mut store = BuffStore::new();
        store.apply(&BuffConfig::new("short", 1.0), 0.0);
        store.apply(&BuffConfig::new("long", 5.0), 0.0);

        store.tick(0.9);
        assert_eq!(store.snapshot().len(), 2);

        // Expiration at exactly `now` counts as expired.
        store.tick(1.0);
        assert_eq!(store.snapshot().len(), 1);
        assert_eq!(store.stacks_of("long"), 1);

        store.tick(5.0);
        assert!(store.is_empty());
    }

    #[test]
    fn refresh_on_stack_extends_duration() {
        let config = attack_speed_buff();
        let mut store = BuffStore::new();
        store.apply(&config, 0.0);
        store.apply(&config, 1.0);
        store.apply(&config, 2.0);

        // Stacked at t=0,1,2 with 3s refresh: still fully active at 2.9.
        store.tick(2.9);
        assert_eq!(store.stacks_of("frenzy"), 3);

        // Expires 3s after the last application.
        store.tick(5.0);
        assert!(store.is_empty());
    }

    #[test]
    fn no_refresh_keeps_original_expiration() {
        let config = BuffConfig::new("carve", 4.0)
            .with_max_stacks(5)
            .with_refresh_on_stack(false);
        let mut store = BuffStore::new();
        store.apply(&config, 0.0);
        store.apply(&config, 3.0);
        assert_eq!(store.stacks_of("carve"), 2);

        // Expiration stays anchored to the first application.
        store.tick(4.0);
        assert!(store.is_empty());
    }
}
