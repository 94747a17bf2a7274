//! Deterministic single-attacker combat simulation core.
//!
//! Models one attacker hitting one target over a fixed window of discrete
//! time: stat resolution from items and buffs, ability casts gated by
//! cooldowns and mana, basic attacks paced by attack speed, item passives
//! reacting over an event bus, and a mitigation pipeline with a fixed
//! penetration order. Runs contain no randomness: the same scenario always
//! produces the same damage log.

pub mod abilities;
pub mod buffs;
pub mod config;
pub mod cooldowns;
pub mod damage;
pub mod engine;
pub mod events;
pub mod items;
pub mod passives;
pub mod resolver;
pub mod stats;

pub use abilities::{Ability, AbilityConfig, AbilityError, AbilityRank, ScalingRatio};
pub use buffs::{ActiveBuff, BuffConfig, BuffStore};
pub use config::{ItemLibrary, ScenarioConfig, ScenarioError};
pub use cooldowns::CooldownTracker;
pub use damage::{mitigate, DamageInstance, DamageResult};
pub use engine::{simulate, DamageRecord, SimReport, TimeEngine};
pub use events::{CombatEvent, EventBus, EventKind};
pub use items::{ItemRecord, StatModifier};
pub use passives::PassiveEffect;
pub use resolver::{resolve, resolve_target};
pub use stats::{DamageType, ProcMask, StatSnapshot, StatType, ATTACK_SPEED_CAP};
