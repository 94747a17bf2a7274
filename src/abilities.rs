//! Ability definitions and the scaling formula

use crate::damage::DamageInstance;
use crate::stats::{DamageType, ProcMask, StatSnapshot, StatType};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors raised at construction time. These indicate a setup
/// bug and are never swallowed.
#[derive(Debug, Error)]
pub enum AbilityError {
    #[error("rank {rank} out of range for {name} (valid: 1..={max})")]
    RankOutOfRange {
        name: String,
        rank: usize,
        max: usize,
    },
    #[error("non-finite coefficient {value} in a scaling ratio of {name}")]
    MalformedRatio { name: String, value: f64 },
}

/// Whose stats a scaling ratio reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatSource {
    Attacker,
    Target,
}

impl Default for StatSource {
    fn default() -> Self {
        StatSource::Attacker
    }
}

/// One term of an ability's damage formula: `coefficient * stat`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScalingRatio {
    pub stat: StatType,
    pub coefficient: f64,
    #[serde(default)]
    pub source: StatSource,
}

impl ScalingRatio {
    pub fn new(stat: StatType, coefficient: f64) -> Self {
        ScalingRatio {
            stat,
            coefficient,
            source: StatSource::Attacker,
        }
    }

    pub fn from_target(stat: StatType, coefficient: f64) -> Self {
        ScalingRatio {
            stat,
            coefficient,
            source: StatSource::Target,
        }
    }
}

fn default_cast_time() -> f64 {
    0.25
}

fn default_travel_time() -> f64 {
    0.25
}

fn default_proc_coefficient() -> f64 {
    1.0
}

/// Per-rank numbers of an ability.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AbilityRank {
    pub base_damage: f64,
    #[serde(default)]
    pub cost: f64,
    pub cooldown: f64,
}

/// Static ability definition, shared across ranks.
#[derive(Debug, Clone)]
pub struct AbilityConfig {
    pub name: String,
    pub damage_type: DamageType,
    pub ratios: Vec<ScalingRatio>,
    pub ranks: Vec<AbilityRank>,
    pub procs: ProcMask,
    pub proc_coefficient: f64,
    pub cast_time: f64,
    pub travel_time: f64,
    pub tags: Vec<String>,
}

impl AbilityConfig {
    pub fn new(name: impl Into<String>, damage_type: DamageType) -> Self {
        AbilityConfig {
            name: name.into(),
            damage_type,
            ratios: Vec::new(),
            ranks: Vec::new(),
            procs: ProcMask::SPELL,
            proc_coefficient: default_proc_coefficient(),
            cast_time: default_cast_time(),
            travel_time: default_travel_time(),
            tags: Vec::new(),
        }
    }

    pub fn with_ratio(mut self, ratio: ScalingRatio) -> Self {
        self.ratios.push(ratio);
        self
    }

    pub fn with_rank(mut self, rank: AbilityRank) -> Self {
        self.ranks.push(rank);
        self
    }

    pub fn with_procs(mut self, procs: ProcMask) -> Self {
        self.procs = procs;
        self
    }

    pub fn with_proc_coefficient(mut self, coefficient: f64) -> Self {
        self.proc_coefficient = coefficient;
        self
    }
}

/// An ability bound to a rank, ready to cast.
#[derive(Debug, Clone)]
pub struct Ability {
    config: AbilityConfig,
    rank: usize,
}

impl Ability {
    /// Binds a config to a rank. Fails if the rank has no data entry or any
    /// ratio carries a non-finite coefficient.
    pub fn new(config: AbilityConfig, rank: usize) -> Result<Self, AbilityError> {
        if rank < 1 || rank > config.ranks.len() {
            return Err(AbilityError::RankOutOfRange {
                name: config.name,
                rank,
                max: config.ranks.len(),
            });
        }
        if let Some(bad) = config.ratios.iter().find(|r| !r.coefficient.is_finite()) {
            return Err(AbilityError::MalformedRatio {
                value: bad.coefficient,
                name: config.name,
            });
        }
        Ok(Ability { config, rank })
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn cast_time(&self) -> f64 {
        self.config.cast_time
    }

    pub fn travel_time(&self) -> f64 {
        self.config.travel_time
    }

    pub fn rank_data(&self) -> &AbilityRank {
        // Rank validity is a construction invariant.
        &self.config.ranks[self.rank - 1]
    }

    /// Builds the raw damage packet for one cast: rank base damage plus every
    /// scaling ratio evaluated against the selected combatant's stats.
    pub fn cast(&self, attacker: &StatSnapshot, target: &StatSnapshot) -> DamageInstance {
        let mut raw = self.rank_data().base_damage;
        for ratio in &self.config.ratios {
            raw += ratio.coefficient * stat_value(ratio, attacker, target);
        }

        let mut instance = DamageInstance::new(raw, self.config.damage_type, *attacker)
            .with_procs(self.config.procs)
            .with_coefficient(self.config.proc_coefficient);
        for tag in &self.config.tags {
            instance = instance.with_tag(tag.clone());
        }
        instance
    }
}

fn stat_value(ratio: &ScalingRatio, attacker: &StatSnapshot, target: &StatSnapshot) -> f64 {
    let stats = match ratio.source {
        StatSource::Attacker => attacker,
        StatSource::Target => target,
    };
    match ratio.stat {
        StatType::AttackDamage => stats.total_ad(),
        StatType::BonusAttackDamage => stats.bonus_ad,
        StatType::AbilityPower => stats.total_ap(),
        StatType::Health => stats.total_hp(),
        StatType::Mana => stats.current_mana,
        StatType::ManaRegen => stats.mana_regen,
        StatType::Armor => stats.total_armor(),
        StatType::MagicResist => stats.total_mr(),
        StatType::AttackSpeed => stats.total_attack_speed(),
        StatType::AbilityHaste => stats.ability_haste,
        StatType::CritChance => stats.crit_chance,
        StatType::CritDamage => stats.crit_damage_multiplier,
        StatType::Lethality => stats.lethality,
        StatType::ArmorPenPercent => stats.armor_pen_percent,
        StatType::MagicPenFlat => stats.magic_pen_flat,
        StatType::MagicPenPercent => stats.magic_pen_percent,
    }
}
