//! Stat snapshots and the combat stat model

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Hard cap on attacks per second, applied in [`StatSnapshot::total_attack_speed`].
pub const ATTACK_SPEED_CAP: f64 = 2.5;

/// Classification of a damage instance for mitigation purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageType {
    Physical,
    Magic,
    True,
}

/// Stats addressable by modifiers and scaling ratios.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatType {
    AttackDamage,
    BonusAttackDamage,
    AbilityPower,
    Health,
    Mana,
    ManaRegen,
    Armor,
    MagicResist,
    AttackSpeed,
    AbilityHaste,
    CritChance,
    CritDamage,
    Lethality,
    ArmorPenPercent,
    MagicPenFlat,
    MagicPenPercent,
}

impl StatType {
    /// All stat types, in the order buckets are applied during resolution.
    pub const ALL: [StatType; 16] = [
        StatType::AttackDamage,
        StatType::BonusAttackDamage,
        StatType::AbilityPower,
        StatType::Health,
        StatType::Mana,
        StatType::ManaRegen,
        StatType::Armor,
        StatType::MagicResist,
        StatType::AttackSpeed,
        StatType::AbilityHaste,
        StatType::CritChance,
        StatType::CritDamage,
        StatType::Lethality,
        StatType::ArmorPenPercent,
        StatType::MagicPenFlat,
        StatType::MagicPenPercent,
    ];
}

bitflags! {
    /// Trigger classification carried by a damage instance.
    ///
    /// On-hit effects key off `ON_HIT`, attack-cadence effects off `ON_ATTACK`,
    /// spell effects off `SPELL`. An empty mask means the instance triggers
    /// nothing, which is how secondary instances avoid proc chains.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ProcMask: u8 {
        const ON_HIT = 1 << 0;
        const ON_ATTACK = 1 << 1;
        const SPELL = 1 << 2;
        const PERIODIC = 1 << 3;

        const BASIC_ATTACK = Self::ON_HIT.bits() | Self::ON_ATTACK.bits();
    }
}

/// A fully resolved set of combat attributes at one instant.
///
/// This is a plain value type: every copy is independent, and a copy embedded
/// in an event is never affected by later stat changes. Produced by the stat
/// resolver every tick; never shared by reference between combatants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatSnapshot {
    // Resource state
    pub current_health: f64,
    pub current_mana: f64,

    // Primary stats, base/bonus pairs
    pub base_hp: f64,
    pub bonus_hp: f64,
    pub base_ad: f64,
    pub bonus_ad: f64,
    pub base_ap: f64,
    pub bonus_ap: f64,
    pub base_mana: f64,
    pub bonus_mana: f64,
    pub base_armor: f64,
    pub bonus_armor: f64,
    pub base_mr: f64,
    pub bonus_mr: f64,

    // Offensive stats
    pub base_attack_speed: f64,
    /// Bonus attack speed as a fraction of base (0.50 = +50%).
    pub bonus_attack_speed: f64,
    pub ability_haste: f64,
    pub crit_chance: f64,
    pub crit_damage_multiplier: f64,

    // Penetration
    pub lethality: f64,
    pub armor_pen_percent: f64,
    pub magic_pen_flat: f64,
    pub magic_pen_percent: f64,

    // Regeneration, per second
    pub mana_regen: f64,
}

impl Default for StatSnapshot {
    fn default() -> Self {
        StatSnapshot {
            current_health: 0.0,
            current_mana: 0.0,
            base_hp: 0.0,
            bonus_hp: 0.0,
            base_ad: 0.0,
            bonus_ad: 0.0,
            base_ap: 0.0,
            bonus_ap: 0.0,
            base_mana: 0.0,
            bonus_mana: 0.0,
            base_armor: 0.0,
            bonus_armor: 0.0,
            base_mr: 0.0,
            bonus_mr: 0.0,
            base_attack_speed: 0.625,
            bonus_attack_speed: 0.0,
            ability_haste: 0.0,
            crit_chance: 0.0,
            crit_damage_multiplier: 1.75,
            lethality: 0.0,
            armor_pen_percent: 0.0,
            magic_pen_flat: 0.0,
            magic_pen_percent: 0.0,
            mana_regen: 0.0,
        }
    }
}

impl StatSnapshot {
    pub fn total_hp(&self) -> f64 {
        self.base_hp + self.bonus_hp
    }

    pub fn total_ad(&self) -> f64 {
        self.base_ad + self.bonus_ad
    }

    pub fn total_ap(&self) -> f64 {
        self.base_ap + self.bonus_ap
    }

    pub fn total_mana(&self) -> f64 {
        self.base_mana + self.bonus_mana
    }

    pub fn total_armor(&self) -> f64 {
        self.base_armor + self.bonus_armor
    }

    pub fn total_mr(&self) -> f64 {
        self.base_mr + self.bonus_mr
    }

    /// Attacks per second, hard capped at [`ATTACK_SPEED_CAP`].
    pub fn total_attack_speed(&self) -> f64 {
        let value = self.base_attack_speed * (1.0 + self.bonus_attack_speed);
        value.min(ATTACK_SPEED_CAP)
    }

    /// Converts ability haste into a cooldown multiplier (100 haste = 0.5x).
    /// Negative haste never lengthens cooldowns.
    pub fn cooldown_multiplier(&self) -> f64 {
        if self.ability_haste < 0.0 {
            return 1.0;
        }
        100.0 / (100.0 + self.ability_haste)
    }

    /// A frozen value copy, taken at the instant an action is committed.
    pub fn snapshot(&self) -> StatSnapshot {
        *self
    }
}
