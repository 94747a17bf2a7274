//! The stat resolution pipeline: base + items + buffs -> snapshot

use crate::buffs::ActiveBuff;
use crate::items::{ItemRecord, StatModKind, StatModifier};
use crate::stats::{StatSnapshot, StatType};
use std::collections::BTreeMap;

/// Accumulated modifiers for one stat type.
#[derive(Debug, Default, Clone, Copy)]
struct Bucket {
    flat: f64,
    percent_base: f64,
    percent_bonus: f64,
}

impl Bucket {
    fn add(&mut self, modifier: &StatModifier, scale: f64) {
        let value = modifier.value * scale;
        match modifier.kind {
            StatModKind::Flat => self.flat += value,
            StatModKind::PercentBase => self.percent_base += value,
            StatModKind::PercentBonus => self.percent_bonus += value,
        }
    }
}

/// Merges base attributes, item modifiers and stack-scaled buff modifiers
/// into a fresh snapshot.
///
/// Modifiers are first summed into per-stat buckets, so the result does not
/// depend on item or buff ordering. Each bucket is then applied in one pass
/// per stat: flat and percent-of-base resolve against the pre-item base
/// value, percent-of-bonus against the bonus accumulated for that stat.
/// Finally, item passives get their stat-resolution hook (resource-scaled
/// stats), which reads totals already produced by the buckets.
pub fn resolve(base: &StatSnapshot, items: &[ItemRecord], buffs: &[ActiveBuff]) -> StatSnapshot {
    let mut buckets: BTreeMap<StatType, Bucket> = BTreeMap::new();

    for item in items {
        for modifier in &item.modifiers {
            buckets.entry(modifier.stat).or_default().add(modifier, 1.0);
        }
    }
    for buff in buffs {
        for modifier in &buff.config.modifiers {
            buckets
                .entry(modifier.stat)
                .or_default()
                .add(modifier, buff.stacks as f64);
        }
    }

    let mut resolved = base.snapshot();
    for stat in StatType::ALL {
        if let Some(bucket) = buckets.get(&stat) {
            apply_bucket(&mut resolved, stat, bucket);
        }
    }

    for item in items {
        for passive in &item.passives {
            passive.resolve_stats(&mut resolved);
        }
    }

    resolved
}

/// Resolves the target's defensive stats under active debuffs.
///
/// Only negative percent modifiers to armor and magic resist apply, shrinking
/// base and bonus multiplicatively; offensive stats are left untouched.
pub fn resolve_target(base: &StatSnapshot, debuffs: &[ActiveBuff]) -> StatSnapshot {
    let mut armor_shred = 0.0;
    let mut mr_shred = 0.0;

    for debuff in debuffs {
        for modifier in &debuff.config.modifiers {
            if modifier.value >= 0.0 {
                continue;
            }
            let magnitude = modifier.value.abs() * debuff.stacks as f64;
            match modifier.stat {
                StatType::Armor => armor_shred += magnitude,
                StatType::MagicResist => mr_shred += magnitude,
                _ => {}
            }
        }
    }

    let mut resolved = base.snapshot();
    if armor_shred > 0.0 {
        let mult = (1.0 - armor_shred).max(0.0);
        resolved.base_armor *= mult;
        resolved.bonus_armor *= mult;
    }
    if mr_shred > 0.0 {
        let mult = (1.0 - mr_shred).max(0.0);
        resolved.base_mr *= mult;
        resolved.bonus_mr *= mult;
    }
    resolved
}

/// Applies one bucket: `bonus += flat + base * pct_base`, then
/// `bonus += bonus * pct_bonus` with the bonus accumulated so far.
fn apply_bucket(snapshot: &mut StatSnapshot, stat: StatType, bucket: &Bucket) {
    match stat {
        StatType::AttackDamage => {
            paired(snapshot.base_ad, &mut snapshot.bonus_ad, bucket);
        }
        StatType::BonusAttackDamage => {
            single(&mut snapshot.bonus_ad, bucket);
        }
        StatType::AbilityPower => {
            paired(snapshot.base_ap, &mut snapshot.bonus_ap, bucket);
        }
        StatType::Health => {
            paired(snapshot.base_hp, &mut snapshot.bonus_hp, bucket);
        }
        StatType::Mana => {
            paired(snapshot.base_mana, &mut snapshot.bonus_mana, bucket);
        }
        StatType::ManaRegen => {
            single(&mut snapshot.mana_regen, bucket);
        }
        StatType::Armor => {
            paired(snapshot.base_armor, &mut snapshot.bonus_armor, bucket);
        }
        StatType::MagicResist => {
            paired(snapshot.base_mr, &mut snapshot.bonus_mr, bucket);
        }
        StatType::AttackSpeed => {
            // Bonus attack speed is already a fraction of base, so flat
            // additions land on the bonus fraction directly.
            paired(1.0, &mut snapshot.bonus_attack_speed, bucket);
        }
        StatType::AbilityHaste => {
            single(&mut snapshot.ability_haste, bucket);
        }
        StatType::CritChance => {
            single(&mut snapshot.crit_chance, bucket);
        }
        StatType::CritDamage => {
            single(&mut snapshot.crit_damage_multiplier, bucket);
        }
        StatType::Lethality => {
            single(&mut snapshot.lethality, bucket);
        }
        StatType::ArmorPenPercent => {
            single(&mut snapshot.armor_pen_percent, bucket);
        }
        StatType::MagicPenFlat => {
            single(&mut snapshot.magic_pen_flat, bucket);
        }
        StatType::MagicPenPercent => {
            single(&mut snapshot.magic_pen_percent, bucket);
        }
    }
}

fn paired(base: f64, bonus: &mut f64, bucket: &Bucket) {
    *bonus += bucket.flat + base * bucket.percent_base;
    *bonus += *bonus * bucket.percent_bonus;
}

fn single(value: &mut f64, bucket: &Bucket) {
    *value += bucket.flat;
    *value += *value * bucket.percent_bonus;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffs::{BuffConfig, BuffStore};
    use crate::items::{ItemRecord, StatModifier};

    fn base_champion() -> StatSnapshot {
        StatSnapshot {
            base_ad: 100.0,
            base_armor: 40.0,
            base_mr: 30.0,
            base_attack_speed: 0.625,
            ..Default::default()
        }
    }

    #[test]
    fn flat_item_modifiers_accumulate_into_bonus() {
        let sword = ItemRecord::new("long_sword")
            .with_modifier(StatModifier::flat(StatType::AttackDamage, 10.0));
        let blade = ItemRecord::new("b_f_sword")
            .with_modifier(StatModifier::flat(StatType::AttackDamage, 40.0));
        let resolved = resolve(&base_champion(), &[sword, blade], &[]);
        assert!((resolved.bonus_ad - 50.0).abs() < 1e-9);
        assert!((resolved.total_ad() - 150.0).abs() < 1e-9);
    }

    #[test]
    fn percent_of_base_reads_pre_item_base() {
        let item = ItemRecord::new("tonic")
            .with_modifier(StatModifier::flat(StatType::AttackDamage, 20.0))
            .with_modifier(StatModifier::percent_base(StatType::AttackDamage, 0.10));
        let resolved = resolve(&base_champion(), &[item], &[]);
        // 20 flat + 10% of the 100 base, never 10% of 120.
        assert!((resolved.bonus_ad - 30.0).abs() < 1e-9);
    }

    #[test]
    fn percent_of_bonus_reads_accumulated_bonus() {
        let item = ItemRecord::new("amplifier")
            .with_modifier(StatModifier::flat(StatType::AttackDamage, 50.0))
            .with_modifier(StatModifier::percent_bonus(StatType::AttackDamage, 0.20));
        let resolved = resolve(&base_champion(), &[item], &[]);
        // 50 bonus, then +20% of that bonus.
        assert!((resolved.bonus_ad - 60.0).abs() < 1e-9);
    }

    #[test]
    fn item_order_does_not_matter() {
        let a = ItemRecord::new("a")
            .with_modifier(StatModifier::flat(StatType::AttackDamage, 25.0));
        let b = ItemRecord::new("b")
            .with_modifier(StatModifier::percent_bonus(StatType::AttackDamage, 0.5));
        let forward = resolve(&base_champion(), &[a.clone(), b.clone()], &[]);
        let reverse = resolve(&base_champion(), &[b, a], &[]);
        assert!((forward.bonus_ad - reverse.bonus_ad).abs() < 1e-9);
    }

    #[test]
    fn buff_modifiers_scale_with_stacks() {
        let config = BuffConfig::new("frenzy", 3.0)
            .with_max_stacks(3)
            .with_modifier(StatModifier::percent_base(StatType::AttackSpeed, 0.10));
        let mut store = BuffStore::new();
        store.apply(&config, 0.0);
        store.apply(&config, 0.5);
        store.apply(&config, 1.0);

        let resolved = resolve(&base_champion(), &[], store.snapshot());
        // 3 stacks of +10% attack speed.
        assert!((resolved.bonus_attack_speed - 0.30).abs() < 1e-9);
        assert!((resolved.total_attack_speed() - 0.625 * 1.30).abs() < 1e-9);
    }

    #[test]
    fn target_resolution_shreds_defenses_only() {
        let shred = BuffConfig::new("carve", 6.0)
            .with_max_stacks(5)
            .with_modifier(StatModifier::percent_base(StatType::Armor, -0.06));
        let mut debuffs = BuffStore::new();
        debuffs.apply(&shred, 0.0);
        debuffs.apply(&shred, 0.1);

        let target = StatSnapshot {
            base_armor: 100.0,
            bonus_armor: 50.0,
            base_ad: 80.0,
            ..Default::default()
        };
        let resolved = resolve_target(&target, debuffs.snapshot());
        // 2 stacks * 6% = 12% shred, multiplicative on base and bonus.
        assert!((resolved.base_armor - 88.0).abs() < 1e-9);
        assert!((resolved.bonus_armor - 44.0).abs() < 1e-9);
        assert!((resolved.base_ad - 80.0).abs() < 1e-9);
    }

    #[test]
    fn positive_modifiers_never_buff_the_target() {
        let weird = BuffConfig::new("weird", 6.0)
            .with_modifier(StatModifier::percent_base(StatType::Armor, 0.25));
        let mut debuffs = BuffStore::new();
        debuffs.apply(&weird, 0.0);
        let target = StatSnapshot {
            base_armor: 100.0,
            ..Default::default()
        };
        let resolved = resolve_target(&target, debuffs.snapshot());
        assert!((resolved.base_armor - 100.0).abs() < 1e-9);
    }

    #[test]
    fn resolution_preserves_resource_state() {
        let mut base = base_champion();
        base.current_health = 640.0;
        base.current_mana = 210.0;
        let resolved = resolve(&base, &[], &[]);
        assert!((resolved.current_health - 640.0).abs() < 1e-9);
        assert!((resolved.current_mana - 210.0).abs() < 1e-9);
    }
}
