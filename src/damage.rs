//! Damage packets and the mitigation engine

use crate::events::{priority, CombatEvent, EventBus, EventKind};
use crate::stats::{DamageType, ProcMask, StatSnapshot};
use serde::Serialize;

/// A raw, pre-mitigation damage packet.
///
/// Carries a frozen copy of the source's stats so later stat changes never
/// retroactively affect damage that is already in flight.
#[derive(Debug, Clone)]
pub struct DamageInstance {
    pub raw: f64,
    pub damage_type: DamageType,
    pub source: StatSnapshot,
    pub procs: ProcMask,
    /// Effectiveness multiplier for secondary on-hit effects.
    pub proc_coefficient: f64,
    pub tags: Vec<String>,
}

impl DamageInstance {
    pub fn new(raw: f64, damage_type: DamageType, source: StatSnapshot) -> Self {
        DamageInstance {
            raw,
            damage_type,
            source,
            procs: ProcMask::empty(),
            proc_coefficient: 1.0,
            tags: Vec::new(),
        }
    }

    pub fn with_procs(mut self, procs: ProcMask) -> Self {
        self.procs = procs;
        self
    }

    pub fn with_coefficient(mut self, coefficient: f64) -> Self {
        self.proc_coefficient = coefficient;
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }
}

/// Mitigated totals for one resolved combat event, which may aggregate
/// several damage instances.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DamageResult {
    pub damage_type: DamageType,
    pub pre_mitigation: f64,
    pub post_mitigation: f64,
}

/// Converts a raw damage instance into a mitigated result against the
/// target's current defenses.
///
/// Penetration order is fixed: percent reduction first, then flat
/// subtraction, then floor at zero. Reversing it changes outcomes.
pub fn mitigate(instance: &DamageInstance, target: &StatSnapshot) -> DamageResult {
    let raw = instance.raw;

    let final_damage = match instance.damage_type {
        DamageType::True => raw,
        DamageType::Physical => {
            let attacker = &instance.source;
            let mut armor = target.total_armor();
            armor *= 1.0 - attacker.armor_pen_percent;
            armor -= attacker.lethality;
            armor = armor.max(0.0);
            raw * 100.0 / (100.0 + armor)
        }
        DamageType::Magic => {
            let attacker = &instance.source;
            let mut mr = target.total_mr();
            mr *= 1.0 - attacker.magic_pen_percent;
            mr -= attacker.magic_pen_flat;
            mr = mr.max(0.0);
            raw * 100.0 / (100.0 + mr)
        }
    };

    DamageResult {
        damage_type: instance.damage_type,
        pre_mitigation: raw,
        post_mitigation: final_damage,
    }
}

/// Registers the mitigation aggregator on a bus.
///
/// Runs last on every pre-mitigation hit, after all passives have had their
/// chance to append instances: sums pre- and post-mitigation amounts across
/// every instance, stores the combined result on the event, and republishes
/// it as a post-mitigation damage event.
pub fn register_mitigation(bus: &mut EventBus) {
    bus.subscribe(
        EventKind::PreMitigationHit,
        priority::LOWEST,
        Box::new(|event, emitter| {
            let mut pre = 0.0;
            let mut post = 0.0;
            for instance in &event.instances {
                let result = mitigate(instance, &event.target);
                pre += result.pre_mitigation;
                post += result.post_mitigation;
            }

            let damage_type = event
                .instances
                .first()
                .map(|instance| instance.damage_type)
                .unwrap_or(DamageType::True);
            let result = DamageResult {
                damage_type,
                pre_mitigation: pre,
                post_mitigation: post,
            };
            event.result = Some(result);

            let mut dealt = CombatEvent::new(
                EventKind::PostMitigationDamage,
                event.timestamp,
                event.source,
                event.target,
            )
            .with_label(event.source_label.clone());
            dealt.instances = event.instances.clone();
            dealt.result = Some(result);
            emitter.emit(dealt);
        }),
    );
}
