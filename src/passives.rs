//! Item passives: event-driven effects and stat-resolution hooks

use crate::buffs::BuffConfig;
use crate::damage::DamageInstance;
use crate::events::{priority, BuffGrant, BuffRecipient, CombatEvent, EventBus, EventKind};
use crate::stats::{DamageType, ProcMask, StatSnapshot};
use std::cell::Cell;
use std::rc::Rc;

/// A passive behavior carried by an equipped item.
///
/// Passives hook into the simulation two ways: event subscriptions made in
/// [`register`](PassiveEffect::register), and the per-tick
/// [`resolve_stats`](PassiveEffect::resolve_stats) hook for stats derived
/// from other stats. A passive holding per-run state (e.g. an internal
/// cooldown) uses `Cell` fields, so one instance must never be shared
/// between two simulation runs.
pub trait PassiveEffect {
    fn name(&self) -> &str;

    /// Subscribes the passive's event handlers. The default registers
    /// nothing, which suits pure stat passives.
    fn register(self: Rc<Self>, bus: &mut EventBus) {
        let _ = bus;
    }

    /// Adjusts the freshly resolved snapshot. Runs after every stat bucket
    /// has been applied, so totals are final when this reads them.
    fn resolve_stats(&self, stats: &mut StatSnapshot) {
        let _ = stats;
    }
}

/// Bonus damage appended to every on-hit trigger, scaled by the triggering
/// instance's proc coefficient.
#[derive(Debug)]
pub struct OnHitDamage {
    name: String,
    pub amount: f64,
    pub damage_type: DamageType,
}

impl OnHitDamage {
    pub fn new(name: impl Into<String>, amount: f64, damage_type: DamageType) -> Self {
        OnHitDamage {
            name: name.into(),
            amount,
            damage_type,
        }
    }
}

impl PassiveEffect for OnHitDamage {
    fn name(&self) -> &str {
        &self.name
    }

    fn register(self: Rc<Self>, bus: &mut EventBus) {
        bus.subscribe(
            EventKind::PreMitigationHit,
            priority::NORMAL,
            Box::new(move |event, _| {
                let Some(base) = event.base_instance() else {
                    return;
                };
                if !base.procs.contains(ProcMask::ON_HIT) || base.proc_coefficient <= 0.0 {
                    return;
                }
                let raw = self.amount * base.proc_coefficient;
                // Appended with an empty mask so it never triggers further
                // on-hit effects.
                event
                    .instances
                    .push(DamageInstance::new(raw, self.damage_type, event.source));
            }),
        );
    }
}

/// Converts a fraction of maximum mana into bonus attack damage during stat
/// resolution.
#[derive(Debug)]
pub struct ManaScaledAttack {
    name: String,
    pub ratio: f64,
}

impl ManaScaledAttack {
    pub fn new(name: impl Into<String>, ratio: f64) -> Self {
        ManaScaledAttack {
            name: name.into(),
            ratio,
        }
    }
}

impl PassiveEffect for ManaScaledAttack {
    fn name(&self) -> &str {
        &self.name
    }

    fn resolve_stats(&self, stats: &mut StatSnapshot) {
        stats.bonus_ad += stats.total_mana() * self.ratio;
    }
}

/// Spellblade: completing a cast arms the next on-hit trigger for bonus
/// damage, gated by an internal cooldown.
///
/// The charge amplifies the triggering hit itself rather than adding a
/// separate instance, matching how empowered attacks behave.
#[derive(Debug)]
pub struct Spellblade {
    name: String,
    pub ratio: f64,
    pub cooldown: f64,
    armed: Cell<bool>,
    last_proc: Cell<f64>,
}

impl Spellblade {
    pub fn new(name: impl Into<String>, ratio: f64, cooldown: f64) -> Self {
        Spellblade {
            name: name.into(),
            ratio,
            cooldown,
            armed: Cell::new(false),
            last_proc: Cell::new(f64::NEG_INFINITY),
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed.get()
    }
}

impl PassiveEffect for Spellblade {
    fn name(&self) -> &str {
        &self.name
    }

    fn register(self: Rc<Self>, bus: &mut EventBus) {
        let arm = Rc::clone(&self);
        bus.subscribe(
            EventKind::CastComplete,
            priority::NORMAL,
            Box::new(move |event, _| {
                if event.timestamp - arm.last_proc.get() >= arm.cooldown {
                    arm.armed.set(true);
                }
            }),
        );

        bus.subscribe(
            EventKind::PreMitigationHit,
            // Runs before additive on-hit passives so the empowerment always
            // lands on the base hit.
            priority::HIGH,
            Box::new(move |event, _| {
                if !self.armed.get() {
                    return;
                }
                let bonus = event.source.base_ad * self.ratio;
                let Some(base) = event.instances.first_mut() else {
                    return;
                };
                if !base.procs.contains(ProcMask::ON_HIT) {
                    return;
                }
                base.raw += bonus;
                self.armed.set(false);
                self.last_proc.set(event.timestamp);
                tracing::trace!(passive = %self.name, time = event.timestamp, "spellblade consumed");
            }),
        );
    }
}

/// Grants the attacker a buff every time a basic attack connects.
#[derive(Debug)]
pub struct BuffOnAttack {
    name: String,
    pub buff: BuffConfig,
}

impl BuffOnAttack {
    pub fn new(name: impl Into<String>, buff: BuffConfig) -> Self {
        BuffOnAttack {
            name: name.into(),
            buff,
        }
    }
}

impl PassiveEffect for BuffOnAttack {
    fn name(&self) -> &str {
        &self.name
    }

    fn register(self: Rc<Self>, bus: &mut EventBus) {
        bus.subscribe(
            EventKind::PreMitigationHit,
            priority::NORMAL,
            Box::new(move |event, emitter| {
                let Some(base) = event.base_instance() else {
                    return;
                };
                if !base.procs.contains(ProcMask::ON_ATTACK) {
                    return;
                }
                emitter.emit(
                    CombatEvent::new(
                        EventKind::BuffApply,
                        event.timestamp,
                        event.source,
                        event.target,
                    )
                    .with_buff(BuffGrant {
                        recipient: BuffRecipient::Attacker,
                        config: self.buff.clone(),
                    }),
                );
            }),
        );
    }
}

/// Applies a stacking debuff to the target whenever physical damage lands.
#[derive(Debug)]
pub struct ShredOnDamage {
    name: String,
    pub debuff: BuffConfig,
}

impl ShredOnDamage {
    pub fn new(name: impl Into<String>, debuff: BuffConfig) -> Self {
        ShredOnDamage {
            name: name.into(),
            debuff,
        }
    }
}

impl PassiveEffect for ShredOnDamage {
    fn name(&self) -> &str {
        &self.name
    }

    fn register(self: Rc<Self>, bus: &mut EventBus) {
        bus.subscribe(
            EventKind::PostMitigationDamage,
            priority::NORMAL,
            Box::new(move |event, emitter| {
                let Some(result) = event.result else {
                    return;
                };
                if result.damage_type != DamageType::Physical || result.post_mitigation <= 0.0 {
                    return;
                }
                emitter.emit(
                    CombatEvent::new(
                        EventKind::BuffApply,
                        event.timestamp,
                        event.source,
                        event.target,
                    )
                    .with_buff(BuffGrant {
                        recipient: BuffRecipient::Target,
                        config: self.debuff.clone(),
                    }),
                );
            }),
        );
    }
}

/// On-hit damage scaled by the target's current health, with a flat floor.
#[derive(Debug)]
pub struct CurrentHealthOnHit {
    name: String,
    pub percent: f64,
    pub min_damage: f64,
    pub damage_type: DamageType,
}

impl CurrentHealthOnHit {
    pub fn new(
        name: impl Into<String>,
        percent: f64,
        min_damage: f64,
        damage_type: DamageType,
    ) -> Self {
        CurrentHealthOnHit {
            name: name.into(),
            percent,
            min_damage,
            damage_type,
        }
    }
}

impl PassiveEffect for CurrentHealthOnHit {
    fn name(&self) -> &str {
        &self.name
    }

    fn register(self: Rc<Self>, bus: &mut EventBus) {
        bus.subscribe(
            EventKind::PreMitigationHit,
            priority::NORMAL,
            Box::new(move |event, _| {
                let Some(base) = event.base_instance() else {
                    return;
                };
                if !base.procs.contains(ProcMask::ON_HIT) || base.proc_coefficient <= 0.0 {
                    return;
                }
                let scaled = self.percent * event.target.current_health;
                let raw = scaled.max(self.min_damage) * base.proc_coefficient;
                event
                    .instances
                    .push(DamageInstance::new(raw, self.damage_type, event.source));
            }),
        );
    }
}
