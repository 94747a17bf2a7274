//! Discrete-time combat loop and the scheduled event queue

use crate::abilities::Ability;
use crate::buffs::BuffStore;
use crate::cooldowns::CooldownTracker;
use crate::damage::{self, DamageInstance};
use crate::events::{priority, BuffRecipient, CombatEvent, EventBus, EventKind};
use crate::items::ItemRecord;
use crate::resolver;
use crate::stats::{DamageType, ProcMask, StatSnapshot};
use serde::Serialize;
use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::rc::Rc;

/// Simulation tick length in seconds (~30 updates per second).
pub const TIME_STEP: f64 = 0.033;

/// Fraction of the attack interval spent in windup before the hit lands.
pub const ATTACK_WINDUP_FRACTION: f64 = 0.2;

/// A combat event waiting in the queue for its fire time.
struct Scheduled {
    time: f64,
    seq: u64,
    event: CombatEvent,
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.seq == other.seq
    }
}

impl Eq for Scheduled {}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed for min-heap behavior; the monotonic sequence breaks
        // timestamp ties in scheduling order.
        other
            .time
            .partial_cmp(&self.time)
            .unwrap_or(Ordering::Equal)
            .then(other.seq.cmp(&self.seq))
    }
}

/// One resolved damage event, as recorded in the run log.
#[derive(Debug, Clone, Serialize)]
pub struct DamageRecord {
    pub timestamp: f64,
    pub source: String,
    pub damage_type: DamageType,
    pub pre_mitigation: f64,
    pub post_mitigation: f64,
}

/// Accumulating state shared with the bus subscribers during a run.
#[derive(Debug, Default)]
struct RunLog {
    total_damage: f64,
    records: Vec<DamageRecord>,
    target_health: f64,
}

/// Summary of one completed simulation run.
#[derive(Debug, Clone, Serialize)]
pub struct SimReport {
    pub duration: f64,
    pub total_damage: f64,
    pub events: Vec<DamageRecord>,
    pub mana_remaining: f64,
    pub target_health: f64,
}

impl SimReport {
    pub fn dps(&self) -> f64 {
        if self.duration <= 0.0 {
            return 0.0;
        }
        self.total_damage / self.duration
    }
}

/// The combat loop: advances time in fixed steps, fires due scheduled
/// events, and lets the attacker act whenever the action lock allows.
///
/// All cross-component communication goes through the event bus, so every
/// item passive sees the same hits the damage log sees. The run is fully
/// deterministic: identical inputs produce an identical event log.
pub struct TimeEngine {
    bus: EventBus,
    queue: BinaryHeap<Scheduled>,
    seq: u64,
    now: f64,
    time_step: f64,
    duration: f64,

    attacker_base: StatSnapshot,
    target_base: StatSnapshot,
    attacker: StatSnapshot,
    target: StatSnapshot,
    attacker_mana: f64,

    items: Vec<ItemRecord>,
    abilities: Vec<Ability>,
    cooldowns: CooldownTracker,
    next_attack_time: f64,

    attacker_buffs: Rc<RefCell<BuffStore>>,
    target_debuffs: Rc<RefCell<BuffStore>>,
    log: Rc<RefCell<RunLog>>,
}

impl TimeEngine {
    pub fn new(
        attacker_base: StatSnapshot,
        target_base: StatSnapshot,
        items: Vec<ItemRecord>,
        abilities: Vec<Ability>,
        duration: f64,
    ) -> Self {
        let mut engine = TimeEngine {
            bus: EventBus::new(),
            queue: BinaryHeap::new(),
            seq: 0,
            now: 0.0,
            time_step: TIME_STEP,
            duration,
            attacker_base,
            target_base,
            attacker: attacker_base,
            target: target_base,
            attacker_mana: 0.0,
            items,
            abilities,
            cooldowns: CooldownTracker::new(),
            next_attack_time: 0.0,
            attacker_buffs: Rc::new(RefCell::new(BuffStore::new())),
            target_debuffs: Rc::new(RefCell::new(BuffStore::new())),
            log: Rc::new(RefCell::new(RunLog::default())),
        };
        engine.wire_bus();
        engine
    }

    pub fn with_time_step(mut self, time_step: f64) -> Self {
        self.time_step = time_step;
        self
    }

    fn wire_bus(&mut self) {
        // Buff grants apply before anything else reacts to the event.
        {
            let attacker_buffs = Rc::clone(&self.attacker_buffs);
            let target_debuffs = Rc::clone(&self.target_debuffs);
            self.bus.subscribe(
                EventKind::BuffApply,
                priority::HIGHEST,
                Box::new(move |event, _| {
                    if let Some(grant) = &event.buff {
                        let store = match grant.recipient {
                            BuffRecipient::Attacker => &attacker_buffs,
                            BuffRecipient::Target => &target_debuffs,
                        };
                        store.borrow_mut().apply(&grant.config, event.timestamp);
                    }
                }),
            );
        }

        {
            let log = Rc::clone(&self.log);
            self.bus.subscribe(
                EventKind::PostMitigationDamage,
                priority::NORMAL,
                Box::new(move |event, _| {
                    let Some(result) = event.result else {
                        return;
                    };
                    let mut log = log.borrow_mut();
                    log.total_damage += result.post_mitigation;
                    log.target_health =
                        (log.target_health - result.post_mitigation).max(0.0);
                    log.records.push(DamageRecord {
                        timestamp: event.timestamp,
                        source: event.source_label.clone(),
                        damage_type: result.damage_type,
                        pre_mitigation: result.pre_mitigation,
                        post_mitigation: result.post_mitigation,
                    });
                }),
            );
        }

        damage::register_mitigation(&mut self.bus);

        for item in &self.items {
            for passive in &item.passives {
                Rc::clone(passive).register(&mut self.bus);
            }
        }
    }

    /// Runs the simulation to completion and returns the report.
    pub fn run(&mut self) -> SimReport {
        self.resolve_combatants();
        self.attacker_mana = if self.attacker_base.current_mana > 0.0 {
            self.attacker_base.current_mana
        } else {
            self.attacker.total_mana()
        };
        self.attacker.current_mana = self.attacker_mana;
        let initial_health = if self.target_base.current_health > 0.0 {
            self.target_base.current_health
        } else {
            self.target.total_hp()
        };
        self.log.borrow_mut().target_health = initial_health;
        self.target.current_health = initial_health;

        tracing::debug!(
            duration = self.duration,
            target_health = initial_health,
            "combat started"
        );

        while self.now < self.duration {
            self.fire_due_events();
            self.act();
            self.advance();
        }
        // In-flight hits landing exactly at the deadline still count.
        self.now = self.duration;
        self.fire_due_events();

        let log = self.log.borrow();
        tracing::debug!(
            total = log.total_damage,
            events = log.records.len(),
            "combat finished"
        );
        SimReport {
            duration: self.duration,
            total_damage: log.total_damage,
            events: log.records.clone(),
            mana_remaining: self.attacker_mana,
            target_health: log.target_health,
        }
    }

    /// Queues an event for a future tick. Events that could only land after
    /// the run's deadline are dropped.
    fn schedule(&mut self, time: f64, event: CombatEvent) {
        if time > self.duration {
            tracing::trace!(kind = ?event.kind, time, "dropped event past deadline");
            return;
        }
        let seq = self.seq;
        self.seq += 1;
        self.queue.push(Scheduled { time, seq, event });
    }

    fn fire_due_events(&mut self) {
        while let Some(next) = self.queue.peek() {
            if next.time > self.now {
                break;
            }
            let mut scheduled = match self.queue.pop() {
                Some(scheduled) => scheduled,
                None => break,
            };
            // The target's defenses and current health are read at impact,
            // not at launch; only the source side is frozen.
            scheduled.event.target = self.target;
            self.bus.publish(&mut scheduled.event);
            self.sync_target_health();
        }
    }

    fn act(&mut self) {
        if self.now < self.cooldowns.global_cooldown() {
            return;
        }
        if self.try_cast() {
            return;
        }
        self.try_basic_attack();
    }

    /// Attempts to cast the first cooldown-ready ability. Affordability is
    /// checked only for that ability: an unaffordable cast falls through to
    /// the basic attack instead of scanning further down the list.
    fn try_cast(&mut self) -> bool {
        let Some(index) = (0..self.abilities.len())
            .find(|&i| self.cooldowns.is_ready(self.abilities[i].name(), self.now))
        else {
            return false;
        };

        let ability = &self.abilities[index];
        let cost = ability.rank_data().cost;
        if self.attacker_mana < cost {
            tracing::trace!(
                ability = ability.name(),
                mana = self.attacker_mana,
                cost,
                "cast gated on mana"
            );
            return false;
        }

        self.attacker_mana -= cost;
        self.attacker.current_mana = self.attacker_mana;

        let name = ability.name().to_string();
        let cast_time = ability.cast_time();
        let travel_time = ability.travel_time();
        let cooldown = ability.rank_data().cooldown;
        let instance = ability.cast(&self.attacker, &self.target);

        tracing::debug!(ability = %name, time = self.now, "cast");
        self.bus.publish(
            &mut CombatEvent::new(EventKind::CastStart, self.now, self.attacker, self.target)
                .with_label(name.clone()),
        );
        self.bus.publish(
            &mut CombatEvent::new(EventKind::CastComplete, self.now, self.attacker, self.target)
                .with_label(name.clone()),
        );

        let hit = CombatEvent::new(
            EventKind::PreMitigationHit,
            self.now + travel_time,
            self.attacker,
            self.target,
        )
        .with_label(name.clone())
        .with_instance(instance);
        self.schedule(self.now + travel_time, hit);

        self.cooldowns.put_on_cooldown(
            &name,
            cooldown,
            self.attacker.cooldown_multiplier(),
            self.now,
        );
        self.cooldowns.trigger_global(cast_time, self.now);
        true
    }

    fn try_basic_attack(&mut self) {
        if self.now < self.next_attack_time {
            return;
        }
        let attack_speed = self.attacker.total_attack_speed();
        if attack_speed <= 0.0 {
            return;
        }
        let delay = 1.0 / attack_speed;
        let windup = delay * ATTACK_WINDUP_FRACTION;

        tracing::trace!(time = self.now, delay, "basic attack");
        self.bus.publish(
            &mut CombatEvent::new(EventKind::AttackLaunch, self.now, self.attacker, self.target)
                .with_label("basic_attack"),
        );

        let instance = DamageInstance::new(
            self.attacker.total_ad(),
            DamageType::Physical,
            self.attacker,
        )
        .with_procs(ProcMask::BASIC_ATTACK);
        let hit = CombatEvent::new(
            EventKind::PreMitigationHit,
            self.now + windup,
            self.attacker,
            self.target,
        )
        .with_label("basic_attack")
        .with_instance(instance);
        self.schedule(self.now + windup, hit);

        self.next_attack_time = self.now + delay;
        self.cooldowns.trigger_global(windup, self.now);
    }

    fn advance(&mut self) {
        self.now += self.time_step;
        self.attacker_buffs.borrow_mut().tick(self.now);
        self.target_debuffs.borrow_mut().tick(self.now);
        self.regenerate();
        self.resolve_combatants();
    }

    fn regenerate(&mut self) {
        let regen = self.attacker.mana_regen * self.time_step;
        let cap = self.attacker.total_mana();
        self.attacker_mana = (self.attacker_mana + regen).min(cap);
    }

    /// Rebuilds both snapshots from base stats, items and whatever buffs are
    /// live right now, carrying resource state across the rebuild.
    fn resolve_combatants(&mut self) {
        let buffs = self.attacker_buffs.borrow();
        let mut attacker = resolver::resolve(&self.attacker_base, &self.items, buffs.snapshot());
        drop(buffs);
        attacker.current_mana = self.attacker_mana.min(attacker.total_mana());
        attacker.current_health = attacker.total_hp();
        self.attacker = attacker;

        let debuffs = self.target_debuffs.borrow();
        let mut target = resolver::resolve_target(&self.target_base, debuffs.snapshot());
        drop(debuffs);
        target.current_health = self.log.borrow().target_health;
        self.target = target;
    }

    fn sync_target_health(&mut self) {
        self.target.current_health = self.log.borrow().target_health;
    }
}

/// Convenience wrapper: build an engine, run it once, return the report.
pub fn simulate(
    attacker_base: StatSnapshot,
    target_base: StatSnapshot,
    items: Vec<ItemRecord>,
    abilities: Vec<Ability>,
    duration: f64,
) -> SimReport {
    TimeEngine::new(attacker_base, target_base, items, abilities, duration).run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abilities::{AbilityConfig, AbilityRank, ScalingRatio};
    use crate::stats::StatType;

    fn attacker() -> StatSnapshot {
        StatSnapshot {
            base_ad: 100.0,
            base_attack_speed: 1.0,
            base_mana: 300.0,
            ..Default::default()
        }
    }

    fn squishy_target() -> StatSnapshot {
        StatSnapshot {
            base_hp: 5000.0,
            ..Default::default()
        }
    }

    fn nuke(cost: f64, cooldown: f64) -> Ability {
        let config = AbilityConfig::new("bolt", DamageType::Magic)
            .with_ratio(ScalingRatio::new(StatType::AttackDamage, 1.0))
            .with_rank(AbilityRank {
                base_damage: 100.0,
                cost,
                cooldown,
            });
        Ability::new(config, 1).unwrap()
    }

    #[test]
    fn attacks_land_against_an_unarmored_target() {
        let report = simulate(attacker(), squishy_target(), Vec::new(), Vec::new(), 3.0);
        assert!(!report.events.is_empty());
        // 100 raw vs 0 armor: every hit lands in full.
        for record in &report.events {
            assert!((record.post_mitigation - 100.0).abs() < 1e-9);
        }
        assert!((report.total_damage - 100.0 * report.events.len() as f64).abs() < 1e-6);
    }

    #[test]
    fn attack_cadence_follows_attack_speed() {
        // 1.0 attacks/s over 5s: attacks at t=0,1,2,3,4, hits land 0.2s later.
        let report = simulate(attacker(), squishy_target(), Vec::new(), Vec::new(), 5.0);
        assert_eq!(report.events.len(), 5);
        let first = &report.events[0];
        assert!((first.timestamp - 0.2).abs() < 1e-9);
    }

    #[test]
    fn report_total_matches_the_event_log() {
        let report = simulate(
            attacker(),
            squishy_target(),
            Vec::new(),
            vec![nuke(30.0, 2.0)],
            6.0,
        );
        let sum: f64 = report.events.iter().map(|r| r.post_mitigation).sum();
        assert!((report.total_damage - sum).abs() < 1e-6);
    }

    #[test]
    fn casting_consumes_mana() {
        let report = simulate(
            attacker(),
            squishy_target(),
            Vec::new(),
            vec![nuke(30.0, 100.0)],
            2.0,
        );
        // One cast fits in 2s on a 100s cooldown.
        assert!((report.mana_remaining - 270.0).abs() < 1e-9);
    }

    #[test]
    fn unaffordable_cast_falls_back_to_a_basic_attack() {
        let mut poor = attacker();
        poor.base_mana = 10.0;
        poor.current_mana = 10.0;
        let report = simulate(
            poor,
            squishy_target(),
            Vec::new(),
            vec![nuke(30.0, 1.0)],
            1.5,
        );
        // Every event is a basic attack; the ability never fires.
        assert!(!report.events.is_empty());
        assert!(report.events.iter().all(|r| r.source == "basic_attack"));
    }

    #[test]
    fn target_health_decreases_and_floors_at_zero() {
        let mut frail = squishy_target();
        frail.base_hp = 150.0;
        let report = simulate(attacker(), frail, Vec::new(), Vec::new(), 5.0);
        assert!((report.target_health - 0.0).abs() < 1e-9);
    }

    #[test]
    fn identical_inputs_yield_identical_logs() {
        let run = || {
            simulate(
                attacker(),
                squishy_target(),
                Vec::new(),
                vec![nuke(30.0, 2.0)],
                8.0,
            )
        };
        let a = run();
        let b = run();
        assert_eq!(a.events.len(), b.events.len());
        for (x, y) in a.events.iter().zip(b.events.iter()) {
            assert_eq!(x.timestamp.to_bits(), y.timestamp.to_bits());
            assert_eq!(x.source, y.source);
            assert_eq!(x.post_mitigation.to_bits(), y.post_mitigation.to_bits());
        }
    }

    #[test]
    fn zero_attack_speed_disables_basic_attacks() {
        let mut statue = attacker();
        statue.base_attack_speed = 0.0;
        let report = simulate(statue, squishy_target(), Vec::new(), Vec::new(), 3.0);
        assert!(report.events.is_empty());
        assert!((report.total_damage - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn negative_bonus_attack_speed_disables_basic_attacks() {
        let mut hobbled = attacker();
        hobbled.bonus_attack_speed = -1.0;
        let report = simulate(hobbled, squishy_target(), Vec::new(), Vec::new(), 3.0);
        assert!(report.events.is_empty());
    }

    #[test]
    fn equal_timestamps_fire_in_scheduling_order() {
        let empty = StatSnapshot::default();
        let labeled = |label: &str| {
            CombatEvent::new(EventKind::BuffApply, 1.0, empty, empty).with_label(label)
        };

        let mut queue: BinaryHeap<Scheduled> = BinaryHeap::new();
        for (seq, label) in [(0, "first"), (1, "second"), (2, "third")] {
            queue.push(Scheduled {
                time: 1.0,
                seq,
                event: labeled(label),
            });
        }
        // An earlier timestamp still wins regardless of sequence.
        queue.push(Scheduled {
            time: 0.5,
            seq: 3,
            event: labeled("early"),
        });

        let order: Vec<String> = std::iter::from_fn(|| queue.pop())
            .map(|scheduled| scheduled.event.source_label)
            .collect();
        assert_eq!(order, vec!["early", "first", "second", "third"]);
    }

    #[test]
    fn hits_past_the_deadline_never_land() {
        // Duration shorter than the first windup: the launch happens but the
        // hit would land at 0.2s.
        let report = simulate(attacker(), squishy_target(), Vec::new(), Vec::new(), 0.1);
        assert!(report.events.is_empty());
        assert!((report.total_damage - 0.0).abs() < f64::EPSILON);
    }
}
