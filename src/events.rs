//! The combat event bus: synchronous, priority-ordered dispatch

use crate::buffs::BuffConfig;
use crate::damage::{DamageInstance, DamageResult};
use crate::stats::StatSnapshot;
use std::collections::HashMap;

/// Kinds of events flowing between combat components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    CastStart,
    CastComplete,
    AttackLaunch,
    PreMitigationHit,
    PostMitigationDamage,
    BuffApply,
}

/// Handler priorities. Lower runs first; ties break by registration order.
pub mod priority {
    pub const HIGHEST: i32 = 0;
    pub const HIGH: i32 = 10;
    pub const NORMAL: i32 = 20;
    pub const LOW: i32 = 30;
    pub const LOWEST: i32 = 40;
}

/// Which combatant a buff-apply request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuffRecipient {
    Attacker,
    Target,
}

/// Payload of a buff-apply request event.
#[derive(Debug, Clone)]
pub struct BuffGrant {
    pub recipient: BuffRecipient,
    pub config: BuffConfig,
}

/// One event on the bus.
///
/// Source and target stats are value snapshots taken when the event was
/// built. Handlers for a pre-mitigation hit may append damage instances
/// before the mitigation aggregator consumes the list; that append window is
/// the only mutation point.
#[derive(Debug, Clone)]
pub struct CombatEvent {
    pub kind: EventKind,
    pub timestamp: f64,
    pub source: StatSnapshot,
    pub target: StatSnapshot,
    pub source_label: String,
    pub instances: Vec<DamageInstance>,
    pub result: Option<DamageResult>,
    pub buff: Option<BuffGrant>,
}

impl CombatEvent {
    pub fn new(kind: EventKind, timestamp: f64, source: StatSnapshot, target: StatSnapshot) -> Self {
        CombatEvent {
            kind,
            timestamp,
            source,
            target,
            source_label: String::new(),
            instances: Vec::new(),
            result: None,
            buff: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.source_label = label.into();
        self
    }

    pub fn with_instance(mut self, instance: DamageInstance) -> Self {
        self.instances.push(instance);
        self
    }

    pub fn with_buff(mut self, grant: BuffGrant) -> Self {
        self.buff = Some(grant);
        self
    }

    /// The instance that initiated this event (index 0 by convention);
    /// appended passive instances follow it.
    pub fn base_instance(&self) -> Option<&DamageInstance> {
        self.instances.first()
    }
}

/// Collects follow-up events emitted by handlers during a dispatch.
///
/// Emitted events are published after the current handler list finishes, on
/// the same call stack, so a handler never re-enters the bus while it holds
/// the in-flight event.
#[derive(Default)]
pub struct Emitter {
    pending: Vec<CombatEvent>,
}

impl Emitter {
    pub fn emit(&mut self, event: CombatEvent) {
        self.pending.push(event);
    }
}

/// A registered event handler. Receives the mutable in-flight event and an
/// emitter for follow-up events.
pub type Handler = Box<dyn FnMut(&mut CombatEvent, &mut Emitter)>;

struct Subscriber {
    priority: i32,
    order: u64,
    handler: Handler,
}

/// Same-thread publish/subscribe channel between combat components.
///
/// One bus exists per simulation run; there is no global registry. Dispatch
/// is synchronous and unisolated: a panicking handler aborts the publish,
/// which indicates a configuration bug rather than a runtime condition.
#[derive(Default)]
pub struct EventBus {
    listeners: HashMap<EventKind, Vec<Subscriber>>,
    registered: u64,
}

impl EventBus {
    pub fn new() -> Self {
        EventBus::default()
    }

    /// Registers a handler for one event kind. Handlers run in ascending
    /// priority order; equal priorities run in registration order.
    pub fn subscribe(&mut self, kind: EventKind, priority: i32, handler: Handler) {
        let order = self.registered;
        self.registered += 1;
        let subscribers = self.listeners.entry(kind).or_default();
        subscribers.push(Subscriber {
            priority,
            order,
            handler,
        });
        subscribers.sort_by_key(|s| (s.priority, s.order));
    }

    /// Invokes every handler registered for the event's kind, then publishes
    /// any follow-up events the handlers emitted.
    pub fn publish(&mut self, event: &mut CombatEvent) {
        let mut emitter = Emitter::default();
        if let Some(subscribers) = self.listeners.get_mut(&event.kind) {
            for subscriber in subscribers.iter_mut() {
                (subscriber.handler)(event, &mut emitter);
            }
        }
        for mut follow_up in emitter.pending {
            self.publish(&mut follow_up);
        }
    }
}
