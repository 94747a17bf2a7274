//! Item records and stat modifiers

use crate::passives::PassiveEffect;
use crate::stats::StatType;
use serde::{Deserialize, Serialize};
use std::rc::Rc;

/// How a modifier's value is applied to its target stat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatModKind {
    Flat,
    PercentBase,
    PercentBonus,
}

impl Default for StatModKind {
    fn default() -> Self {
        StatModKind::Flat
    }
}

/// A single stat adjustment carried by an item or a buff.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatModifier {
    pub stat: StatType,
    pub value: f64,
    #[serde(default)]
    pub kind: StatModKind,
}

impl StatModifier {
    pub fn flat(stat: StatType, value: f64) -> Self {
        StatModifier {
            stat,
            value,
            kind: StatModKind::Flat,
        }
    }

    pub fn percent_base(stat: StatType, value: f64) -> Self {
        StatModifier {
            stat,
            value,
            kind: StatModKind::PercentBase,
        }
    }

    pub fn percent_bonus(stat: StatType, value: f64) -> Self {
        StatModifier {
            stat,
            value,
            kind: StatModKind::PercentBonus,
        }
    }
}

/// An equipped item for the duration of one simulation run.
///
/// Passives carry per-run mutable state (e.g. a spellblade's internal
/// cooldown), so a record must be built fresh for every run and never shared
/// between two simulations.
#[derive(Clone)]
pub struct ItemRecord {
    pub name: String,
    pub cost: u32,
    pub modifiers: Vec<StatModifier>,
    pub passives: Vec<Rc<dyn PassiveEffect>>,
}

impl ItemRecord {
    pub fn new(name: impl Into<String>) -> Self {
        ItemRecord {
            name: name.into(),
            cost: 0,
            modifiers: Vec::new(),
            passives: Vec::new(),
        }
    }

    pub fn with_cost(mut self, cost: u32) -> Self {
        self.cost = cost;
        self
    }

    pub fn with_modifier(mut self, modifier: StatModifier) -> Self {
        self.modifiers.push(modifier);
        self
    }

    pub fn with_passive(mut self, passive: Rc<dyn PassiveEffect>) -> Self {
        self.passives.push(passive);
        self
    }
}

impl std::fmt::Debug for ItemRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ItemRecord")
            .field("name", &self.name)
            .field("cost", &self.cost)
            .field("modifiers", &self.modifiers)
            .field(
                "passives",
                &self.passives.iter().map(|p| p.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
