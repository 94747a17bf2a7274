//! Scenario and item-library configuration loaded from YAML or JSON

use crate::abilities::{Ability, AbilityConfig, AbilityError, AbilityRank, ScalingRatio};
use crate::buffs::BuffConfig;
use crate::items::{ItemRecord, StatModifier};
use crate::passives::{
    BuffOnAttack, CurrentHealthOnHit, ManaScaledAttack, OnHitDamage, PassiveEffect, ShredOnDamage,
    Spellblade,
};
use crate::stats::{DamageType, ProcMask, StatSnapshot};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::rc::Rc;
use thiserror::Error;

/// Errors raised while loading scenario or item files.
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("failed to read {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {message}")]
    Parse { path: String, message: String },
    #[error(transparent)]
    Ability(#[from] AbilityError),
}

fn read_to_string(path: &Path) -> Result<String, ScenarioError> {
    fs::read_to_string(path).map_err(|source| ScenarioError::Io {
        path: path.display().to_string(),
        source,
    })
}

fn parse_file<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ScenarioError> {
    let content = read_to_string(path)?;
    let path_str = path.to_string_lossy().to_lowercase();

    let parsed = if path_str.ends_with(".json") {
        serde_json::from_str(&content).map_err(|e| e.to_string())
    } else {
        serde_yaml::from_str(&content).map_err(|e| e.to_string())
    };
    parsed.map_err(|message| ScenarioError::Parse {
        path: path.display().to_string(),
        message,
    })
}

fn default_time_step() -> f64 {
    crate::engine::TIME_STEP
}

fn default_level() -> u32 {
    1
}

/// A full simulation scenario: who fights whom, with what, for how long.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub name: String,
    pub duration: f64,
    #[serde(default = "default_time_step")]
    pub time_step: f64,
    pub champion: ChampionSpec,
    pub target: TargetSpec,
    #[serde(default)]
    pub items: Vec<String>,
    #[serde(default)]
    pub abilities: Vec<AbilitySpec>,
    #[serde(default)]
    pub builds: Vec<BuildSpec>,
}

impl ScenarioConfig {
    /// Loads a scenario from a YAML or JSON file, picked by extension.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        parse_file(path.as_ref())
    }

    pub fn to_abilities(&self) -> Result<Vec<Ability>, ScenarioError> {
        self.abilities
            .iter()
            .map(|spec| spec.to_ability().map_err(ScenarioError::from))
            .collect()
    }
}

/// An alternative item loadout for build comparison.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildSpec {
    pub name: String,
    pub items: Vec<String>,
}

/// The attacker's base attributes with per-level growth.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChampionSpec {
    pub name: String,
    #[serde(default = "default_level")]
    pub level: u32,
    pub base_ad: f64,
    #[serde(default)]
    pub ad_per_level: f64,
    #[serde(default)]
    pub base_ap: f64,
    pub base_hp: f64,
    #[serde(default)]
    pub hp_per_level: f64,
    #[serde(default)]
    pub base_mana: f64,
    #[serde(default)]
    pub mana_per_level: f64,
    #[serde(default)]
    pub mana_regen: f64,
    pub base_attack_speed: f64,
    #[serde(default)]
    pub attack_speed_per_level: f64,
    #[serde(default)]
    pub base_armor: f64,
    #[serde(default)]
    pub armor_per_level: f64,
    #[serde(default)]
    pub base_mr: f64,
    #[serde(default)]
    pub mr_per_level: f64,
}

impl ChampionSpec {
    /// Base stats at the configured level. Growth is linear from level 1,
    /// except attack speed growth, which lands in the bonus fraction.
    pub fn at_level(&self) -> StatSnapshot {
        let grown = (self.level.max(1) - 1) as f64;
        StatSnapshot {
            base_ad: self.base_ad + self.ad_per_level * grown,
            base_ap: self.base_ap,
            base_hp: self.base_hp + self.hp_per_level * grown,
            base_mana: self.base_mana + self.mana_per_level * grown,
            mana_regen: self.mana_regen,
            base_attack_speed: self.base_attack_speed,
            bonus_attack_speed: self.attack_speed_per_level * grown,
            base_armor: self.base_armor + self.armor_per_level * grown,
            base_mr: self.base_mr + self.mr_per_level * grown,
            ..Default::default()
        }
    }
}

/// The training dummy on the other side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetSpec {
    pub hp: f64,
    #[serde(default)]
    pub armor: f64,
    #[serde(default)]
    pub magic_resist: f64,
}

impl TargetSpec {
    pub fn to_snapshot(&self) -> StatSnapshot {
        StatSnapshot {
            base_hp: self.hp,
            current_health: self.hp,
            base_armor: self.armor,
            base_mr: self.magic_resist,
            ..Default::default()
        }
    }
}

/// Proc classification names accepted in ability specs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcFlag {
    OnHit,
    OnAttack,
    Spell,
    Periodic,
}

impl ProcFlag {
    fn to_mask(self) -> ProcMask {
        match self {
            ProcFlag::OnHit => ProcMask::ON_HIT,
            ProcFlag::OnAttack => ProcMask::ON_ATTACK,
            ProcFlag::Spell => ProcMask::SPELL,
            ProcFlag::Periodic => ProcMask::PERIODIC,
        }
    }
}

fn default_spell_procs() -> Vec<ProcFlag> {
    vec![ProcFlag::Spell]
}

fn default_rank() -> usize {
    1
}

fn default_proc_coefficient() -> f64 {
    1.0
}

fn default_cast_time() -> f64 {
    0.25
}

fn default_travel_time() -> f64 {
    0.25
}

/// Declarative form of an ability, as written in scenario files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbilitySpec {
    pub name: String,
    pub damage_type: DamageType,
    #[serde(default = "default_rank")]
    pub rank: usize,
    #[serde(default)]
    pub ratios: Vec<ScalingRatio>,
    pub ranks: Vec<AbilityRank>,
    #[serde(default = "default_spell_procs")]
    pub procs: Vec<ProcFlag>,
    #[serde(default = "default_proc_coefficient")]
    pub proc_coefficient: f64,
    #[serde(default = "default_cast_time")]
    pub cast_time: f64,
    #[serde(default = "default_travel_time")]
    pub travel_time: f64,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl AbilitySpec {
    pub fn to_ability(&self) -> Result<Ability, AbilityError> {
        let mut config = AbilityConfig::new(self.name.clone(), self.damage_type)
            .with_procs(
                self.procs
                    .iter()
                    .fold(ProcMask::empty(), |mask, flag| mask | flag.to_mask()),
            )
            .with_proc_coefficient(self.proc_coefficient);
        config.cast_time = self.cast_time;
        config.travel_time = self.travel_time;
        config.tags = self.tags.clone();
        for ratio in &self.ratios {
            config = config.with_ratio(*ratio);
        }
        for rank in &self.ranks {
            config = config.with_rank(*rank);
        }
        Ability::new(config, self.rank)
    }
}

/// Declarative form of an item passive, dispatched on `kind`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PassiveSpec {
    OnHitDamage {
        name: String,
        amount: f64,
        damage_type: DamageType,
    },
    ManaScaledAttack {
        name: String,
        ratio: f64,
    },
    Spellblade {
        name: String,
        ratio: f64,
        cooldown: f64,
    },
    BuffOnAttack {
        name: String,
        buff: BuffConfig,
    },
    ShredOnDamage {
        name: String,
        debuff: BuffConfig,
    },
    CurrentHealthOnHit {
        name: String,
        percent: f64,
        min_damage: f64,
        damage_type: DamageType,
    },
}

impl PassiveSpec {
    /// Builds a fresh passive instance. Called once per simulation run so
    /// that per-run state (spellblade charges) never leaks between runs.
    pub fn build(&self) -> Rc<dyn PassiveEffect> {
        match self {
            PassiveSpec::OnHitDamage {
                name,
                amount,
                damage_type,
            } => Rc::new(OnHitDamage::new(name.clone(), *amount, *damage_type)),
            PassiveSpec::ManaScaledAttack { name, ratio } => {
                Rc::new(ManaScaledAttack::new(name.clone(), *ratio))
            }
            PassiveSpec::Spellblade {
                name,
                ratio,
                cooldown,
            } => Rc::new(Spellblade::new(name.clone(), *ratio, *cooldown)),
            PassiveSpec::BuffOnAttack { name, buff } => {
                Rc::new(BuffOnAttack::new(name.clone(), buff.clone()))
            }
            PassiveSpec::ShredOnDamage { name, debuff } => {
                Rc::new(ShredOnDamage::new(name.clone(), debuff.clone()))
            }
            PassiveSpec::CurrentHealthOnHit {
                name,
                percent,
                min_damage,
                damage_type,
            } => Rc::new(CurrentHealthOnHit::new(
                name.clone(),
                *percent,
                *min_damage,
                *damage_type,
            )),
        }
    }
}

/// Declarative form of an item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemSpec {
    pub name: String,
    #[serde(default)]
    pub cost: u32,
    #[serde(default)]
    pub stats: Vec<StatModifier>,
    #[serde(default)]
    pub passives: Vec<PassiveSpec>,
}

impl ItemSpec {
    /// Builds a fresh record with fresh passive instances.
    pub fn build(&self) -> ItemRecord {
        let mut record = ItemRecord::new(self.name.clone()).with_cost(self.cost);
        for modifier in &self.stats {
            record = record.with_modifier(*modifier);
        }
        for passive in &self.passives {
            record = record.with_passive(passive.build());
        }
        record
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ItemFile {
    items: Vec<ItemSpec>,
}

/// The item catalog scenarios reference by name.
#[derive(Debug, Clone, Default)]
pub struct ItemLibrary {
    by_name: HashMap<String, ItemSpec>,
}

impl ItemLibrary {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let file: ItemFile = parse_file(path.as_ref())?;
        Ok(Self::from_specs(file.items))
    }

    pub fn from_specs(specs: Vec<ItemSpec>) -> Self {
        let by_name = specs
            .into_iter()
            .map(|spec| (spec.name.clone(), spec))
            .collect();
        ItemLibrary { by_name }
    }

    pub fn get(&self, name: &str) -> Option<&ItemSpec> {
        self.by_name.get(name)
    }

    /// Builds the records for a named loadout, preserving the requested
    /// order. Unknown names are skipped with a warning rather than aborting
    /// the run.
    pub fn resolve_loadout(&self, names: &[String]) -> Vec<ItemRecord> {
        let mut records = Vec::with_capacity(names.len());
        for name in names {
            match self.by_name.get(name) {
                Some(spec) => records.push(spec.build()),
                None => tracing::warn!(item = %name, "unknown item, skipping"),
            }
        }
        records
    }

    pub fn loadout_cost(&self, names: &[String]) -> u32 {
        names
            .iter()
            .filter_map(|name| self.by_name.get(name))
            .map(|spec| spec.cost)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::StatType;

    #[test]
    fn champion_growth_is_linear_from_level_one() {
        let spec = ChampionSpec {
            name: "marksman".into(),
            level: 11,
            base_ad: 60.0,
            ad_per_level: 3.0,
            base_ap: 0.0,
            base_hp: 600.0,
            hp_per_level: 100.0,
            base_mana: 300.0,
            mana_per_level: 40.0,
            mana_regen: 7.0,
            base_attack_speed: 0.625,
            attack_speed_per_level: 0.025,
            base_armor: 28.0,
            armor_per_level: 4.0,
            base_mr: 30.0,
            mr_per_level: 1.3,
        };
        let stats = spec.at_level();
        assert!((stats.base_ad - 90.0).abs() < 1e-9);
        assert!((stats.base_hp - 1600.0).abs() < 1e-9);
        assert!((stats.bonus_attack_speed - 0.25).abs() < 1e-9);
    }

    #[test]
    fn level_one_has_no_growth() {
        let spec = ChampionSpec {
            name: "marksman".into(),
            level: 1,
            base_ad: 60.0,
            ad_per_level: 3.0,
            base_ap: 0.0,
            base_hp: 600.0,
            hp_per_level: 100.0,
            base_mana: 0.0,
            mana_per_level: 0.0,
            mana_regen: 0.0,
            base_attack_speed: 0.625,
            attack_speed_per_level: 0.0,
            base_armor: 0.0,
            armor_per_level: 0.0,
            base_mr: 0.0,
            mr_per_level: 0.0,
        };
        let stats = spec.at_level();
        assert!((stats.base_ad - 60.0).abs() < 1e-9);
        assert!((stats.base_hp - 600.0).abs() < 1e-9);
    }

    #[test]
    fn scenario_parses_from_yaml() {
        let yaml = r#"
name: dummy_check
duration: 10.0
champion:
  name: marksman
  level: 9
  base_ad: 70.0
  ad_per_level: 3.0
  base_hp: 700.0
  base_mana: 300.0
  base_attack_speed: 0.658
target:
  hp: 3000.0
  armor: 60.0
items:
  - long_sword
abilities:
  - name: mystic_shot
    damage_type: physical
    ratios:
      - stat: attack_damage
        coefficient: 1.3
    ranks:
      - base_damage: 120.0
        cost: 30.0
        cooldown: 4.5
    procs: [spell, on_hit]
"#;
        let config: ScenarioConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.champion.level, 9);
        assert!((config.time_step - crate::engine::TIME_STEP).abs() < 1e-12);
        let abilities = config.to_abilities().unwrap();
        assert_eq!(abilities.len(), 1);
        assert_eq!(abilities[0].name(), "mystic_shot");
    }

    #[test]
    fn item_specs_build_fresh_records() {
        let yaml = r#"
items:
  - name: sheen
    cost: 900
    passives:
      - kind: spellblade
        name: sheen
        ratio: 1.0
        cooldown: 1.5
  - name: long_sword
    cost: 350
    stats:
      - stat: attack_damage
        value: 10.0
"#;
        let file: ItemFile = serde_yaml::from_str(yaml).unwrap();
        let library = ItemLibrary::from_specs(file.items);

        let loadout = library.resolve_loadout(&["long_sword".into(), "sheen".into()]);
        assert_eq!(loadout.len(), 2);
        assert_eq!(loadout[0].name, "long_sword");
        assert_eq!(loadout[0].modifiers[0].stat, StatType::AttackDamage);
        assert_eq!(loadout[1].passives.len(), 1);
        assert_eq!(library.loadout_cost(&["long_sword".into(), "sheen".into()]), 1250);
    }

    #[test]
    fn unknown_items_are_skipped() {
        let library = ItemLibrary::from_specs(vec![ItemSpec {
            name: "long_sword".into(),
            cost: 350,
            stats: Vec::new(),
            passives: Vec::new(),
        }]);
        let loadout = library.resolve_loadout(&["long_sword".into(), "typo_blade".into()]);
        assert_eq!(loadout.len(), 1);
    }

    #[test]
    fn bad_rank_surfaces_as_an_ability_error() {
        let spec = AbilitySpec {
            name: "mystic_shot".into(),
            damage_type: DamageType::Physical,
            rank: 3,
            ratios: Vec::new(),
            ranks: vec![AbilityRank {
                base_damage: 100.0,
                cost: 0.0,
                cooldown: 4.0,
            }],
            procs: default_spell_procs(),
            proc_coefficient: 1.0,
            cast_time: 0.25,
            travel_time: 0.25,
            tags: Vec::new(),
        };
        assert!(spec.to_ability().is_err());
    }
}
