//! Rules lookup collaborator.
//!
//! Rules parsing proper is an external concern; the kernel only needs a lookup
//! keyed by (name, kind). [`RulesTable`] is a small JSON-backed implementation
//! used by tests, benches and headless runs.
//!
//! Malformed entries are logged and skipped so that one bad object never
//! aborts a whole load.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::entity::EntityKind;
use crate::error::RulesError;

/// Static data for one object type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRules {
    /// Unique name within its kind.
    pub name: String,
    /// Entity kind.
    pub kind: EntityKind,
    /// Maximum hit points.
    #[serde(default)]
    pub max_health: u32,
    /// Purchase cost in credits.
    #[serde(default)]
    pub cost: u32,
    /// Buildings only: leave rubble instead of vanishing when destroyed.
    #[serde(default)]
    pub leaves_rubble: bool,
    /// Footprint in tiles (width, height).
    #[serde(default = "default_footprint")]
    pub footprint: (i32, i32),
    /// Power output (positive) or drain (negative) while spawned.
    #[serde(default)]
    pub power: i32,
}

const fn default_footprint() -> (i32, i32) {
    (1, 1)
}

impl ObjectRules {
    /// Creates rules with default cost, footprint and no rubble.
    #[must_use]
    pub fn new(name: &str, kind: EntityKind, max_health: u32) -> Self {
        Self {
            name: name.to_string(),
            kind,
            max_health,
            cost: 0,
            leaves_rubble: false,
            footprint: default_footprint(),
            power: 0,
        }
    }

    /// Sets the purchase cost.
    #[must_use]
    pub fn with_cost(mut self, cost: u32) -> Self {
        self.cost = cost;
        self
    }

    /// Marks the object as leaving rubble.
    #[must_use]
    pub fn with_rubble(mut self) -> Self {
        self.leaves_rubble = true;
        self
    }

    /// Sets the footprint.
    #[must_use]
    pub fn with_footprint(mut self, width: i32, height: i32) -> Self {
        self.footprint = (width, height);
        self
    }

    /// Sets the power output (positive) or drain (negative).
    #[must_use]
    pub fn with_power(mut self, power: i32) -> Self {
        self.power = power;
        self
    }

    fn validate(&self) -> Result<(), RulesError> {
        let invalid = |reason: &str| RulesError::InvalidEntry {
            name: self.name.clone(),
            reason: reason.to_string(),
        };
        if self.name.is_empty() {
            return Err(invalid("empty name"));
        }
        if self.kind.is_techno() && self.max_health == 0 {
            return Err(invalid("buildings and units need max_health > 0"));
        }
        if self.footprint.0 <= 0 || self.footprint.1 <= 0 {
            return Err(invalid("footprint must be at least 1x1"));
        }
        if self.leaves_rubble && self.kind != EntityKind::Building {
            return Err(invalid("only buildings can leave rubble"));
        }
        Ok(())
    }
}

/// Static data for a weapon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeaponRules {
    /// Weapon name.
    pub name: String,
    /// Name of the projectile object it fires.
    pub projectile: String,
    /// Flight time in ticks.
    #[serde(default = "default_flight_ticks")]
    pub flight_ticks: u32,
}

const fn default_flight_ticks() -> u32 {
    1
}

/// Static data for a super weapon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuperWeaponRules {
    /// Super weapon name.
    pub name: String,
    /// Ticks to recharge from empty.
    pub recharge_ticks: u32,
}

/// Lookup of static rules data.
pub trait RulesLookup {
    /// Rules for the named object of the given kind.
    fn object(&self, name: &str, kind: EntityKind) -> Option<&ObjectRules>;

    /// Rules for the named weapon.
    fn weapon(&self, name: &str) -> Option<&WeaponRules>;

    /// Rules for the named super weapon.
    fn super_weapon(&self, name: &str) -> Option<&SuperWeaponRules>;

    /// Like [`object`](RulesLookup::object) but reports absence as an error.
    fn require_object(&self, name: &str, kind: EntityKind) -> Result<&ObjectRules, RulesError> {
        self.object(name, kind).ok_or_else(|| RulesError::MissingRules {
            name: name.to_string(),
            kind,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
struct RulesDocument {
    #[serde(default)]
    objects: Vec<serde_json::Value>,
    #[serde(default)]
    weapons: Vec<serde_json::Value>,
    #[serde(default)]
    super_weapons: Vec<serde_json::Value>,
}

/// In-memory rules table.
#[derive(Debug, Clone, Default)]
pub struct RulesTable {
    objects: BTreeMap<(EntityKind, String), ObjectRules>,
    weapons: BTreeMap<String, WeaponRules>,
    super_weapons: BTreeMap<String, SuperWeaponRules>,
}

impl RulesTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a JSON rules document.
    ///
    /// Only a document that is not JSON, or whose top level has the wrong
    /// shape, is an error. Individual entries that fail to parse or validate
    /// are logged and skipped.
    pub fn from_json(json: &str) -> Result<Self, RulesError> {
        let doc: RulesDocument = serde_json::from_str(json)?;
        let mut table = Self::new();

        for value in doc.objects {
            match serde_json::from_value::<ObjectRules>(value) {
                Ok(rules) => {
                    if let Err(err) = table.insert_object(rules) {
                        warn!(%err, "skipping object rules");
                    }
                }
                Err(err) => warn!(%err, "skipping unparseable object rules"),
            }
        }
        for value in doc.weapons {
            match serde_json::from_value::<WeaponRules>(value) {
                Ok(rules) => table.insert_weapon(rules),
                Err(err) => warn!(%err, "skipping unparseable weapon rules"),
            }
        }
        for value in doc.super_weapons {
            match serde_json::from_value::<SuperWeaponRules>(value) {
                Ok(rules) => table.insert_super_weapon(rules),
                Err(err) => warn!(%err, "skipping unparseable super weapon rules"),
            }
        }
        Ok(table)
    }

    /// Validates and inserts object rules, replacing any previous entry.
    pub fn insert_object(&mut self, rules: ObjectRules) -> Result<(), RulesError> {
        rules.validate()?;
        self.objects.insert((rules.kind, rules.name.clone()), rules);
        Ok(())
    }

    /// Inserts weapon rules.
    pub fn insert_weapon(&mut self, rules: WeaponRules) {
        self.weapons.insert(rules.name.clone(), rules);
    }

    /// Inserts super weapon rules.
    pub fn insert_super_weapon(&mut self, rules: SuperWeaponRules) {
        self.super_weapons.insert(rules.name.clone(), rules);
    }

    /// Number of object entries.
    #[must_use]
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }
}

impl RulesLookup for RulesTable {
    fn object(&self, name: &str, kind: EntityKind) -> Option<&ObjectRules> {
        self.objects.get(&(kind, name.to_string()))
    }

    fn weapon(&self, name: &str) -> Option<&WeaponRules> {
        self.weapons.get(name)
    }

    fn super_weapon(&self, name: &str) -> Option<&SuperWeaponRules> {
        self.super_weapons.get(name)
    }
}
