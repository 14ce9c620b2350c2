//! Field rules for the Beyond All Reason unitdef export
//!
//! Each canonical output field is declared once, with the raw keys it may be
//! read from, its canonical type and what happens when it is missing. The
//! table is validated when a [`Schema`] is built, so a misconfigured rule set
//! fails before any record is read.

use crate::value::FieldType;
use crate::{Error, Result};
use std::collections::{HashMap, HashSet};

/// Canonical name of the primary key field
pub const UNIT_ID: &str = "unit_id";

/// Canonical name of the engine id field used to resolve numeric references
pub const ENGINE_ID: &str = "engine_id";

/// Field derived from the `unit_id` prefix
pub const FACTION: &str = "faction";

/// Field derived from `is_building`
pub const UNIT_TYPE: &str = "unit_type";

/// Canonical name of the building flag
pub const IS_BUILDING: &str = "is_building";

/// Names the normalizer computes itself; no rule may claim them
pub const DERIVED_FIELDS: &[&str] = &[FACTION, UNIT_TYPE];

/// What to do when a rule finds no raw value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Missing {
    /// The record is malformed without it
    Required,
    /// Leave the field out of the normalized record
    Omit,
    /// Use the type's zero value (`0`, `0.0`, `false`, `[]`)
    Zero,
}

/// A single canonical field and where it comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRule {
    /// Output field name
    pub canonical: &'static str,
    /// Raw keys, tried in order. Dotted keys address nested objects.
    pub raw_keys: &'static [&'static str],
    pub field_type: FieldType,
    pub missing: Missing,
}

const fn rule(
    canonical: &'static str,
    raw_keys: &'static [&'static str],
    field_type: FieldType,
    missing: Missing,
) -> FieldRule {
    FieldRule {
        canonical,
        raw_keys,
        field_type,
        missing,
    }
}

/// Rules for the export format this tool targets
pub const UNITDEF_RULES: &[FieldRule] = &[
    rule(UNIT_ID, &["name"], FieldType::Text, Missing::Required),
    rule(ENGINE_ID, &["id"], FieldType::Integer, Missing::Omit),
    rule("human_name", &["translatedHumanName", "humanName"], FieldType::Text, Missing::Omit),
    rule("tooltip", &["translatedTooltip", "tooltip"], FieldType::Text, Missing::Omit),
    rule("health", &["health", "maxDamage"], FieldType::Float, Missing::Zero),
    rule("metal_cost", &["metalCost", "buildCostMetal"], FieldType::Float, Missing::Zero),
    rule("energy_cost", &["energyCost", "buildCostEnergy"], FieldType::Float, Missing::Zero),
    rule("build_time", &["buildTime"], FieldType::Float, Missing::Zero),
    rule("build_power", &["buildSpeed", "workerTime"], FieldType::Float, Missing::Zero),
    rule("metal_make", &["metalMake"], FieldType::Float, Missing::Zero),
    rule("extracts_metal", &["extractsMetal"], FieldType::Float, Missing::Zero),
    rule("energy_make", &["energyMake"], FieldType::Float, Missing::Zero),
    rule("energy_storage", &["energyStorage"], FieldType::Float, Missing::Zero),
    rule("metal_storage", &["metalStorage"], FieldType::Float, Missing::Zero),
    rule("speed", &["speed", "maxVelocity"], FieldType::Float, Missing::Zero),
    rule("los", &["sightDistance"], FieldType::Float, Missing::Zero),
    rule("los_air", &["airSightDistance"], FieldType::Float, Missing::Zero),
    rule("radar_distance", &["radarDistance"], FieldType::Float, Missing::Zero),
    rule(IS_BUILDING, &["isBuilding"], FieldType::Boolean, Missing::Zero),
    rule("can_fly", &["canFly"], FieldType::Boolean, Missing::Zero),
    rule("is_builder", &["isBuilder", "builder"], FieldType::Boolean, Missing::Zero),
    rule("tech_level", &["customParams.techlevel"], FieldType::Integer, Missing::Omit),
    rule("builds", &["buildOptions", "builds"], FieldType::References, Missing::Zero),
    rule("requires", &["requires"], FieldType::References, Missing::Zero),
    rule("upgrades_from", &["upgradesFrom"], FieldType::References, Missing::Zero),
];

/// Engine-only fields that carry no statistics and are dropped silently
pub const ENGINE_ONLY_FIELDS: &[&str] = &[
    "sounds",
    "objectName",
    "script",
    "buildPic",
    "iconType",
    "model",
    "modelCenterOffset",
    "collisionVolumeOffsets",
    "collisionVolumeScales",
    "collisionVolumeType",
    "selectionVolumeOffsets",
    "selectionVolumeScales",
    "selectionVolumeType",
    "explodeAs",
    "selfDestructAs",
    "corpse",
    "featureDefs",
    "sfxTypes",
];

/// Unit name prefix → faction
pub const FACTION_PREFIXES: &[(&str, &str)] = &[
    ("arm", "armada"),
    ("cor", "cortex"),
    ("leg", "legion"),
    ("raptor", "raptor"),
    ("scav", "scavenger"),
];

/// Fold a raw key so that `buildOptions`, `build_options` and `BuildOptions` compare equal
pub fn fold_key(key: &str) -> String {
    key.chars()
        .filter(|c| !matches!(c, '_' | '-' | ' '))
        .flat_map(char::to_lowercase)
        .collect()
}

/// A validated rule set
#[derive(Debug, Clone)]
pub struct Schema {
    rules: Vec<FieldRule>,
    /// Folded top-level raw keys consumed by some rule
    claimed: HashSet<String>,
    /// Folded engine-only keys
    ignored: HashSet<String>,
    /// Folded canonical and derived output names
    outputs: HashSet<String>,
    factions: Vec<(&'static str, &'static str)>,
}

impl Schema {
    /// Build and validate a schema
    pub fn new(
        rules: &[FieldRule],
        engine_only: &[&str],
        factions: &[(&'static str, &'static str)],
    ) -> Result<Self> {
        let mut canonical = HashSet::new();
        let mut raw_owner: HashMap<String, &str> = HashMap::new();
        let mut claimed = HashSet::new();

        for rule in rules {
            if !canonical.insert(rule.canonical) {
                return Err(Error::Schema(format!(
                    "canonical field '{}' is declared twice",
                    rule.canonical
                )));
            }
            if DERIVED_FIELDS.contains(&rule.canonical) {
                return Err(Error::Schema(format!(
                    "'{}' is a derived field and cannot have a rule",
                    rule.canonical
                )));
            }
            if rule.raw_keys.is_empty() {
                return Err(Error::Schema(format!(
                    "'{}' has no raw keys",
                    rule.canonical
                )));
            }
            if rule.missing == Missing::Zero && rule.field_type.zero().is_none() {
                return Err(Error::Schema(format!(
                    "'{}' defaults to zero but {} has no zero value",
                    rule.canonical, rule.field_type
                )));
            }

            for raw in rule.raw_keys {
                let folded = fold_path(raw);
                if folded.iter().any(String::is_empty) {
                    return Err(Error::Schema(format!(
                        "'{}' has an empty segment in raw key '{}'",
                        rule.canonical, raw
                    )));
                }
                if let Some(owner) = raw_owner.insert(folded.join("."), rule.canonical) {
                    return Err(Error::Schema(format!(
                        "raw key '{}' is claimed by both '{}' and '{}'",
                        raw, owner, rule.canonical
                    )));
                }
                claimed.insert(folded[0].clone());
            }
        }

        match rules.iter().find(|r| r.canonical == UNIT_ID) {
            Some(id) if id.field_type == FieldType::Text && id.missing == Missing::Required => {}
            Some(_) => {
                return Err(Error::Schema(format!(
                    "'{}' must be a required string field",
                    UNIT_ID
                )))
            }
            None => return Err(Error::Schema(format!("no rule for '{}'", UNIT_ID))),
        }

        let ignored: HashSet<String> = engine_only.iter().map(|k| fold_key(k)).collect();
        if let Some(key) = ignored.iter().find(|k| claimed.contains(*k)) {
            return Err(Error::Schema(format!(
                "raw key '{}' is both read by a rule and ignored as engine-only",
                key
            )));
        }

        let outputs = rules
            .iter()
            .map(|r| r.canonical)
            .chain(DERIVED_FIELDS.iter().copied())
            .map(fold_key)
            .collect();

        Ok(Self {
            rules: rules.to_vec(),
            claimed,
            ignored,
            outputs,
            factions: factions.to_vec(),
        })
    }

    /// The built-in Beyond All Reason unitdef schema
    pub fn beyond_all_reason() -> Result<Self> {
        Self::new(UNITDEF_RULES, ENGINE_ONLY_FIELDS, FACTION_PREFIXES)
    }

    pub fn rules(&self) -> &[FieldRule] {
        &self.rules
    }

    pub fn rule(&self, canonical: &str) -> Option<&FieldRule> {
        self.rules.iter().find(|r| r.canonical == canonical)
    }

    /// Whether a top-level raw key (already folded) is read by any rule
    pub fn is_claimed(&self, folded: &str) -> bool {
        self.claimed.contains(folded)
    }

    /// Whether a top-level raw key (already folded) is engine-only
    pub fn is_ignored(&self, folded: &str) -> bool {
        self.ignored.contains(folded)
    }

    /// Whether a name folds to one produced by the schema, either by a rule or derived
    pub fn is_canonical(&self, name: &str) -> bool {
        self.outputs.contains(&fold_key(name))
    }

    /// Faction for a unit name, from the first matching prefix
    pub fn faction_for(&self, unit_id: &str) -> Option<&'static str> {
        self.factions
            .iter()
            .find(|(prefix, _)| unit_id.starts_with(prefix))
            .map(|(_, faction)| *faction)
    }
}

/// Split a dotted raw key into folded segments
pub(crate) fn fold_path(raw: &str) -> Vec<String> {
    raw.split('.').map(fold_key).collect()
}
