//! Per-record normalization
//!
//! Turns one [`RawUnitRecord`] into a [`NormalizedUnitRecord`] by applying
//! every [`FieldRule`] of the schema, the unknown-field policy, and the
//! derived fields. No I/O and no logging happens here; dropped keys are
//! handed back to the caller.

use crate::record::{NormalizedUnitRecord, RawUnitRecord};
use crate::reshape::UnknownFieldPolicy;
use crate::schema::{
    fold_key, fold_path, FieldRule, Missing, Schema, FACTION, IS_BUILDING, UNIT_ID, UNIT_TYPE,
};
use crate::value::{self, FieldValue};
use crate::{Error, Result};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::Path;

/// Result of normalizing one record
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub record: NormalizedUnitRecord,
    /// Raw keys removed by the unknown-field policy, sorted
    pub dropped: Vec<String>,
}

/// Raw keys of one JSON object grouped by their folded form
struct FoldedKeys<'a> {
    object: &'a Map<String, Value>,
    keys: HashMap<String, Vec<&'a str>>,
}

impl<'a> FoldedKeys<'a> {
    fn new(object: &'a Map<String, Value>) -> Self {
        let mut keys: HashMap<String, Vec<&'a str>> = HashMap::new();
        for key in object.keys() {
            keys.entry(fold_key(key)).or_default().push(key.as_str());
        }
        Self { object, keys }
    }

    /// Look up a folded key. Two raw keys folding together is an ambiguity.
    fn get(&self, folded: &str) -> std::result::Result<Option<(&'a str, &'a Value)>, String> {
        match self.keys.get(folded).map(Vec::as_slice) {
            None => Ok(None),
            Some([key]) => Ok(self.object.get(*key).map(|value| (*key, value))),
            Some(keys) => Err(format!("is ambiguous between raw keys {:?}", keys)),
        }
    }
}

/// Record-scoped error builder
struct Context<'a> {
    file: &'a Path,
    unit: Option<&'a str>,
}

impl Context<'_> {
    fn malformed(&self, field: &str, reason: impl Into<String>) -> Error {
        Error::MalformedRecord {
            file: self.file.to_path_buf(),
            unit: self.unit.map(str::to_string),
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// Normalize one raw record
pub fn normalize(raw: RawUnitRecord, schema: &Schema, policy: UnknownFieldPolicy) -> Result<Normalized> {
    let top = FoldedKeys::new(raw.fields());
    let mut ctx = Context {
        file: raw.origin(),
        unit: None,
    };

    let unit_id = match schema.rule(UNIT_ID) {
        Some(id_rule) => match read_rule(&top, id_rule, &ctx)? {
            Some(FieldValue::Text(name)) if !name.trim().is_empty() => name.trim().to_string(),
            Some(_) => return Err(ctx.malformed(id_rule.raw_keys[0], "must be a non-empty string")),
            None => return Err(ctx.malformed(id_rule.raw_keys[0], "is required to key the unit")),
        },
        None => return Err(Error::Schema(format!("no rule for '{}'", UNIT_ID))),
    };
    ctx.unit = Some(&unit_id);

    let mut record = NormalizedUnitRecord::new(unit_id.as_str());
    for rule in schema.rules().iter().filter(|r| r.canonical != UNIT_ID) {
        let value = match read_rule(&top, rule, &ctx)? {
            Some(value) => Some(value),
            None => match rule.missing {
                Missing::Required => {
                    return Err(ctx.malformed(rule.raw_keys[0], "is required"));
                }
                Missing::Omit => None,
                Missing::Zero => rule.field_type.zero(),
            },
        };
        if let Some(value) = value {
            record.insert(rule.canonical, value);
        }
    }

    let dropped = apply_unknown_policy(raw.fields(), schema, policy, &mut record, &ctx)?;

    if let Some(faction) = schema.faction_for(&unit_id) {
        record.insert(FACTION, FieldValue::Text(faction.to_string()));
    }
    let is_building = record
        .get(IS_BUILDING)
        .and_then(FieldValue::as_bool)
        .unwrap_or(false);
    let unit_type = if is_building { "building" } else { "unit" };
    record.insert(UNIT_TYPE, FieldValue::Text(unit_type.to_string()));

    Ok(Normalized { record, dropped })
}

/// Read and coerce every raw key of a rule
///
/// When several alternative keys are present they must agree after coercion.
fn read_rule(top: &FoldedKeys<'_>, rule: &FieldRule, ctx: &Context<'_>) -> Result<Option<FieldValue>> {
    let mut found: Option<(&str, FieldValue)> = None;

    for &raw_key in rule.raw_keys {
        let raw = lookup(top, raw_key).map_err(|reason| ctx.malformed(raw_key, reason))?;
        let Some(raw) = raw else { continue };
        let value = value::coerce(rule.field_type, raw).map_err(|reason| ctx.malformed(raw_key, reason))?;

        if let Some((first_key, first)) = &found {
            if *first != value {
                return Err(ctx.malformed(
                    raw_key,
                    format!("conflicts with '{}' for {}", first_key, rule.canonical),
                ));
            }
            continue;
        }
        found = Some((raw_key, value));
    }

    Ok(found.map(|(_, value)| value))
}

/// Follow a (possibly dotted) raw key; `null` and non-object intermediates count as missing
fn lookup<'a>(top: &FoldedKeys<'a>, raw_key: &str) -> std::result::Result<Option<&'a Value>, String> {
    let path = fold_path(raw_key);
    let Some((first, rest)) = path.split_first() else {
        return Ok(None);
    };

    let Some((_, mut current)) = top.get(first)? else {
        return Ok(None);
    };
    for segment in rest {
        // Empty Lua tables are exported as `[]`
        let Value::Object(object) = current else {
            return Ok(None);
        };
        match FoldedKeys::new(object).get(segment)? {
            Some((_, value)) => current = value,
            None => return Ok(None),
        }
    }

    Ok((!current.is_null()).then_some(current))
}

fn apply_unknown_policy(
    fields: &Map<String, Value>,
    schema: &Schema,
    policy: UnknownFieldPolicy,
    record: &mut NormalizedUnitRecord,
    ctx: &Context<'_>,
) -> Result<Vec<String>> {
    let mut dropped = Vec::new();

    for (key, raw) in fields {
        let folded = fold_key(key);
        if schema.is_claimed(&folded) || schema.is_ignored(&folded) {
            continue;
        }

        match policy {
            UnknownFieldPolicy::Drop => dropped.push(key.clone()),
            UnknownFieldPolicy::Reject => {
                return Err(ctx.malformed(key, "is not a known unitdef field"));
            }
            UnknownFieldPolicy::PassThrough => {
                if schema.is_canonical(key) {
                    return Err(ctx.malformed(key, "collides with a canonical field name"));
                }
                match value::infer(raw) {
                    Some(value) => {
                        record.insert(key.as_str(), value);
                    }
                    None => dropped.push(key.clone()),
                }
            }
        }
    }

    dropped.sort();
    Ok(dropped)
}
