//! Cross-record reference resolution
//!
//! Runs after every record has been normalized, so forward references to
//! units that sort later are never a problem. Pass one collects every
//! `unit_id` and engine id; pass two checks each reference against that set
//! and rewrites engine ids to unit names.

use crate::collection::UnitCollection;
use crate::record::NormalizedUnitRecord;
use crate::schema::ENGINE_ID;
use crate::value::{FieldValue, UnitReference};
use crate::{Error, Result};
use std::collections::{BTreeMap, HashMap, HashSet};

/// A reference whose target is not among the loaded units
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DanglingReference {
    pub unit: String,
    pub field: String,
    pub target: UnitReference,
}

impl From<DanglingReference> for Error {
    fn from(d: DanglingReference) -> Self {
        Error::DanglingReference {
            unit: d.unit,
            field: d.field,
            target: d.target.to_string(),
        }
    }
}

/// Every known unit, by name and by engine id
#[derive(Debug)]
pub struct ReferenceTable<'a> {
    unit_ids: HashSet<&'a str>,
    engine_ids: HashMap<i64, &'a str>,
}

impl<'a> ReferenceTable<'a> {
    /// Pass one: collect identities. Two units sharing an engine id is an error.
    pub fn build(units: &'a BTreeMap<String, NormalizedUnitRecord>) -> Result<Self> {
        let mut unit_ids = HashSet::with_capacity(units.len());
        let mut engine_ids: HashMap<i64, &'a str> = HashMap::new();

        for (unit_id, record) in units {
            unit_ids.insert(unit_id.as_str());
            if let Some(engine_id) = record.get(ENGINE_ID).and_then(FieldValue::as_integer) {
                if let Some(first) = engine_ids.insert(engine_id, unit_id.as_str()) {
                    return Err(Error::DuplicateEngineId {
                        engine_id,
                        first: first.to_string(),
                        second: unit_id.clone(),
                    });
                }
            }
        }

        Ok(Self {
            unit_ids,
            engine_ids,
        })
    }

    /// The `unit_id` a reference points at, if it exists
    pub fn lookup(&self, reference: &UnitReference) -> Option<&'a str> {
        match reference {
            UnitReference::Name(name) => self.unit_ids.get(name.as_str()).copied(),
            UnitReference::EngineId(id) => self.engine_ids.get(id).copied(),
        }
    }
}

/// Find every dangling reference, in unit, field and position order
pub fn dangling_references(
    units: &BTreeMap<String, NormalizedUnitRecord>,
    table: &ReferenceTable<'_>,
) -> Vec<DanglingReference> {
    let mut dangling = Vec::new();
    for (unit_id, record) in units {
        for (field, refs) in record.references() {
            for target in refs.iter().filter(|r| table.lookup(r).is_none()) {
                dangling.push(DanglingReference {
                    unit: unit_id.clone(),
                    field: field.to_string(),
                    target: target.clone(),
                });
            }
        }
    }
    dangling
}

/// Validate every reference and build the final collection
///
/// All dangling references are logged; the first one is returned as the error.
pub fn resolve(mut units: BTreeMap<String, NormalizedUnitRecord>) -> Result<UnitCollection> {
    let materialized = {
        let table = ReferenceTable::build(&units)?;

        let dangling = dangling_references(&units, &table);
        for d in &dangling {
            tracing::warn!(unit = %d.unit, field = %d.field, target = %d.target, "dangling reference");
        }
        if let Some(first) = dangling.into_iter().next() {
            return Err(first.into());
        }

        materialize(&units, &table)
    };

    for (unit_id, field, refs) in materialized {
        if let Some(record) = units.get_mut(&unit_id) {
            record.insert(field, FieldValue::References(refs));
        }
    }

    Ok(UnitCollection::from_units(units))
}

/// Reference fields that contain engine ids, rewritten to unit names
fn materialize(
    units: &BTreeMap<String, NormalizedUnitRecord>,
    table: &ReferenceTable<'_>,
) -> Vec<(String, String, Vec<UnitReference>)> {
    let mut rewritten = Vec::new();
    for (unit_id, record) in units {
        for (field, refs) in record.references() {
            if !refs.iter().any(|r| matches!(r, UnitReference::EngineId(_))) {
                continue;
            }
            let names = refs
                .iter()
                .filter_map(|r| table.lookup(r))
                .map(UnitReference::name)
                .collect();
            rewritten.push((unit_id.clone(), field.to_string(), names));
        }
    }
    rewritten
}
