//! The assembled unit set and its derived indices

use crate::record::NormalizedUnitRecord;
use crate::schema::{FACTION, UNIT_TYPE};
use crate::value::FieldValue;
use serde::Serialize;
use std::collections::BTreeMap;

/// Every normalized unit, keyed by `unit_id`
///
/// Only built by the resolver, so every reference inside points at a key of
/// the same collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct UnitCollection {
    units: BTreeMap<String, NormalizedUnitRecord>,
}

impl UnitCollection {
    pub(crate) fn from_units(units: BTreeMap<String, NormalizedUnitRecord>) -> Self {
        Self { units }
    }

    pub fn get(&self, unit_id: &str) -> Option<&NormalizedUnitRecord> {
        self.units.get(unit_id)
    }

    pub fn contains(&self, unit_id: &str) -> bool {
        self.units.contains_key(unit_id)
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn unit_ids(&self) -> impl Iterator<Item = &str> {
        self.units.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &NormalizedUnitRecord> {
        self.units.values()
    }

    /// Build the faction / type / tech level groupings
    pub fn index(&self) -> UnitIndex {
        UnitIndex::build(self)
    }
}

impl<'a> IntoIterator for &'a UnitCollection {
    type Item = &'a NormalizedUnitRecord;
    type IntoIter = std::collections::btree_map::Values<'a, String, NormalizedUnitRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.units.values()
    }
}

/// Secondary groupings over a finished collection
///
/// Built from normalized fields only. Each list is in `unit_id` order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UnitIndex {
    pub by_faction: BTreeMap<String, Vec<String>>,
    pub by_type: BTreeMap<String, Vec<String>>,
    pub by_tech_level: BTreeMap<i64, Vec<String>>,
    /// Units whose name matched no faction prefix
    pub unaffiliated: Vec<String>,
}

impl UnitIndex {
    pub fn build(collection: &UnitCollection) -> Self {
        let mut index = Self::default();

        for record in collection {
            let unit_id = record.unit_id().to_string();

            match record.get(FACTION).and_then(FieldValue::as_text) {
                Some(faction) => index
                    .by_faction
                    .entry(faction.to_string())
                    .or_default()
                    .push(unit_id.clone()),
                None => index.unaffiliated.push(unit_id.clone()),
            }

            if let Some(unit_type) = record.get(UNIT_TYPE).and_then(FieldValue::as_text) {
                index
                    .by_type
                    .entry(unit_type.to_string())
                    .or_default()
                    .push(unit_id.clone());
            }

            if let Some(level) = record.get("tech_level").and_then(FieldValue::as_integer) {
                index.by_tech_level.entry(level).or_default().push(unit_id);
            }
        }

        index
    }

    pub fn faction(&self, faction: &str) -> &[String] {
        self.by_faction.get(faction).map(Vec::as_slice).unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(id: &str, faction: Option<&str>, unit_type: &str, tech: Option<i64>) -> NormalizedUnitRecord {
        let mut record = NormalizedUnitRecord::new(id);
        if let Some(faction) = faction {
            record.insert(FACTION, FieldValue::Text(faction.to_string()));
        }
        record.insert(UNIT_TYPE, FieldValue::Text(unit_type.to_string()));
        if let Some(tech) = tech {
            record.insert("tech_level", FieldValue::Integer(tech));
        }
        record
    }

    fn collection(records: Vec<NormalizedUnitRecord>) -> UnitCollection {
        UnitCollection::from_units(
            records
                .into_iter()
                .map(|r| (r.unit_id().to_string(), r))
                .collect(),
        )
    }

    #[test]
    fn test_index_groups() {
        let units = collection(vec![
            unit("corlab", Some("cortex"), "building", Some(1)),
            unit("armpw", Some("armada"), "unit", Some(1)),
            unit("armlab", Some("armada"), "building", Some(1)),
            unit("chicken", None, "unit", None),
        ]);
        let index = units.index();

        assert_eq!(index.faction("armada"), ["armlab", "armpw"]);
        assert_eq!(index.faction("cortex"), ["corlab"]);
        assert!(index.faction("legion").is_empty());
        assert_eq!(index.unaffiliated, ["chicken"]);
        assert_eq!(index.by_type["building"], ["armlab", "corlab"]);
        assert_eq!(index.by_tech_level[&1].len(), 3);
    }

    #[test]
    fn test_collection_serializes_as_plain_map() {
        let units = collection(vec![unit("armpw", None, "unit", None)]);
        let json = serde_json::to_value(&units).unwrap();
        assert_eq!(json["armpw"]["unit_id"], "armpw");
        assert_eq!(json["armpw"]["unit_type"], "unit");
        assert_eq!(units.unit_ids().collect::<Vec<_>>(), ["armpw"]);
    }
}
