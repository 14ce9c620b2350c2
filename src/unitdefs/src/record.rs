//! Raw and normalized unit records

use crate::schema::UNIT_ID;
use crate::value::{FieldValue, UnitReference};
use crate::{Error, Result};
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// One unitdef as read from the export, keyed by raw field name
#[derive(Debug, Clone, PartialEq)]
pub struct RawUnitRecord {
    origin: PathBuf,
    fields: Map<String, Value>,
}

impl RawUnitRecord {
    pub fn new(origin: impl Into<PathBuf>, fields: Map<String, Value>) -> Self {
        Self {
            origin: origin.into(),
            fields,
        }
    }

    /// Wrap a parsed JSON document; the root must be an object
    pub fn from_value(origin: impl Into<PathBuf>, value: Value) -> Result<Self> {
        let origin = origin.into();
        match value {
            Value::Object(fields) => Ok(Self::new(origin, fields)),
            other => Err(Error::MalformedRecord {
                file: origin,
                unit: None,
                field: "<root>".to_string(),
                reason: format!(
                    "must be a JSON object, got {}",
                    crate::value::describe(&other)
                ),
            }),
        }
    }

    /// File (or other label) this record was read from
    pub fn origin(&self) -> &Path {
        &self.origin
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }
}

/// A unit with canonical, typed fields
///
/// Serializes as a JSON object with `unit_id` first and the remaining fields
/// in name order.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedUnitRecord {
    unit_id: String,
    fields: BTreeMap<String, FieldValue>,
}

impl NormalizedUnitRecord {
    pub fn new(unit_id: impl Into<String>) -> Self {
        Self {
            unit_id: unit_id.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn unit_id(&self) -> &str {
        &self.unit_id
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    pub fn fields(&self) -> &BTreeMap<String, FieldValue> {
        &self.fields
    }

    pub fn insert(&mut self, field: impl Into<String>, value: FieldValue) -> Option<FieldValue> {
        self.fields.insert(field.into(), value)
    }

    /// Every reference-typed field, in field name order
    pub fn references(&self) -> impl Iterator<Item = (&str, &[UnitReference])> {
        self.fields
            .iter()
            .filter_map(|(name, value)| value.as_references().map(|refs| (name.as_str(), refs)))
    }
}

impl Serialize for NormalizedUnitRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len() + 1))?;
        map.serialize_entry(UNIT_ID, &self.unit_id)?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
