//! Pipeline orchestration: load, normalize, resolve, write
//!
//! A run either produces a complete collection or fails; there is no mode
//! that skips bad records.

use crate::collection::UnitCollection;
use crate::normalize::normalize;
use crate::output::write_collection;
use crate::record::{NormalizedUnitRecord, RawUnitRecord};
use crate::resolve::resolve;
use crate::schema::Schema;
use crate::source::{DirectorySource, RecordSource};
use crate::value::FieldType;
use crate::{Error, Result};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

/// How to treat raw fields that no rule reads and that are not engine-only
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnknownFieldPolicy {
    /// Remove them and report them in the run summary
    #[default]
    Drop,
    /// Fail the record
    Reject,
    /// Keep scalar values under their raw key; drop the rest
    PassThrough,
}

/// Run parameters threaded through the pipeline
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReshapeOptions {
    pub unknown_fields: UnknownFieldPolicy,
}

/// Drives one reshaping run over a fixed schema
#[derive(Debug, Clone, Copy)]
pub struct Reshaper<'a> {
    schema: &'a Schema,
    options: &'a ReshapeOptions,
}

impl<'a> Reshaper<'a> {
    pub fn new(schema: &'a Schema, options: &'a ReshapeOptions) -> Self {
        Self { schema, options }
    }

    /// Load everything from a source and reshape it
    pub fn reshape<S: RecordSource + ?Sized>(&self, source: &S) -> Result<UnitCollection> {
        let records = source.load()?;
        if records.is_empty() {
            return Err(Error::EmptyInput(source.describe()));
        }
        self.reshape_records(records)
    }

    /// Reshape already-loaded records
    ///
    /// Records are processed in origin order so the first reported failure
    /// does not depend on discovery order.
    pub fn reshape_records(&self, mut records: Vec<RawUnitRecord>) -> Result<UnitCollection> {
        if records.is_empty() {
            return Err(Error::EmptyInput("<no records>".to_string()));
        }
        records.sort_by(|a, b| a.origin().cmp(b.origin()));

        let mut units: BTreeMap<String, NormalizedUnitRecord> = BTreeMap::new();
        let mut origins: HashMap<String, PathBuf> = HashMap::new();
        let mut dropped: BTreeMap<String, usize> = BTreeMap::new();

        for raw in records {
            let origin = raw.origin().to_path_buf();
            tracing::info!("Processing {}", display_name(&origin));

            let normalized = normalize(raw, self.schema, self.options.unknown_fields)?;
            let unit_id = normalized.record.unit_id().to_string();
            tracing::debug!(
                unit = %unit_id,
                fields = normalized.record.fields().len(),
                "{} - extracted fields",
                unit_id
            );

            for key in normalized.dropped {
                *dropped.entry(key).or_default() += 1;
            }

            if let Some(first) = origins.get(&unit_id) {
                return Err(Error::DuplicateUnit {
                    unit_id,
                    first: first.clone(),
                    second: origin,
                });
            }
            origins.insert(unit_id.clone(), origin);
            units.insert(unit_id, normalized.record);
        }

        check_field_types(&units)?;
        let collection = resolve(units)?;

        log_summary(&collection, &dropped);
        Ok(collection)
    }
}

/// A field name must carry one value type across every record
pub fn check_field_types(units: &BTreeMap<String, NormalizedUnitRecord>) -> Result<()> {
    let mut seen: HashMap<&str, (FieldType, &str)> = HashMap::new();

    for (unit_id, record) in units {
        for (field, value) in record.fields() {
            let found = value.field_type();
            let (expected, first_unit) = *seen
                .entry(field.as_str())
                .or_insert((found, unit_id.as_str()));
            if expected != found {
                return Err(Error::InconsistentFieldType {
                    field: field.clone(),
                    unit: unit_id.clone(),
                    expected,
                    found,
                    first_unit: first_unit.to_string(),
                });
            }
        }
    }

    Ok(())
}

fn log_summary(collection: &UnitCollection, dropped: &BTreeMap<String, usize>) {
    if !dropped.is_empty() {
        let total: usize = dropped.values().sum();
        tracing::info!(
            "Dropped {} unknown field values across {} distinct keys",
            total,
            dropped.len()
        );
        for (key, count) in dropped {
            tracing::debug!(key = %key, count, "dropped unknown field");
        }
    }

    let index = collection.index();
    for (faction, units) in &index.by_faction {
        tracing::info!(faction = %faction, units = units.len(), "faction summary");
    }
    if !index.unaffiliated.is_empty() {
        tracing::info!(units = index.unaffiliated.len(), "units without a faction");
    }
    tracing::info!("Reshaped {} units", collection.len());
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// Reshape a unitdefs directory and write the result to `output`
///
/// The output file is only touched once the whole collection is valid.
pub fn reshape_directory(
    input: &Path,
    output: &Path,
    schema: &Schema,
    options: &ReshapeOptions,
) -> Result<UnitCollection> {
    let source = DirectorySource::open(input)?;
    let collection = Reshaper::new(schema, options).reshape(&source)?;
    tracing::debug!("Processed raw unitdefs");

    write_collection(&collection, output)?;
    tracing::info!("Wrote {} units to {}", collection.len(), output.display());
    Ok(collection)
}
