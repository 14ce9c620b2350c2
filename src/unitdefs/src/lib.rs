//! Reshaper for Beyond All Reason unitdef exports
//!
//! The game's export tooling writes one loosely-typed JSON file per unit.
//! This crate turns a directory of those files into a single document keyed
//! by unit name, with typed fields and validated cross-unit references.
//!
//! # Pipeline
//!
//! 1. [`source`]: read every `*.json` file into a [`RawUnitRecord`]
//! 2. [`normalize`]: apply the [`Schema`] rules to each record
//! 3. [`resolve`]: check that every reference names a loaded unit
//! 4. [`output`]: write the [`UnitCollection`] atomically
//!
//! [`reshape_directory`] runs all four steps.

pub mod collection;
pub mod normalize;
pub mod output;
pub mod record;
pub mod reshape;
pub mod resolve;
pub mod schema;
pub mod source;
pub mod value;

use std::path::PathBuf;

// Re-export main types
pub use collection::{UnitCollection, UnitIndex};
pub use normalize::{normalize as normalize_record, Normalized};
pub use output::{render, write_collection, DEFAULT_OUTPUT};
pub use record::{NormalizedUnitRecord, RawUnitRecord};
pub use reshape::{reshape_directory, ReshapeOptions, Reshaper, UnknownFieldPolicy};
pub use resolve::{resolve as resolve_references, DanglingReference, ReferenceTable};
pub use schema::{FieldRule, Missing, Schema};
pub use source::{DirectorySource, RecordSource};
pub use value::{FieldType, FieldValue, UnitReference};

/// Errors from reshaping
///
/// Every variant is fatal for the run.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("No unit definitions found in {0}")]
    EmptyInput(String),

    #[error("Could not read unitdefs directory '{}': {source}", .path.display())]
    InputUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read {}: {source}", .path.display())]
    ReadRecord {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {}: {source}", .path.display())]
    InvalidJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Malformed record {}: field '{field}' {reason}", describe_record(.file, .unit.as_deref()))]
    MalformedRecord {
        file: PathBuf,
        unit: Option<String>,
        field: String,
        reason: String,
    },

    #[error("Unit '{unit_id}' is defined in both {} and {}", .first.display(), .second.display())]
    DuplicateUnit {
        unit_id: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("Field '{field}' is {found} in unit '{unit}' but {expected} in unit '{first_unit}'")]
    InconsistentFieldType {
        field: String,
        unit: String,
        expected: FieldType,
        found: FieldType,
        first_unit: String,
    },

    #[error("Engine id {engine_id} is used by both '{first}' and '{second}'")]
    DuplicateEngineId {
        engine_id: i64,
        first: String,
        second: String,
    },

    #[error("Dangling reference: unit '{unit}' field '{field}' refers to missing unit '{target}'")]
    DanglingReference {
        unit: String,
        field: String,
        target: String,
    },

    #[error("Failed to write {}: {source}", .path.display())]
    WriteFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid schema: {0}")]
    Schema(String),
}

impl Error {
    /// Stable error category for diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            Error::EmptyInput(_) | Error::InputUnreadable { .. } => "EmptyInputError",
            Error::ReadRecord { .. }
            | Error::InvalidJson { .. }
            | Error::MalformedRecord { .. }
            | Error::DuplicateUnit { .. }
            | Error::InconsistentFieldType { .. } => "MalformedRecordError",
            Error::DuplicateEngineId { .. } | Error::DanglingReference { .. } => {
                "DanglingReferenceError"
            }
            Error::WriteFailure { .. } => "WriteFailureError",
            Error::Schema(_) => "SchemaError",
        }
    }
}

fn describe_record(file: &std::path::Path, unit: Option<&str>) -> String {
    match unit {
        Some(unit) => format!("'{}' ({})", unit, file.display()),
        None => file.display().to_string(),
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::DanglingReference {
            unit: "tank".to_string(),
            field: "builds".to_string(),
            target: "factory".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Dangling reference: unit 'tank' field 'builds' refers to missing unit 'factory'"
        );

        let err = Error::MalformedRecord {
            file: PathBuf::from("armpw.json"),
            unit: Some("armpw".to_string()),
            field: "health".to_string(),
            reason: "expected float, got string \"x\"".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Malformed record 'armpw' (armpw.json): field 'health' expected float, got string \"x\""
        );

        let err = Error::MalformedRecord {
            file: PathBuf::from("noname.json"),
            unit: None,
            field: "name".to_string(),
            reason: "is required to key the unit".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Malformed record noname.json: field 'name' is required to key the unit"
        );
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(Error::EmptyInput("dir".into()).kind(), "EmptyInputError");
        assert_eq!(Error::Schema("x".into()).kind(), "SchemaError");
        let err = Error::DuplicateEngineId {
            engine_id: 1,
            first: "a".into(),
            second: "b".into(),
        };
        assert_eq!(err.kind(), "DanglingReferenceError");
        let err = Error::InconsistentFieldType {
            field: "mass".into(),
            unit: "b".into(),
            expected: FieldType::Integer,
            found: FieldType::Float,
            first_unit: "a".into(),
        };
        assert_eq!(err.kind(), "MalformedRecordError");
        assert_eq!(
            err.to_string(),
            "Field 'mass' is float in unit 'b' but integer in unit 'a'"
        );
    }
}
