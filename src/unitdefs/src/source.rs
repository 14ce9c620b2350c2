//! Where raw unit records come from

use crate::record::RawUnitRecord;
use crate::{Error, Result};
use std::path::{Path, PathBuf};

/// A provider of raw unitdef records
pub trait RecordSource {
    /// Label used in diagnostics (usually a directory path)
    fn describe(&self) -> String;

    /// Load every record. An empty result is not an error here.
    fn load(&self) -> Result<Vec<RawUnitRecord>>;
}

/// A directory of exported unitdefs, one `*.json` file per unit
///
/// Only files directly inside the directory are read; subdirectories and
/// other extensions are skipped. Symlinks are followed, and a link whose
/// target is missing fails the load.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    path: PathBuf,
}

impl DirectorySource {
    /// Open a unitdefs directory, failing if it does not exist
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        match std::fs::metadata(&path) {
            Ok(meta) if meta.is_dir() => Ok(Self { path }),
            Ok(_) => Err(Error::InputUnreadable {
                path,
                source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a directory"),
            }),
            Err(source) => Err(Error::InputUnreadable { path, source }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Paths of all unitdef files, in file name order
    pub fn files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        for entry in walkdir::WalkDir::new(&self.path)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| Error::InputUnreadable {
                path: self.path.clone(),
                source: e.into(),
            })?;
            let path = entry.path();

            let is_json = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("json"));
            if !entry.file_type().is_file() || !is_json {
                tracing::debug!("Skipping {}", path.display());
                continue;
            }

            files.push(path.to_path_buf());
        }

        Ok(files)
    }
}

/// Read and parse one unitdef file
pub fn read_record(path: &Path) -> Result<RawUnitRecord> {
    let content = std::fs::read_to_string(path).map_err(|source| Error::ReadRecord {
        path: path.to_path_buf(),
        source,
    })?;
    let value = serde_json::from_str(&content).map_err(|source| Error::InvalidJson {
        path: path.to_path_buf(),
        source,
    })?;
    RawUnitRecord::from_value(path, value)
}

impl RecordSource for DirectorySource {
    fn describe(&self) -> String {
        self.path().display().to_string()
    }

    fn load(&self) -> Result<Vec<RawUnitRecord>> {
        self.files()?.iter().map(|path| read_record(path)).collect()
    }
}

/// In-memory records, mostly for tests and embedding
impl RecordSource for [RawUnitRecord] {
    fn describe(&self) -> String {
        "<memory>".to_string()
    }

    fn load(&self) -> Result<Vec<RawUnitRecord>> {
        Ok(self.to_vec())
    }
}
