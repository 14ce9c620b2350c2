//! Writing the reshaped document

use crate::collection::UnitCollection;
use crate::{Error, Result};
use std::io::Write;
use std::path::Path;

/// Default output location, relative to the working directory
pub const DEFAULT_OUTPUT: &str = "unitdefs.json";

/// Render the collection as pretty JSON with a trailing newline
pub fn render(collection: &UnitCollection) -> serde_json::Result<Vec<u8>> {
    let mut bytes = serde_json::to_vec_pretty(collection)?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Write the collection to `path`
///
/// The document goes to a temporary file next to the destination first and is
/// renamed into place, so a failed write never leaves a truncated file.
pub fn write_collection(collection: &UnitCollection, path: &Path) -> Result<()> {
    let failure = |source: std::io::Error| Error::WriteFailure {
        path: path.to_path_buf(),
        source,
    };

    let bytes = render(collection).map_err(|e| failure(e.into()))?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut temp = tempfile::NamedTempFile::new_in(dir).map_err(failure)?;
    temp.write_all(&bytes).map_err(failure)?;
    temp.flush().map_err(failure)?;
    temp.persist(path).map_err(|e| failure(e.error))?;

    tracing::debug!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}
