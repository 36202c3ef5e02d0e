//! Folder import: turns an operator-selected directory into an import batch.

use crate::error::{KioskError, Result};
use crate::kernel::registry::ImportFile;
use std::path::Path;
use tracing::warn;
use walkdir::WalkDir;

/// Reads every regular file under `dir`, recursively.
///
/// Names are kept relative to `dir`; the classifier only looks at the base
/// name. Unreadable entries are logged and left out.
pub fn collect_dir(dir: &Path) -> Result<Vec<ImportFile>> {
    if !dir.is_dir() {
        return Err(KioskError::Config(format!("{} is not a directory", dir.display())));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).follow_links(true).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let name = path.strip_prefix(dir).unwrap_or(path).to_string_lossy().into_owned();
        match std::fs::read(path) {
            Ok(data) => files.push(ImportFile::new(name, data)),
            Err(e) => warn!("Skipping {}: {}", path.display(), e),
        }
    }
    Ok(files)
}
