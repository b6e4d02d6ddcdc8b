//! Script sources
//!
//! Each file's full contents is one migration; the file stem is its name.

use crate::errors::{io_error, Result};
use migrun_core::{MigrationScript, MigrunError};
use std::path::{Path, PathBuf};

/// Load every `.sql` file directly inside `dir`, ordered by file name
///
/// # Errors
///
/// `Io` if the directory or a file cannot be read, `InvalidInput` if the
/// directory holds no `.sql` files.
pub fn load_dir<P: AsRef<Path>>(dir: P) -> Result<Vec<MigrationScript>> {
    let dir = dir.as_ref();
    let entries = std::fs::read_dir(dir).map_err(|e| io_error("load_dir", dir, e))?;

    let mut files: Vec<PathBuf> = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| io_error("load_dir", dir, e))?.path();
        let is_sql = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("sql"))
            .unwrap_or(false);
        if is_sql && path.is_file() {
            files.push(path);
        }
    }

    if files.is_empty() {
        return Err(MigrunError::NoScripts {
            path: dir.display().to_string(),
        }
        .into());
    }

    // Numeric prefixes (001_, 002_) make byte order the intended order
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    load_files(files.as_slice())
}

/// Load an explicit list of files, keeping the given order
///
/// # Errors
///
/// `Io` if a file cannot be read, `InvalidInput` if a name cannot be
/// derived from a path.
pub fn load_files<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<MigrationScript>> {
    paths
        .iter()
        .map(|path| {
            let path = path.as_ref();
            let name = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .ok_or_else(|| MigrunError::InvalidFileName {
                    path: path.display().to_string(),
                })?;
            let sql = std::fs::read_to_string(path).map_err(|e| io_error("load_files", path, e))?;
            MigrationScript::new(name, sql)
        })
        .collect()
}
