//! Reading and writing the text formats of the hybrid-ligand pipeline.
//!
//! - [`topology`] parses `.itp` ligand topologies into typed sections and records.
//! - [`itp`] writes the merged hybrid topology and its companion atom-types file with the
//!   column widths the MD engine expects.
//! - [`gro`] reads and writes fixed-column coordinate files, preserving untouched rows.
//! - [`mol2`] reads the 3D structures consumed by correspondence oracles.
//! - [`posres`] and [`summary`] emit position restraints and system topologies.

pub mod error;
pub mod gro;
pub mod itp;
pub mod mol2;
pub mod posres;
pub mod summary;
pub mod topology;
pub mod traits;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Writes `contents` to `path` through a sibling temporary file and a rename.
///
/// Readers never observe a partially written file: either the previous contents or the new
/// ones are present at `path`.
pub fn write_atomically(path: &Path, contents: &str) -> io::Result<()> {
    let temp = temporary_sibling(path);
    fs::write(&temp, contents)?;
    if let Err(e) = fs::rename(&temp, path) {
        let _ = fs::remove_file(&temp);
        return Err(e);
    }
    Ok(())
}

/// Writes a set of files so that either all of them are replaced or none is.
///
/// Every file is first staged to its temporary sibling. Only when all stages succeed are the
/// temporaries renamed over their targets; a failed rename restores the targets already
/// replaced. On error the failing path is returned with the cause.
pub fn write_all_atomically(files: &[(PathBuf, String)]) -> Result<(), (PathBuf, io::Error)> {
    let mut staged: Vec<PathBuf> = Vec::with_capacity(files.len());
    for (path, contents) in files {
        let temp = temporary_sibling(path);
        if let Err(e) = fs::write(&temp, contents) {
            let _ = fs::remove_file(&temp);
            discard(&staged);
            return Err((path.clone(), e));
        }
        staged.push(temp);
    }

    let mut committed: Vec<(&Path, Option<PathBuf>)> = Vec::with_capacity(files.len());
    for (index, ((path, _), temp)) in files.iter().zip(&staged).enumerate() {
        match commit(path, temp) {
            Ok(backup) => committed.push((path, backup)),
            Err(e) => {
                discard(&staged[index..]);
                for (path, backup) in committed.iter().rev() {
                    let _ = fs::remove_file(path);
                    if let Some(backup) = backup {
                        let _ = fs::rename(backup, path);
                    }
                }
                return Err((path.clone(), e));
            }
        }
    }

    for (_, backup) in committed {
        if let Some(backup) = backup {
            let _ = fs::remove_file(backup);
        }
    }
    Ok(())
}

/// Moves `temp` over `path`, keeping any previous file aside so it can be restored.
fn commit(path: &Path, temp: &Path) -> io::Result<Option<PathBuf>> {
    let backup = if path.exists() {
        let backup = backup_sibling(path);
        fs::rename(path, &backup)?;
        Some(backup)
    } else {
        None
    };
    if let Err(e) = fs::rename(temp, path) {
        if let Some(backup) = &backup {
            let _ = fs::rename(backup, path);
        }
        return Err(e);
    }
    Ok(backup)
}

fn discard(paths: &[PathBuf]) {
    for path in paths {
        let _ = fs::remove_file(path);
    }
}

fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.{suffix}"))
}

fn temporary_sibling(path: &Path) -> PathBuf {
    sibling_with_suffix(path, "partial")
}

fn backup_sibling(path: &Path) -> PathBuf {
    sibling_with_suffix(path, "previous")
}

/// Returns an error unless `path` has the given extension (case-insensitive).
pub fn check_extension(path: &Path, expected: &'static str) -> Result<(), error::FormatError> {
    let matches = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(expected));
    if matches {
        Ok(())
    } else {
        Err(error::FormatErrorKind::UnexpectedExtension { expected }.into())
    }
}
