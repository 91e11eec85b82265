// schema/document.rs - table row types
//! Rows of the file table and the error table, plus the stat snapshot taken at scan time.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::path::Entities;

use super::Column;

/// One valid file of the dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Primary key, see [`FileStat::unique_id`]
    pub unique_id: u64,
    pub root: PathBuf,
    #[serde(flatten)]
    pub entities: Entities,
    /// Full resolved path of the file
    pub filename: PathBuf,
    pub atime: i64,
    pub mtime: i64,
    pub ctime: i64,
}

impl FileRecord {
    pub fn new(root: &Path, filename: PathBuf, entities: Entities, stat: FileStat) -> Self {
        Self {
            unique_id: stat.unique_id,
            root: root.to_path_buf(),
            entities,
            filename,
            atime: stat.atime,
            mtime: stat.mtime,
            ctime: stat.ctime,
        }
    }

    /// Value of an entity column, `None` when the entity is absent.
    pub fn column(&self, column: Column) -> Option<&str> {
        self.entities.get(column)
    }
}

/// Symbolic category of a rejected file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Structural, grammar or consistency check failed
    ValidationFailure,
    /// The name passed validation but an entity could not be extracted
    EntityFormat,
    /// The file vanished or could not be stat-ed during the scan
    Io,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::ValidationFailure => "ValidationFailure",
            ErrorKind::EntityFormat => "EntityFormatError",
            ErrorKind::Io => "IoError",
        };
        f.write_str(name)
    }
}

/// One rejected candidate file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub filename: PathBuf,
    pub error_type: ErrorKind,
    pub error_message: String,
    /// `None` when the file could not even be stat-ed
    pub unique_id: Option<u64>,
}

impl ErrorRecord {
    pub fn new(filename: PathBuf, error_type: ErrorKind, error_message: String, unique_id: Option<u64>) -> Self {
        Self { filename, error_type, error_message, unique_id }
    }
}

/// Identity and timestamps of a file, captured once per scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    /// Inode number on unix; a hash of the canonical path elsewhere
    pub unique_id: u64,
    pub atime: i64,
    pub mtime: i64,
    pub ctime: i64,
}

impl FileStat {
    #[cfg(unix)]
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        use std::os::unix::fs::MetadataExt;

        let metadata = std::fs::metadata(path)?;
        Ok(Self {
            unique_id: metadata.ino(),
            atime: metadata.atime(),
            mtime: metadata.mtime(),
            ctime: metadata.ctime(),
        })
    }

    #[cfg(not(unix))]
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};
        use std::time::SystemTime;

        let metadata = std::fs::metadata(path)?;
        let canonical_path = path.canonicalize()?;
        let mut hasher = DefaultHasher::new();
        canonical_path.hash(&mut hasher);

        let seconds = |time: std::io::Result<SystemTime>| {
            time.unwrap_or(SystemTime::UNIX_EPOCH)
                .duration_since(SystemTime::UNIX_EPOCH)
                .map(|d| d.as_secs() as i64)
                .unwrap_or_default()
        };

        Ok(Self {
            unique_id: hasher.finish(),
            atime: seconds(metadata.accessed()),
            mtime: seconds(metadata.modified()),
            ctime: seconds(metadata.created()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_stat_is_stable_for_unchanged_file() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("sub-01_ses-01_eeg.vhdr");
        std::fs::write(&file, "Brain Vision Data Exchange Header File\n").unwrap();

        let first = FileStat::from_path(&file).unwrap();
        let second = FileStat::from_path(&file).unwrap();
        assert_eq!(first.unique_id, second.unique_id);
        assert_eq!(first.mtime, second.mtime);
    }

    #[test]
    fn test_distinct_files_have_distinct_ids() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.vhdr");
        let b = dir.path().join("b.vhdr");
        std::fs::write(&a, "a").unwrap();
        std::fs::write(&b, "b").unwrap();

        assert_ne!(
            FileStat::from_path(&a).unwrap().unique_id,
            FileStat::from_path(&b).unwrap().unique_id
        );
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(FileStat::from_path(&dir.path().join("missing.vhdr")).is_err());
    }
}
