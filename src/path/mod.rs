// path/mod.rs - BIDS path handling
//! Bidirectional mapping between entity records and BIDS paths.
//!
//! [`EntityPath`] renders the strict, canonical form of a path and parses paths back into
//! entities. [`PatternQuery`] renders the same entities in wildcard-tolerant glob form for
//! scanning, and [`validate_bids_file`] decides whether a candidate path is BIDS at all.

mod entities;
pub mod pattern;
pub mod validate;

pub use entities::*;
pub use pattern::*;
pub use validate::*;

use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};

use crate::schema::Column;

/// One BIDS path: an optional dataset root plus normalized entities.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityPath {
    pub root: Option<PathBuf>,
    pub entities: Entities,
}

impl EntityPath {
    /// Normalizes `entities` (see [`Entities::normalized`]).
    pub fn new(root: Option<PathBuf>, entities: Entities) -> Result<Self, EntityError> {
        Ok(Self { root, entities: entities.normalized()? })
    }

    /// `sub-<subject>/ses-<session>/<datatype>`, omitting absent components.
    pub fn relative_path(&self) -> PathBuf {
        let mut path = PathBuf::new();
        if let Some(subject) = &self.entities.subject {
            path.push(format!("sub-{}", subject));
        }
        if let Some(session) = &self.entities.session {
            path.push(format!("ses-{}", session));
        }
        if let Some(datatype) = &self.entities.datatype {
            path.push(datatype);
        }
        path
    }

    /// Key-value entities in canonical order followed by the bare suffix, joined by `_`.
    pub fn basename(&self) -> String {
        let mut components: Vec<String> = ENTITY_KEYS
            .iter()
            .filter_map(|(column, key)| self.entities.get(*column).map(|v| format!("{}-{}", key, v)))
            .collect();
        if let Some(suffix) = &self.entities.suffix {
            components.push(suffix.clone());
        }
        components.join("_")
    }

    pub fn filename(&self) -> String {
        match self.entities.extension.as_deref() {
            Some(ext) if !ext.is_empty() && !ext.starts_with('.') => format!("{}.{}", self.basename(), ext),
            Some(ext) => format!("{}{}", self.basename(), ext),
            None => self.basename(),
        }
    }

    /// Root (when set) joined with the relative path and the filename.
    pub fn fullpath(&self) -> PathBuf {
        let relative = self.relative_path().join(self.filename());
        match &self.root {
            Some(root) => root.join(relative),
            None => relative,
        }
    }

    /// Parses a path back into entities.
    ///
    /// A path with an extension is a file: up to three trailing parent directories give
    /// subject, session and datatype, and the filename stem gives the key-value entities
    /// plus the suffix (its last `_` component). A path without an extension is a bare
    /// directory probe and only its own trailing components are read. Filename entities
    /// take precedence over directory ones; [`validate_bids_file`] checks they agree.
    pub fn parse(path: impl AsRef<Path>) -> Result<Self, EntityError> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| to_str(n, path))
            .transpose()?
            .unwrap_or_default();
        let (stem, extension) = split_extension(name);

        let mut entities = Entities::new();
        let directory = match extension {
            Some(_) => path.parent(),
            None => Some(path),
        };
        let directories = directory.map(normal_components).transpose()?.unwrap_or_default();
        let tail = &directories[directories.len().saturating_sub(3)..];
        for part in tail {
            if let Some(label) = part.strip_prefix("sub-") {
                entities.subject = Some(label.to_string());
            } else if let Some(label) = part.strip_prefix("ses-") {
                entities.session = Some(label.to_string());
            }
        }
        if let Some(last) = tail.last() {
            if !last.starts_with("sub-") && !last.starts_with("ses-") {
                entities.datatype = Some(last.to_string());
            }
        }

        if let Some(extension) = extension {
            let components: Vec<&str> = stem.split('_').collect();
            if let Some((suffix, keyed)) = components.split_last() {
                for component in keyed {
                    let (key, value) = component
                        .split_once('-')
                        .ok_or_else(|| EntityError::MalformedComponent(component.to_string()))?;
                    let column = column_for_key(key).ok_or_else(|| EntityError::UnknownKey(key.to_string()))?;
                    entities.set(column, Some(value.to_string()));
                }
                entities.set(Column::Suffix, Some(suffix.to_string()));
            }
            entities.extension = Some(extension.to_string());
        }

        let root = if directories.len() > 3 && extension.is_some() {
            directory.and_then(|d| d.ancestors().nth(3)).map(Path::to_path_buf)
        } else {
            None
        };

        EntityPath::new(root, entities)
    }
}

/// Splits a file name at its first `.` into stem and extension (dot included).
pub fn split_extension(name: &str) -> (&str, Option<&str>) {
    match name.find('.') {
        Some(0) | None => (name, None),
        Some(idx) => (&name[..idx], Some(&name[idx..])),
    }
}

fn to_str<'a>(part: &'a OsStr, path: &Path) -> Result<&'a str, EntityError> {
    part.to_str()
        .ok_or_else(|| EntityError::NonUtf8Path(path.to_string_lossy().to_string()))
}

pub(crate) fn normal_components(path: &Path) -> Result<Vec<&str>, EntityError> {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(to_str(part, path)),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Entities {
        Entities::new()
            .with(Column::Subject, "001")
            .with(Column::Session, "01")
            .with(Column::Datatype, "eeg")
            .with(Column::Task, "rest")
            .with(Column::Run, "01")
            .with(Column::Suffix, "eeg")
            .with(Column::Extension, ".vhdr")
    }

    #[test]
    fn test_basename_order_is_canonical() {
        let path = EntityPath::new(None, sample()).unwrap();
        assert_eq!(path.basename(), "sub-001_ses-01_task-rest_run-01_eeg");
    }

    #[test]
    fn test_filename_accepts_extension_with_or_without_dot() {
        let dotted = EntityPath::new(None, sample()).unwrap();
        let bare = EntityPath::new(None, sample().with(Column::Extension, "vhdr")).unwrap();
        assert_eq!(dotted.filename(), "sub-001_ses-01_task-rest_run-01_eeg.vhdr");
        assert_eq!(bare.filename(), dotted.filename());
    }

    #[test]
    fn test_relative_path_omits_absent_components() {
        let full = EntityPath::new(None, sample()).unwrap();
        assert_eq!(full.relative_path(), PathBuf::from("sub-001/ses-01/eeg"));

        let partial = EntityPath::new(None, Entities::new().with(Column::Subject, "001")).unwrap();
        assert_eq!(partial.relative_path(), PathBuf::from("sub-001"));
    }

    #[test]
    fn test_fullpath_with_root() {
        let path = EntityPath::new(Some(PathBuf::from("/data")), sample()).unwrap();
        assert_eq!(
            path.fullpath(),
            PathBuf::from("/data/sub-001/ses-01/eeg/sub-001_ses-01_task-rest_run-01_eeg.vhdr")
        );
    }

    #[test]
    fn test_parse_file() {
        let parsed = EntityPath::parse("sub-001/ses-01/eeg/sub-001_ses-01_task-rest_run-01_eeg.vhdr").unwrap();
        assert_eq!(parsed.entities, sample().normalized().unwrap());
        assert_eq!(parsed.root, None);
    }

    #[test]
    fn test_parse_extracts_root() {
        let parsed = EntityPath::parse("/data/bids/sub-001/ses-01/eeg/sub-001_ses-01_eeg.vhdr").unwrap();
        assert_eq!(parsed.root, Some(PathBuf::from("/data/bids")));
    }

    #[test]
    fn test_round_trip() {
        let entities = Entities::new()
            .with(Column::Subject, "007")
            .with(Column::Session, "02")
            .with(Column::Datatype, "ieeg")
            .with(Column::Task, "motor")
            .with(Column::Acquisition, "high")
            .with(Column::Run, "3")
            .with(Column::Recording, "ecg")
            .with(Column::Space, "CapTrak")
            .with(Column::Description, "clean")
            .with(Column::Suffix, "channels")
            .with(Column::Extension, "tsv");
        let path = EntityPath::new(None, entities).unwrap();
        let parsed = EntityPath::parse(path.relative_path().join(path.filename())).unwrap();
        assert_eq!(parsed.entities, path.entities);
    }

    #[test]
    fn test_parse_is_idempotent_on_normalized_output() {
        let parsed = EntityPath::parse("sub-001/ses-01/eeg/sub-001_ses-01_desc-aDesc_eeg.vhdr").unwrap();
        let again = EntityPath::new(None, parsed.entities.clone()).unwrap();
        assert_eq!(again.entities, parsed.entities);
    }

    #[test]
    fn test_parse_directory_probe() {
        let parsed = EntityPath::parse("sub-003/ses-02/meg").unwrap();
        assert_eq!(parsed.entities.subject.as_deref(), Some("003"));
        assert_eq!(parsed.entities.session.as_deref(), Some("02"));
        assert_eq!(parsed.entities.datatype.as_deref(), Some("meg"));
        assert_eq!(parsed.entities.suffix, None);
        assert_eq!(parsed.entities.extension, None);
    }

    #[test]
    fn test_parse_rejects_malformed_component() {
        let err = EntityPath::parse("sub-001/ses-01/eeg/sub-001_ses01_task-rest_eeg.vhdr").unwrap_err();
        assert_eq!(err, EntityError::MalformedComponent("ses01".to_string()));
    }

    #[test]
    fn test_parse_rejects_unknown_key() {
        let err = EntityPath::parse("sub-001/ses-01/eeg/sub-001_ses-01_foo-bar_eeg.vhdr").unwrap_err();
        assert_eq!(err, EntityError::UnknownKey("foo".to_string()));
    }

    #[test]
    fn test_split_extension() {
        assert_eq!(split_extension("sub-01_eeg.vhdr"), ("sub-01_eeg", Some(".vhdr")));
        assert_eq!(split_extension("sub-01_T1w.nii.gz"), ("sub-01_T1w", Some(".nii.gz")));
        assert_eq!(split_extension("eeg"), ("eeg", None));
        assert_eq!(split_extension(".hidden"), (".hidden", None));
    }
}
