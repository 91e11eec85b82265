// engine/builder.rs - index builder
//! Builds a [`BidsIndex`] with the builder pattern.

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::indexer::{substring_exclusion, Exclusion, Traversal, WalkdirTraversal};
use crate::path::{Entities, PatternQuery};

use super::core::{BidsIndex, IndexResult, IndexTables, Origin};

/// Index builder
pub struct IndexBuilder {
    root: Option<PathBuf>,
    query: Entities,
    traversal: Arc<dyn Traversal>,
    exclusion: Exclusion,
}

impl Default for IndexBuilder {
    fn default() -> Self {
        Self {
            root: None,
            query: Entities::new(),
            traversal: Arc::new(WalkdirTraversal::new()),
            exclusion: substring_exclusion(vec!["test".to_string()]),
        }
    }
}

impl IndexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Root, walker settings, exclusions and base query from the application config.
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            root: config.paths.root.clone(),
            query: config.query.clone(),
            traversal: Arc::new(WalkdirTraversal::from_config(&config.walker)),
            exclusion: substring_exclusion(config.walker.exclude_substrings.clone()),
        }
    }

    /// Set the dataset root
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    /// Restrict the scan to files matching these entities
    pub fn with_query(mut self, query: Entities) -> Self {
        self.query = query;
        self
    }

    pub fn with_traversal(mut self, traversal: impl Traversal + 'static) -> Self {
        self.traversal = Arc::new(traversal);
        self
    }

    /// Replace the exclusion predicate
    pub fn with_exclusion(mut self, exclusion: Exclusion) -> Self {
        self.exclusion = exclusion;
        self
    }

    /// Exclude file names containing any of `substrings`, ignoring case
    pub fn with_excluded_substrings<I, S>(self, substrings: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let substrings = substrings.into_iter().map(Into::into).collect();
        self.with_exclusion(substring_exclusion(substrings))
    }

    /// An index that has not scanned yet. With a root it scans on first table access.
    pub fn build_lazy(self) -> IndexResult<BidsIndex> {
        let query = PatternQuery::new(self.query)?;
        Ok(BidsIndex {
            root: self.root,
            query,
            traversal: self.traversal,
            exclusion: self.exclusion,
            tables: IndexTables::default(),
            origin: Origin::Unbuilt,
        })
    }

    /// Builds the index, scanning right away when a root is set.
    pub fn build(self) -> IndexResult<BidsIndex> {
        let mut index = self.build_lazy()?;
        if index.root.is_some() {
            index.build()?;
        }
        Ok(index)
    }

    /// An unbuilt, rootless index over every file.
    pub(crate) fn into_index(self) -> BidsIndex {
        BidsIndex {
            root: self.root,
            query: PatternQuery::all(),
            traversal: self.traversal,
            exclusion: self.exclusion,
            tables: IndexTables::default(),
            origin: Origin::Unbuilt,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::IndexError;
    use crate::schema::Column;
    use tempfile::tempdir;

    fn dataset() -> tempfile::TempDir {
        let dir = tempdir().unwrap();
        for name in ["sub-01_ses-01_task-rest_eeg.vhdr", "sub-01_ses-01_task-rest_eeg.eeg"] {
            let path = dir.path().join("sub-01/ses-01/eeg").join(name);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, "").unwrap();
        }
        dir
    }

    #[test]
    fn test_builder() {
        let dir = dataset();
        let index = IndexBuilder::new().with_root(dir.path()).build().unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(index.root(), Some(dir.path()));
    }

    #[test]
    fn test_builder_with_query() {
        let dir = dataset();
        let index = IndexBuilder::new()
            .with_root(dir.path())
            .with_query(Entities::new().with(Column::Extension, "vhdr"))
            .build()
            .unwrap();
        assert_eq!(index.extensions(), vec![".vhdr"]);
    }

    #[test]
    fn test_builder_rejects_invalid_query() {
        let result = IndexBuilder::new()
            .with_query(Entities::new().with(Column::Subject, "not valid"))
            .build();
        assert!(matches!(result, Err(IndexError::EntityFormat(_))));
    }

    #[test]
    fn test_lazy_build_scans_on_first_access() {
        let dir = dataset();
        let mut index = IndexBuilder::new().with_root(dir.path()).build_lazy().unwrap();
        assert!(index.needs_build());
        assert!(index.records().is_empty());
        assert_eq!(index.files().unwrap().len(), 2);
        assert!(!index.needs_build());
    }

    #[test]
    fn test_excluded_substrings() {
        let dir = dataset();
        let index = IndexBuilder::new()
            .with_root(dir.path())
            .with_excluded_substrings(["EEG"])
            .build()
            .unwrap();
        assert!(index.is_empty());
    }

    #[test]
    fn test_from_config() {
        let dir = dataset();
        let mut config = AppConfig::default();
        config.paths.root = Some(dir.path().to_path_buf());
        config.query = Entities::new().with(Column::Extension, ".eeg");
        let index = IndexBuilder::from_config(&config).build().unwrap();
        assert_eq!(index.len(), 1);
    }
}
