// engine/core.rs - the BIDS index
//! The index type: root, file table, error table, and the scan that fills them.

use std::borrow::Cow;
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use crate::indexer::{self, Exclusion, Traversal};
use crate::path::{EntityError, PatternQuery};
use crate::query::{Criteria, MaskBuilder};
use crate::schema::{Column, ErrorKind, ErrorRecord, FileRecord};

use super::builder::IndexBuilder;

/// Index error type
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid selection keys: {}", .keys.join(", "))]
    InvalidCriteria { keys: Vec<String> },

    #[error("Cannot perform operations between types {lhs} and {rhs}")]
    IncompatibleOperand { lhs: String, rhs: String },

    #[error("Operand has invalid columns: missing {missing:?}, unknown {unknown:?}")]
    InvalidColumns { missing: Vec<String>, unknown: Vec<String> },

    #[error(
        "Malformed range '{0}': input must be digits separated by a `-` or \
         digits and a wild card `*` separated by a `-`"
    )]
    MalformedRange(String),

    #[error("Entity format error: {0}")]
    EntityFormat(#[from] EntityError),

    #[error("Index {index} out of range for {len} rows")]
    OutOfRange { index: isize, len: usize },

    #[error("Query parse error: {0}")]
    QueryParse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Glob pattern error: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type IndexResult<T> = Result<T, IndexError>;

/// The two co-indexed tables of an index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexTables {
    pub files: Vec<FileRecord>,
    pub errors: Vec<ErrorRecord>,
}

/// Where the current tables came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Origin {
    /// Never populated
    Unbuilt,
    /// Filled by a filesystem scan
    Scanned,
    /// Produced by selection or set algebra from other tables
    Derived,
}

/// An indexed BIDS dataset.
///
/// Rows are kept in scan order and keyed by [`FileRecord::unique_id`]. Cloning copies both
/// tables, so snapshots returned by selection and set algebra never share rows with their
/// source.
#[derive(Clone)]
pub struct BidsIndex {
    pub(crate) root: Option<PathBuf>,
    pub(crate) query: PatternQuery,
    pub(crate) traversal: Arc<dyn Traversal>,
    pub(crate) exclusion: Exclusion,
    pub(crate) tables: IndexTables,
    pub(crate) origin: Origin,
}

impl BidsIndex {
    /// An empty index without a root.
    pub fn new() -> Self {
        IndexBuilder::new().into_index()
    }

    pub fn builder() -> IndexBuilder {
        IndexBuilder::new()
    }

    /// Builds an index over every file below `root`.
    pub fn open(root: impl Into<PathBuf>) -> IndexResult<Self> {
        IndexBuilder::new().with_root(root).build()
    }

    /// A derived snapshot holding the given tables.
    pub(crate) fn derived(&self, root: Option<PathBuf>, tables: IndexTables) -> Self {
        Self {
            root,
            query: self.query.clone(),
            traversal: Arc::clone(&self.traversal),
            exclusion: self.exclusion.clone(),
            tables,
            origin: Origin::Derived,
        }
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    pub fn query(&self) -> &PatternQuery {
        &self.query
    }

    /// Rescans the whole tree and replaces both tables.
    pub fn build(&mut self) -> IndexResult<&mut Self> {
        let root = self
            .root
            .clone()
            .ok_or_else(|| IndexError::Config("Root directory not set".to_string()))?;

        let tables = indexer::scan(&root, &self.query, self.traversal.as_ref(), &self.exclusion)?;
        info!(
            root = %root.display(),
            files = tables.files.len(),
            errors = tables.errors.len(),
            "index built"
        );
        self.tables = tables;
        self.origin = Origin::Scanned;
        Ok(self)
    }

    /// True when reading the tables would trigger an implicit build.
    pub fn needs_build(&self) -> bool {
        self.root.is_some()
            && match self.origin {
                Origin::Unbuilt => true,
                Origin::Scanned => self.tables.files.is_empty(),
                Origin::Derived => false,
            }
    }

    /// This index, or a freshly built copy of it when it was never populated.
    pub(crate) fn built(&self) -> IndexResult<Cow<'_, Self>> {
        if !self.needs_build() {
            return Ok(Cow::Borrowed(self));
        }
        let mut index = self.clone();
        index.build()?;
        Ok(Cow::Owned(index))
    }

    /// The file table, building it first when it was never populated.
    pub fn files(&mut self) -> IndexResult<&[FileRecord]> {
        if self.needs_build() {
            self.build()?;
        }
        Ok(&self.tables.files)
    }

    /// The error table, building it first when it was never populated.
    pub fn errors(&mut self) -> IndexResult<&[ErrorRecord]> {
        if self.needs_build() {
            self.build()?;
        }
        Ok(&self.tables.errors)
    }

    /// The file table as it is, without any implicit build.
    pub fn records(&self) -> &[FileRecord] {
        &self.tables.files
    }

    /// The error table as it is, without any implicit build.
    pub fn error_records(&self) -> &[ErrorRecord] {
        &self.tables.errors
    }

    pub fn tables(&self) -> &IndexTables {
        &self.tables
    }

    pub fn len(&self) -> usize {
        self.tables.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.files.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FileRecord> {
        self.tables.files.iter()
    }

    /// Row at `index`; negative values count from the end.
    pub fn get(&self, index: isize) -> IndexResult<&FileRecord> {
        let len = self.tables.files.len();
        let position = if index < 0 { len.checked_sub(index.unsigned_abs()) } else { Some(index as usize) };
        position
            .and_then(|p| self.tables.files.get(p))
            .ok_or(IndexError::OutOfRange { index, len })
    }

    // === unique values ===

    /// Sorted distinct non-null values of an entity column.
    pub fn unique_values(&self, column: Column) -> Vec<String> {
        self.tables
            .files
            .iter()
            .filter_map(|r| r.column(column))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// Number of distinct values of a column, a missing value counting as one.
    pub fn distinct_count(&self, column: Column) -> usize {
        self.tables.files.iter().map(|r| r.column(column)).collect::<HashSet<_>>().len()
    }

    pub fn subjects(&self) -> Vec<String> {
        self.unique_values(Column::Subject)
    }

    pub fn sessions(&self) -> Vec<String> {
        self.unique_values(Column::Session)
    }

    pub fn datatypes(&self) -> Vec<String> {
        self.unique_values(Column::Datatype)
    }

    pub fn tasks(&self) -> Vec<String> {
        self.unique_values(Column::Task)
    }

    pub fn runs(&self) -> Vec<String> {
        self.unique_values(Column::Run)
    }

    pub fn acquisitions(&self) -> Vec<String> {
        self.unique_values(Column::Acquisition)
    }

    pub fn recordings(&self) -> Vec<String> {
        self.unique_values(Column::Recording)
    }

    pub fn spaces(&self) -> Vec<String> {
        self.unique_values(Column::Space)
    }

    pub fn descriptions(&self) -> Vec<String> {
        self.unique_values(Column::Description)
    }

    pub fn suffixes(&self) -> Vec<String> {
        self.unique_values(Column::Suffix)
    }

    pub fn extensions(&self) -> Vec<String> {
        self.unique_values(Column::Extension)
    }

    // === selection ===

    /// A new index holding the rows matching every criterion.
    pub fn select(&self, criteria: &Criteria) -> IndexResult<Self> {
        let this = self.built()?;
        let mask = MaskBuilder::new(&this.tables.files).build_mask(criteria)?;
        Ok(this.derived(this.root.clone(), this.masked(&mask, true)))
    }

    /// A new index without the rows matching every criterion.
    pub fn remove(&self, criteria: &Criteria) -> IndexResult<Self> {
        let this = self.built()?;
        let mask = MaskBuilder::new(&this.tables.files).build_mask(criteria)?;
        Ok(this.derived(this.root.clone(), this.masked(&mask, false)))
    }

    /// [`select`](Self::select), narrowing this index instead of returning a copy.
    pub fn select_in_place(&mut self, criteria: &Criteria) -> IndexResult<&mut Self> {
        let mask = MaskBuilder::new(self.files()?).build_mask(criteria)?;
        self.retain(&mask, true);
        Ok(self)
    }

    /// [`remove`](Self::remove), narrowing this index instead of returning a copy.
    pub fn remove_in_place(&mut self, criteria: &Criteria) -> IndexResult<&mut Self> {
        let mask = MaskBuilder::new(self.files()?).build_mask(criteria)?;
        self.retain(&mask, false);
        Ok(self)
    }

    fn masked(&self, mask: &[bool], keep: bool) -> IndexTables {
        let files = self
            .tables
            .files
            .iter()
            .zip(mask)
            .filter(|(_, m)| **m == keep)
            .map(|(r, _)| r.clone())
            .collect();
        IndexTables { files, errors: self.tables.errors.clone() }
    }

    fn retain(&mut self, mask: &[bool], keep: bool) {
        let mut flags = mask.iter();
        self.tables.files.retain(|_| flags.next().copied() == Some(keep));
        self.origin = Origin::Derived;
    }

    // === error log ===

    /// Distinct error categories present in the error table.
    pub fn error_types(&self) -> Vec<ErrorKind> {
        self.tables
            .errors
            .iter()
            .map(|e| e.error_type)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn log_error_summary(&self) {
        if self.tables.errors.is_empty() {
            info!("No errors found");
        } else {
            let types: Vec<String> = self.error_types().iter().map(ToString::to_string).collect();
            info!(
                "Number of files: {}, error types: {}",
                self.tables.errors.len(),
                types.join(", ")
            );
        }
    }

    // === export ===

    pub fn to_json(&self) -> IndexResult<String> {
        Ok(serde_json::to_string_pretty(&self.tables.files)?)
    }

    pub fn errors_to_json(&self) -> IndexResult<String> {
        Ok(serde_json::to_string_pretty(&self.tables.errors)?)
    }
}

impl Default for BidsIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for BidsIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BidsIndex")
            .field("root", &self.root)
            .field("query", &self.query)
            .field("files", &self.tables.files.len())
            .field("errors", &self.tables.errors.len())
            .field("origin", &self.origin)
            .finish()
    }
}

impl fmt::Display for BidsIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.tables.files.is_empty() {
            return write!(f, "BidsIndex: No database created yet.");
        }
        write!(
            f,
            "BidsIndex: {} files, {} errors, subjects: {}, sessions: {}, datatypes: {}, tasks: {}",
            self.tables.files.len(),
            self.tables.errors.len(),
            self.distinct_count(Column::Subject),
            self.distinct_count(Column::Session),
            self.distinct_count(Column::Datatype),
            self.distinct_count(Column::Task)
        )
    }
}

impl<'a> IntoIterator for &'a BidsIndex {
    type Item = &'a FileRecord;
    type IntoIter = std::slice::Iter<'a, FileRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::Entities;

    fn record(unique_id: u64, subject: &str, run: Option<&str>) -> FileRecord {
        let mut entities = Entities::new()
            .with(Column::Subject, subject)
            .with(Column::Session, "01")
            .with(Column::Datatype, "eeg")
            .with(Column::Suffix, "eeg")
            .with(Column::Extension, ".vhdr");
        entities.run = run.map(str::to_string);
        FileRecord {
            unique_id,
            root: PathBuf::from("/data"),
            entities,
            filename: PathBuf::from(format!("/data/sub-{}/ses-01/eeg/{}.vhdr", subject, unique_id)),
            atime: 0,
            mtime: 0,
            ctime: 0,
        }
    }

    fn index(records: Vec<FileRecord>) -> BidsIndex {
        let empty = BidsIndex::new();
        empty.derived(None, IndexTables { files: records, errors: Vec::new() })
    }

    #[test]
    fn test_empty_index_reads_without_building() {
        let mut index = BidsIndex::new();
        assert!(!index.needs_build());
        assert!(index.files().unwrap().is_empty());
        assert!(index.errors().unwrap().is_empty());
        assert!(index.subjects().is_empty());
        assert!(index.extensions().is_empty());
        assert_eq!(index.to_string(), "BidsIndex: No database created yet.");
    }

    #[test]
    fn test_build_without_root_is_a_config_error() {
        let mut index = BidsIndex::new();
        assert!(matches!(index.build(), Err(IndexError::Config(_))));
    }

    #[test]
    fn test_unique_values_are_sorted_and_distinct() {
        let index = index(vec![
            record(3, "002", Some("02")),
            record(1, "001", None),
            record(2, "002", Some("01")),
        ]);
        assert_eq!(index.subjects(), vec!["001", "002"]);
        assert_eq!(index.runs(), vec!["01", "02"]);
        assert_eq!(index.sessions(), vec!["01"]);
    }

    #[test]
    fn test_positional_access() {
        let index = index(vec![record(10, "001", None), record(20, "002", None), record(30, "003", None)]);
        assert_eq!(index.get(0).unwrap().unique_id, 10);
        assert_eq!(index.get(-1).unwrap().unique_id, 30);
        assert_eq!(index.get(-3).unwrap().unique_id, 10);
        assert!(matches!(index.get(3), Err(IndexError::OutOfRange { index: 3, len: 3 })));
        assert!(matches!(index.get(-4), Err(IndexError::OutOfRange { .. })));
    }

    #[test]
    fn test_iteration_follows_row_order() {
        let index = index(vec![record(5, "001", None), record(4, "002", None)]);
        let ids: Vec<u64> = (&index).into_iter().map(|r| r.unique_id).collect();
        assert_eq!(ids, vec![5, 4]);
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_select_returns_independent_copy() {
        let source = index(vec![record(1, "001", None), record(2, "002", None)]);
        let mut selected = source.select(&Criteria::new().subject("001")).unwrap();
        assert_eq!(selected.len(), 1);

        selected.tables.files[0].entities.subject = Some("999".to_string());
        assert_eq!(source.subjects(), vec!["001", "002"]);
    }

    #[test]
    fn test_in_place_selection() {
        let mut index = index(vec![record(1, "001", None), record(2, "002", None), record(3, "003", None)]);
        index.remove_in_place(&Criteria::new().subject("002")).unwrap();
        assert_eq!(index.subjects(), vec!["001", "003"]);
        index.select_in_place(&Criteria::new().subject("003")).unwrap();
        assert_eq!(index.subjects(), vec!["003"]);
    }

    #[test]
    fn test_display_summary() {
        let mut with_task = record(3, "002", None);
        with_task.entities.task = Some("rest".to_string());
        let index = index(vec![record(1, "001", None), record(2, "002", None), with_task]);
        assert_eq!(
            index.to_string(),
            "BidsIndex: 3 files, 0 errors, subjects: 2, sessions: 1, datatypes: 1, tasks: 2"
        );
    }

    #[test]
    fn test_json_export() {
        let index = index(vec![record(7, "001", Some("01"))]);
        let json: serde_json::Value = serde_json::from_str(&index.to_json().unwrap()).unwrap();
        assert_eq!(json[0]["unique_id"], 7);
        assert_eq!(json[0]["subject"], "001");
        assert_eq!(json[0]["run"], "01");
    }
}
