// engine/ops.rs - set algebra between indexes
//! Union, difference and intersection keyed by `unique_id`.
//!
//! The left-hand index dominates: on a shared key its row is the one kept, and rows
//! only present on the right are appended after the left-hand rows. Error tables merge
//! with the same rule.

use std::borrow::Cow;
use std::collections::{BTreeSet, HashSet};
use std::ops::{Add, BitAnd, BitOr, Sub};
use std::path::Path;

use serde_json::Value;
use tracing::debug;

use crate::schema::{invalid_columns, missing_columns, ErrorRecord, FileRecord};

use super::core::{BidsIndex, IndexError, IndexResult, IndexTables};

/// Right-hand side of a set operation.
#[derive(Debug, Clone, Copy)]
pub enum Operand<'a> {
    Index(&'a BidsIndex),
    /// Bare primary keys; only meaningful for difference and intersection
    Keys(&'a BTreeSet<u64>),
    /// A JSON array of file-table rows
    Json(&'a Value),
}

impl Operand<'_> {
    pub fn type_name(&self) -> &'static str {
        match self {
            Operand::Index(_) => "BidsIndex",
            Operand::Keys(_) => "key set",
            Operand::Json(value) => json_kind(value),
        }
    }
}

impl<'a> From<&'a BidsIndex> for Operand<'a> {
    fn from(index: &'a BidsIndex) -> Self {
        Operand::Index(index)
    }
}

impl<'a> From<&'a BTreeSet<u64>> for Operand<'a> {
    fn from(keys: &'a BTreeSet<u64>) -> Self {
        Operand::Keys(keys)
    }
}

impl<'a> From<&'a Value> for Operand<'a> {
    fn from(value: &'a Value) -> Self {
        Operand::Json(value)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// An operand checked and reduced to its keys and, when it has them, its rows.
struct Resolved<'a> {
    keys: HashSet<u64>,
    tables: Option<Cow<'a, IndexTables>>,
}

fn incompatible(lhs: &str, rhs: &str) -> IndexError {
    IndexError::IncompatibleOperand { lhs: lhs.to_string(), rhs: rhs.to_string() }
}

fn resolve<'a>(operand: Operand<'a>, built: &'a mut Option<BidsIndex>) -> IndexResult<Resolved<'a>> {
    match operand {
        Operand::Index(index) => {
            let index = match index.built()? {
                Cow::Borrowed(index) => index,
                Cow::Owned(index) => &*built.insert(index),
            };
            Ok(Resolved {
                keys: index.tables.files.iter().map(|r| r.unique_id).collect(),
                tables: Some(Cow::Borrowed(&index.tables)),
            })
        }
        Operand::Keys(keys) => Ok(Resolved { keys: keys.iter().copied().collect(), tables: None }),
        Operand::Json(value) => {
            let files = records_from_json(value)?;
            Ok(Resolved {
                keys: files.iter().map(|r| r.unique_id).collect(),
                tables: Some(Cow::Owned(IndexTables { files, errors: Vec::new() })),
            })
        }
    }
}

/// Rows of a JSON table, after checking every row carries exactly the file-table columns.
/// A `unique_id` repeated within the table keeps its first row.
fn records_from_json(value: &Value) -> IndexResult<Vec<FileRecord>> {
    let Value::Array(rows) = value else {
        return Err(incompatible("BidsIndex", json_kind(value)));
    };

    let mut records = Vec::with_capacity(rows.len());
    let mut seen = HashSet::new();
    for row in rows {
        let Value::Object(fields) = row else {
            return Err(incompatible("BidsIndex", &format!("array of {}", json_kind(row))));
        };
        let columns = || fields.keys().map(String::as_str);
        let missing = missing_columns(columns());
        let unknown = invalid_columns(columns());
        if !missing.is_empty() || !unknown.is_empty() {
            return Err(IndexError::InvalidColumns {
                missing: missing.into_iter().collect(),
                unknown: unknown.into_iter().collect(),
            });
        }
        let record: FileRecord = serde_json::from_value(row.clone())?;
        if !seen.insert(record.unique_id) {
            debug!(unique_id = record.unique_id, "duplicate row in JSON table");
            continue;
        }
        records.push(record);
    }
    Ok(records)
}

/// `A`'s errors plus `B`'s errors not already logged by `A`, keyed by `unique_id` when
/// known and by filename otherwise.
fn merge_errors(lhs: &[ErrorRecord], rhs: &[ErrorRecord]) -> Vec<ErrorRecord> {
    fn key(record: &ErrorRecord) -> (Option<u64>, Option<&Path>) {
        match record.unique_id {
            Some(id) => (Some(id), None),
            None => (None, Some(record.filename.as_path())),
        }
    }

    let seen: HashSet<_> = lhs.iter().map(key).collect();
    lhs.iter()
        .chain(rhs.iter().filter(|r| !seen.contains(&key(r))))
        .cloned()
        .collect()
}

impl BidsIndex {
    /// All rows of `self` plus the rows of `other` whose key `self` lacks.
    pub fn union<'a>(&self, other: impl Into<Operand<'a>>) -> IndexResult<BidsIndex> {
        let operand = other.into();
        if let Operand::Keys(_) = operand {
            return Err(incompatible("BidsIndex", operand.type_name()));
        }
        let this = self.built()?;
        let mut built = None;
        let rhs = resolve(operand, &mut built)?;
        let rhs_tables = rhs.tables.unwrap_or_default();

        let own: HashSet<u64> = this.tables.files.iter().map(|r| r.unique_id).collect();
        let files: Vec<FileRecord> = this
            .tables
            .files
            .iter()
            .chain(rhs_tables.files.iter().filter(|r| !own.contains(&r.unique_id)))
            .cloned()
            .collect();
        let errors = merge_errors(&this.tables.errors, &rhs_tables.errors);

        let root = this.root.clone().filter(|root| files.iter().all(|r| &r.root == root));
        Ok(this.derived(root, IndexTables { files, errors }))
    }

    /// Rows of `self` whose key is absent from `other`.
    pub fn difference<'a>(&self, other: impl Into<Operand<'a>>) -> IndexResult<BidsIndex> {
        self.filter_by_keys(other.into(), false)
    }

    /// Rows of `self` whose key is present in `other`, in `self`'s version.
    pub fn intersection<'a>(&self, other: impl Into<Operand<'a>>) -> IndexResult<BidsIndex> {
        self.filter_by_keys(other.into(), true)
    }

    fn filter_by_keys(&self, operand: Operand<'_>, keep_shared: bool) -> IndexResult<BidsIndex> {
        let this = self.built()?;
        let mut built = None;
        let rhs = resolve(operand, &mut built)?;

        let files = this
            .tables
            .files
            .iter()
            .filter(|r| rhs.keys.contains(&r.unique_id) == keep_shared)
            .cloned()
            .collect();
        let errors = match &rhs.tables {
            Some(tables) => merge_errors(&this.tables.errors, &tables.errors),
            None => this.tables.errors.clone(),
        };
        Ok(this.derived(this.root.clone(), IndexTables { files, errors }))
    }

    /// Primary keys of the file table.
    pub fn unique_ids(&self) -> BTreeSet<u64> {
        self.tables.files.iter().map(|r| r.unique_id).collect()
    }
}

impl Add<&BidsIndex> for &BidsIndex {
    type Output = IndexResult<BidsIndex>;

    fn add(self, rhs: &BidsIndex) -> Self::Output {
        self.union(rhs)
    }
}

impl BitOr<&BidsIndex> for &BidsIndex {
    type Output = IndexResult<BidsIndex>;

    fn bitor(self, rhs: &BidsIndex) -> Self::Output {
        self.union(rhs)
    }
}

impl Sub<&BidsIndex> for &BidsIndex {
    type Output = IndexResult<BidsIndex>;

    fn sub(self, rhs: &BidsIndex) -> Self::Output {
        self.difference(rhs)
    }
}

impl BitAnd<&BidsIndex> for &BidsIndex {
    type Output = IndexResult<BidsIndex>;

    fn bitand(self, rhs: &BidsIndex) -> Self::Output {
        self.intersection(rhs)
    }
}
