// query/filter.rs - row mask builder
//! Turns [`Criteria`] into a boolean row mask over the file table.

use tracing::warn;

use super::types::*;
use crate::engine::IndexResult;
use crate::schema::{Column, FileRecord};

/// Mask builder
pub struct MaskBuilder<'a> {
    records: &'a [FileRecord],
}

impl<'a> MaskBuilder<'a> {
    pub fn new(records: &'a [FileRecord]) -> Self {
        Self { records }
    }

    /// One flag per row, true where every criterion holds.
    pub fn build_mask(&self, criteria: &Criteria) -> IndexResult<Vec<bool>> {
        let mut mask = vec![true; self.records.len()];
        for (column, value) in criteria.iter() {
            let criterion = self.criterion_mask(column, value)?;
            for (keep, matched) in mask.iter_mut().zip(criterion) {
                *keep &= matched;
            }
        }
        Ok(mask)
    }

    /// Single values compare verbatim; a dash on a numeric column makes them a range.
    fn criterion_mask(&self, column: Column, value: &CriterionValue) -> IndexResult<Vec<bool>> {
        match value {
            CriterionValue::Single(value) => {
                if value.contains('-') && self.is_numeric(column) {
                    let range = RangeExpr::parse(value)?;
                    return Ok(self.map(column, |v| v.is_some_and(|v| range.contains(v))));
                }
                let mask = self.map(column, |v| v == Some(value.as_str()));
                if !mask.iter().any(|m| *m) {
                    warn!("no matching location for {}={:?}", column, value);
                }
                Ok(mask)
            }
            CriterionValue::List(values) => {
                Ok(self.map(column, |v| values.iter().any(|item| item.as_deref() == v)))
            }
        }
    }

    /// True when the column holds at least one value and every value is a digit string.
    pub fn is_numeric(&self, column: Column) -> bool {
        let mut values = self.records.iter().filter_map(|r| r.column(column)).peekable();
        values.peek().is_some() && values.all(is_digits)
    }

    fn map(&self, column: Column, predicate: impl Fn(Option<&str>) -> bool) -> Vec<bool> {
        self.records.iter().map(|r| predicate(r.column(column))).collect()
    }
}
