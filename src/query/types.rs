// query/types.rs - selection criteria
//! Typed criteria for `select`/`remove` and the numeric range expression.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::engine::{IndexError, IndexResult};
use crate::path::column_for_key;
use crate::schema::Column;

/// Value of one criterion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CriterionValue {
    /// Exact match, or a range expression on numeric columns
    Single(String),
    /// Membership; `None` matches rows where the entity is absent
    List(Vec<Option<String>>),
}

impl From<&str> for CriterionValue {
    fn from(value: &str) -> Self {
        CriterionValue::Single(value.to_string())
    }
}

impl From<String> for CriterionValue {
    fn from(value: String) -> Self {
        CriterionValue::Single(value)
    }
}

impl From<Vec<&str>> for CriterionValue {
    fn from(values: Vec<&str>) -> Self {
        CriterionValue::List(values.into_iter().map(|v| Some(v.to_string())).collect())
    }
}

impl From<Vec<String>> for CriterionValue {
    fn from(values: Vec<String>) -> Self {
        CriterionValue::List(values.into_iter().map(Some).collect())
    }
}

impl From<Vec<Option<String>>> for CriterionValue {
    fn from(values: Vec<Option<String>>) -> Self {
        CriterionValue::List(values)
    }
}

impl<const N: usize> From<[&str; N]> for CriterionValue {
    fn from(values: [&str; N]) -> Self {
        CriterionValue::List(values.iter().map(|v| Some(v.to_string())).collect())
    }
}

/// Selection criteria: entity column to value, all criteria ANDed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Criteria {
    values: BTreeMap<Column, CriterionValue>,
}

macro_rules! criterion_setters {
    ($($name:ident => $column:expr),* $(,)?) => {
        $(
            pub fn $name(self, value: impl Into<CriterionValue>) -> Self {
                self.with($column, value)
            }
        )*
    };
}

impl Criteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: Column, value: impl Into<CriterionValue>) -> Self {
        self.values.insert(column, value.into());
        self
    }

    criterion_setters! {
        subject => Column::Subject,
        session => Column::Session,
        datatype => Column::Datatype,
        task => Column::Task,
        run => Column::Run,
        acquisition => Column::Acquisition,
        recording => Column::Recording,
        space => Column::Space,
        description => Column::Description,
        suffix => Column::Suffix,
        extension => Column::Extension,
    }

    pub fn get(&self, column: Column) -> Option<&CriterionValue> {
        self.values.get(&column)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Column, &CriterionValue)> {
        self.values.iter().map(|(c, v)| (*c, v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Criteria from `(key, value)` pairs. Keys are column names (`subject`) or BIDS
    /// filename keys (`sub`); every unknown key is reported at once.
    pub fn from_pairs<I, K, V>(pairs: I) -> IndexResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<CriterionValue>,
    {
        let mut criteria = Criteria::new();
        let mut unknown = Vec::new();
        for (key, value) in pairs {
            match resolve_key(key.as_ref()) {
                Some(column) => criteria.values.insert(column, value.into()),
                None => {
                    unknown.push(key.as_ref().to_string());
                    continue;
                }
            };
        }
        if unknown.is_empty() {
            Ok(criteria)
        } else {
            unknown.sort();
            Err(IndexError::InvalidCriteria { keys: unknown })
        }
    }

    /// Criteria from a JSON object. `null` values are ignored, strings and numbers are
    /// single values, arrays are membership lists (with `null` matching absent entities).
    pub fn from_json(value: &Value) -> IndexResult<Self> {
        let Value::Object(fields) = value else {
            return Err(IndexError::QueryParse(format!("criteria must be a JSON object, got {}", value)));
        };

        let unknown: Vec<String> = fields.keys().filter(|k| resolve_key(k).is_none()).cloned().collect();
        if !unknown.is_empty() {
            return Err(IndexError::InvalidCriteria { keys: unknown });
        }

        let mut pairs = Vec::with_capacity(fields.len());
        for (key, value) in fields {
            let criterion = match value {
                Value::Null => continue,
                Value::String(s) => CriterionValue::Single(s.clone()),
                Value::Number(n) => CriterionValue::Single(n.to_string()),
                Value::Array(items) => CriterionValue::List(
                    items.iter().map(|item| json_scalar(key, item)).collect::<IndexResult<_>>()?,
                ),
                other => {
                    return Err(IndexError::QueryParse(format!("unsupported value for '{}': {}", key, other)));
                }
            };
            pairs.push((key.as_str(), criterion));
        }
        Self::from_pairs(pairs)
    }
}

fn resolve_key(key: &str) -> Option<Column> {
    key.parse::<Column>().ok().or_else(|| column_for_key(key))
}

fn json_scalar(key: &str, item: &Value) -> IndexResult<Option<String>> {
    match item {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        Value::Number(n) => Ok(Some(n.to_string())),
        other => Err(IndexError::QueryParse(format!("unsupported list item for '{}': {}", key, other))),
    }
}

/// `start-stop`, `start-*` or `*-stop` over digit strings, inclusive on both ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeExpr {
    /// `None` is open
    pub start: Option<String>,
    pub stop: Option<String>,
}

impl RangeExpr {
    pub fn parse(expr: &str) -> IndexResult<Self> {
        let malformed = || IndexError::MalformedRange(expr.to_string());
        let (start, stop) = expr.split_once('-').ok_or_else(malformed)?;
        let bound = |side: &str| -> IndexResult<Option<String>> {
            let side = side.trim();
            if side == "*" {
                Ok(None)
            } else if is_digits(side) {
                Ok(Some(side.to_string()))
            } else {
                Err(malformed())
            }
        };
        Ok(Self { start: bound(start)?, stop: bound(stop)? })
    }

    /// True when the digit string `value` lies within the range.
    pub fn contains(&self, value: &str) -> bool {
        if !is_digits(value) {
            return false;
        }
        let above_start = self
            .start
            .as_deref()
            .map_or(true, |start| compare_digits(value, start) != Ordering::Less);
        let below_stop = self
            .stop
            .as_deref()
            .map_or(true, |stop| compare_digits(value, stop) != Ordering::Greater);
        above_start && below_stop
    }
}

pub(crate) fn is_digits(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit())
}

/// Numeric order of two digit strings of any length.
fn compare_digits(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}
