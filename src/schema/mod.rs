// schema/mod.rs - table schema
//! Logical schema of the index: the selectable entity columns, the row types of the
//! file and error tables, and column-set validation.

mod document;
pub mod fields;

pub use document::*;
pub use fields::*;

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Entity columns a selection may filter on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Column {
    Subject,
    Session,
    Datatype,
    Task,
    Run,
    Acquisition,
    Recording,
    Space,
    Description,
    Suffix,
    Extension,
}

impl Column {
    pub const ALL: [Column; 11] = [
        Column::Subject,
        Column::Session,
        Column::Datatype,
        Column::Task,
        Column::Run,
        Column::Acquisition,
        Column::Recording,
        Column::Space,
        Column::Description,
        Column::Suffix,
        Column::Extension,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Column::Subject => COL_SUBJECT,
            Column::Session => COL_SESSION,
            Column::Datatype => COL_DATATYPE,
            Column::Task => COL_TASK,
            Column::Run => COL_RUN,
            Column::Acquisition => COL_ACQUISITION,
            Column::Recording => COL_RECORDING,
            Column::Space => COL_SPACE,
            Column::Description => COL_DESCRIPTION,
            Column::Suffix => COL_SUFFIX,
            Column::Extension => COL_EXTENSION,
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Column {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Column::ALL
            .into_iter()
            .find(|c| c.name() == s)
            .ok_or_else(|| s.to_string())
    }
}

/// True when `columns` carries every required file-table column.
pub fn is_all_columns_valid<'a, I>(columns: I) -> bool
where
    I: IntoIterator<Item = &'a str>,
{
    let present: BTreeSet<&str> = columns.into_iter().collect();
    REQUIRED_COLUMNS.iter().all(|c| present.contains(c))
}

/// Column names in `columns` that are not part of the file-table schema.
pub fn invalid_columns<'a, I>(columns: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = &'a str>,
{
    columns
        .into_iter()
        .filter(|c| !REQUIRED_COLUMNS.contains(c) && !OPTIONAL_COLUMNS.contains(c))
        .map(str::to_string)
        .collect()
}

/// Required file-table columns absent from `columns`.
pub fn missing_columns<'a, I>(columns: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let present: BTreeSet<&str> = columns.into_iter().collect();
    REQUIRED_COLUMNS
        .iter()
        .filter(|c| !present.contains(*c))
        .map(|c| c.to_string())
        .collect()
}
