// path/entities.rs - BIDS entity record
//! The structured tuple of entities one BIDS path encodes, and the normalization every
//! value goes through before it is stored or rendered.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::schema::Column;

/// Key-value entities in canonical filename order, with their filename keys.
pub const ENTITY_KEYS: [(Column, &str); 8] = [
    (Column::Subject, "sub"),
    (Column::Session, "ses"),
    (Column::Task, "task"),
    (Column::Acquisition, "acq"),
    (Column::Run, "run"),
    (Column::Recording, "recording"),
    (Column::Space, "space"),
    (Column::Description, "desc"),
];

static LABEL_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z0-9]+$").unwrap());

static DATATYPE_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z0-9]+$").unwrap());

static EXTENSION_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\.[a-zA-Z0-9]+)+$").unwrap());

/// Filename key of a key-value entity column.
pub fn key_for(column: Column) -> Option<&'static str> {
    ENTITY_KEYS.iter().find(|(c, _)| *c == column).map(|(_, key)| *key)
}

/// Entity column a filename key maps to.
pub fn column_for_key(key: &str) -> Option<Column> {
    ENTITY_KEYS.iter().find(|(_, k)| *k == key).map(|(c, _)| *c)
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EntityError {
    #[error("Invalid format in '{0}': should be '<key>-<value>'")]
    MalformedComponent(String),

    #[error("Invalid key '{0}': not a known BIDS entity")]
    UnknownKey(String),

    #[error("Invalid prefix '{prefix}' for {column}: expected '{expected}-<label>' or a bare label")]
    InvalidPrefix {
        column: Column,
        prefix: String,
        expected: &'static str,
    },

    #[error("Invalid {column} '{value}': {reason}")]
    InvalidValue {
        column: Column,
        value: String,
        reason: &'static str,
    },

    #[error("Path is not valid UTF-8: {0}")]
    NonUtf8Path(String),
}

/// Entities of one BIDS file. Values are stored without their key prefix
/// (`"01"`, never `"sub-01"`); the extension keeps its leading dot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Entities {
    pub subject: Option<String>,
    pub session: Option<String>,
    pub datatype: Option<String>,
    pub task: Option<String>,
    pub run: Option<String>,
    pub acquisition: Option<String>,
    pub recording: Option<String>,
    pub space: Option<String>,
    pub description: Option<String>,
    pub suffix: Option<String>,
    pub extension: Option<String>,
}

impl Entities {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, column: Column) -> Option<&str> {
        self.slot(column).as_deref()
    }

    pub fn set(&mut self, column: Column, value: Option<String>) {
        *self.slot_mut(column) = value;
    }

    /// Builder-style setter, mostly for tests and queries.
    pub fn with(mut self, column: Column, value: impl Into<String>) -> Self {
        self.set(column, Some(value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        Column::ALL.iter().all(|c| self.get(*c).is_none())
    }

    fn slot(&self, column: Column) -> &Option<String> {
        match column {
            Column::Subject => &self.subject,
            Column::Session => &self.session,
            Column::Datatype => &self.datatype,
            Column::Task => &self.task,
            Column::Run => &self.run,
            Column::Acquisition => &self.acquisition,
            Column::Recording => &self.recording,
            Column::Space => &self.space,
            Column::Description => &self.description,
            Column::Suffix => &self.suffix,
            Column::Extension => &self.extension,
        }
    }

    fn slot_mut(&mut self, column: Column) -> &mut Option<String> {
        match column {
            Column::Subject => &mut self.subject,
            Column::Session => &mut self.session,
            Column::Datatype => &mut self.datatype,
            Column::Task => &mut self.task,
            Column::Run => &mut self.run,
            Column::Acquisition => &mut self.acquisition,
            Column::Recording => &mut self.recording,
            Column::Space => &mut self.space,
            Column::Description => &mut self.description,
            Column::Suffix => &mut self.suffix,
            Column::Extension => &mut self.extension,
        }
    }

    /// Strips redundant key prefixes and checks every present value against its grammar.
    ///
    /// `subject = "sub-001"` becomes `"001"`, `task = "sub-001"` is rejected, and the
    /// extension gains a leading dot when it lacks one. Normalizing twice is a no-op.
    pub fn normalized(mut self) -> Result<Self, EntityError> {
        for column in Column::ALL {
            if let Some(value) = self.slot_mut(column).take() {
                *self.slot_mut(column) = Some(normalize_value(column, &value)?);
            }
        }
        Ok(self)
    }
}

/// Normalizes one entity value for `column`.
pub fn normalize_value(column: Column, value: &str) -> Result<String, EntityError> {
    match column {
        Column::Datatype => check(column, value, &DATATYPE_PATTERN, "should be a lowercase alphanumeric string"),
        Column::Suffix => check(column, value, &LABEL_PATTERN, "should be an alphanumeric string"),
        Column::Extension => normalize_extension(value),
        _ => {
            let expected = key_for(column).unwrap_or_default();
            let label = match value.split_once('-') {
                Some((prefix, label)) if prefix == expected => label,
                Some((prefix, _)) => {
                    return Err(EntityError::InvalidPrefix {
                        column,
                        prefix: prefix.to_string(),
                        expected,
                    })
                }
                None => value,
            };
            check(column, label, &LABEL_PATTERN, "labels are alphanumeric only")
        }
    }
}

fn normalize_extension(value: &str) -> Result<String, EntityError> {
    if value.is_empty() {
        return Ok(String::new());
    }
    let dotted = if value.starts_with('.') { value.to_string() } else { format!(".{}", value) };
    if EXTENSION_PATTERN.is_match(&dotted) {
        Ok(dotted)
    } else {
        Err(EntityError::InvalidValue {
            column: Column::Extension,
            value: value.to_string(),
            reason: "should be dot-separated alphanumeric parts",
        })
    }
}

fn check(column: Column, value: &str, pattern: &Regex, reason: &'static str) -> Result<String, EntityError> {
    if pattern.is_match(value) {
        Ok(value.to_string())
    } else {
        Err(EntityError::InvalidValue { column, value: value.to_string(), reason })
    }
}

impl fmt::Display for Entities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let present: Vec<String> = Column::ALL
            .iter()
            .filter_map(|c| self.get(*c).map(|v| format!("{}={}", c, v)))
            .collect();
        write!(f, "{{{}}}", present.join(", "))
    }
}
