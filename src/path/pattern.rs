// path/pattern.rs - wildcard query rendering
//! Renders a partially-specified entity record as the directory and filename globs a
//! directory walk matches candidates against. Pure string assembly, no filesystem access.

use glob::{MatchOptions, Pattern, PatternError};
use std::path::Path;

use crate::schema::Column;

use super::{key_for, normal_components, Entities, EntityError};

/// Optional filename entities, in canonical order.
const OPTIONAL_ENTITIES: [Column; 6] = [
    Column::Task,
    Column::Acquisition,
    Column::Run,
    Column::Recording,
    Column::Space,
    Column::Description,
];

/// Entities that must all be set for a chain without `space` to count as complete.
const REGULAR_CHAIN: [Column; 5] = [
    Column::Task,
    Column::Acquisition,
    Column::Run,
    Column::Recording,
    Column::Description,
];

/// A query over a BIDS tree: unset entities are wildcards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatternQuery {
    entities: Entities,
}

impl PatternQuery {
    /// Matches every file of a tree.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn new(entities: Entities) -> Result<Self, EntityError> {
        Ok(Self { entities: entities.normalized()? })
    }

    pub fn entities(&self) -> &Entities {
        &self.entities
    }

    /// `sub-{subject|*}/ses-{session|*}/{datatype|*}`
    pub fn directory_glob(&self) -> String {
        format!(
            "sub-{}/ses-{}/{}",
            self.or_wildcard(Column::Subject),
            self.or_wildcard(Column::Session),
            self.or_wildcard(Column::Datatype)
        )
    }

    /// Filename glob: the mandatory `sub-*_ses-*` prefix, each set optional entity as
    /// `{key}-{value}*`, then `{suffix|*}.{extension|*}`, with redundant wildcards collapsed.
    pub fn filename_glob(&self) -> String {
        let mut glob = format!(
            "sub-{}_ses-{}",
            self.or_wildcard(Column::Subject),
            self.or_wildcard(Column::Session)
        );
        glob.push_str(if self.all_optional_exist() { "_" } else { "*_" });

        let optional: Vec<String> = OPTIONAL_ENTITIES
            .iter()
            .filter_map(|column| {
                let key = key_for(*column)?;
                self.entities.get(*column).map(|value| format!("{}-{}*", key, value))
            })
            .collect();
        if !optional.is_empty() {
            glob.push_str(&optional.join("_"));
            glob.push('_');
        }

        glob.push_str(self.or_wildcard(Column::Suffix));
        glob.push('.');
        let extension = self
            .entities
            .extension
            .as_deref()
            .map(|ext| ext.trim_start_matches('.'))
            .filter(|ext| !ext.is_empty())
            .unwrap_or("*");
        glob.push_str(extension);

        collapse_wildcards(&glob)
    }

    /// Directory glob joined with the filename glob.
    pub fn glob(&self) -> String {
        format!("{}/{}", self.directory_glob(), self.filename_glob())
    }

    /// True when no gap wildcard is needed before the optional chain: either `space` is
    /// set (electrode and channel sidecars carry no task/run/acq chain) or every regular
    /// optional entity is.
    pub fn all_optional_exist(&self) -> bool {
        self.entities.space.is_some() || REGULAR_CHAIN.iter().all(|c| self.entities.get(*c).is_some())
    }

    pub fn matcher(&self) -> Result<GlobMatcher, PatternError> {
        GlobMatcher::new(&self.glob())
    }

    fn or_wildcard(&self, column: Column) -> &str {
        self.entities.get(column).unwrap_or("*")
    }
}

/// Collapses `**`, `*_*` and `*.*` into `*` until nothing changes.
pub fn collapse_wildcards(pattern: &str) -> String {
    let mut collapsed = pattern.to_string();
    loop {
        let next = collapsed.replace("**", "*").replace("*_*", "*").replace("*.*", "*");
        if next == collapsed {
            return next;
        }
        collapsed = next;
    }
}

/// Compiled `dir/dir/dir/file` glob, matched against the last four components of a path.
#[derive(Debug, Clone)]
pub struct GlobMatcher {
    pattern: Pattern,
    depth: usize,
}

impl GlobMatcher {
    pub fn new(glob: &str) -> Result<Self, PatternError> {
        Ok(Self { pattern: Pattern::new(glob)?, depth: glob.split('/').count() })
    }

    pub fn matches(&self, path: &Path) -> bool {
        let Ok(components) = normal_components(path) else {
            return false;
        };
        if components.len() < self.depth {
            return false;
        }
        let tail = components[components.len() - self.depth..].join("/");
        let options = MatchOptions {
            case_sensitive: true,
            require_literal_separator: true,
            require_literal_leading_dot: false,
        };
        self.pattern.matches_with(&tail, options)
    }
}
