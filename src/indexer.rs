// indexer.rs - dataset scan
//! Walks a dataset root, matches candidates against the base query, and sorts every
//! candidate into the file table or the error table.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

use crate::config::WalkerConfig;
use crate::engine::{IndexError, IndexResult, IndexTables};
use crate::path::{validate_bids_file, EntityPath, GlobMatcher, PatternQuery};
use crate::schema::{ErrorKind, ErrorRecord, FileRecord, FileStat};

/// Predicate deciding that a path is never indexed, not even as an error.
pub type Exclusion = Arc<dyn Fn(&Path) -> bool + Send + Sync>;

/// Excludes files whose name contains any of `substrings`, ignoring case.
pub fn substring_exclusion(substrings: Vec<String>) -> Exclusion {
    let substrings: Vec<String> = substrings
        .into_iter()
        .filter(|s| !s.is_empty())
        .map(|s| s.to_lowercase())
        .collect();
    Arc::new(move |path: &Path| {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        substrings.iter().any(|s| name.contains(s.as_str()))
    })
}

/// Source of candidate files for a scan.
pub trait Traversal: Send + Sync {
    /// Files below `root` accepted by `matcher`, in a deterministic order. Failing to
    /// read `root` itself is an error; unreadable entries below it are skipped.
    fn candidates(&self, root: &Path, matcher: &GlobMatcher) -> IndexResult<Vec<PathBuf>>;
}

/// Recursive directory walk on top of `walkdir`.
#[derive(Debug, Clone)]
pub struct WalkdirTraversal {
    follow_symlinks: bool,
    max_depth: usize,
    skip_hidden: bool,
}

impl WalkdirTraversal {
    pub fn new() -> Self {
        Self::from_config(&WalkerConfig::default())
    }

    pub fn from_config(config: &WalkerConfig) -> Self {
        Self {
            follow_symlinks: config.follow_symlinks,
            max_depth: config.max_depth,
            skip_hidden: config.skip_hidden,
        }
    }
}

impl Default for WalkdirTraversal {
    fn default() -> Self {
        Self::new()
    }
}

impl Traversal for WalkdirTraversal {
    fn candidates(&self, root: &Path, matcher: &GlobMatcher) -> IndexResult<Vec<PathBuf>> {
        let mut walker = WalkDir::new(root)
            .follow_links(self.follow_symlinks)
            .sort_by(|a, b| a.file_name().cmp(b.file_name()));
        if self.max_depth > 0 {
            walker = walker.max_depth(self.max_depth);
        }

        let skip_hidden = self.skip_hidden;
        let mut candidates = Vec::new();
        for entry in walker
            .into_iter()
            .filter_entry(|e| !(skip_hidden && e.depth() > 0 && is_hidden(e)))
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => return Err(IndexError::Walk(e)),
                Err(e) => {
                    warn!("skipping unreadable entry: {}", e);
                    continue;
                }
            };
            if entry.file_type().is_file() && matcher.matches(entry.path()) {
                candidates.push(entry.into_path());
            }
        }
        Ok(candidates)
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_str().map(|s| s.starts_with('.')).unwrap_or(false)
}

/// Scans `root` and builds both tables.
///
/// Candidates go through validation, entity extraction and stat, in that order. A
/// failure at any stage moves the file to the error table and the scan goes on; only an
/// unreadable root aborts it. A file reached twice (hard links, followed symlinks) is
/// kept once.
pub fn scan(
    root: &Path,
    query: &PatternQuery,
    traversal: &dyn Traversal,
    exclusion: &Exclusion,
) -> IndexResult<IndexTables> {
    let _span = tracing::info_span!("scan", root = %root.display()).entered();

    let metadata = fs::metadata(root)?;
    if !metadata.is_dir() {
        return Err(IndexError::Config(format!("Root is not a directory: {}", root.display())));
    }

    let matcher = query.matcher()?;
    debug!(glob = %query.glob(), "matching candidates");

    let mut tables = IndexTables::default();
    let mut seen = HashSet::new();
    for path in traversal.candidates(root, &matcher)? {
        if exclusion(&path) {
            debug!(path = %path.display(), "excluded");
            continue;
        }

        if let Err(e) = validate_bids_file(&path) {
            let unique_id = FileStat::from_path(&path).ok().map(|s| s.unique_id);
            tables
                .errors
                .push(ErrorRecord::new(path, ErrorKind::ValidationFailure, e.to_string(), unique_id));
            continue;
        }

        let entities = match EntityPath::parse(&path) {
            Ok(parsed) => parsed.entities,
            Err(e) => {
                let unique_id = FileStat::from_path(&path).ok().map(|s| s.unique_id);
                tables
                    .errors
                    .push(ErrorRecord::new(path, ErrorKind::EntityFormat, e.to_string(), unique_id));
                continue;
            }
        };

        let stat = match FileStat::from_path(&path) {
            Ok(stat) => stat,
            Err(e) => {
                tables.errors.push(ErrorRecord::new(path, ErrorKind::Io, e.to_string(), None));
                continue;
            }
        };

        if !seen.insert(stat.unique_id) {
            debug!(path = %path.display(), unique_id = stat.unique_id, "already indexed");
            continue;
        }
        tables.files.push(FileRecord::new(root, path, entities, stat));
    }

    debug!(files = tables.files.len(), errors = tables.errors.len(), "scan finished");
    Ok(tables)
}
