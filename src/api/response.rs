// api/response.rs - response types
//! Serializable views of an index for display and export.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::engine::BidsIndex;
use crate::schema::{ErrorKind, ErrorRecord, FileRecord};

use super::request::ListRequest;

/// Index summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,

    /// Rows in the file table
    pub files: usize,

    /// Rows in the error table
    pub errors: usize,

    pub subjects: Vec<String>,
    pub sessions: Vec<String>,
    pub datatypes: Vec<String>,
    pub tasks: Vec<String>,
    pub runs: Vec<String>,
    pub extensions: Vec<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub error_types: Vec<ErrorKind>,
}

impl IndexSummary {
    pub fn from_index(index: &BidsIndex) -> Self {
        Self {
            root: index.root().map(PathBuf::from),
            files: index.len(),
            errors: index.error_records().len(),
            subjects: index.subjects(),
            sessions: index.sessions(),
            datatypes: index.datatypes(),
            tasks: index.tasks(),
            runs: index.runs(),
            extensions: index.extensions(),
            error_types: index.error_types(),
        }
    }
}

/// A page of file-table rows
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordPage {
    /// Rows in the whole table
    pub total: usize,
    pub offset: usize,
    pub rows: Vec<FileRecord>,
    pub has_more: bool,
}

impl RecordPage {
    pub fn from_index(index: &BidsIndex, request: &ListRequest) -> Self {
        let total = index.len();
        let rows: Vec<FileRecord> = index.iter().skip(request.offset).take(request.limit).cloned().collect();
        Self {
            total,
            offset: request.offset,
            has_more: request.offset + rows.len() < total,
            rows,
        }
    }
}

/// Error table grouped for display
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorReport {
    pub total: usize,
    pub error_types: Vec<ErrorKind>,
    pub rows: Vec<ErrorRecord>,
}

impl ErrorReport {
    pub fn from_index(index: &BidsIndex) -> Self {
        Self {
            total: index.error_records().len(),
            error_types: index.error_types(),
            rows: index.error_records().to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_of_empty_index() {
        let summary = IndexSummary::from_index(&BidsIndex::new());
        assert_eq!(summary.files, 0);
        assert_eq!(summary.root, None);
        let json = serde_json::to_value(&summary).unwrap();
        assert!(json.get("root").is_none());
        assert!(json.get("error_types").is_none());
    }

    #[test]
    fn test_empty_page() {
        let page = RecordPage::from_index(&BidsIndex::new(), &ListRequest::default());
        assert_eq!(page.total, 0);
        assert!(page.rows.is_empty());
        assert!(!page.has_more);
    }
}
