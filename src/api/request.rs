// api/request.rs - request types
//! Structured requests against an index, deserialized from JSON.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::engine::{BidsIndex, IndexResult};
use crate::query::Criteria;

/// What a selection request does with matching rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionAction {
    /// Keep matching rows
    Select,
    /// Drop matching rows
    Remove,
}

impl Default for SelectionAction {
    fn default() -> Self {
        Self::Select
    }
}

/// Selection request
///
/// ```json
/// { "action": "remove", "criteria": { "subject": "001-003", "run": ["01", null] } }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionRequest {
    #[serde(default)]
    pub action: SelectionAction,

    /// Column name (or BIDS key) to a string, a list, or `null`
    #[serde(default = "empty_object")]
    pub criteria: Value,
}

fn empty_object() -> Value {
    Value::Object(Default::default())
}

impl SelectionRequest {
    pub fn select(criteria: Value) -> Self {
        Self { action: SelectionAction::Select, criteria }
    }

    pub fn remove(criteria: Value) -> Self {
        Self { action: SelectionAction::Remove, criteria }
    }

    pub fn from_json(input: &str) -> IndexResult<Self> {
        Ok(serde_json::from_str(input)?)
    }

    /// Parsed criteria, with unknown keys rejected.
    pub fn criteria(&self) -> IndexResult<Criteria> {
        Criteria::from_json(&self.criteria)
    }

    /// Runs the request, returning a new index.
    pub fn apply(&self, index: &BidsIndex) -> IndexResult<BidsIndex> {
        let criteria = self.criteria()?;
        match self.action {
            SelectionAction::Select => index.select(&criteria),
            SelectionAction::Remove => index.remove(&criteria),
        }
    }
}

/// Page of file-table rows
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListRequest {
    #[serde(default)]
    pub offset: usize,

    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    20
}

impl Default for ListRequest {
    fn default() -> Self {
        Self { offset: 0, limit: default_limit() }
    }
}

impl ListRequest {
    pub fn new(offset: usize, limit: usize) -> Self {
        Self { offset, limit }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::IndexError;
    use serde_json::json;

    #[test]
    fn test_deserialize_request() {
        let request =
            SelectionRequest::from_json(r#"{ "action": "remove", "criteria": { "subject": "001" } }"#).unwrap();
        assert_eq!(request.action, SelectionAction::Remove);
        assert_eq!(request.criteria().unwrap().len(), 1);

        let defaulted = SelectionRequest::from_json("{}").unwrap();
        assert_eq!(defaulted.action, SelectionAction::Select);
        assert!(defaulted.criteria().unwrap().is_empty());
    }

    #[test]
    fn test_unknown_criteria_keys() {
        let request = SelectionRequest::select(json!({ "bogus": "x" }));
        assert!(matches!(request.apply(&BidsIndex::new()), Err(IndexError::InvalidCriteria { .. })));
    }

    #[test]
    fn test_apply_on_empty_index() {
        let request = SelectionRequest::select(json!({ "subject": "001" }));
        assert!(request.apply(&BidsIndex::new()).unwrap().is_empty());
    }

    #[test]
    fn test_list_request_defaults() {
        let request: ListRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(request.offset, 0);
        assert_eq!(request.limit, 20);
    }
}
