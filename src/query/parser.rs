// query/parser.rs - criteria text parser
//! Parses free-form selection text into [`Criteria`].
//!
//! Supported syntax:
//! - exact match: `subject=001` or `--subject=001`
//! - quoted values: `task="rest"`
//! - range: `run=01-03`, `subject=002-*`, `subject=*-004`
//! - list: `run=01,02` (`null` in a list matches missing values)
//! - BIDS keys work too: `sub=001 acq=full`

use once_cell::sync::Lazy;
use regex::Regex;

use super::types::*;
use crate::engine::{IndexError, IndexResult};

static ARG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?:--)?([a-z]+)=(?:"([^"]*)"|(\S+))"#).unwrap());

/// Criteria parser
#[derive(Debug, Default, Clone, Copy)]
pub struct CriteriaParser;

impl CriteriaParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(&self, input: &str) -> IndexResult<Criteria> {
        let input = input.trim();
        let mut pairs: Vec<(String, CriterionValue)> = Vec::new();
        let mut stray: Vec<&str> = Vec::new();

        let mut last_end = 0;
        for cap in ARG_PATTERN.captures_iter(input) {
            let Some(full_match) = cap.get(0) else { continue };
            let before = input[last_end..full_match.start()].trim();
            if !before.is_empty() {
                stray.push(before);
            }
            last_end = full_match.end();

            let key = cap.get(1).map(|m| m.as_str()).unwrap_or_default();
            let value = cap.get(2).or_else(|| cap.get(3)).map(|m| m.as_str()).unwrap_or_default();
            pairs.push((key.to_string(), parse_value(value)));
        }
        let rest = input[last_end..].trim();
        if !rest.is_empty() {
            stray.push(rest);
        }

        if !stray.is_empty() {
            return Err(IndexError::QueryParse(format!(
                "expected key=value pairs, found '{}'",
                stray.join("', '")
            )));
        }
        Criteria::from_pairs(pairs)
    }
}

fn parse_value(value: &str) -> CriterionValue {
    if !value.contains(',') {
        return CriterionValue::Single(value.trim().to_string());
    }
    CriterionValue::List(
        value
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(|item| if item == "null" { None } else { Some(item.to_string()) })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Column;

    #[test]
    fn test_parse_simple_criteria() {
        let criteria = CriteriaParser::new().parse("subject=001 task=aTask").unwrap();
        assert_eq!(criteria.len(), 2);
        assert_eq!(criteria.get(Column::Task), Some(&CriterionValue::Single("aTask".to_string())));
    }

    #[test]
    fn test_parse_flags_quotes_and_lists() {
        let criteria = CriteriaParser::new()
            .parse(r#"--subject=001-003 task="rest" run=01,02,null"#)
            .unwrap();
        assert_eq!(criteria.get(Column::Subject), Some(&CriterionValue::Single("001-003".to_string())));
        assert_eq!(criteria.get(Column::Task), Some(&CriterionValue::Single("rest".to_string())));
        assert_eq!(
            criteria.get(Column::Run),
            Some(&CriterionValue::List(vec![Some("01".to_string()), Some("02".to_string()), None]))
        );
    }

    #[test]
    fn test_parse_trims_quoted_values() {
        let criteria = CriteriaParser::new().parse(r#"task=" rest " acquisition="""#).unwrap();
        assert_eq!(criteria.get(Column::Task), Some(&CriterionValue::Single("rest".to_string())));
        assert_eq!(criteria.get(Column::Acquisition), Some(&CriterionValue::Single(String::new())));
    }

    #[test]
    fn test_parse_rejects_unknown_keys() {
        let err = CriteriaParser::new().parse("bogus=x subject=001 other=y").unwrap_err();
        match err {
            IndexError::InvalidCriteria { keys } => assert_eq!(keys, vec!["bogus", "other"]),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_parse_rejects_stray_text() {
        assert!(matches!(
            CriteriaParser::new().parse("subject=001 eeg"),
            Err(IndexError::QueryParse(_))
        ));
    }

    #[test]
    fn test_parse_empty_input() {
        assert!(CriteriaParser::new().parse("   ").unwrap().is_empty());
    }
}
