// path/validate.rs - BIDS path validation
//! Structural, grammar and consistency checks for one candidate file.
//!
//! Every check appends to a reason list instead of returning early, so a rejected file
//! reports all of its problems at once.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

use super::{normal_components, split_extension};

/// Filename keys accepted by the validator.
pub const VALID_KEYS: [&str; 8] = ["acq", "desc", "recording", "run", "ses", "space", "sub", "task"];

static DATATYPE_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z0-9]+$").unwrap());

static PATH_COMPONENT_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(sub|ses)-[\w\d]+$").unwrap());

static KEY_VALUE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<key>[a-zA-Z0-9]+)-(?P<value>[a-zA-Z0-9]+)$").unwrap());

/// A candidate file failed one or more BIDS checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub path: PathBuf,
    pub reasons: Vec<String>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Non-standardized BIDS name\n{}\n", self.path.display())?;
        for (i, reason) in self.reasons.iter().enumerate() {
            write!(f, "\n{}. {}", i + 1, reason)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// Checks a candidate path against the BIDS layout and naming rules.
///
/// Files (paths with an extension) must live in `root/sub-<label>/ses-<label>/<datatype>`
/// and carry `key-value` filename entities from [`VALID_KEYS`]; bare directories are
/// checked on their own trailing components. Subject and session must agree between the
/// directories and the filename.
pub fn validate_bids_file(file: impl AsRef<Path>) -> Result<(), ValidationError> {
    let file = file.as_ref();
    let mut reasons = Vec::new();

    let name = file.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    let (stem, extension) = split_extension(name);
    let is_file = extension.is_some();

    let directory = if is_file { file.parent().unwrap_or(Path::new("")) } else { file };
    let components = match normal_components(directory) {
        Ok(components) => components,
        Err(err) => {
            return Err(ValidationError { path: file.to_path_buf(), reasons: vec![err.to_string()] });
        }
    };
    let tail = &components[components.len().saturating_sub(3)..];

    // 1. path structure
    let structured = tail.len() == 3 && tail[0].starts_with("sub-") && tail[1].starts_with("ses-");
    if !structured {
        reasons.push(
            "Path does not contain valid BIDS elements (e.g., 'sub-*'). \
             Should be in the form of 'root/sub-<label>/ses-<label>/<datatype>'"
                .to_string(),
        );
    }
    if let Some(datatype) = tail.last() {
        if !DATATYPE_PATTERN.is_match(datatype) {
            reasons.push(format!(
                "Invalid datatype: '{}' should be a lowercase alphanumeric string.",
                datatype
            ));
        }
    }

    // 2. sub-/ses- component grammar
    let (path_subject, path_session) = match tail {
        [subject, session, _] => {
            for part in [subject, session] {
                if !PATH_COMPONENT_PATTERN.is_match(part) {
                    reasons.push(format!(
                        "Invalid path component: '{}' should match the pattern \
                         '<key>-<value>' with key being 'sub' or 'ses'.",
                        part
                    ));
                }
            }
            (subject.strip_prefix("sub-"), session.strip_prefix("ses-"))
        }
        _ => (None, None),
    };

    // 3. filename entity grammar
    let mut filename_entities: HashMap<&str, &str> = HashMap::new();
    if is_file {
        let parts: Vec<&str> = stem.split('_').collect();
        if let Some((_suffix, keyed)) = parts.split_last() {
            for part in keyed {
                match KEY_VALUE_PATTERN.captures(part) {
                    None => reasons.push(format!("Invalid format in '{}': should be '<key>-<value>'", part)),
                    Some(caps) => {
                        let key = caps.name("key").map(|m| m.as_str()).unwrap_or_default();
                        if !VALID_KEYS.contains(&key) {
                            reasons.push(format!("Invalid key '{}': must be one of {:?}", key, VALID_KEYS));
                        }
                    }
                }
                if let Some((key, value)) = part.split_once('-') {
                    filename_entities.insert(key, value);
                }
            }
        }
    }

    // 4. path/filename consistency
    if let (Some(path_subject), Some(file_subject)) = (path_subject, filename_entities.get("sub")) {
        if path_subject != *file_subject {
            reasons.push(format!(
                "Subject mismatch: path has 'sub-{}' but filename has 'sub-{}'",
                path_subject, file_subject
            ));
        }
    }
    if let (Some(path_session), Some(file_session)) = (path_session, filename_entities.get("ses")) {
        if path_session != *file_session {
            reasons.push(format!(
                "Session mismatch: path has 'ses-{}' but filename has 'ses-{}'",
                path_session, file_session
            ));
        }
    }

    if reasons.is_empty() {
        Ok(())
    } else {
        Err(ValidationError { path: file.to_path_buf(), reasons })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_paths() {
        let valid_paths = [
            "sub-001/ses-01/eeg/sub-001_ses-01_task-rest_eeg.vhdr",
            "sub-002/ses-02/eeg/sub-002_ses-02_task-test_run-01_eeg.vhdr",
            "sub-003/ses-01/eeg/sub-003_ses-01_task-test_acq-full_run-01_eeg.vhdr",
            "/data/sub-004/ses-01/eeg/sub-004_ses-01_space-CapTrak_electrodes.tsv",
            "sub-005/ses-01/eeg",
        ];
        for path in valid_paths {
            assert_eq!(validate_bids_file(path), Ok(()), "{}", path);
        }
    }

    #[test]
    fn test_invalid_paths() {
        let invalid_paths = [
            "invalid/ses-01/eeg/sub-001_ses-01_task-rest_eeg.vhdr",
            "sub-001/ses-01/eeg/sub-002_ses-01_task-rest_eeg.vhdr",
            "sub-001/ses-01/eeg/sub-001_ses-02_task-rest_eeg.vhdr",
            "sub-001/ses-01/eeg/sub-001_ses-01_invalid-key_eeg.vhdr",
            "sab-001/ses-01/eeg/sub-001_ses-01_task-rest_eeg.vhdr",
            "sub-005/ses-01/eeg/sub-005_ses-01_task-invalid@task_eeg.vhdr",
        ];
        for path in invalid_paths {
            assert!(validate_bids_file(path).is_err(), "{}", path);
        }
    }

    #[test]
    fn test_datatype_must_be_lowercase_alphanumeric() {
        assert!(validate_bids_file("sub-001/ses-01/eeg/sub-001_ses-01_task-rest_eeg.vhdr").is_ok());
        assert!(validate_bids_file("sub-001/ses-01/EEG/sub-001_ses-01_task-rest_eeg.vhdr").is_err());
        assert!(validate_bids_file("sub-001/ses-01/$e$/sub-001_ses-01_task-rest_eeg.vhdr").is_err());
    }

    #[test]
    fn test_entity_format() {
        let err = validate_bids_file("sub-001/ses-01/eeg/sub-001_ses01_task-rest_run-01_eeg.vhdr").unwrap_err();
        assert_eq!(err.reasons, vec!["Invalid format in 'ses01': should be '<key>-<value>'".to_string()]);
    }

    #[test]
    fn test_unknown_key_is_named() {
        let err = validate_bids_file("sub-001/ses-01/eeg/sub-001_ses-01_invalid-key_eeg.vhdr").unwrap_err();
        assert_eq!(err.reasons.len(), 1);
        assert!(err.reasons[0].starts_with("Invalid key 'invalid'"));
    }

    #[test]
    fn test_mismatch_reports_both_values() {
        let err = validate_bids_file("sub-001/ses-01/eeg/sub-002_ses-01_task-rest_eeg.vhdr").unwrap_err();
        assert_eq!(
            err.reasons,
            vec!["Subject mismatch: path has 'sub-001' but filename has 'sub-002'".to_string()]
        );
    }

    #[test]
    fn test_all_reasons_are_reported() {
        let err = validate_bids_file("sub-001/ses-01/EEG/sub-002_ses-02_foo-bar_eeg.vhdr").unwrap_err();
        assert_eq!(err.reasons.len(), 4);
        assert!(err.reasons[0].starts_with("Invalid datatype"));
        assert!(err.reasons[1].starts_with("Invalid key 'foo'"));
        assert!(err.reasons[2].starts_with("Subject mismatch"));
        assert!(err.reasons[3].starts_with("Session mismatch"));
    }

    #[test]
    fn test_message_is_numbered() {
        let err = validate_bids_file("invalid/ses-01/eeg/sub-001_ses-01_task-rest_eeg.vhdr").unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("Non-standardized BIDS name\ninvalid/ses-01/eeg/sub-001_ses-01_task-rest_eeg.vhdr\n\n1. "));
        assert!(message.contains("\n2. Invalid path component: 'invalid'"));
    }

    #[test]
    fn test_missing_structure() {
        let err = validate_bids_file("eeg/sub-001_ses-01_eeg.vhdr").unwrap_err();
        assert!(err.reasons[0].contains("root/sub-<label>/ses-<label>/<datatype>"));
    }
}
