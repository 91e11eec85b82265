// schema/fields.rs - column name constants
//! Every column of the file table and the error table, named in one place.

/// Filesystem-stable identity (inode on unix), primary key of both tables
pub const COL_UNIQUE_ID: &str = "unique_id";
/// Dataset root shared by every row of an index
pub const COL_ROOT: &str = "root";
pub const COL_SUBJECT: &str = "subject";
pub const COL_SESSION: &str = "session";
pub const COL_DATATYPE: &str = "datatype";
pub const COL_TASK: &str = "task";
pub const COL_RUN: &str = "run";
pub const COL_ACQUISITION: &str = "acquisition";
pub const COL_RECORDING: &str = "recording";
pub const COL_SPACE: &str = "space";
pub const COL_DESCRIPTION: &str = "description";
pub const COL_SUFFIX: &str = "suffix";
pub const COL_EXTENSION: &str = "extension";
/// Full resolved path of the file
pub const COL_FILENAME: &str = "filename";
pub const COL_ATIME: &str = "atime";
pub const COL_MTIME: &str = "mtime";
pub const COL_CTIME: &str = "ctime";

pub const COL_ERROR_TYPE: &str = "error_type";
pub const COL_ERROR_MESSAGE: &str = "error_message";

/// Columns a file table must carry to take part in set algebra.
pub const REQUIRED_COLUMNS: &[&str] = &[
    COL_UNIQUE_ID,
    COL_ROOT,
    COL_SUBJECT,
    COL_SESSION,
    COL_DATATYPE,
    COL_TASK,
    COL_RUN,
    COL_ACQUISITION,
    COL_DESCRIPTION,
    COL_SUFFIX,
    COL_EXTENSION,
    COL_ATIME,
    COL_MTIME,
    COL_CTIME,
    COL_FILENAME,
];

/// Columns that may appear in a file table without being required.
pub const OPTIONAL_COLUMNS: &[&str] = &[COL_RECORDING, COL_SPACE];
