// src/lib.rs
pub mod api;
pub mod config;
pub mod engine;
pub mod indexer;
pub mod path;
pub mod query;
pub mod schema;

pub use config::AppConfig;
pub use engine::{BidsIndex, IndexBuilder, IndexError, IndexResult, Operand};
pub use path::{validate_bids_file, Entities, EntityPath, PatternQuery, ValidationError};
pub use query::{Criteria, CriteriaParser, CriterionValue};
pub use schema::{Column, ErrorKind, ErrorRecord, FileRecord};
