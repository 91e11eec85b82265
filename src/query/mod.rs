// query/mod.rs - selection queries
//! Criteria types, text parsing and row masks.

mod parser;
pub mod filter;
pub mod types;

pub use filter::*;
pub use parser::*;
pub use types::*;
