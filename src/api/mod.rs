// api/mod.rs - API types
//! Structured request and response types

pub mod request;
pub mod response;

pub use request::*;
pub use response::*;
