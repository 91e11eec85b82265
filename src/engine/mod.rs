// engine/mod.rs - index engine
//! The index, its builder, and set algebra between indexes.

pub mod builder;
pub mod core;
pub mod ops;

pub use builder::*;
pub use self::core::*;
pub use ops::*;
