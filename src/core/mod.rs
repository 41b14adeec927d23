//! Core types and errors for max-kernel search

pub mod error;
pub mod types;

pub use self::error::*;
pub use self::types::*;
