//! # sg-types
//!
//! Core types shared by the sweepgen crates: overrides, override sets,
//! sweep axes, the command-line override parser and the error hierarchy.

pub mod errors;
pub mod overrides;
pub mod parser;

pub use errors::*;
pub use overrides::*;
pub use parser::*;
