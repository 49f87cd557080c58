//! Character-level leaf matchers built on the walker contract.

pub mod literal;
pub mod pattern;

pub use literal::{Literal, LiteralWalker};
pub use pattern::{Pattern, PatternWalker};
