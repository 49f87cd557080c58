//! Trellis core types: state identifiers and error definitions.

pub mod error;
pub mod state;

pub use error::{Result, TrellisError};
pub use state::{StateId, VisitedEdge};
