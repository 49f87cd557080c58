use std::fmt;

use serde::{Deserialize, Serialize};

/// A vertex identifier in a transition graph: either a numeric tag or a
/// symbolic tag. `"$"` is the conventional terminal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StateId {
    Num(i64),
    Name(String),
}

impl StateId {
    /// The conventional terminal state tag.
    pub fn end() -> Self {
        StateId::Name("$".to_string())
    }

    pub fn is_end_tag(&self) -> bool {
        matches!(self, StateId::Name(s) if s == "$")
    }
}

impl From<i64> for StateId {
    fn from(n: i64) -> Self {
        StateId::Num(n)
    }
}

impl From<i32> for StateId {
    fn from(n: i32) -> Self {
        StateId::Num(n as i64)
    }
}

impl From<&str> for StateId {
    fn from(s: &str) -> Self {
        StateId::Name(s.to_string())
    }
}

impl From<String> for StateId {
    fn from(s: String) -> Self {
        StateId::Name(s)
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateId::Num(n) => write!(f, "{n}"),
            StateId::Name(s) => write!(f, "{s}"),
        }
    }
}

/// An edge traversal record `(from, to, value)` kept by a walker to avoid
/// re-entering the same edge within one parse.
pub type VisitedEdge = (StateId, Option<StateId>, Option<String>);
