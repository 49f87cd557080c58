//! Trellis engine: hierarchical state machines, walkers, and frontier stepping.
//!
//! A grammar is a composition of small state machines: each machine has a
//! labeled transition graph whose edges are themselves machines. Walkers
//! represent live positions inside that hierarchy; advancing a frontier of
//! walkers by a proposed token either rejects the token, consumes it fully,
//! or consumes a leading prefix that a vocabulary lookup can legalize.

pub mod accepted;
pub mod frontier;
pub mod machine;
pub mod matchers;
pub mod vocab;
pub mod walker;

pub use accepted::AcceptedState;
pub use frontier::advance_all;
pub use machine::{Edge, Machine, MachineExt, MachineHandle, StateGraph, StateMachine, Transition};
pub use matchers::{Literal, Pattern};
pub use vocab::{TokenTrie, Vocabulary};
pub use walker::{GraphWalker, Walker, WalkerBox, WalkerCore, MAX_CONTINUATION_DEPTH};

pub use trellis_core::{Result, StateId, TrellisError, VisitedEdge};
