//! State machines and the traversal algorithms that drive walkers over them.

use std::any::Any;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;

use tracing::trace;

use trellis_core::{Result, StateId, TrellisError};

use crate::accepted::AcceptedState;
use crate::walker::{GraphWalker, Walker, WalkerBox};

/// A shared, immutable machine reference. Machines never mutate after
/// construction and may be referenced from any thread.
pub type MachineHandle = Arc<dyn Machine>;

/// A labeled transition: traversing it means launching a walker over
/// `machine` and, on acceptance, moving to `target`.
#[derive(Debug, Clone)]
pub struct Edge {
    pub machine: MachineHandle,
    pub target: StateId,
}

impl Edge {
    pub fn new(machine: impl Machine + 'static, target: impl Into<StateId>) -> Self {
        Self {
            machine: Arc::new(machine),
            target: target.into(),
        }
    }

    pub fn from_handle(machine: MachineHandle, target: impl Into<StateId>) -> Self {
        Self {
            machine,
            target: target.into(),
        }
    }
}

impl PartialEq for Edge {
    fn eq(&self, other: &Self) -> bool {
        self.target == other.target && self.machine.machine_eq(other.machine.as_ref())
    }
}

/// Ordered outgoing edges per state. A missing key means no outgoing edges.
/// The order of edges inside each `Vec` is the enumeration order of branched
/// walkers and is observable by callers.
pub type StateGraph = HashMap<StateId, Vec<Edge>>;

/// Walkers produced while enumerating transitions: `(sub_walker, from, to)`.
pub type Transition = (WalkerBox, StateId, StateId);

/// A machine in the grammar hierarchy.
///
/// Composite machines describe a transition graph; leaf machines match
/// characters directly. Both kinds share the traversal algorithms provided
/// by [`MachineExt`], differing only in the walkers they manufacture.
pub trait Machine: fmt::Debug + Send + Sync {
    fn state_graph(&self) -> &StateGraph;
    fn start_state(&self) -> &StateId;
    fn end_states(&self) -> &[StateId];
    fn is_optional(&self) -> bool;
    fn is_case_sensitive(&self) -> bool;

    /// Short name used by display formatting.
    fn name(&self) -> &'static str {
        "machine"
    }

    /// Manufacture this machine's walker, positioned at `state` (defaults to
    /// the start state).
    fn new_walker(self: Arc<Self>, state: Option<StateId>) -> WalkerBox;

    fn as_any(&self) -> &dyn Any;

    /// Machines compare by the structure of their state graphs.
    fn machine_eq(&self, other: &dyn Machine) -> bool {
        graphs_eq(self.state_graph(), other.state_graph())
    }
}

fn graphs_eq(a: &StateGraph, b: &StateGraph) -> bool {
    a.len() == b.len()
        && a.iter().all(|(state, edges)| {
            b.get(state)
                .is_some_and(|other_edges| edges.as_slice() == other_edges.as_slice())
        })
}

impl fmt::Display for dyn Machine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.state_graph().is_empty() {
            return write!(f, "{}", self.name());
        }
        write!(f, "{}({{", self.name())?;
        let mut states: Vec<_> = self.state_graph().keys().collect();
        states.sort();
        for (i, state) in states.into_iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{state}: [")?;
            for (j, edge) in self.state_graph()[state].iter().enumerate() {
                if j > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "({} -> {})", &*edge.machine, edge.target)?;
            }
            write!(f, "]")?;
        }
        write!(f, "}})")
    }
}

/// The concrete composite machine: a transition graph over sub-machines.
#[derive(Debug)]
pub struct StateMachine {
    pub state_graph: StateGraph,
    pub start_state: StateId,
    pub end_states: Vec<StateId>,
    pub is_optional: bool,
    pub is_case_sensitive: bool,
}

impl StateMachine {
    /// A machine over `state_graph` with the conventional defaults: start
    /// state `0`, end states `{"$"}`, required, case sensitive.
    pub fn new(state_graph: StateGraph) -> Self {
        Self {
            state_graph,
            start_state: StateId::from(0),
            end_states: vec![StateId::end()],
            is_optional: false,
            is_case_sensitive: true,
        }
    }

    pub fn with_states(
        state_graph: StateGraph,
        start_state: impl Into<StateId>,
        end_states: Vec<StateId>,
    ) -> Self {
        Self {
            state_graph,
            start_state: start_state.into(),
            end_states,
            is_optional: false,
            is_case_sensitive: true,
        }
    }

    pub fn optional(mut self) -> Self {
        self.is_optional = true;
        self
    }

    pub fn case_insensitive(mut self) -> Self {
        self.is_case_sensitive = false;
        self
    }

    /// Check that every edge target is either an end state or a graph key.
    pub fn validate(&self) -> Result<()> {
        for (state, edges) in &self.state_graph {
            for edge in edges {
                let known = self.end_states.contains(&edge.target)
                    || self.state_graph.contains_key(&edge.target);
                if !known {
                    return Err(TrellisError::InvalidGrammar(format!(
                        "edge {state} -> {target} references a state that is \
                         neither an end state nor a graph key",
                        target = edge.target,
                    )));
                }
            }
        }
        Ok(())
    }
}

impl Machine for StateMachine {
    fn state_graph(&self) -> &StateGraph {
        &self.state_graph
    }

    fn start_state(&self) -> &StateId {
        &self.start_state
    }

    fn end_states(&self) -> &[StateId] {
        &self.end_states
    }

    fn is_optional(&self) -> bool {
        self.is_optional
    }

    fn is_case_sensitive(&self) -> bool {
        self.is_case_sensitive
    }

    fn name(&self) -> &'static str {
        "state_machine"
    }

    fn new_walker(self: Arc<Self>, state: Option<StateId>) -> WalkerBox {
        Box::new(GraphWalker::new(self, state))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl PartialEq for StateMachine {
    fn eq(&self, other: &Self) -> bool {
        self.machine_eq(other)
    }
}

/// Traversal operations shared by every machine, provided over the shared
/// handle so walkers of nested machines can call back into their owner.
pub trait MachineExt {
    /// A fresh walker positioned at `state` (defaults to the start state).
    fn get_new_walker(&self, state: Option<StateId>) -> WalkerBox;

    /// The initial frontier: a lone walker for graphless machines, otherwise
    /// every first-edge choice materialized via [`MachineExt::branch_walker`].
    fn get_walkers(&self, state: Option<StateId>) -> Vec<WalkerBox>;

    /// Outgoing edges of `state`; empty when the state has none.
    fn get_edges(&self, state: &StateId) -> &[Edge];

    /// Enumerate `(sub_walker, from, to)` for each edge out of
    /// `state` (defaults to the walker's current state). Optional edges whose
    /// target is not an end state are traversed through, so every position
    /// reachable without consuming input is offered.
    fn get_transitions<W: Walker + ?Sized>(
        &self,
        walker: &W,
        state: Option<&StateId>,
    ) -> Vec<Transition>;

    /// Fork `walker` across its available transitions. When an optional edge
    /// leading straight to an end state cannot be started, the fork instead
    /// skips the edge entirely and surfaces an accepted walker carrying the
    /// token as remaining input.
    fn branch_walker<W: Walker + ?Sized>(&self, walker: &W, token: Option<&str>)
        -> Vec<WalkerBox>;

    /// Drive `walker` through `token`. Each returned walker has either fully
    /// consumed the token or reports the unconsumed tail in its remaining
    /// input. A token the grammar cannot consume yields an empty list.
    fn advance(&self, walker: WalkerBox, token: &str) -> Vec<WalkerBox>;
}

impl MachineExt for MachineHandle {
    fn get_new_walker(&self, state: Option<StateId>) -> WalkerBox {
        Arc::clone(self).new_walker(state)
    }

    fn get_walkers(&self, state: Option<StateId>) -> Vec<WalkerBox> {
        let initial = self.get_new_walker(state);
        if self.state_graph().is_empty() {
            return vec![initial];
        }
        self.branch_walker(initial.as_ref(), None)
    }

    fn get_edges(&self, state: &StateId) -> &[Edge] {
        self.state_graph()
            .get(state)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn get_transitions<W: Walker + ?Sized>(
        &self,
        walker: &W,
        state: Option<&StateId>,
    ) -> Vec<Transition> {
        let from = state.unwrap_or(&walker.core().current_state).clone();
        let mut transitions = Vec::new();

        for edge in self.get_edges(&from) {
            for sub_walker in edge.machine.get_walkers(None) {
                transitions.push((sub_walker, from.clone(), edge.target.clone()));
            }

            if edge.machine.is_optional()
                && !self.end_states().contains(&edge.target)
                && walker.can_accept_more_input()
            {
                transitions.extend(self.get_transitions(walker, Some(&edge.target)));
            }
        }

        transitions
    }

    fn branch_walker<W: Walker + ?Sized>(
        &self,
        walker: &W,
        token: Option<&str>,
    ) -> Vec<WalkerBox> {
        let input = token
            .map(str::to_owned)
            .or_else(|| walker.core().remaining_input.clone());

        let mut branches = Vec::new();
        for (sub_walker, from, to) in self.get_transitions(walker, None) {
            let sub_machine = Arc::clone(&sub_walker.core().machine);
            if let Some(branched) =
                walker.start_transition(sub_walker, input.as_deref(), Some(from), Some(to.clone()))
            {
                branches.push(branched);
                continue;
            }

            if sub_machine.is_optional() && self.end_states().contains(&to) && input.is_some() {
                let mut skipped = walker.clone_walker();
                if skipped.core().remaining_input.is_none() {
                    skipped.core_mut().remaining_input = input.clone();
                }
                branches.push(Box::new(AcceptedState::wrap(skipped)));
            }
        }

        branches
    }

    fn advance(&self, walker: WalkerBox, token: &str) -> Vec<WalkerBox> {
        if token.is_empty() {
            return vec![walker];
        }

        let mut results: Vec<WalkerBox> = Vec::new();
        let mut queue: VecDeque<(WalkerBox, String)> = VecDeque::new();
        queue.push_back((walker, token.to_owned()));

        while let Some((mut current, tok)) = queue.pop_front() {
            let starts = current.core().transition.is_some()
                && current.should_start_transition(&tok);

            if !starts {
                // No live transition can take this token: fork the walker and
                // retry the branches, or surface it as-is when it is already
                // carrying unresolved input.
                let mut pending: Vec<WalkerBox> = Vec::new();
                let mut accepted = false;
                for mut branched in current.branch(Some(&tok)) {
                    // Only a walker with a live transition can make progress
                    // when requeued; anything else either surfaces as
                    // accepted or is dropped.
                    if branched.core().transition.is_some()
                        && branched.should_start_transition(&tok)
                    {
                        pending.push(branched);
                    } else if branched.has_reached_accept_state() {
                        results.push(branched);
                        accepted = true;
                        break;
                    }
                }
                if accepted {
                    continue;
                }
                if pending.is_empty() {
                    if current.core().remaining_input.is_some() {
                        results.push(current);
                    }
                    continue;
                }
                for branched in pending {
                    queue.push_back((branched, tok.clone()));
                }
                continue;
            }

            let successors = current
                .core()
                .transition
                .as_ref()
                .map(|t| t.consume_token(&tok))
                .unwrap_or_default();

            for successor in successors {
                let (next, terminal) = current.complete_transition(successor);
                let Some(next) = next else { continue };
                let next: WalkerBox = if terminal {
                    Box::new(AcceptedState::wrap(next))
                } else {
                    next
                };
                match next.core().remaining_input.clone() {
                    Some(rest) => queue.push_back((next, rest)),
                    None => results.push(next),
                }
            }
        }

        trace!(token, results = results.len(), "walker advance complete");
        results
    }
}
