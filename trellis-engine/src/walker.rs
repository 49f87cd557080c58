//! Walkers: live positions inside the machine hierarchy.
//!
//! A walker is mutated only by producing a new walker via [`Walker::clone_walker`];
//! once published it is never changed in place. Nested sub-walkers drive the
//! edge currently being consumed, and completed sub-walkers are retired into
//! the accepted history, which is what the accumulated raw value is rebuilt
//! from.

use std::collections::{BTreeSet, HashSet};
use std::fmt;

use trellis_core::{StateId, VisitedEdge};

use crate::machine::{MachineExt, MachineHandle};
use crate::vocab::Vocabulary;

/// An owned walker trait object.
pub type WalkerBox = Box<dyn Walker>;

/// Bound on nested continuation enumeration; grammars that recurse deeper
/// than this report no continuations instead of looping.
pub const MAX_CONTINUATION_DEPTH: usize = 10;

/// The field block shared by every walker implementation.
#[derive(Debug)]
pub struct WalkerCore {
    /// The machine this walker traverses. Shared and immutable.
    pub machine: MachineHandle,
    pub current_state: StateId,
    /// The state this walker will occupy once its transition walker accepts.
    pub target_state: Option<StateId>,
    /// The nested walker driving the currently active edge.
    pub transition: Option<WalkerBox>,
    /// Retired sub-walkers that reached acceptance, in completion order.
    pub accepted_history: Vec<WalkerBox>,
    /// Edges already traversed by this lineage. Revisits are forbidden,
    /// which bounds cycles in the state graph.
    pub explored_edges: HashSet<VisitedEdge>,
    pub consumed_character_count: usize,
    /// Unconsumed tail of the last offered token.
    pub remaining_input: Option<String>,
    /// Literal text recorded by leaf walkers.
    pub raw_value_override: Option<String>,
    /// Cleared when re-entry through an already explored edge is detected.
    pub accepts_more_input: bool,
}

impl WalkerCore {
    pub fn new(machine: MachineHandle, state: Option<StateId>) -> Self {
        let current_state = state.unwrap_or_else(|| machine.start_state().clone());
        Self {
            machine,
            current_state,
            target_state: None,
            transition: None,
            accepted_history: Vec::new(),
            explored_edges: HashSet::new(),
            consumed_character_count: 0,
            remaining_input: None,
            raw_value_override: None,
            accepts_more_input: false,
        }
    }
}

impl Clone for WalkerCore {
    fn clone(&self) -> Self {
        Self {
            machine: self.machine.clone(),
            current_state: self.current_state.clone(),
            target_state: self.target_state.clone(),
            transition: self.transition.as_ref().map(|w| w.clone_walker()),
            accepted_history: self
                .accepted_history
                .iter()
                .map(|w| w.clone_walker())
                .collect(),
            explored_edges: self.explored_edges.clone(),
            consumed_character_count: self.consumed_character_count,
            remaining_input: self.remaining_input.clone(),
            raw_value_override: self.raw_value_override.clone(),
            accepts_more_input: self.accepts_more_input,
        }
    }
}

/// One live parse position.
///
/// The provided methods implement the composite behavior shared by all
/// walkers; leaf walkers override the observation and consumption methods
/// they need. Every mutation happens on a clone, so a walker handed out by
/// the engine is never changed behind the caller's back.
pub trait Walker: fmt::Debug + Send {
    fn core(&self) -> &WalkerCore;
    fn core_mut(&mut self) -> &mut WalkerCore;
    fn clone_walker(&self) -> WalkerBox;

    /// Whether this walker could usefully be offered further input.
    fn can_accept_more_input(&self) -> bool {
        let core = self.core();
        if core
            .transition
            .as_ref()
            .is_some_and(|t| t.can_accept_more_input())
        {
            return true;
        }
        core.accepts_more_input || !core.machine.get_edges(&core.current_state).is_empty()
    }

    /// Whether the walker is in the middle of consuming a value.
    fn is_within_value(&self) -> bool {
        match &self.core().transition {
            Some(t) => t.is_within_value(),
            None => self.core().consumed_character_count > 0,
        }
    }

    fn has_reached_accept_state(&self) -> bool {
        false
    }

    fn accepts_any_token(&self) -> bool {
        false
    }

    /// Strings that, if offered next, would start a transition. Composite
    /// walkers delegate to the nested walker; the depth bound stops cyclic
    /// grammars from recursing forever.
    fn get_valid_continuations(&self, depth: usize) -> Vec<String> {
        if depth > MAX_CONTINUATION_DEPTH {
            return Vec::new();
        }
        match &self.core().transition {
            Some(t) => t.get_valid_continuations(depth + 1),
            None => Vec::new(),
        }
    }

    /// Every vocabulary entry extending one of the valid continuations.
    fn find_valid_prefixes(&self, vocab: &dyn Vocabulary) -> BTreeSet<String> {
        let mut prefixes = BTreeSet::new();
        let mut seen = HashSet::new();
        for continuation in self.get_valid_continuations(0) {
            if !seen.insert(continuation.clone()) {
                continue;
            }
            for entry in vocab.entries_with_prefix(&continuation) {
                prefixes.insert(entry);
            }
        }
        prefixes
    }

    /// The edge this walker is currently on: `(from, to, value)`.
    fn current_edge(&self) -> VisitedEdge {
        (
            self.core().current_state.clone(),
            self.core().target_state.clone(),
            self.raw_value(),
        )
    }

    /// The text this walker has matched: the leaf override when present,
    /// otherwise the concatenation of the retired history and the nested
    /// walker's value.
    fn raw_value(&self) -> Option<String> {
        let core = self.core();
        if let Some(value) = &core.raw_value_override {
            return Some(value.clone());
        }
        if core.accepted_history.is_empty() && core.transition.is_none() {
            return None;
        }

        let mut value = String::new();
        for walker in &core.accepted_history {
            if let Some(part) = walker.raw_value() {
                value.push_str(&part);
            }
        }
        if let Some(t) = &core.transition {
            if let Some(part) = t.raw_value() {
                value.push_str(&part);
            }
        }
        if value.is_empty() {
            None
        } else {
            Some(value)
        }
    }

    /// Whether `token` could begin (or continue) a transition from here.
    /// Re-entering an edge this lineage already explored is refused, and the
    /// walker stops advertising that it accepts more input.
    fn should_start_transition(&mut self, token: &str) -> bool {
        if let Some(t) = self.core_mut().transition.as_deref_mut() {
            return t.should_start_transition(token);
        }

        let edge = self.current_edge();
        if self.core().explored_edges.contains(&edge) {
            self.core_mut().accepts_more_input = false;
            return false;
        }
        true
    }

    fn should_complete_transition(&self) -> bool {
        match &self.core().transition {
            Some(t) => t.should_complete_transition(),
            None => true,
        }
    }

    /// Begin traversing an edge by installing `sub_walker` as the active
    /// transition walker on a clone of `self`. Returns `None` when the
    /// sub-walker refuses the token or the fork would be redundant.
    fn start_transition(
        &self,
        mut sub_walker: WalkerBox,
        token: Option<&str>,
        from: Option<StateId>,
        to: Option<StateId>,
    ) -> Option<WalkerBox> {
        if let Some(token) = token {
            if !sub_walker.should_start_transition(token) {
                return None;
            }
        }

        // Already transitioning toward the same target with a live
        // sub-walker: a second fork would only duplicate it.
        if self.core().target_state == to
            && self
                .core()
                .transition
                .as_ref()
                .is_some_and(|t| t.can_accept_more_input())
        {
            return None;
        }

        let mut next = self.clone_walker();
        {
            let core = next.core_mut();
            if let Some(from) = from {
                core.current_state = from;
            }
            core.target_state = to;
        }
        if next
            .core()
            .transition
            .as_ref()
            .is_some_and(|t| t.has_reached_accept_state())
        {
            let retired = next.core_mut().transition.take();
            next.core_mut().accepted_history.extend(retired);
        }
        next.core_mut().transition = Some(sub_walker);
        Some(next)
    }

    /// Fold a finished sub-walker back into a clone of `self`. The second
    /// element is true when the clone landed on an end state.
    ///
    /// The sub-walker's unconsumed tail and consumed count move up one
    /// level, so the same in-flight sub-walker can complete again on the
    /// next token without being counted twice.
    fn complete_transition(&self, sub_walker: WalkerBox) -> (Option<WalkerBox>, bool) {
        let mut next = self.clone_walker();
        next.core_mut().transition = Some(sub_walker);

        {
            let core = next.core_mut();
            let (rest, consumed) = {
                let t = core
                    .transition
                    .as_deref_mut()
                    .expect("transition installed above");
                let sub = t.core_mut();
                (
                    sub.remaining_input.take(),
                    std::mem::take(&mut sub.consumed_character_count),
                )
            };
            core.remaining_input = rest;
            core.consumed_character_count += consumed;
        }

        let edge = next.current_edge();
        next.core_mut().explored_edges.insert(edge);

        if !next.should_complete_transition() {
            if next.can_accept_more_input() {
                return (Some(next), false);
            }
            return (None, false);
        }

        let sub_accepted = next
            .core()
            .transition
            .as_ref()
            .is_some_and(|t| t.has_reached_accept_state());
        if sub_accepted {
            if let Some(target) = next.core().target_state.clone() {
                next.core_mut().current_state = target;

                let sub_exhausted = next
                    .core()
                    .transition
                    .as_ref()
                    .is_some_and(|t| !t.can_accept_more_input());
                if sub_exhausted {
                    let retired = next.core_mut().transition.take();
                    next.core_mut().accepted_history.extend(retired);
                    next.core_mut().target_state = None;
                }

                let current = next.core().current_state.clone();
                if next.core().machine.end_states().contains(&current) {
                    return (Some(next), true);
                }
            }
        }

        (Some(next), false)
    }

    /// Fan this walker out: fork the nested walker when it can still accept
    /// input, then fork across the owning machine's transitions.
    fn branch(&self, token: Option<&str>) -> Vec<WalkerBox> {
        let mut branches: Vec<WalkerBox> = Vec::new();

        if let Some(t) = &self.core().transition {
            let sub_branches = if t.can_accept_more_input() {
                t.branch(token)
            } else {
                Vec::new()
            };

            if sub_branches.is_empty() && !t.has_reached_accept_state() {
                return branches;
            }
            for sub in sub_branches {
                let mut next = self.clone_walker();
                next.core_mut().transition = Some(sub);
                branches.push(next);
            }
        }

        let machine = self.core().machine.clone();
        branches.extend(machine.branch_walker(self, token));
        branches
    }

    /// Consume `token` from this position. Composite walkers delegate to the
    /// owning machine's advance algorithm; leaf walkers match characters.
    fn consume_token(&self, token: &str) -> Vec<WalkerBox> {
        let machine = self.core().machine.clone();
        machine.advance(self.clone_walker(), token)
    }

    /// Structural equality: position, accumulated value, nested walker, and
    /// machine structure.
    fn walker_eq(&self, other: &dyn Walker) -> bool {
        let (a, b) = (self.core(), other.core());
        if a.current_state != b.current_state || a.target_state != b.target_state {
            return false;
        }
        if self.raw_value() != other.raw_value() {
            return false;
        }
        match (&a.transition, &b.transition) {
            (Some(x), Some(y)) => {
                if !x.walker_eq(y.as_ref()) {
                    return false;
                }
            }
            (None, None) => {}
            _ => return false,
        }
        a.machine.machine_eq(b.machine.as_ref())
    }
}

impl PartialEq for dyn Walker {
    fn eq(&self, other: &Self) -> bool {
        self.walker_eq(other)
    }
}

impl fmt::Display for dyn Walker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.has_reached_accept_state() {
            write!(f, "[accepted] ")?;
        }
        let core = self.core();
        write!(f, "{}.walker(state: {}", core.machine.name(), core.current_state)?;
        if let Some(target) = &core.target_state {
            if *target != core.current_state {
                write!(f, " -> {target}")?;
            }
        }
        if let Some(value) = self.raw_value() {
            write!(f, ", value: {value:?}")?;
        }
        if let Some(rest) = &core.remaining_input {
            write!(f, ", remaining: {rest:?}")?;
        }
        if let Some(t) = &core.transition {
            write!(f, ", transition: {}", &**t)?;
        }
        write!(f, ")")
    }
}

/// The walker of a composite [`crate::machine::StateMachine`].
#[derive(Debug)]
pub struct GraphWalker {
    core: WalkerCore,
}

impl GraphWalker {
    pub fn new(machine: MachineHandle, state: Option<StateId>) -> Self {
        Self {
            core: WalkerCore::new(machine, state),
        }
    }
}

impl Walker for GraphWalker {
    fn core(&self) -> &WalkerCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut WalkerCore {
        &mut self.core
    }

    fn clone_walker(&self) -> WalkerBox {
        Box::new(GraphWalker {
            core: self.core.clone(),
        })
    }

    /// Accepting at an end state, or immediately when the machine is
    /// optional and nothing has been consumed yet.
    fn has_reached_accept_state(&self) -> bool {
        let core = self.core();
        if core.machine.end_states().contains(&core.current_state) {
            return true;
        }
        core.machine.is_optional()
            && core.consumed_character_count == 0
            && core.transition.is_none()
            && core.accepted_history.is_empty()
    }
}
