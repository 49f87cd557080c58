//! Regex leaf matcher backed by a `regex-automata` dense DFA.

use std::any::Any;
use std::sync::Arc;

use regex_automata::dfa::dense;
use regex_automata::dfa::Automaton;
use regex_automata::util::primitives::StateID;
use regex_automata::util::start;
use regex_automata::util::syntax;
use regex_automata::Anchored;

use trellis_core::{Result, StateId, TrellisError};

use crate::machine::{Machine, MachineHandle, StateGraph, StateMachine};
use crate::walker::{Walker, WalkerBox, WalkerCore};

/// Maximum allowed pattern length.
const MAX_PATTERN_LEN: usize = 8192;
/// Maximum DFA size in bytes (10 MB).
const MAX_DFA_SIZE: usize = 10 * 1024 * 1024;

/// Matches text against an anchored regular expression, character by
/// character.
#[derive(Debug)]
pub struct Pattern {
    source: String,
    dfa: dense::DFA<Vec<u32>>,
    start: StateID,
    base: StateMachine,
}

impl Pattern {
    /// Compile `pattern` into an anchored character-level DFA.
    pub fn new(pattern: &str) -> Result<Self> {
        Self::build(pattern, true)
    }

    pub fn new_case_insensitive(pattern: &str) -> Result<Self> {
        Self::build(pattern, false)
    }

    fn build(pattern: &str, case_sensitive: bool) -> Result<Self> {
        if pattern.len() > MAX_PATTERN_LEN {
            return Err(TrellisError::InvalidGrammar(format!(
                "pattern too long ({} bytes, max {MAX_PATTERN_LEN})",
                pattern.len()
            )));
        }

        let dfa = dense::Builder::new()
            .syntax(syntax::Config::new().case_insensitive(!case_sensitive))
            .configure(
                dense::DFA::config()
                    .start_kind(regex_automata::dfa::StartKind::Anchored)
                    .dfa_size_limit(Some(MAX_DFA_SIZE)),
            )
            .build(pattern)
            .map_err(|e| {
                TrellisError::InvalidGrammar(format!("pattern {pattern:?} failed to compile: {e}"))
            })?;

        let start_config = start::Config::new().anchored(Anchored::Yes);
        let start = dfa
            .start_state(&start_config)
            .map_err(|e| TrellisError::InvalidGrammar(format!("pattern has no start state: {e}")))?;

        let mut base = StateMachine::new(StateGraph::new());
        base.is_case_sensitive = case_sensitive;
        Ok(Self {
            source: pattern.to_string(),
            dfa,
            start,
            base,
        })
    }

    /// The whole pattern may be skipped; it accepts the empty string.
    pub fn optional(mut self) -> Self {
        self.base.is_optional = true;
        self
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Walk one character from `state`; `None` when it leads to a dead end.
    fn step_char(&self, state: StateID, ch: char) -> Option<StateID> {
        let mut buf = [0u8; 4];
        let mut current = state;
        for &byte in ch.encode_utf8(&mut buf).as_bytes() {
            let next = self.dfa.next_state(current, byte);
            if self.dfa.is_dead_state(next) {
                return None;
            }
            current = next;
        }
        Some(current)
    }

    fn is_accepting(&self, state: StateID) -> bool {
        self.dfa.is_match_state(state) || self.dfa.is_match_state(self.dfa.next_eoi_state(state))
    }
}

impl Machine for Pattern {
    fn state_graph(&self) -> &StateGraph {
        &self.base.state_graph
    }

    fn start_state(&self) -> &StateId {
        &self.base.start_state
    }

    fn end_states(&self) -> &[StateId] {
        &self.base.end_states
    }

    fn is_optional(&self) -> bool {
        self.base.is_optional
    }

    fn is_case_sensitive(&self) -> bool {
        self.base.is_case_sensitive
    }

    fn name(&self) -> &'static str {
        "pattern"
    }

    fn new_walker(self: Arc<Self>, state: Option<StateId>) -> WalkerBox {
        Box::new(PatternWalker::new(self, state))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn machine_eq(&self, other: &dyn Machine) -> bool {
        other.as_any().downcast_ref::<Pattern>().is_some_and(|o| {
            o.source == self.source && o.base.is_case_sensitive == self.base.is_case_sensitive
        })
    }
}

/// Walker over a [`Pattern`]: drives the DFA through each offered token and
/// records the unconsumed tail as remaining input.
#[derive(Debug)]
pub struct PatternWalker {
    core: WalkerCore,
    pattern: Arc<Pattern>,
    state: StateID,
    /// Characters matched so far across all offers.
    matched: usize,
}

impl PatternWalker {
    pub fn new(pattern: Arc<Pattern>, state: Option<StateId>) -> Self {
        let machine: MachineHandle = pattern.clone();
        let start = pattern.start;
        Self {
            core: WalkerCore::new(machine, state),
            pattern,
            state: start,
            matched: 0,
        }
    }

    fn cloned(&self) -> PatternWalker {
        PatternWalker {
            core: self.core.clone(),
            pattern: Arc::clone(&self.pattern),
            state: self.state,
            matched: self.matched,
        }
    }
}

impl Walker for PatternWalker {
    fn core(&self) -> &WalkerCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut WalkerCore {
        &mut self.core
    }

    fn clone_walker(&self) -> WalkerBox {
        Box::new(self.cloned())
    }

    fn consume_token(&self, token: &str) -> Vec<WalkerBox> {
        if token.is_empty() {
            return vec![self.clone_walker()];
        }

        let mut state = self.state;
        let mut consumed_chars = 0;
        let mut consumed_bytes = 0;
        for ch in token.chars() {
            match self.pattern.step_char(state, ch) {
                Some(next) => {
                    state = next;
                    consumed_chars += 1;
                    consumed_bytes += ch.len_utf8();
                }
                None => break,
            }
        }
        if consumed_chars == 0 {
            return Vec::new();
        }

        let mut next = self.cloned();
        next.state = state;
        next.matched += consumed_chars;
        next.core.consumed_character_count += consumed_chars;
        let mut value = next.core.raw_value_override.take().unwrap_or_default();
        value.push_str(&token[..consumed_bytes]);
        next.core.raw_value_override = Some(value);
        next.core.remaining_input = if consumed_bytes < token.len() {
            Some(token[consumed_bytes..].to_string())
        } else {
            None
        };
        vec![Box::new(next)]
    }

    fn should_start_transition(&mut self, token: &str) -> bool {
        match token.chars().next() {
            Some(ch) => self.pattern.step_char(self.state, ch).is_some(),
            None => false,
        }
    }

    fn should_complete_transition(&self) -> bool {
        self.has_reached_accept_state()
    }

    fn has_reached_accept_state(&self) -> bool {
        self.pattern.is_accepting(self.state)
            || (self.matched == 0 && self.pattern.is_optional())
    }

    fn can_accept_more_input(&self) -> bool {
        (0..=255u8).any(|byte| {
            let next = self.pattern.dfa.next_state(self.state, byte);
            !self.pattern.dfa.is_dead_state(next)
        })
    }

    fn is_within_value(&self) -> bool {
        self.matched > 0
    }

    /// Live single-character successors of the current DFA state, over the
    /// printable ASCII range.
    fn get_valid_continuations(&self, _depth: usize) -> Vec<String> {
        (0x20u8..=0x7e)
            .filter_map(|byte| {
                let ch = byte as char;
                self.pattern
                    .step_char(self.state, ch)
                    .map(|_| ch.to_string())
            })
            .collect()
    }
}
