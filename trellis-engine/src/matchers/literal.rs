//! Exact-text leaf matcher.

use std::any::Any;
use std::sync::Arc;

use trellis_core::StateId;

use crate::machine::{Machine, MachineHandle, StateGraph, StateMachine};
use crate::walker::{Walker, WalkerBox, WalkerCore};

/// Matches one exact piece of text, character by character.
#[derive(Debug)]
pub struct Literal {
    text: String,
    base: StateMachine,
}

impl Literal {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            base: StateMachine::new(StateGraph::new()),
        }
    }

    /// The whole literal may be skipped; it accepts the empty string.
    pub fn optional(mut self) -> Self {
        self.base.is_optional = true;
        self
    }

    pub fn case_insensitive(mut self) -> Self {
        self.base.is_case_sensitive = false;
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    fn chars_eq(&self, a: char, b: char) -> bool {
        if self.base.is_case_sensitive {
            a == b
        } else {
            a.to_lowercase().eq(b.to_lowercase())
        }
    }

    fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

impl Machine for Literal {
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
        "literal"
    }

    fn new_walker(self: Arc<Self>, state: Option<StateId>) -> WalkerBox {
        Box::new(LiteralWalker::new(self, state))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn machine_eq(&self, other: &dyn Machine) -> bool {
        other.as_any().downcast_ref::<Literal>().is_some_and(|o| {
            o.text == self.text && o.base.is_case_sensitive == self.base.is_case_sensitive
        })
    }
}

/// Walker over a [`Literal`]: consumes the longest matching prefix of each
/// offered token and records the unconsumed tail as remaining input.
#[derive(Debug)]
pub struct LiteralWalker {
    core: WalkerCore,
    literal: Arc<Literal>,
    /// Characters of the literal matched so far.
    matched: usize,
}

impl LiteralWalker {
    pub fn new(literal: Arc<Literal>, state: Option<StateId>) -> Self {
        let machine: MachineHandle = literal.clone();
        Self {
            core: WalkerCore::new(machine, state),
            literal,
            matched: 0,
        }
    }

    fn cloned(&self) -> LiteralWalker {
        LiteralWalker {
            core: self.core.clone(),
            literal: Arc::clone(&self.literal),
            matched: self.matched,
        }
    }
}

impl Walker for LiteralWalker {
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

        let tail: Vec<char> = self.literal.text.chars().skip(self.matched).collect();
        let mut consumed_chars = 0;
        let mut consumed_bytes = 0;
        for (tc, lc) in token.chars().zip(tail.iter()) {
            if !self.literal.chars_eq(tc, *lc) {
                break;
            }
            consumed_chars += 1;
            consumed_bytes += tc.len_utf8();
        }
        if consumed_chars == 0 {
            return Vec::new();
        }

        let mut next = self.cloned();
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
        let next_char = self.literal.text.chars().nth(self.matched);
        match (next_char, token.chars().next()) {
            (Some(lc), Some(tc)) => self.literal.chars_eq(tc, lc),
            _ => false,
        }
    }

    fn should_complete_transition(&self) -> bool {
        self.has_reached_accept_state()
    }

    fn has_reached_accept_state(&self) -> bool {
        self.matched == self.literal.char_count()
            || (self.matched == 0 && self.literal.is_optional())
    }

    fn can_accept_more_input(&self) -> bool {
        self.matched < self.literal.char_count()
    }

    fn is_within_value(&self) -> bool {
        self.matched > 0 && self.matched < self.literal.char_count()
    }

    fn get_valid_continuations(&self, _depth: usize) -> Vec<String> {
        if self.matched >= self.literal.char_count() {
            return Vec::new();
        }
        let tail: String = self.literal.text.chars().skip(self.matched).collect();
        vec![tail]
    }
}
