//! Wrapper marking a walker that has reached an accepting position.

use trellis_core::{Result, TrellisError};

use crate::walker::{Walker, WalkerBox, WalkerCore};

/// A walker that has reached grammatical completion.
///
/// Copies the inner walker's state and delegates everything else to it, so
/// an accepted walker can keep consuming input when the grammar allows more
/// (for example a repetition that already matched once). Cloning yields the
/// inner walker, not another wrapper.
#[derive(Debug)]
pub struct AcceptedState {
    core: WalkerCore,
    inner: WalkerBox,
}

impl AcceptedState {
    /// Wrap `walker`, checking that it is actually in an accepting position.
    pub fn new(walker: WalkerBox) -> Result<Self> {
        let at_end = walker
            .core()
            .machine
            .end_states()
            .contains(&walker.core().current_state);
        if !walker.has_reached_accept_state() && !at_end {
            return Err(TrellisError::InvalidGrammar(
                "walker has not reached an accepting state".to_string(),
            ));
        }
        Ok(Self::wrap(walker))
    }

    /// Unchecked wrap used by the engine, which also accepts walkers whose
    /// pending target (rather than current state) is the accepting position.
    pub(crate) fn wrap(walker: WalkerBox) -> Self {
        Self {
            core: walker.core().clone(),
            inner: walker,
        }
    }

    pub fn accepted_walker(&self) -> &dyn Walker {
        self.inner.as_ref()
    }
}

impl Walker for AcceptedState {
    fn core(&self) -> &WalkerCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut WalkerCore {
        &mut self.core
    }

    fn clone_walker(&self) -> WalkerBox {
        self.inner.clone_walker()
    }

    fn has_reached_accept_state(&self) -> bool {
        true
    }

    fn is_within_value(&self) -> bool {
        false
    }

    fn can_accept_more_input(&self) -> bool {
        self.inner.can_accept_more_input()
    }

    fn should_start_transition(&mut self, token: &str) -> bool {
        if !self.inner.can_accept_more_input() {
            return false;
        }
        self.inner.should_start_transition(token)
    }

    fn consume_token(&self, token: &str) -> Vec<WalkerBox> {
        if !self.inner.can_accept_more_input() {
            return Vec::new();
        }
        self.inner.consume_token(token)
    }

    fn walker_eq(&self, other: &dyn Walker) -> bool {
        self.inner.walker_eq(other)
    }
}
