//! Frontier stepping: advance every live walker by a proposed token.

use tracing::debug;

use crate::vocab::Vocabulary;
use crate::walker::WalkerBox;

/// Advance a frontier of walkers by `token`.
///
/// Returns `(effective_token, walker)` pairs in discovery order: frontier
/// order first, then the edge-enumeration order of each walker's branches.
///
/// A walker that absorbs only a leading portion of the token is reported
/// under that prefix when the prefix is itself a vocabulary entry — the
/// generator can legally emit the shorter token instead — and dropped
/// otherwise. Without a vocabulary, partial consumption is dropped outright.
pub fn advance_all(
    frontier: &[WalkerBox],
    token: &str,
    vocab: Option<&dyn Vocabulary>,
) -> Vec<(String, WalkerBox)> {
    let mut results: Vec<(String, WalkerBox)> = Vec::new();

    for walker in frontier {
        for mut advanced in walker.consume_token(token) {
            let Some(remaining) = advanced.core().remaining_input.clone() else {
                results.push((token.to_owned(), advanced));
                continue;
            };

            let Some(vocab) = vocab else { continue };
            let prefix = &token[..token.len() - remaining.len()];
            if prefix.is_empty() || !vocab.contains(prefix) {
                continue;
            }

            // The generator can emit `prefix` instead of `token`, so the
            // walker continues as if the shorter token had been offered.
            advanced.core_mut().remaining_input = None;
            if advanced.core().transition.is_none() && advanced.can_accept_more_input() {
                for branched in advanced.branch(None) {
                    results.push((prefix.to_owned(), branched));
                }
            } else {
                results.push((prefix.to_owned(), advanced));
            }
        }
    }

    debug!(
        token,
        frontier = frontier.len(),
        emitted = results.len(),
        "advanced frontier"
    );
    results
}
