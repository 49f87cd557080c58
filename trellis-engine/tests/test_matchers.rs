//! Tests for the character-level leaf matchers.

use std::sync::Arc;

use trellis_engine::{Literal, Machine, MachineExt, MachineHandle, Pattern, TrellisError};

fn handle(machine: impl Machine + 'static) -> MachineHandle {
    Arc::new(machine)
}

// ===== Literal =====

#[test]
fn test_literal_consumes_whole_token() {
    let machine = handle(Literal::new("abc"));
    let walker = machine.get_new_walker(None);

    let advanced = walker.consume_token("abc");
    assert_eq!(advanced.len(), 1);
    let walker = &advanced[0];
    assert!(walker.has_reached_accept_state());
    assert!(!walker.can_accept_more_input());
    assert!(walker.core().remaining_input.is_none());
    assert_eq!(walker.raw_value().as_deref(), Some("abc"));
    assert_eq!(walker.core().consumed_character_count, 3);
}

#[test]
fn test_literal_keeps_unconsumed_tail() {
    let machine = handle(Literal::new("ab"));
    let walker = machine.get_new_walker(None);

    let advanced = walker.consume_token("abX");
    assert_eq!(advanced.len(), 1);
    assert_eq!(advanced[0].core().remaining_input.as_deref(), Some("X"));
    assert!(advanced[0].has_reached_accept_state());
}

#[test]
fn test_literal_rejects_wrong_start() {
    let machine = handle(Literal::new("abc"));
    let walker = machine.get_new_walker(None);
    assert!(walker.consume_token("xyz").is_empty());
}

#[test]
fn test_literal_consumes_across_offers() {
    let machine = handle(Literal::new("abc"));
    let walker = machine.get_new_walker(None);

    let mid = walker.consume_token("ab");
    assert_eq!(mid.len(), 1);
    assert!(!mid[0].has_reached_accept_state());
    assert!(mid[0].is_within_value());
    assert!(mid[0].can_accept_more_input());

    let done = mid[0].consume_token("c");
    assert_eq!(done.len(), 1);
    assert!(done[0].has_reached_accept_state());
    assert_eq!(done[0].raw_value().as_deref(), Some("abc"));
}

#[test]
fn test_literal_case_insensitive_records_actual_text() {
    let machine = handle(Literal::new("true").case_insensitive());
    let walker = machine.get_new_walker(None);

    let advanced = walker.consume_token("TrUe");
    assert_eq!(advanced.len(), 1);
    assert!(advanced[0].has_reached_accept_state());
    assert_eq!(advanced[0].raw_value().as_deref(), Some("TrUe"));
}

#[test]
fn test_literal_case_sensitive_rejects_wrong_case() {
    let machine = handle(Literal::new("true"));
    let walker = machine.get_new_walker(None);
    assert!(walker.consume_token("True").is_empty());
}

#[test]
fn test_literal_continuations_list_the_tail() {
    let machine = handle(Literal::new("abc"));
    let walker = machine.get_new_walker(None);
    assert_eq!(walker.get_valid_continuations(0), vec!["abc".to_string()]);

    let mid = walker.consume_token("a");
    assert_eq!(mid[0].get_valid_continuations(0), vec!["bc".to_string()]);
}

#[test]
fn test_literal_equality_by_text() {
    assert!(Literal::new("x").machine_eq(&Literal::new("x")));
    assert!(!Literal::new("x").machine_eq(&Literal::new("y")));
    assert!(!Literal::new("x").machine_eq(&Literal::new("x").case_insensitive()));
}

// ===== Pattern =====

#[test]
fn test_pattern_matches_literal_text() {
    let machine = handle(Pattern::new("abc").unwrap());
    let walker = machine.get_new_walker(None);

    let advanced = walker.consume_token("abc");
    assert_eq!(advanced.len(), 1);
    assert!(advanced[0].has_reached_accept_state());
    assert_eq!(advanced[0].raw_value().as_deref(), Some("abc"));
}

#[test]
fn test_pattern_digits_accept_and_continue() {
    let machine = handle(Pattern::new("[0-9]+").unwrap());
    let walker = machine.get_new_walker(None);

    let advanced = walker.consume_token("123");
    assert_eq!(advanced.len(), 1);
    let walker = &advanced[0];
    assert!(walker.has_reached_accept_state());
    // A repetition stays open for more digits.
    assert!(walker.can_accept_more_input());

    let more = walker.consume_token("45");
    assert_eq!(more.len(), 1);
    assert_eq!(more[0].raw_value().as_deref(), Some("12345"));
}

#[test]
fn test_pattern_keeps_unconsumed_tail() {
    let machine = handle(Pattern::new("[0-9]+").unwrap());
    let walker = machine.get_new_walker(None);

    let advanced = walker.consume_token("42x");
    assert_eq!(advanced.len(), 1);
    assert_eq!(advanced[0].core().remaining_input.as_deref(), Some("x"));
    assert_eq!(advanced[0].raw_value().as_deref(), Some("42"));
    assert_eq!(advanced[0].core().consumed_character_count, 2);
}

#[test]
fn test_pattern_rejects_wrong_start() {
    let machine = handle(Pattern::new("[0-9]+").unwrap());
    let walker = machine.get_new_walker(None);
    assert!(walker.consume_token("x1").is_empty());
}

#[test]
fn test_pattern_mid_match_is_not_accepting() {
    let machine = handle(Pattern::new("ab").unwrap());
    let walker = machine.get_new_walker(None);

    let mid = walker.consume_token("a");
    assert_eq!(mid.len(), 1);
    assert!(!mid[0].has_reached_accept_state());
    assert!(mid[0].can_accept_more_input());
    assert!(mid[0].is_within_value());
}

#[test]
fn test_pattern_case_insensitive() {
    let machine = handle(Pattern::new_case_insensitive("yes|no").unwrap());
    let walker = machine.get_new_walker(None);

    let advanced = walker.consume_token("YES");
    assert_eq!(advanced.len(), 1);
    assert!(advanced[0].has_reached_accept_state());
}

#[test]
fn test_pattern_continuations_enumerate_live_characters() {
    let machine = handle(Pattern::new("(yes|no)").unwrap());
    let walker = machine.get_new_walker(None);

    let continuations = walker.get_valid_continuations(0);
    assert!(continuations.contains(&"y".to_string()));
    assert!(continuations.contains(&"n".to_string()));
    assert!(!continuations.contains(&"e".to_string()));
}

#[test]
fn test_pattern_optional_accepts_immediately() {
    let machine = handle(Pattern::new("x").unwrap().optional());
    let walker = machine.get_new_walker(None);
    assert!(walker.has_reached_accept_state());
}

#[test]
fn test_pattern_invalid_source_is_rejected() {
    let err = Pattern::new("[unclosed").unwrap_err();
    assert!(matches!(err, TrellisError::InvalidGrammar(_)));
}

#[test]
fn test_pattern_equality_by_source() {
    let a = Pattern::new("[0-9]+").unwrap();
    let b = Pattern::new("[0-9]+").unwrap();
    let c = Pattern::new("[a-z]+").unwrap();
    assert!(a.machine_eq(&b));
    assert!(!a.machine_eq(&c));
}

// ===== Leaf defaults =====

#[test]
fn test_leaves_do_not_accept_any_token() {
    let literal = handle(Literal::new("a"));
    let pattern = handle(Pattern::new("a").unwrap());
    assert!(!literal.get_new_walker(None).accepts_any_token());
    assert!(!pattern.get_new_walker(None).accepts_any_token());
}
