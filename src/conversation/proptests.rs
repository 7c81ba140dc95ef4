//! Property-based tests for the conversation log

use super::*;
use crate::message::ImageRef;
use proptest::prelude::*;

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_sender() -> impl Strategy<Value = Sender> {
    prop_oneof![Just(Sender::User), Just(Sender::Model), Just(Sender::Error)]
}

fn arb_message() -> impl Strategy<Value = Message> {
    (
        "[a-zA-Z0-9 ]{0,30}",
        arb_sender(),
        any::<bool>(),
        prop::collection::vec("[a-z]{1,8}\\.png", 0..3),
    )
        .prop_map(|(text, sender, pending, refs)| {
            Message::new(
                text,
                sender,
                pending,
                refs.into_iter().map(ImageRef::new).collect(),
            )
        })
}

#[derive(Debug, Clone)]
enum Op {
    SendStart(String),
    Complete { ok: bool, text: String },
    Resolve,
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        "[a-z]{1,10}".prop_map(Op::SendStart),
        (any::<bool>(), "[a-z]{0,10}").prop_map(|(ok, text)| Op::Complete { ok, text }),
        Just(Op::Resolve),
    ]
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_append_preserves_order(messages in prop::collection::vec(arb_message(), 0..40)) {
        let mut state = ConversationState::new();
        for m in &messages {
            state.append(m.clone());
        }
        let snap = state.snapshot();
        prop_assert_eq!(snap.len(), messages.len());
        for (a, b) in snap.iter().zip(&messages) {
            prop_assert_eq!(a.id(), b.id());
        }
    }

    #[test]
    fn prop_resolve_pending_is_idempotent(messages in prop::collection::vec(arb_message(), 0..20)) {
        let mut once = ConversationState::from_messages(messages);
        once.resolve_pending();
        let mut twice = once.clone();
        twice.resolve_pending();
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn prop_resolve_never_changes_length(messages in prop::collection::vec(arb_message(), 0..20)) {
        let mut state = ConversationState::from_messages(messages);
        let before = state.len();
        state.resolve_pending();
        prop_assert_eq!(state.len(), before);
        if let Some(last) = state.last() {
            prop_assert!(!last.is_pending);
        }
    }

    /// Sequential turns (each send completes before the next starts) never
    /// leave more than one pending message, and none once the turn resolves.
    #[test]
    fn prop_sequential_turns_keep_at_most_one_pending(ops in prop::collection::vec(arb_op(), 0..50)) {
        let mut state = ConversationState::new();
        let mut in_flight = false;
        for op in ops {
            match op {
                Op::SendStart(text) if !in_flight => {
                    state.append(Message::pending_user(text, vec![]));
                    in_flight = true;
                }
                Op::Complete { ok, text } if in_flight => {
                    state.resolve_pending();
                    state.append(if ok { Message::model(text) } else { Message::error(text) });
                    in_flight = false;
                    prop_assert_eq!(state.pending_count(), 0);
                }
                Op::Resolve => {
                    state.resolve_pending();
                    in_flight = false;
                }
                _ => {}
            }
            prop_assert!(state.pending_count() <= 1);
        }
    }
}
