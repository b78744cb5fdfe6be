//! Property-based tests for the state machine
//!
//! These verify the session invariants hold across all states and inputs,
//! not just the scripted flows in the unit tests.

use super::state::*;
use super::transition::transition;
use super::{Effect, Event};
use crate::catalog::Catalog;
use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use std::collections::HashMap;

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_state() -> impl Strategy<Value = ChatState> {
    prop_oneof![
        Just(ChatState::Init),
        Just(ChatState::BrowsingCatalog),
        Just(ChatState::CollectingItems),
        Just(ChatState::ConfirmingOrder),
        Just(ChatState::CapturingCustomerData),
        Just(ChatState::Finalized),
    ]
}

fn arb_cart_line() -> impl Strategy<Value = CartLine> {
    ("[A-E][0-9]{2}", 1u32..50, 100u64..5000).prop_map(|(code, quantity, unit_price_cents)| {
        CartLine {
            name: format!("Producto {code}"),
            code,
            unit_price_cents,
            quantity,
        }
    })
}

fn arb_cart() -> impl Strategy<Value = HashMap<String, CartLine>> {
    proptest::collection::vec(arb_cart_line(), 0..4).prop_map(|lines| {
        lines
            .into_iter()
            .map(|line| (line.code.clone(), line))
            .collect()
    })
}

fn arb_session() -> impl Strategy<Value = Session> {
    (arb_state(), arb_cart(), 0u64..100_000).prop_map(|(state, cart, total_cents)| Session {
        customer_id: "573001112233".to_string(),
        state,
        cart,
        total_cents,
        customer: None,
        order_id: None,
    })
}

fn arb_text() -> impl Strategy<Value = String> {
    prop_oneof![
        // Free-form noise
        "[a-zA-Z0-9 ]{0,20}",
        // Shapes the grammar cares about
        Just("hola".to_string()),
        Just("1".to_string()),
        Just("listo".to_string()),
        Just("A12 2".to_string()),
        Just("Z99 1".to_string()),
        Just("A12 0".to_string()),
        Just("menu".to_string()),
        Just("cancelar".to_string()),
        Just("ayuda".to_string()),
        Just("Ana\nCalle 10\n300111\nefectivo".to_string()),
    ]
}

fn dispatch(session: &Session, text: &str) -> super::TransitionResult {
    let at = Utc.with_ymd_and_hms(2025, 5, 20, 12, 0, 0).unwrap();
    transition(session, &Catalog::with_defaults(), Event::text(text, at))
}

// ============================================================================
// Invariants
// ============================================================================

proptest! {
    // Exhaustiveness makes an undefined state unrepresentable; this pins
    // the observable half: every dispatch lands in a member of the enum
    // and every cart line keeps a positive quantity.
    #[test]
    fn any_dispatch_preserves_cart_invariants(session in arb_session(), text in arb_text()) {
        let result = dispatch(&session, &text);

        prop_assert!(matches!(
            result.session.state,
            ChatState::Init
                | ChatState::BrowsingCatalog
                | ChatState::CollectingItems
                | ChatState::ConfirmingOrder
                | ChatState::CapturingCustomerData
                | ChatState::Finalized
        ));
        for (key, line) in &result.session.cart {
            prop_assert!(line.quantity > 0);
            prop_assert_eq!(key, &line.code);
            prop_assert_eq!(key.to_uppercase(), key.clone());
        }
    }

    #[test]
    fn dispatch_is_deterministic(session in arb_session(), text in arb_text()) {
        let a = dispatch(&session, &text);
        let b = dispatch(&session, &text);
        prop_assert_eq!(a.session, b.session);
        prop_assert_eq!(a.effects, b.effects);
    }

    #[test]
    fn replies_never_target_another_customer(session in arb_session(), text in arb_text()) {
        // The transition only names the triggering customer: its output
        // session always belongs to the same id.
        let result = dispatch(&session, &text);
        prop_assert_eq!(result.session.customer_id, session.customer_id);
    }

    #[test]
    fn cancel_command_always_deletes(session in arb_session()) {
        let result = dispatch(&session, "cancelar");
        prop_assert!(result.effects.contains(&Effect::DeleteSession));
        prop_assert_eq!(result.session.state, ChatState::Init);
        prop_assert!(result.session.cart.is_empty());
    }

    #[test]
    fn menu_command_always_resets_to_menu(session in arb_session()) {
        let result = dispatch(&session, "menu");
        prop_assert_eq!(result.session.state, ChatState::BrowsingCatalog);
        prop_assert!(result.session.cart.is_empty());
    }

    #[test]
    fn help_command_never_mutates(session in arb_session()) {
        let result = dispatch(&session, "ayuda");
        if session.state.is_terminal() {
            // Terminal sessions re-dispatch as fresh, so only the reset
            // fields may differ.
            prop_assert_eq!(result.session.state, ChatState::Init);
        } else {
            prop_assert_eq!(result.session, session);
        }
        prop_assert!(!result.effects.contains(&Effect::SaveSession));
        prop_assert!(!result.effects.contains(&Effect::DeleteSession));
    }

    #[test]
    fn unsupported_media_never_produces_effects(session in arb_session()) {
        let result = transition(
            &session,
            &Catalog::with_defaults(),
            Event::unsupported("audio"),
        );
        prop_assert!(result.effects.is_empty());
    }

    #[test]
    fn order_is_stored_only_from_capturing(session in arb_session(), text in arb_text()) {
        let result = dispatch(&session, &text);
        let stored = result
            .effects
            .iter()
            .any(|e| matches!(e, Effect::StoreOrder { .. }));
        if stored {
            prop_assert_eq!(session.state, ChatState::CapturingCustomerData);
            prop_assert_eq!(result.session.state, ChatState::Finalized);
        }
    }
}
