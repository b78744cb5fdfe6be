//! Pure state transition function
//!
//! Given the stored session and one inbound event, produce the next
//! session plus the effects to execute. No I/O happens here: the dialog
//! runtime persists sessions, sends replies, and stores orders afterward.
//! Because the whole next session is computed before anything is
//! committed, a handler can never leave a session half-mutated.

use super::command::{self, Command};
use super::state::{CartLine, ChatState, CustomerRecord, Session};
use super::{Effect, Event};
use crate::catalog::{format_cents, Catalog};
use crate::order::Order;
use chrono::{DateTime, Utc};

/// Result of dispatching one inbound event
#[derive(Debug)]
pub struct TransitionResult {
    pub session: Session,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Dispatch one event against a session.
///
/// Total over the closed state enum: every (state, input) pair has a
/// defined outcome, so malformed user input is always answered with a
/// re-prompt in the same state, never an error.
pub fn transition(session: &Session, catalog: &Catalog, event: Event) -> TransitionResult {
    // Terminal per order: any further input is handled as a brand-new
    // default session, so a customer can start over immediately.
    if session.state.is_terminal() {
        let fresh = Session::new(&session.customer_id);
        return transition(&fresh, catalog, event);
    }

    let Event::Text { body, received_at } = event else {
        // Unsupported media: acknowledge, no state change, no reply.
        return TransitionResult::new(session.clone());
    };
    let text = body.trim();

    // Global commands win over all state-specific parsing.
    if let Some(cmd) = Command::parse(text) {
        return apply_command(session, cmd);
    }

    match session.state {
        ChatState::Init => handle_init(session, text),
        ChatState::BrowsingCatalog => handle_browsing(session, text, catalog),
        ChatState::CollectingItems => handle_collecting(session, text, catalog),
        ChatState::ConfirmingOrder => handle_confirming(session, text),
        ChatState::CapturingCustomerData => handle_capturing(session, text, received_at),
        // Unreachable: rewritten to Init above. Kept explicit so a new
        // state forces a handler here.
        ChatState::Finalized => TransitionResult::new(session.clone()),
    }
}

// ============================================================
// Global commands
// ============================================================

fn apply_command(session: &Session, cmd: Command) -> TransitionResult {
    match cmd {
        // Reset and land directly on the main menu.
        Command::Menu => {
            let mut next = Session::new(&session.customer_id);
            next.state = ChatState::BrowsingCatalog;
            TransitionResult::new(next)
                .with_effect(Effect::SaveSession)
                .with_effect(Effect::reply(welcome_menu()))
        }
        Command::Cancel => TransitionResult::new(Session::new(&session.customer_id))
            .with_effect(Effect::DeleteSession)
            .with_effect(Effect::reply(cancelled_text())),
        Command::Help => {
            TransitionResult::new(session.clone()).with_effect(Effect::reply(command::help_text()))
        }
    }
}

// ============================================================
// State handlers
// ============================================================

// Sticky: unrecognized input never errors, it re-prompts.
fn handle_init(session: &Session, text: &str) -> TransitionResult {
    if is_start_trigger(text) {
        let mut next = session.clone();
        next.state = ChatState::BrowsingCatalog;
        TransitionResult::new(next)
            .with_effect(Effect::SaveSession)
            .with_effect(Effect::reply(welcome_menu()))
    } else {
        TransitionResult::new(session.clone()).with_effect(Effect::reply(init_hint()))
    }
}

fn handle_browsing(session: &Session, text: &str, catalog: &Catalog) -> TransitionResult {
    match text {
        "1" => {
            let mut next = session.clone();
            next.state = ChatState::CollectingItems;
            next.cart.clear();
            TransitionResult::new(next)
                .with_effect(Effect::SaveSession)
                .with_effect(Effect::reply(catalog_listing(catalog)))
        }
        // Presentation-only leaves: emit their text, back to Init.
        "2" => back_to_init(session, promotions_text()),
        "3" => back_to_init(session, advisor_text()),
        _ => back_to_init(session, format!("No entendí 😅.\n\n{}", init_hint())),
    }
}

fn back_to_init(session: &Session, reply: String) -> TransitionResult {
    let mut next = session.clone();
    next.state = ChatState::Init;
    TransitionResult::new(next)
        .with_effect(Effect::SaveSession)
        .with_effect(Effect::reply(reply))
}

fn handle_collecting(session: &Session, text: &str, catalog: &Catalog) -> TransitionResult {
    if text.eq_ignore_ascii_case("listo") {
        if session.cart.is_empty() {
            return TransitionResult::new(session.clone())
                .with_effect(Effect::reply(empty_cart_text()));
        }
        let mut next = session.clone();
        next.total_cents = next.cart_total_cents();
        next.state = ChatState::ConfirmingOrder;
        let summary = order_summary(&next);
        return TransitionResult::new(next)
            .with_effect(Effect::SaveSession)
            .with_effect(Effect::reply(summary));
    }

    // Expected shape: `<code> <quantity>`, exactly two tokens.
    let tokens: Vec<&str> = text.split_whitespace().collect();
    let [code_token, qty_token] = tokens.as_slice() else {
        return TransitionResult::new(session.clone())
            .with_effect(Effect::reply(format_error_text()));
    };
    let quantity = match qty_token.parse::<u32>() {
        Ok(q) if q > 0 => q,
        _ => {
            return TransitionResult::new(session.clone())
                .with_effect(Effect::reply(format_error_text()));
        }
    };

    let code = code_token.to_uppercase();
    let Some(item) = catalog.lookup(&code) else {
        return TransitionResult::new(session.clone())
            .with_effect(Effect::reply(invalid_code_text(&code)));
    };

    // Upsert: re-entering a code replaces its quantity (last write wins),
    // with the price snapshotted now.
    let line = CartLine {
        code: code.clone(),
        name: item.name.clone(),
        unit_price_cents: item.unit_price_cents,
        quantity,
    };
    let ack = added_ack(&line);
    let mut next = session.clone();
    next.cart.insert(code, line);
    TransitionResult::new(next)
        .with_effect(Effect::SaveSession)
        .with_effect(Effect::reply(ack))
}

fn handle_confirming(session: &Session, text: &str) -> TransitionResult {
    match text {
        "1" => {
            let mut next = session.clone();
            next.state = ChatState::CapturingCustomerData;
            TransitionResult::new(next)
                .with_effect(Effect::SaveSession)
                .with_effect(Effect::reply(data_instructions()))
        }
        // Cart is preserved, not cleared.
        "2" => {
            let mut next = session.clone();
            next.state = ChatState::CollectingItems;
            TransitionResult::new(next)
                .with_effect(Effect::SaveSession)
                .with_effect(Effect::reply(modify_instructions()))
        }
        "3" => apply_command(session, Command::Cancel),
        "4" => apply_command(session, Command::Menu),
        _ => TransitionResult::new(session.clone())
            .with_effect(Effect::reply(invalid_option_text())),
    }
}

fn handle_capturing(
    session: &Session,
    text: &str,
    received_at: DateTime<Utc>,
) -> TransitionResult {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    // No partial capture: the record is all-or-nothing.
    let [name, address, phone, payment_method, ..] = lines.as_slice() else {
        return TransitionResult::new(session.clone())
            .with_effect(Effect::reply(missing_data_text()));
    };

    let customer = CustomerRecord {
        name: (*name).to_string(),
        address: (*address).to_string(),
        phone: (*phone).to_string(),
        payment_method: (*payment_method).to_string(),
        captured_at: received_at,
    };
    let order = Order::finalize(session, &customer);

    let mut next = session.clone();
    next.customer = Some(customer);
    next.order_id = Some(order.order_id.clone());
    next.state = ChatState::Finalized;
    let receipt = order.receipt();
    TransitionResult::new(next)
        .with_effect(Effect::StoreOrder { order })
        .with_effect(Effect::SaveSession)
        .with_effect(Effect::reply(receipt))
}

// ============================================================
// Message texts
// ============================================================

const START_TRIGGERS: [&str; 4] = ["hola", "buenas", "menú", "menu"];

/// Case-insensitive substring match over the fixed keyword set
fn is_start_trigger(text: &str) -> bool {
    let lowered = text.to_lowercase();
    START_TRIGGERS.iter().any(|kw| lowered.contains(kw))
}

fn welcome_menu() -> String {
    [
        "¡Hola! 👋 Bienvenido a la tienda.",
        "",
        "1. Ver catálogo y hacer un pedido",
        "2. Promociones",
        "3. Hablar con un asesor",
        "",
        "Escribe el número de la opción. Envía *ayuda* para ver los comandos.",
    ]
    .join("\n")
}

fn init_hint() -> String {
    "Escribe *hola* para ver el menú.".to_string()
}

fn catalog_listing(catalog: &Catalog) -> String {
    let mut out = String::from("📦 Catálogo:\n");
    for item in catalog.listing() {
        out.push_str(&format!(
            "{} - {} - {}\n",
            item.code,
            item.name,
            format_cents(item.unit_price_cents)
        ));
    }
    out.push_str("\nEnvía *código cantidad* (ej: A12 2). Escribe *listo* cuando termines.");
    out
}

fn promotions_text() -> String {
    "🎉 Por ahora no hay promociones activas.\n\nEscribe *hola* para volver al menú.".to_string()
}

fn advisor_text() -> String {
    "Contacto de ventas 📞 3000000000.\n\nEscribe *hola* para volver al menú.".to_string()
}

fn format_error_text() -> String {
    "Formato no válido. Envía *código cantidad* (ej: A12 2), o *listo* para confirmar."
        .to_string()
}

fn invalid_code_text(code: &str) -> String {
    format!("El código {code} no está en el catálogo. Revisa el código e intenta de nuevo.")
}

fn added_ack(line: &CartLine) -> String {
    format!(
        "Agregado: {} x {} ({} c/u). Envía otro producto o *listo* para continuar.",
        line.quantity,
        line.name,
        format_cents(line.unit_price_cents)
    )
}

fn empty_cart_text() -> String {
    "Tu carrito está vacío. Agrega al menos un producto antes de enviar *listo*.".to_string()
}

fn order_summary(session: &Session) -> String {
    let mut out = String::from("🧾 Resumen de tu pedido:\n\n");
    for line in session.sorted_lines() {
        out.push_str(&format!(
            "{} x {} - {}\n",
            line.quantity,
            line.name,
            format_cents(line.subtotal_cents())
        ));
    }
    out.push_str(&format!(
        "\nTotal: {}\n\n1. Confirmar pedido\n2. Modificar pedido\n3. Cancelar\n4. Volver al menú",
        format_cents(session.total_cents)
    ));
    out
}

fn invalid_option_text() -> String {
    "Opción no válida. Responde 1, 2, 3 o 4.".to_string()
}

fn data_instructions() -> String {
    [
        "Para finalizar, envía tus datos en 4 líneas:",
        "Nombre",
        "Dirección de entrega",
        "Teléfono",
        "Método de pago",
    ]
    .join("\n")
}

fn modify_instructions() -> String {
    "Puedes seguir agregando productos. Envía *código cantidad* o *listo* para confirmar."
        .to_string()
}

fn missing_data_text() -> String {
    "Faltan datos. Envía 4 líneas: nombre, dirección, teléfono y método de pago.".to_string()
}

fn cancelled_text() -> String {
    "Tu pedido fue cancelado. Escribe *hola* si quieres empezar de nuevo.".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn catalog() -> Catalog {
        Catalog::with_defaults()
    }

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 20, 12, 0, 0).unwrap()
    }

    fn msg(text: &str) -> Event {
        Event::text(text, at())
    }

    fn replies(result: &TransitionResult) -> Vec<&str> {
        result
            .effects
            .iter()
            .filter_map(|e| match e {
                Effect::Reply { text } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    fn advance(session: &Session, text: &str) -> TransitionResult {
        transition(session, &catalog(), msg(text))
    }

    #[test]
    fn init_start_trigger_opens_menu() {
        let session = Session::new("c1");
        let result = advance(&session, "Hola, buen día");

        assert_eq!(result.session.state, ChatState::BrowsingCatalog);
        assert!(replies(&result)[0].contains("Bienvenido"));
    }

    #[test]
    fn init_is_sticky_on_unrecognized_input() {
        let session = Session::new("c1");
        let result = advance(&session, "quiero algo");

        assert_eq!(result.session.state, ChatState::Init);
        assert!(!result.effects.contains(&Effect::SaveSession));
        assert!(replies(&result)[0].contains("hola"));
    }

    #[test]
    fn browsing_option_one_lists_catalog_and_clears_cart() {
        let mut session = Session::new("c1");
        session.state = ChatState::BrowsingCatalog;
        session.cart.insert(
            "A12".to_string(),
            CartLine {
                code: "A12".to_string(),
                name: "viejo".to_string(),
                unit_price_cents: 1,
                quantity: 1,
            },
        );

        let result = advance(&session, "1");
        assert_eq!(result.session.state, ChatState::CollectingItems);
        assert!(result.session.cart.is_empty());
        assert!(replies(&result)[0].contains("A12"));
    }

    #[test]
    fn browsing_unrecognized_returns_to_init() {
        let mut session = Session::new("c1");
        session.state = ChatState::BrowsingCatalog;

        let result = advance(&session, "9");
        assert_eq!(result.session.state, ChatState::Init);
    }

    #[test]
    fn collecting_adds_line_with_snapshotted_price() {
        let mut session = Session::new("c1");
        session.state = ChatState::CollectingItems;

        let result = advance(&session, "a12 2");
        assert_eq!(result.session.state, ChatState::CollectingItems);
        let line = &result.session.cart["A12"];
        assert_eq!(line.quantity, 2);
        assert_eq!(line.unit_price_cents, 1500);
    }

    #[test]
    fn collecting_upsert_replaces_quantity() {
        let mut session = Session::new("c1");
        session.state = ChatState::CollectingItems;

        let first = advance(&session, "A12 2");
        let second = advance(&first.session, "A12 5");

        assert_eq!(second.session.cart.len(), 1);
        assert_eq!(second.session.cart["A12"].quantity, 5);
    }

    #[test]
    fn collecting_rejects_bad_token_counts() {
        let mut session = Session::new("c1");
        session.state = ChatState::CollectingItems;

        for input in ["A12", "A12 2 3", ""] {
            let result = advance(&session, input);
            assert_eq!(result.session.cart.len(), 0, "input {input:?}");
            assert_eq!(result.session.state, ChatState::CollectingItems);
        }
    }

    #[test]
    fn collecting_rejects_zero_and_negative_quantities() {
        let mut session = Session::new("c1");
        session.state = ChatState::CollectingItems;

        for input in ["A12 0", "A12 -3", "A12 dos"] {
            let result = advance(&session, input);
            assert!(result.session.cart.is_empty(), "input {input:?}");
            assert!(replies(&result)[0].contains("Formato no válido"));
        }
    }

    #[test]
    fn collecting_rejects_unknown_code() {
        let mut session = Session::new("c1");
        session.state = ChatState::CollectingItems;

        let result = advance(&session, "Z99 1");
        assert!(result.session.cart.is_empty());
        assert_eq!(result.session.state, ChatState::CollectingItems);
        assert!(replies(&result)[0].contains("Z99"));
    }

    #[test]
    fn listo_with_empty_cart_stays_collecting() {
        let mut session = Session::new("c1");
        session.state = ChatState::CollectingItems;

        let result = advance(&session, "listo");
        assert_eq!(result.session.state, ChatState::CollectingItems);
        assert!(replies(&result)[0].contains("vacío"));
    }

    #[test]
    fn listo_snapshots_total_and_confirms() {
        let mut session = Session::new("c1");
        session.state = ChatState::CollectingItems;
        let session = advance(&session, "A12 2").session;
        let session = advance(&session, "B05 1").session;

        let result = advance(&session, "LISTO");
        assert_eq!(result.session.state, ChatState::ConfirmingOrder);
        assert_eq!(result.session.total_cents, 4800);
        assert!(replies(&result)[0].contains("$48.00"));
    }

    #[test]
    fn listo_in_confirming_is_an_invalid_option() {
        let mut session = Session::new("c1");
        session.state = ChatState::ConfirmingOrder;

        let result = advance(&session, "listo");
        assert_eq!(result.session.state, ChatState::ConfirmingOrder);
        assert!(replies(&result)[0].contains("Opción no válida"));
    }

    #[test]
    fn confirming_modify_preserves_cart() {
        let mut session = Session::new("c1");
        session.state = ChatState::CollectingItems;
        let session = advance(&session, "A12 2").session;
        let session = advance(&session, "listo").session;

        let result = advance(&session, "2");
        assert_eq!(result.session.state, ChatState::CollectingItems);
        assert_eq!(result.session.cart.len(), 1);
    }

    #[test]
    fn confirming_cancel_deletes_session() {
        let mut session = Session::new("c1");
        session.state = ChatState::ConfirmingOrder;

        let result = advance(&session, "3");
        assert_eq!(result.session.state, ChatState::Init);
        assert!(result.effects.contains(&Effect::DeleteSession));
    }

    #[test]
    fn global_command_wins_inside_collecting() {
        let mut session = Session::new("c1");
        session.state = ChatState::CollectingItems;
        let session = advance(&session, "A12 2").session;

        let result = advance(&session, "menu");
        assert_eq!(result.session.state, ChatState::BrowsingCatalog);
        assert!(result.session.cart.is_empty());
        assert!(replies(&result)[0].contains("Bienvenido"));
    }

    #[test]
    fn cancel_command_works_from_any_collecting_state() {
        let mut session = Session::new("c1");
        session.state = ChatState::CollectingItems;
        let session = advance(&session, "A12 2").session;

        let result = advance(&session, "CANCELAR");
        assert!(result.effects.contains(&Effect::DeleteSession));
        assert_eq!(result.session, Session::new("c1"));
    }

    #[test]
    fn help_leaves_session_untouched() {
        let mut session = Session::new("c1");
        session.state = ChatState::ConfirmingOrder;
        session.total_cents = 999;

        let result = advance(&session, "ayuda");
        assert_eq!(result.session, session);
        assert!(!result.effects.contains(&Effect::SaveSession));
        assert!(replies(&result)[0].contains("Comandos"));
    }

    #[test]
    fn capturing_requires_four_lines() {
        let mut session = Session::new("c1");
        session.state = ChatState::CapturingCustomerData;

        let result = advance(&session, "Ana\nCalle 10");
        assert_eq!(result.session.state, ChatState::CapturingCustomerData);
        assert!(result.session.customer.is_none());
        assert!(replies(&result)[0].contains("Faltan datos"));
    }

    #[test]
    fn capturing_ignores_lines_beyond_the_fourth() {
        let mut session = Session::new("c1");
        session.state = ChatState::CollectingItems;
        let session = advance(&session, "A12 1").session;
        let session = advance(&session, "listo").session;
        let session = advance(&session, "1").session;

        let result = advance(&session, "Ana\nCalle 10\n300111\nefectivo\nextra\nmás extra");
        assert_eq!(result.session.state, ChatState::Finalized);
        let customer = result.session.customer.as_ref().unwrap();
        assert_eq!(customer.payment_method, "efectivo");
    }

    #[test]
    fn unsupported_media_is_a_no_op() {
        let mut session = Session::new("c1");
        session.state = ChatState::CollectingItems;

        let result = transition(&session, &catalog(), Event::unsupported("image"));
        assert_eq!(result.session, session);
        assert!(result.effects.is_empty());
    }

    #[test]
    fn finalized_redispatches_as_fresh_init() {
        let mut session = Session::new("c1");
        session.state = ChatState::Finalized;
        session.order_id = Some("PED-OLD".to_string());

        let result = advance(&session, "hola");
        assert_eq!(result.session.state, ChatState::BrowsingCatalog);
        assert!(result.session.order_id.is_none());
        assert!(result.session.cart.is_empty());
    }

    #[test]
    fn full_round_trip_produces_receipt_and_order() {
        let session = Session::new("573001112233");
        let session = advance(&session, "hola").session;
        let session = advance(&session, "1").session;
        let session = advance(&session, "a12 2").session;
        let session = advance(&session, "B05 1").session;
        let session = advance(&session, "listo").session;
        let session = advance(&session, "1").session;

        let result = advance(&session, "Ana Pérez\nCalle 10 #4-32\n3001112233\nefectivo");
        assert_eq!(result.session.state, ChatState::Finalized);

        let order_id = result.session.order_id.clone().expect("order id assigned");
        assert!(order_id.starts_with("PED-"));

        let stored = result.effects.iter().find_map(|e| match e {
            Effect::StoreOrder { order } => Some(order),
            _ => None,
        });
        let order = stored.expect("order handed to storage");
        assert_eq!(order.order_id, order_id);
        assert_eq!(order.total_cents, 4800);

        let receipt = replies(&result).pop().unwrap().to_string();
        assert!(receipt.contains("$48.00"));
        assert!(receipt.contains(&order_id));
    }

    #[test]
    fn repeated_capture_of_same_content_yields_same_order_id() {
        let mut base = Session::new("c1");
        base.state = ChatState::CollectingItems;
        let base = advance(&base, "A12 2").session;
        let base = advance(&base, "listo").session;
        let base = advance(&base, "1").session;

        let first = advance(&base, "Ana\nCalle 10\n300111\nefectivo");
        let second = advance(&base, "Ana\nCalle 10\n300111\nefectivo");
        assert_eq!(first.session.order_id, second.session.order_id);
    }
}
