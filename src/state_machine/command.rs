//! Global command interception
//!
//! A fixed table of reserved keywords honored in every state, checked
//! before state dispatch. Matching is exact over the whole trimmed,
//! lower-cased message, so a single-token command never collides with the
//! two-token item-line grammar.

/// Reserved global commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Reset to the main menu
    Menu,
    /// Delete the session entirely
    Cancel,
    /// Show the command table; session untouched
    Help,
}

impl Command {
    /// Exact, case-insensitive match against the whole message
    pub fn parse(text: &str) -> Option<Command> {
        match text.trim().to_lowercase().as_str() {
            "menu" | "menú" => Some(Command::Menu),
            "cancelar" | "cancel" => Some(Command::Cancel),
            "ayuda" | "help" => Some(Command::Help),
            _ => None,
        }
    }
}

/// Help text listing the command table
pub fn help_text() -> String {
    [
        "Comandos disponibles:",
        "*menu* - volver al menú principal",
        "*cancelar* - cancelar el pedido en curso",
        "*ayuda* - ver esta ayuda",
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_commands_case_insensitively() {
        assert_eq!(Command::parse("MENU"), Some(Command::Menu));
        assert_eq!(Command::parse("menú"), Some(Command::Menu));
        assert_eq!(Command::parse("  Cancelar "), Some(Command::Cancel));
        assert_eq!(Command::parse("AyUdA"), Some(Command::Help));
    }

    #[test]
    fn requires_exact_whole_message_match() {
        assert_eq!(Command::parse("menu por favor"), None);
        assert_eq!(Command::parse("a12 menu"), None);
        assert_eq!(Command::parse(""), None);
    }
}
