//! Undo/redo key bindings.

use crate::input::KeyEvent;

/// History action bound to a key chord.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryAction {
    Undo,
    Redo,
}

/// A keyboard shortcut definition.
///
/// `command` matches Ctrl on Windows/Linux and Cmd on macOS.
#[derive(Debug, Clone)]
pub struct Shortcut {
    pub key: &'static str,
    pub command: bool,
    pub shift: bool,
    pub action: HistoryAction,
    pub description: &'static str,
}

impl Shortcut {
    pub const fn new(
        key: &'static str,
        command: bool,
        shift: bool,
        action: HistoryAction,
        description: &'static str,
    ) -> Self {
        Self {
            key,
            command,
            shift,
            action,
            description,
        }
    }

    /// Format the shortcut for display (e.g., "Ctrl+Shift+Z").
    pub fn format(&self) -> String {
        let mut parts = Vec::new();
        if self.command {
            parts.push("Ctrl");
        }
        if self.shift {
            parts.push("Shift");
        }
        parts.push(self.key);
        parts.join("+")
    }

    fn matches(&self, event: &KeyEvent) -> bool {
        event.key.eq_ignore_ascii_case(self.key)
            && event.modifiers.command() == self.command
            && event.modifiers.shift == self.shift
            && !event.modifiers.alt
    }
}

/// Key bindings for history navigation.
///
/// There is one keymap per [`Document`](crate::document::Document), not one
/// per session.
#[derive(Debug, Clone)]
pub struct HistoryKeymap {
    shortcuts: Vec<Shortcut>,
}

impl Default for HistoryKeymap {
    fn default() -> Self {
        Self {
            shortcuts: vec![
                Shortcut::new("Z", true, false, HistoryAction::Undo, "Undo"),
                Shortcut::new("Z", true, true, HistoryAction::Redo, "Redo"),
                Shortcut::new("Y", true, false, HistoryAction::Redo, "Redo"),
            ],
        }
    }
}

impl HistoryKeymap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shortcuts(&self) -> &[Shortcut] {
        &self.shortcuts
    }

    /// Map a key event to its history action, if bound.
    pub fn resolve(&self, event: &KeyEvent) -> Option<HistoryAction> {
        self.shortcuts
            .iter()
            .find(|s| s.matches(event))
            .map(|s| s.action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Modifiers;

    fn key(key: &str, ctrl: bool, shift: bool, meta: bool) -> KeyEvent {
        KeyEvent::new(
            key,
            Modifiers {
                ctrl,
                shift,
                meta,
                ..Modifiers::default()
            },
        )
    }

    #[test]
    fn test_resolve_bindings() {
        let keymap = HistoryKeymap::new();
        assert_eq!(keymap.resolve(&key("z", true, false, false)), Some(HistoryAction::Undo));
        assert_eq!(keymap.resolve(&key("Z", false, false, true)), Some(HistoryAction::Undo));
        assert_eq!(keymap.resolve(&key("z", true, true, false)), Some(HistoryAction::Redo));
        assert_eq!(keymap.resolve(&key("y", false, false, true)), Some(HistoryAction::Redo));
    }

    #[test]
    fn test_unbound_chords() {
        let keymap = HistoryKeymap::new();
        assert_eq!(keymap.resolve(&key("z", false, false, false)), None);
        assert_eq!(keymap.resolve(&key("y", true, true, false)), None);
        assert_eq!(keymap.resolve(&key("x", true, false, false)), None);
    }

    #[test]
    fn test_format() {
        let keymap = HistoryKeymap::new();
        let formatted: Vec<String> = keymap.shortcuts().iter().map(Shortcut::format).collect();
        assert_eq!(formatted, vec!["Ctrl+Z", "Ctrl+Shift+Z", "Ctrl+Y"]);
    }
}
