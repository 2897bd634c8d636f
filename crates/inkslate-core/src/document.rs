//! A set of drawing sessions sharing one history keymap.

use crate::input::KeyEvent;
use crate::session::{Session, SessionResult};
use crate::shortcuts::{HistoryAction, HistoryKeymap};
use crate::surface::RasterSurface;
use std::collections::HashMap;
use uuid::Uuid;

/// Owns the sessions of one page or window.
///
/// Key events are routed once, to the focused session, no matter how many
/// sessions exist.
pub struct Document<S: RasterSurface> {
    sessions: HashMap<Uuid, Session<S>>,
    order: Vec<Uuid>,
    focused: Option<Uuid>,
    keymap: HistoryKeymap,
}

impl<S: RasterSurface> Default for Document<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: RasterSurface> Document<S> {
    pub fn new() -> Self {
        Self::with_keymap(HistoryKeymap::default())
    }

    pub fn with_keymap(keymap: HistoryKeymap) -> Self {
        Self {
            sessions: HashMap::new(),
            order: Vec::new(),
            focused: None,
            keymap,
        }
    }

    pub fn keymap(&self) -> &HistoryKeymap {
        &self.keymap
    }

    /// Add a session. The first session added takes focus.
    pub fn add_session(&mut self, session: Session<S>) -> Uuid {
        let id = session.id();
        self.sessions.insert(id, session);
        self.order.push(id);
        if self.focused.is_none() {
            self.focused = Some(id);
        }
        id
    }

    pub fn remove_session(&mut self, id: Uuid) -> Option<Session<S>> {
        let session = self.sessions.remove(&id)?;
        self.order.retain(|other| *other != id);
        if self.focused == Some(id) {
            self.focused = self.order.first().copied();
        }
        Some(session)
    }

    pub fn session(&self, id: Uuid) -> Option<&Session<S>> {
        self.sessions.get(&id)
    }

    pub fn session_mut(&mut self, id: Uuid) -> Option<&mut Session<S>> {
        self.sessions.get_mut(&id)
    }

    /// Sessions in insertion order.
    pub fn sessions(&self) -> impl Iterator<Item = &Session<S>> {
        self.order.iter().filter_map(|id| self.sessions.get(id))
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn focused(&self) -> Option<Uuid> {
        self.focused
    }

    /// Focus a session. Returns `false` for an unknown id.
    pub fn focus(&mut self, id: Uuid) -> bool {
        if !self.sessions.contains_key(&id) {
            return false;
        }
        self.focused = Some(id);
        true
    }

    /// Route a key event to the focused session.
    ///
    /// Returns the action taken and whether it changed the history cursor,
    /// or `None` when the key is unbound or nothing is focused.
    pub fn handle_key(&mut self, event: &KeyEvent) -> Option<SessionResult<(HistoryAction, bool)>> {
        let action = self.keymap.resolve(event)?;
        let session = self.focused.and_then(|id| self.sessions.get_mut(&id))?;
        log::trace!("Key {:?} -> {:?} on session {}", event.key, action, session.id());
        let result = match action {
            HistoryAction::Undo => session.undo(),
            HistoryAction::Redo => session.redo(),
        };
        Some(result.map(|moved| (action, moved)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{Modifiers, PointerEvent};
    use crate::options::Options;
    use crate::session::SessionError;
    use crate::surface::RecordingSurface;

    fn session() -> Session<RecordingSurface> {
        Session::new(RecordingSurface::new(20, 20), Options::default()).unwrap()
    }

    fn ctrl(key: &str) -> KeyEvent {
        KeyEvent::new(
            key,
            Modifiers {
                ctrl: true,
                ..Modifiers::default()
            },
        )
    }

    #[test]
    fn test_undo_dispatched_once_to_focused() {
        let mut doc = Document::new();
        let a = doc.add_session(session());
        let b = doc.add_session(session());
        for id in [a, b] {
            doc.session_mut(id).unwrap().save();
        }
        assert_eq!(doc.focused(), Some(a));

        let result = doc.handle_key(&ctrl("z")).unwrap().unwrap();
        assert_eq!(result, (HistoryAction::Undo, true));
        assert_eq!(doc.session(a).unwrap().memento().unwrap().cursor(), Some(0));
        assert_eq!(doc.session(b).unwrap().memento().unwrap().cursor(), Some(1));

        assert!(doc.focus(b));
        doc.handle_key(&ctrl("z"));
        assert_eq!(doc.session(a).unwrap().memento().unwrap().cursor(), Some(0));
        assert_eq!(doc.session(b).unwrap().memento().unwrap().cursor(), Some(0));
    }

    #[test]
    fn test_unbound_key_and_no_focus() {
        let mut doc: Document<RecordingSurface> = Document::new();
        assert!(doc.handle_key(&ctrl("z")).is_none());
        doc.add_session(session());
        assert!(doc.handle_key(&ctrl("q")).is_none());
    }

    #[test]
    fn test_mid_stroke_rejection_surfaces() {
        let mut doc = Document::new();
        let id = doc.add_session(session());
        doc.session_mut(id)
            .unwrap()
            .handle_pointer_event(&PointerEvent::down(0, 1.0, 1.0, 0));
        assert!(matches!(
            doc.handle_key(&ctrl("y")),
            Some(Err(SessionError::StrokeInProgress))
        ));
    }

    #[test]
    fn test_remove_moves_focus() {
        let mut doc = Document::new();
        let a = doc.add_session(session());
        let b = doc.add_session(session());
        assert!(doc.remove_session(a).is_some());
        assert_eq!(doc.focused(), Some(b));
        assert_eq!(doc.len(), 1);
        assert!(!doc.focus(a));
    }
}
