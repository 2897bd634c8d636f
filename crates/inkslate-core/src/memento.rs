//! Snapshot-based undo/redo history.

use crate::capture::GestureId;
use crate::command::CommandLog;
use crate::point::Strokes;
use serde::{Deserialize, Serialize};

/// One undo/redo checkpoint.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Snapshot {
    /// PNG data URL of the surface. Empty when encoding failed.
    pub image: String,
    pub strokes: Strokes,
    pub log: CommandLog,
}

#[derive(Debug, Clone)]
struct Entry {
    snapshot: Snapshot,
    /// Gesture that pushed this entry, if it came from pointer input.
    gesture: Option<GestureId>,
}

/// How a save landed on the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveKind {
    Pushed,
    Coalesced,
}

/// Linear history of snapshots with a cursor.
///
/// Pushing after an undo discards everything past the cursor.
#[derive(Debug, Clone, Default)]
pub struct Memento {
    entries: Vec<Entry>,
    cursor: Option<usize>,
    max_depth: usize,
}

impl Memento {
    /// `max_depth == 0` keeps every entry.
    pub fn new(max_depth: usize) -> Self {
        Self {
            entries: Vec::new(),
            cursor: None,
            max_depth,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn can_undo(&self) -> bool {
        self.cursor.is_some_and(|c| c > 0)
    }

    pub fn can_redo(&self) -> bool {
        self.cursor.is_some_and(|c| c + 1 < self.entries.len())
    }

    /// Whether a save tagged with `gesture` would refresh the entry at the cursor.
    pub fn coalesces(&self, gesture: Option<GestureId>) -> bool {
        let (Some(gesture), Some(cursor)) = (gesture, self.cursor) else {
            return false;
        };
        self.entries[cursor].gesture == Some(gesture)
    }

    /// Record `snapshot`.
    ///
    /// A save from a gesture that already pushed the entry at the cursor
    /// refreshes that entry in place, so pointers lifting together produce one
    /// history step.
    pub fn save(&mut self, snapshot: Snapshot, gesture: Option<GestureId>) -> SaveKind {
        if self.coalesces(gesture) {
            if let Some(cursor) = self.cursor {
                self.entries[cursor].snapshot = snapshot;
                log::debug!("Coalesced save into history entry {}", cursor);
                return SaveKind::Coalesced;
            }
        }

        let keep = self.cursor.map_or(0, |c| c + 1);
        self.entries.truncate(keep);
        self.entries.push(Entry { snapshot, gesture });

        if self.max_depth > 0 && self.entries.len() > self.max_depth {
            let excess = self.entries.len() - self.max_depth;
            self.entries.drain(..excess);
        }
        self.cursor = Some(self.entries.len() - 1);
        log::debug!("Pushed history entry {}", self.entries.len() - 1);
        SaveKind::Pushed
    }

    /// Step back. Returns the snapshot to restore, or `None` at the start.
    pub fn undo(&mut self) -> Option<&Snapshot> {
        let cursor = self.cursor.filter(|&c| c > 0)? - 1;
        self.cursor = Some(cursor);
        Some(&self.entries[cursor].snapshot)
    }

    /// Step forward. Returns the snapshot to restore, or `None` at the end.
    pub fn redo(&mut self) -> Option<&Snapshot> {
        let cursor = self.cursor? + 1;
        if cursor >= self.entries.len() {
            return None;
        }
        self.cursor = Some(cursor);
        Some(&self.entries[cursor].snapshot)
    }

    /// Drop every entry. The caller seeds a fresh baseline with [`save`](Self::save).
    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = None;
    }

    /// The snapshot at the cursor.
    pub fn current(&self) -> Option<&Snapshot> {
        self.cursor.map(|c| &self.entries[c].snapshot)
    }

    /// Independent copy of the snapshot at the cursor.
    pub fn state(&self) -> Option<Snapshot> {
        self.current().cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::point::{Point, PointerId};

    fn snap(tag: &str, strokes: usize) -> Snapshot {
        Snapshot {
            image: tag.to_string(),
            strokes: vec![vec![Point::new(0.0, 0.0, 0, true, PointerId(0))]; strokes],
            log: CommandLog::new(),
        }
    }

    #[test]
    fn test_save_and_undo_cursor() {
        let mut m = Memento::new(0);
        m.save(snap("a", 0), None);
        assert_eq!((m.len(), m.cursor()), (1, Some(0)));
        m.save(snap("b", 1), None);
        assert_eq!((m.len(), m.cursor()), (2, Some(1)));

        assert_eq!(m.undo().map(|s| s.image.clone()), Some("a".into()));
        assert_eq!(m.cursor(), Some(0));
        assert!(m.undo().is_none());
        assert_eq!(m.cursor(), Some(0));
    }

    #[test]
    fn test_redo_and_truncation() {
        let mut m = Memento::new(0);
        m.save(snap("a", 0), None);
        m.save(snap("b", 1), None);
        m.save(snap("c", 2), None);
        m.undo();
        m.undo();
        assert_eq!(m.redo().map(|s| s.image.clone()), Some("b".into()));
        assert!(m.can_redo());

        m.save(snap("d", 3), None);
        assert_eq!(m.len(), 3);
        assert!(!m.can_redo());
        assert!(m.redo().is_none());
        assert_eq!(m.state().unwrap().image, "d");
    }

    #[test]
    fn test_gesture_saves_coalesce() {
        let mut m = Memento::new(0);
        m.save(snap("base", 0), None);
        let g = Some(GestureId(4));
        assert_eq!(m.save(snap("one", 1), g), SaveKind::Pushed);
        assert_eq!(m.save(snap("two", 2), g), SaveKind::Coalesced);
        assert_eq!(m.len(), 2);
        assert_eq!(m.state().unwrap().strokes.len(), 2);

        assert_eq!(m.save(snap("next", 3), Some(GestureId(5))), SaveKind::Pushed);
        assert_eq!(m.len(), 3);
    }

    #[test]
    fn test_coalescing_requires_entry_at_cursor() {
        let mut m = Memento::new(0);
        m.save(snap("base", 0), None);
        let g = Some(GestureId(1));
        m.save(snap("one", 1), g);
        m.undo();
        assert_eq!(m.save(snap("two", 2), g), SaveKind::Pushed);
        assert_eq!(m.len(), 2);
    }

    #[test]
    fn test_max_depth_trims_oldest() {
        let mut m = Memento::new(2);
        m.save(snap("a", 0), None);
        m.save(snap("b", 0), None);
        m.save(snap("c", 0), None);
        assert_eq!(m.len(), 2);
        assert_eq!(m.cursor(), Some(1));
        assert_eq!(m.undo().map(|s| s.image.clone()), Some("b".into()));
    }

    #[test]
    fn test_state_is_a_copy() {
        let mut m = Memento::new(0);
        m.save(snap("a", 1), None);
        let mut copy = m.state().unwrap();
        copy.strokes.clear();
        copy.image.push('!');
        assert_eq!(m.current().unwrap().strokes.len(), 1);
        assert_eq!(m.current().unwrap().image, "a");
    }

    #[test]
    fn test_clear_empties() {
        let mut m = Memento::new(0);
        m.save(snap("a", 0), None);
        m.clear();
        assert!(m.is_empty());
        assert_eq!(m.cursor(), None);
        assert!(m.state().is_none());
    }
}
