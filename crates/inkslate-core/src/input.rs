//! Normalized pointer and keyboard events.

use crate::point::PointerId;
use serde::{Deserialize, Serialize};

/// Mouse button identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    #[default]
    Left,
    Right,
    Middle,
}

/// Modifier keys state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    #[serde(default)]
    pub shift: bool,
    #[serde(default)]
    pub ctrl: bool,
    #[serde(default)]
    pub alt: bool,
    #[serde(default)]
    pub meta: bool,
}

impl Modifiers {
    /// Ctrl on most platforms, Cmd on macOS.
    pub fn command(&self) -> bool {
        self.ctrl || self.meta
    }
}

/// Pointer event phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerEventKind {
    Down,
    Move,
    Up,
}

/// A pointer event in surface-local coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointerEvent {
    #[serde(rename = "type")]
    pub kind: PointerEventKind,
    /// Raw host identifier; may be negative.
    #[serde(default)]
    pub pointer_id: i64,
    pub x: f64,
    pub y: f64,
    /// Milliseconds.
    pub timestamp: u64,
    #[serde(default)]
    pub button: MouseButton,
}

impl PointerEvent {
    pub fn new(kind: PointerEventKind, pointer_id: i64, x: f64, y: f64, timestamp: u64) -> Self {
        Self {
            kind,
            pointer_id,
            x,
            y,
            timestamp,
            button: MouseButton::Left,
        }
    }

    pub fn down(pointer_id: i64, x: f64, y: f64, timestamp: u64) -> Self {
        Self::new(PointerEventKind::Down, pointer_id, x, y, timestamp)
    }

    pub fn moved(pointer_id: i64, x: f64, y: f64, timestamp: u64) -> Self {
        Self::new(PointerEventKind::Move, pointer_id, x, y, timestamp)
    }

    pub fn up(pointer_id: i64, x: f64, y: f64, timestamp: u64) -> Self {
        Self::new(PointerEventKind::Up, pointer_id, x, y, timestamp)
    }

    pub fn with_button(mut self, button: MouseButton) -> Self {
        self.button = button;
        self
    }

    pub fn pointer(&self) -> PointerId {
        PointerId::normalize(self.pointer_id)
    }
}

/// A key press.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEvent {
    pub key: String,
    #[serde(default)]
    pub modifiers: Modifiers,
}

impl KeyEvent {
    pub fn new(key: impl Into<String>, modifiers: Modifiers) -> Self {
        Self {
            key: key.into(),
            modifiers,
        }
    }
}
