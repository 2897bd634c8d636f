//! Recorded input scripts: one JSON event per line.
//!
//! ```text
//! {"type": "down", "pointerId": 1, "x": 10, "y": 10, "timestamp": 0}
//! {"type": "move", "pointerId": 1, "x": 20, "y": 15, "timestamp": 16}
//! {"type": "up", "pointerId": 1, "x": 20, "y": 15, "timestamp": 32}
//! {"key": "z", "modifiers": {"ctrl": true}}
//! {"action": "clear"}
//! ```
//!
//! Blank lines and lines starting with `#` are skipped.

use inkslate_core::input::{KeyEvent, PointerEvent};
use serde::Deserialize;
use std::io::BufRead;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

pub type ScriptResult<T> = Result<T, ScriptError>;

/// Session operations that have no input event of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptAction {
    Clear,
    Save,
    Undo,
    Redo,
    Reset,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ScriptEvent {
    Pointer(PointerEvent),
    Key(KeyEvent),
    Action { action: ScriptAction },
}

/// Parse every event in `reader`.
pub fn parse<R: BufRead>(reader: R) -> ScriptResult<Vec<ScriptEvent>> {
    let mut events = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let event = serde_json::from_str(trimmed).map_err(|source| ScriptError::Parse {
            line: index + 1,
            source,
        })?;
        events.push(event);
    }
    log::debug!("Parsed {} script events", events.len());
    Ok(events)
}
