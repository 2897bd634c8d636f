//! Inkslate command line shell.
//!
//! Replays recorded pointer and key scripts into a drawing document and
//! writes the session, PNG and SVG outputs.

mod app;
pub mod script;

pub use app::{App, AppConfig, print_shortcuts, render_file};
pub use script::{ScriptAction, ScriptError, ScriptEvent};
