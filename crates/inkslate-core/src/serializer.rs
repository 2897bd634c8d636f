//! Saved session documents: `{options, strokes, actions}`.

use crate::command::CommandLog;
use crate::options::Options;
use crate::point::Strokes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Session (de)serialization errors.
#[derive(Debug, Error)]
pub enum SerializeError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for serialization.
pub type SerializeResult<T> = Result<T, SerializeError>;

/// Everything needed to rebuild a drawing.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SessionData {
    #[serde(default)]
    pub options: Options,
    #[serde(default)]
    pub strokes: Strokes,
    #[serde(default)]
    pub actions: CommandLog,
}

impl SessionData {
    pub fn to_json(&self) -> SerializeResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> SerializeResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> SerializeResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
