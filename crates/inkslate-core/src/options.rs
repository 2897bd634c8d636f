//! Session configuration.

use crate::color::StyleColor;
use crate::style::{LineCap, LineJoin};
use serde::{Deserialize, Serialize};

/// Style used for recorded pen-up movements when they are redrawn.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PenUpStyle {
    pub stroke_style: StyleColor,
    pub line_width: f64,
}

impl Default for PenUpStyle {
    fn default() -> Self {
        Self {
            stroke_style: StyleColor::rgb(0xDD, 0xDD, 0xDD),
            line_width: 1.0,
        }
    }
}

/// Drawing defaults applied when a session starts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GraphicsOptions {
    /// Radius of the marker drawn at each stroke start; 0 disables it.
    pub first_point_size: f64,
    pub line_width: f64,
    pub stroke_style: StyleColor,
    pub fill_style: StyleColor,
    pub line_cap: LineCap,
    pub line_join: LineJoin,
    pub miter_limit: f64,
}

impl Default for GraphicsOptions {
    fn default() -> Self {
        let magenta = StyleColor::rgb(0xFF, 0x00, 0xFF);
        Self {
            first_point_size: 3.0,
            line_width: 3.0,
            stroke_style: magenta,
            fill_style: magenta,
            line_cap: LineCap::Round,
            line_join: LineJoin::Round,
            miter_limit: 10.0,
        }
    }
}

/// Session options. Every field is optional in JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Options {
    /// Accept pointer input at all.
    pub interactive: bool,
    /// Track pointers other than the primary one.
    pub multitouch: bool,
    /// Store timestamps relative to the first recorded point.
    pub rel_timestamps: bool,
    /// Record hover movements between strokes as pen-up points.
    pub record_pen_up_movements: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pen_up_style: Option<PenUpStyle>,
    /// Drop a point that repeats the previous point's coordinates.
    pub filter_coords: bool,
    /// Keep an undo/redo history.
    pub memento: bool,
    /// Maximum number of history entries; 0 keeps everything.
    pub history_depth: usize,
    pub graphics: GraphicsOptions,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            interactive: true,
            multitouch: true,
            rel_timestamps: false,
            record_pen_up_movements: false,
            pen_up_style: None,
            filter_coords: false,
            memento: true,
            history_depth: 0,
            graphics: GraphicsOptions::default(),
        }
    }
}

impl Options {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Pen-up style with the default filled in.
    pub fn pen_up_style(&self) -> PenUpStyle {
        self.pen_up_style.unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_json() {
        let opts = Options::from_json("{}").unwrap();
        assert_eq!(opts, Options::default());
        assert!(opts.interactive && opts.multitouch && opts.memento);
        assert_eq!(opts.graphics.first_point_size, 3.0);
        assert_eq!(opts.graphics.stroke_style.to_css(), "#FF00FF");
        assert_eq!(opts.pen_up_style().stroke_style.to_css(), "#DDDDDD");
    }

    #[test]
    fn test_partial_override() {
        let opts = Options::from_json(
            r##"{"filterCoords": true, "penUpStyle": {"lineWidth": 2}, "graphics": {"lineWidth": 5, "lineCap": "square"}}"##,
        )
        .unwrap();
        assert!(opts.filter_coords);
        assert_eq!(opts.pen_up_style().line_width, 2.0);
        assert_eq!(opts.pen_up_style().stroke_style.to_css(), "#DDDDDD");
        assert_eq!(opts.graphics.line_width, 5.0);
        assert_eq!(opts.graphics.line_cap, LineCap::Square);
        assert_eq!(opts.graphics.first_point_size, 3.0);
    }

    #[test]
    fn test_round_trip_keeps_camel_case() {
        let json = Options::default().to_json().unwrap();
        assert!(json.contains("\"relTimestamps\""));
        assert!(json.contains("\"firstPointSize\""));
        assert!(!json.contains("penUpStyle"));
        assert_eq!(Options::from_json(&json).unwrap(), Options::default());
    }
}
