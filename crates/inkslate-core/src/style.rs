//! Whitelisted style properties and the graphics state they mutate.

use crate::color::StyleColor;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Line cap style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineCap {
    #[default]
    Butt,
    Round,
    Square,
}

impl LineCap {
    pub fn as_str(self) -> &'static str {
        match self {
            LineCap::Butt => "butt",
            LineCap::Round => "round",
            LineCap::Square => "square",
        }
    }
}

/// Line join style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineJoin {
    #[default]
    Miter,
    Round,
    Bevel,
}

impl LineJoin {
    pub fn as_str(self) -> &'static str {
        match self {
            LineJoin::Miter => "miter",
            LineJoin::Round => "round",
            LineJoin::Bevel => "bevel",
        }
    }
}

/// A style property assignment. Only these properties are recorded in a command log.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StyleProperty {
    FillStyle(StyleColor),
    StrokeStyle(StyleColor),
    LineWidth(f64),
    LineCap(LineCap),
    LineJoin(LineJoin),
    MiterLimit(f64),
}

impl StyleProperty {
    /// Canvas-style property name.
    pub fn name(&self) -> &'static str {
        match self {
            StyleProperty::FillStyle(_) => "fillStyle",
            StyleProperty::StrokeStyle(_) => "strokeStyle",
            StyleProperty::LineWidth(_) => "lineWidth",
            StyleProperty::LineCap(_) => "lineCap",
            StyleProperty::LineJoin(_) => "lineJoin",
            StyleProperty::MiterLimit(_) => "miterLimit",
        }
    }

    pub fn value(&self) -> Value {
        match self {
            StyleProperty::FillStyle(c) | StyleProperty::StrokeStyle(c) => Value::from(c.to_css()),
            StyleProperty::LineWidth(v) | StyleProperty::MiterLimit(v) => Value::from(*v),
            StyleProperty::LineCap(cap) => Value::from(cap.as_str()),
            StyleProperty::LineJoin(join) => Value::from(join.as_str()),
        }
    }

    /// Build a property from its wire name and value.
    ///
    /// Returns `None` for names outside the whitelist or values of the wrong shape.
    pub fn from_parts(name: &str, value: &Value) -> Option<Self> {
        let color = || value.as_str().and_then(|s| StyleColor::parse(s).ok());
        let prop = match name {
            "fillStyle" => StyleProperty::FillStyle(color()?),
            "strokeStyle" => StyleProperty::StrokeStyle(color()?),
            "lineWidth" => StyleProperty::LineWidth(value.as_f64()?),
            "miterLimit" => StyleProperty::MiterLimit(value.as_f64()?),
            "lineCap" => StyleProperty::LineCap(serde_json::from_value(value.clone()).ok()?),
            "lineJoin" => StyleProperty::LineJoin(serde_json::from_value(value.clone()).ok()?),
            _ => return None,
        };
        Some(prop)
    }
}

/// Current values of every whitelisted property.
///
/// Defaults match a fresh 2D canvas context.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GraphicsState {
    pub fill_style: StyleColor,
    pub stroke_style: StyleColor,
    pub line_width: f64,
    pub line_cap: LineCap,
    pub line_join: LineJoin,
    pub miter_limit: f64,
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self {
            fill_style: StyleColor::black(),
            stroke_style: StyleColor::black(),
            line_width: 1.0,
            line_cap: LineCap::Butt,
            line_join: LineJoin::Miter,
            miter_limit: 10.0,
        }
    }
}

impl GraphicsState {
    pub fn apply(&mut self, property: &StyleProperty) {
        match *property {
            StyleProperty::FillStyle(c) => self.fill_style = c,
            StyleProperty::StrokeStyle(c) => self.stroke_style = c,
            StyleProperty::LineWidth(w) => self.line_width = w,
            StyleProperty::LineCap(cap) => self.line_cap = cap,
            StyleProperty::LineJoin(join) => self.line_join = join,
            StyleProperty::MiterLimit(m) => self.miter_limit = m,
        }
    }

    /// Every property, in wire order.
    pub fn properties(&self) -> [StyleProperty; 6] {
        [
            StyleProperty::FillStyle(self.fill_style),
            StyleProperty::StrokeStyle(self.stroke_style),
            StyleProperty::LineWidth(self.line_width),
            StyleProperty::LineCap(self.line_cap),
            StyleProperty::LineJoin(self.line_join),
            StyleProperty::MiterLimit(self.miter_limit),
        ]
    }

    /// Assignments that turn `self` into `target`.
    pub fn diff(&self, target: &GraphicsState) -> Vec<StyleProperty> {
        self.properties()
            .into_iter()
            .zip(target.properties())
            .filter(|(current, wanted)| current != wanted)
            .map(|(_, wanted)| wanted)
            .collect()
    }

    /// Stroke parameters for kurbo-based backends.
    pub fn kurbo_stroke(&self) -> kurbo::Stroke {
        let cap = match self.line_cap {
            LineCap::Butt => kurbo::Cap::Butt,
            LineCap::Round => kurbo::Cap::Round,
            LineCap::Square => kurbo::Cap::Square,
        };
        let join = match self.line_join {
            LineJoin::Miter => kurbo::Join::Miter,
            LineJoin::Round => kurbo::Join::Round,
            LineJoin::Bevel => kurbo::Join::Bevel,
        };
        kurbo::Stroke::new(self.line_width)
            .with_caps(cap)
            .with_join(join)
            .with_miter_limit(self.miter_limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_parts_whitelist() {
        assert_eq!(
            StyleProperty::from_parts("lineWidth", &json!(3)),
            Some(StyleProperty::LineWidth(3.0))
        );
        assert_eq!(
            StyleProperty::from_parts("lineCap", &json!("round")),
            Some(StyleProperty::LineCap(LineCap::Round))
        );
        assert_eq!(
            StyleProperty::from_parts("strokeStyle", &json!("#DDD")),
            Some(StyleProperty::StrokeStyle(StyleColor::rgb(221, 221, 221)))
        );
        assert_eq!(StyleProperty::from_parts("globalAlpha", &json!(0.5)), None);
        assert_eq!(StyleProperty::from_parts("lineJoin", &json!("wobbly")), None);
        assert_eq!(StyleProperty::from_parts("lineWidth", &json!("thick")), None);
    }

    #[test]
    fn test_diff_emits_only_changed() {
        let base = GraphicsState::default();
        let mut changed = base;
        changed.apply(&StyleProperty::LineWidth(4.0));
        changed.apply(&StyleProperty::FillStyle(StyleColor::white()));

        let ops = base.diff(&changed);
        assert_eq!(
            ops,
            vec![
                StyleProperty::FillStyle(StyleColor::white()),
                StyleProperty::LineWidth(4.0)
            ]
        );
        assert!(changed.diff(&changed).is_empty());
    }
}
