//! Recorded points and strokes.

use serde::{Deserialize, Serialize};

/// Normalized pointer identifier. The primary pointer (mouse, first touch) is 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PointerId(pub u32);

impl PointerId {
    pub const PRIMARY: PointerId = PointerId(0);

    /// Normalize a raw host identifier (which may be negative on some platforms).
    pub fn normalize(raw: i64) -> Self {
        let abs = raw.unsigned_abs();
        Self(u32::try_from(abs).unwrap_or(u32::MAX))
    }

    pub fn is_primary(self) -> bool {
        self.0 == 0
    }
}

impl std::fmt::Display for PointerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single recorded sample.
///
/// Serialized as the compact tuple `[x, y, t, pendown, pointerId]` where
/// `pendown` is `1` or `0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "PointTuple", into = "PointTuple")]
pub struct Point {
    pub x: f64,
    pub y: f64,
    /// Milliseconds, absolute or session-relative.
    pub t: u64,
    pub pendown: bool,
    pub pointer_id: PointerId,
}

#[derive(Serialize, Deserialize)]
struct PointTuple(f64, f64, u64, u8, u32);

impl From<PointTuple> for Point {
    fn from(PointTuple(x, y, t, pendown, id): PointTuple) -> Self {
        Self {
            x,
            y,
            t,
            pendown: pendown != 0,
            pointer_id: PointerId(id),
        }
    }
}

impl From<Point> for PointTuple {
    fn from(p: Point) -> Self {
        PointTuple(p.x, p.y, p.t, u8::from(p.pendown), p.pointer_id.0)
    }
}

impl Point {
    pub fn new(x: f64, y: f64, t: u64, pendown: bool, pointer_id: PointerId) -> Self {
        Self {
            x,
            y,
            t,
            pendown,
            pointer_id,
        }
    }

    /// Whether two points share the same coordinates.
    pub fn same_position(&self, other: &Point) -> bool {
        self.x == other.x && self.y == other.y
    }

    pub fn to_kurbo(self) -> kurbo::Point {
        kurbo::Point::new(self.x, self.y)
    }
}

/// Points of one pointer gesture, in recording order.
pub type Stroke = Vec<Point>;

/// Completed strokes, in completion order.
pub type Strokes = Vec<Stroke>;

/// Whether a stroke was recorded with the pen down. Empty strokes count as pen-down.
pub fn is_pendown(stroke: &[Point]) -> bool {
    stroke.first().is_none_or(|p| p.pendown)
}
