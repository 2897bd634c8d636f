//! Per-pointer stroke capture.
//!
//! Each pointer is `Idle` or `Drawing`. Points accumulate in a slot keyed by
//! the normalized pointer id and move into the strokes collection when the
//! pointer lifts. Every move while drawing emits a self-contained segment
//! (`beginPath`, `moveTo`, `lineTo`, `stroke`, `closePath`) so simultaneous
//! pointers never share a path.

use crate::input::{MouseButton, PointerEvent, PointerEventKind};
use crate::options::Options;
use crate::point::{Point, PointerId, Stroke, Strokes};
use crate::sketch::Sketch;
use crate::surface::RasterSurface;
use std::collections::HashMap;

/// Identifies one multi-pointer gesture: pointers that went down together,
/// from the first going down to the last one lifting.
///
/// A pointer that goes down after some pointer of the current gesture has
/// already lifted starts a new gesture, so alternating fingers that never
/// all leave the surface still produce separate gestures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GestureId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PointerState {
    #[default]
    Idle,
    Drawing,
}

#[derive(Debug, Default)]
struct Slot {
    state: PointerState,
    points: Stroke,
    gesture: Option<GestureId>,
}

/// What a pointer event did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureOutcome {
    Ignored,
    StrokeStarted { pointer: PointerId, gesture: GestureId },
    PointAdded { pointer: PointerId },
    PenUpRecorded { pointer: PointerId },
    StrokeCompleted { pointer: PointerId, gesture: GestureId },
}

/// Stroke capture state machine.
#[derive(Debug, Default)]
pub struct StrokeCapture {
    slots: HashMap<PointerId, Slot>,
    drawing: usize,
    gesture: Option<GestureId>,
    /// A pointer of the current gesture has lifted.
    gesture_lifted: bool,
    next_gesture: u64,
    time_origin: Option<u64>,
}

impl StrokeCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether any pointer is mid-stroke.
    pub fn is_drawing(&self) -> bool {
        self.drawing > 0
    }

    pub fn drawing_count(&self) -> usize {
        self.drawing
    }

    pub fn state(&self, pointer: PointerId) -> PointerState {
        self.slots.get(&pointer).map_or(PointerState::Idle, |s| s.state)
    }

    /// Points recorded so far for `pointer` that have not become a stroke yet.
    pub fn open_points(&self, pointer: PointerId) -> &[Point] {
        self.slots.get(&pointer).map(|s| s.points.as_slice()).unwrap_or(&[])
    }

    /// The gesture in progress, if any pointer is drawing.
    pub fn gesture(&self) -> Option<GestureId> {
        self.gesture
    }

    /// Discard every open point array and return all pointers to `Idle`.
    /// Returns how many pointers were mid-stroke.
    pub fn cancel_open_strokes(&mut self) -> usize {
        let cancelled = self.drawing;
        if !self.slots.is_empty() {
            log::debug!("Cancelling {} open strokes", cancelled);
        }
        self.slots.clear();
        self.drawing = 0;
        self.gesture = None;
        self.gesture_lifted = false;
        cancelled
    }

    /// Feed one pointer event through the state machine.
    pub fn handle<S: RasterSurface>(
        &mut self,
        event: &PointerEvent,
        options: &Options,
        sketch: &mut Sketch<S>,
        strokes: &mut Strokes,
    ) -> CaptureOutcome {
        if !options.interactive {
            return CaptureOutcome::Ignored;
        }
        let pointer = event.pointer();
        if !options.multitouch && !pointer.is_primary() {
            log::trace!("Ignoring pointer {} with multitouch disabled", pointer);
            return CaptureOutcome::Ignored;
        }
        match event.kind {
            PointerEventKind::Down => self.down(pointer, event, options, sketch, strokes),
            PointerEventKind::Move => self.move_to(pointer, event, options, sketch, strokes),
            PointerEventKind::Up => self.up(pointer, sketch, strokes),
        }
    }

    fn down<S: RasterSurface>(
        &mut self,
        pointer: PointerId,
        event: &PointerEvent,
        options: &Options,
        sketch: &mut Sketch<S>,
        strokes: &mut Strokes,
    ) -> CaptureOutcome {
        if event.button != MouseButton::Left {
            log::trace!("Ignoring {:?} button down", event.button);
            return CaptureOutcome::Ignored;
        }

        let g = &options.graphics;
        if g.first_point_size > 0.0 {
            sketch
                .begin_fill(g.fill_style)
                .fill_circle(event.x, event.y, g.first_point_size)
                .end_fill();
        }
        sketch.line_style(g.stroke_style, g.line_width).begin_path();

        let gesture = match self.gesture {
            Some(id) if !self.gesture_lifted => id,
            _ => {
                let id = GestureId(self.next_gesture);
                self.next_gesture += 1;
                self.gesture = Some(id);
                self.gesture_lifted = false;
                id
            }
        };

        let slot = self.slots.entry(pointer).or_default();
        if !slot.points.is_empty() {
            log::trace!("Flushing stale points for pointer {}", pointer);
            strokes.push(std::mem::take(&mut slot.points));
        }
        if slot.state == PointerState::Idle {
            slot.state = PointerState::Drawing;
            self.drawing += 1;
        }
        slot.gesture = Some(gesture);

        let point = self.make_point(pointer, event, true);
        self.push_point(pointer, point, options);
        CaptureOutcome::StrokeStarted { pointer, gesture }
    }

    fn move_to<S: RasterSurface>(
        &mut self,
        pointer: PointerId,
        event: &PointerEvent,
        options: &Options,
        sketch: &mut Sketch<S>,
        strokes: &Strokes,
    ) -> CaptureOutcome {
        if self.state(pointer) == PointerState::Drawing {
            let point = self.make_point(pointer, event, true);
            if let Some(last) = self.open_points(pointer).last().copied() {
                if options.filter_coords && last.same_position(&point) {
                    return CaptureOutcome::Ignored;
                }
                sketch
                    .begin_path()
                    .line(last.x, last.y, point.x, point.y)
                    .stroke()
                    .close_path();
            }
            self.push_point(pointer, point, options);
            return CaptureOutcome::PointAdded { pointer };
        }

        if options.record_pen_up_movements && !strokes.is_empty() {
            let point = self.make_point(pointer, event, false);
            if self.push_point(pointer, point, options) {
                return CaptureOutcome::PenUpRecorded { pointer };
            }
        }
        CaptureOutcome::Ignored
    }

    fn up<S: RasterSurface>(
        &mut self,
        pointer: PointerId,
        sketch: &mut Sketch<S>,
        strokes: &mut Strokes,
    ) -> CaptureOutcome {
        let Some(slot) = self
            .slots
            .get(&pointer)
            .filter(|s| s.state == PointerState::Drawing)
        else {
            log::trace!("Pointer {} up without an open stroke", pointer);
            return CaptureOutcome::Ignored;
        };
        let gesture = slot.gesture.unwrap_or(GestureId(0));

        sketch.close_path();
        if let Some(slot) = self.slots.remove(&pointer) {
            strokes.push(slot.points);
        }
        self.drawing = self.drawing.saturating_sub(1);
        if self.drawing == 0 {
            self.gesture = None;
            self.gesture_lifted = false;
        } else {
            self.gesture_lifted = true;
        }
        CaptureOutcome::StrokeCompleted { pointer, gesture }
    }

    fn make_point(&self, pointer: PointerId, event: &PointerEvent, pendown: bool) -> Point {
        Point::new(event.x, event.y, event.timestamp, pendown, pointer)
    }

    /// Append a point to the pointer's open array, applying relative time and
    /// duplicate filtering. Returns whether the point was kept.
    fn push_point(&mut self, pointer: PointerId, mut point: Point, options: &Options) -> bool {
        if options.rel_timestamps {
            let origin = *self.time_origin.get_or_insert(point.t);
            point.t = point.t.saturating_sub(origin);
        }
        let points = &mut self.slots.entry(pointer).or_default().points;
        if options.filter_coords && points.last().is_some_and(|last| last.same_position(&point)) {
            return false;
        }
        points.push(point);
        true
    }
}
