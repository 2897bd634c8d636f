//! A drawing session: one surface, its strokes, log and history.

use crate::animate::StrokeAnimation;
use crate::bitmap::{Bitmap, BitmapResult, BoxFuture, DataUrlDecoder, ImageDecoder};
use crate::capture::{CaptureOutcome, GestureId, StrokeCapture};
use crate::command::CommandLog;
use crate::input::PointerEvent;
use crate::memento::{Memento, SaveKind, Snapshot};
use crate::options::{GraphicsOptions, Options};
use crate::point::{PointerId, Strokes, is_pendown};
use crate::serializer::{SerializeError, SessionData};
use crate::sketch::{Sketch, SketchError};
use crate::style::StyleProperty;
use crate::surface::RasterSurface;
use std::collections::VecDeque;
use std::future::Future;
use std::rc::Rc;
use std::task::{Context, Poll};
use thiserror::Error;
use uuid::Uuid;

/// Session errors.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Cannot change history while a stroke is in progress")]
    StrokeInProgress,
    #[error(transparent)]
    Sketch(#[from] SketchError),
    #[error(transparent)]
    Serialize(#[from] SerializeError),
}

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Notifications queued by a session, drained with [`Session::drain_events`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    PointerDown { pointer: PointerId },
    PointerMove { pointer: PointerId },
    PointerUp { pointer: PointerId },
    /// A stroke was appended; `index` is its position in the strokes collection.
    StrokeCompleted { index: usize },
    Cleared,
    MementoInit,
    MementoSave { coalesced: bool },
    MementoUndo,
    MementoRedo,
    MementoReset,
    /// A queued restore was applied.
    MementoChange,
    AnimationStart,
    AnimationEnd,
}

/// Work that waits for earlier work, applied strictly in request order.
enum Deferred {
    Save(Option<GestureId>),
    Restore(Snapshot),
}

struct ActiveRestore {
    snapshot: Snapshot,
    decode: BoxFuture<'static, BitmapResult<Bitmap>>,
}

/// Binds capture, the raster adapter and undo history for one surface.
///
/// All asynchronous work (image draws, deferred saves, restores) is driven
/// by [`poll_pending`](Self::poll_pending) or awaited with
/// [`settle`](Self::settle). Dropping the session drops that work.
pub struct Session<S: RasterSurface> {
    id: Uuid,
    options: Options,
    sketch: Sketch<S>,
    strokes: Strokes,
    capture: StrokeCapture,
    memento: Option<Memento>,
    deferred: VecDeque<Deferred>,
    active_restore: Option<ActiveRestore>,
    events: Vec<SessionEvent>,
    animation_epoch: u64,
}

impl<S: RasterSurface> std::fmt::Debug for Session<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("strokes", &self.strokes.len())
            .field("sketch", &self.sketch)
            .field("history", &self.memento.as_ref().map(Memento::len))
            .finish()
    }
}

impl<S: RasterSurface> Session<S> {
    pub fn new(surface: S, options: Options) -> SessionResult<Self> {
        Self::with_decoder(surface, options, Rc::new(DataUrlDecoder))
    }

    pub fn with_decoder(
        surface: S,
        options: Options,
        decoder: Rc<dyn ImageDecoder>,
    ) -> SessionResult<Self> {
        let mut sketch = Sketch::with_decoder(surface, decoder)?;
        apply_graphics(&mut sketch, &options.graphics);

        let mut session = Self {
            id: Uuid::new_v4(),
            options,
            sketch,
            strokes: Strokes::new(),
            capture: StrokeCapture::new(),
            memento: None,
            deferred: VecDeque::new(),
            active_restore: None,
            events: Vec::new(),
            animation_epoch: 0,
        };
        session.configure_memento();
        log::debug!("Created session {}", session.id);
        Ok(session)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn sketch(&self) -> &Sketch<S> {
        &self.sketch
    }

    /// Direct access for programmatic drawing. Calls are logged like captured ones.
    pub fn sketch_mut(&mut self) -> &mut Sketch<S> {
        &mut self.sketch
    }

    pub fn log(&self) -> &CommandLog {
        self.sketch.log()
    }

    pub fn strokes(&self) -> &Strokes {
        &self.strokes
    }

    pub fn capture(&self) -> &StrokeCapture {
        &self.capture
    }

    pub fn memento(&self) -> Option<&Memento> {
        self.memento.as_ref()
    }

    /// Image decodes still in flight.
    pub fn pending_async(&self) -> usize {
        self.sketch.pending_async()
    }

    /// Whether no decode, deferred save or restore is outstanding.
    pub fn is_settled(&self) -> bool {
        self.sketch.pending_async() == 0
            && self.deferred.is_empty()
            && self.active_restore.is_none()
    }

    /// Whether a restore is queued or decoding.
    pub fn is_restoring(&self) -> bool {
        self.active_restore.is_some()
            || self.deferred.iter().any(|work| matches!(work, Deferred::Restore(_)))
    }

    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    fn configure_memento(&mut self) {
        match (self.options.memento, self.memento.is_some()) {
            (true, false) => {
                self.memento = Some(Memento::new(self.options.history_depth));
                self.events.push(SessionEvent::MementoInit);
                self.request_save(None);
            }
            (false, true) => self.memento = None,
            _ => {}
        }
    }

    // --- Input ---

    /// Feed a pointer event. Completed strokes request a history save.
    ///
    /// Input is ignored while a restore is outstanding.
    pub fn handle_pointer_event(&mut self, event: &PointerEvent) -> CaptureOutcome {
        if self.is_restoring() {
            log::debug!("Ignoring {:?} until queued restores apply", event.kind);
            return CaptureOutcome::Ignored;
        }
        let outcome =
            self.capture
                .handle(event, &self.options, &mut self.sketch, &mut self.strokes);
        match outcome {
            CaptureOutcome::StrokeStarted { pointer, .. } => {
                self.events.push(SessionEvent::PointerDown { pointer });
            }
            CaptureOutcome::PointAdded { pointer } | CaptureOutcome::PenUpRecorded { pointer } => {
                self.events.push(SessionEvent::PointerMove { pointer });
            }
            CaptureOutcome::StrokeCompleted { pointer, gesture } => {
                self.events.push(SessionEvent::PointerUp { pointer });
                self.events.push(SessionEvent::StrokeCompleted {
                    index: self.strokes.len() - 1,
                });
                if self.memento.is_some() {
                    self.request_save(Some(gesture));
                }
            }
            CaptureOutcome::Ignored => {}
        }
        outcome
    }

    // --- Strokes and surface ---

    /// Replace the strokes collection and redraw it.
    pub fn set_strokes(&mut self, strokes: Strokes) {
        self.strokes = strokes;
        self.redraw();
    }

    /// Clear the surface and redraw every stroke from its points.
    pub fn redraw(&mut self) {
        self.sketch.clear();
        let g = self.options.graphics;
        let pen_up = self.options.pen_up_style();
        for stroke in &self.strokes {
            let pendown = is_pendown(stroke);
            if !pendown && !self.options.record_pen_up_movements {
                continue;
            }
            let Some(first) = stroke.first() else {
                continue;
            };
            if g.first_point_size > 0.0 {
                self.sketch
                    .begin_fill(g.fill_style)
                    .fill_circle(first.x, first.y, g.first_point_size)
                    .end_fill();
            }
            if pendown {
                self.sketch.line_style(g.stroke_style, g.line_width);
            } else {
                self.sketch.line_style(pen_up.stroke_style, pen_up.line_width);
            }
            for pair in stroke.windows(2) {
                self.sketch
                    .begin_path()
                    .line(pair[0].x, pair[0].y, pair[1].x, pair[1].y)
                    .stroke()
                    .close_path();
            }
        }
    }

    /// Clear surface, strokes and log, then reset history to a blank baseline.
    ///
    /// Open strokes, queued restores, pending decodes and running animations
    /// are all cancelled.
    pub fn clear(&mut self) {
        self.animation_epoch += 1;
        self.capture.cancel_open_strokes();
        self.sketch.clear();
        self.strokes.clear();
        self.deferred.clear();
        self.active_restore = None;
        self.events.push(SessionEvent::Cleared);
        if self.memento.is_some() {
            self.reset_history();
        }
    }

    // --- History ---

    /// Save the current state as a new history entry.
    pub fn save(&mut self) {
        if self.memento.is_none() {
            log::trace!("Save ignored: history disabled");
            return;
        }
        self.request_save(None);
    }

    fn request_save(&mut self, gesture: Option<GestureId>) {
        if self.sketch.pending_async() > 0
            || !self.deferred.is_empty()
            || self.active_restore.is_some()
        {
            log::debug!(
                "Deferring save behind {} image decodes and {} queued jobs",
                self.sketch.pending_async(),
                self.deferred.len()
            );
            self.deferred.push_back(Deferred::Save(gesture));
        } else {
            self.save_now(gesture);
        }
    }

    fn save_now(&mut self, gesture: Option<GestureId>) {
        if self.memento.is_none() {
            return;
        }
        let snapshot = self.capture_snapshot();
        let Some(memento) = self.memento.as_mut() else {
            return;
        };
        let kind = memento.save(snapshot, gesture);
        self.events.push(SessionEvent::MementoSave {
            coalesced: kind == SaveKind::Coalesced,
        });
    }

    fn capture_snapshot(&mut self) -> Snapshot {
        let image = match self.sketch.surface_mut().snapshot().to_data_url() {
            Ok(url) => url,
            Err(e) => {
                log::warn!("Snapshot image encoding failed: {}", e);
                String::new()
            }
        };
        Snapshot {
            image,
            strokes: self.strokes.clone(),
            log: self.sketch.log().clone(),
        }
    }

    /// Step back one history entry. `Ok(false)` at the start of history or
    /// when history is disabled.
    pub fn undo(&mut self) -> SessionResult<bool> {
        self.step_history(Memento::undo, SessionEvent::MementoUndo)
    }

    /// Step forward one history entry. `Ok(false)` at the end of history.
    pub fn redo(&mut self) -> SessionResult<bool> {
        self.step_history(Memento::redo, SessionEvent::MementoRedo)
    }

    fn step_history(
        &mut self,
        step: fn(&mut Memento) -> Option<&Snapshot>,
        event: SessionEvent,
    ) -> SessionResult<bool> {
        if self.capture.is_drawing() {
            return Err(SessionError::StrokeInProgress);
        }
        let Some(memento) = self.memento.as_mut() else {
            return Ok(false);
        };
        let Some(snapshot) = step(memento).cloned() else {
            return Ok(false);
        };
        self.deferred.push_back(Deferred::Restore(snapshot));
        self.events.push(event);
        Ok(true)
    }

    /// Drop all history and save the current state as the new baseline.
    pub fn reset_history(&mut self) {
        let Some(memento) = self.memento.as_mut() else {
            return;
        };
        memento.clear();
        self.events.push(SessionEvent::MementoReset);
        self.request_save(None);
    }

    /// Queue a restore of `snapshot`, or of the current history entry when `None`.
    /// Returns `false` if there is nothing to restore.
    pub fn restore(&mut self, snapshot: Option<Snapshot>) -> bool {
        let Some(snapshot) = snapshot.or_else(|| self.state()) else {
            return false;
        };
        self.deferred.push_back(Deferred::Restore(snapshot));
        true
    }

    /// Copy of the history entry at the cursor.
    pub fn state(&self) -> Option<Snapshot> {
        self.memento.as_ref().and_then(Memento::state)
    }

    // --- Async driving ---

    /// Make progress on outstanding work: image decodes first, then deferred
    /// saves and restores in the order they were requested, one restore at a
    /// time. Ready when all are done.
    pub fn poll_pending(&mut self, cx: &mut Context<'_>) -> Poll<()> {
        loop {
            if self.sketch.poll_images(cx).is_pending() {
                return Poll::Pending;
            }

            if let Some(active) = self.active_restore.as_mut() {
                let result = match active.decode.as_mut().poll(cx) {
                    Poll::Ready(result) => result,
                    Poll::Pending => return Poll::Pending,
                };
                if let Some(active) = self.active_restore.take() {
                    self.apply_restore(active.snapshot, result);
                }
                continue;
            }

            match self.deferred.pop_front() {
                Some(Deferred::Save(gesture)) => self.save_now(gesture),
                Some(Deferred::Restore(snapshot)) => {
                    let decode = self.sketch.decoder().decode(&snapshot.image);
                    self.active_restore = Some(ActiveRestore { snapshot, decode });
                }
                None => return Poll::Ready(()),
            }
        }
    }

    /// Wait until [`poll_pending`](Self::poll_pending) is ready.
    pub async fn settle(&mut self) {
        std::future::poll_fn(|cx| self.poll_pending(cx)).await
    }

    fn apply_restore(&mut self, snapshot: Snapshot, decoded: BitmapResult<Bitmap>) {
        let cancelled = self.capture.cancel_open_strokes();
        if cancelled > 0 {
            log::warn!("Restore cancelled {} open strokes", cancelled);
        }
        let Snapshot { strokes, log, .. } = snapshot;
        match decoded {
            Ok(image) => self.sketch.restore_snapshot(Some(&image), log),
            Err(e) => {
                log::warn!("Snapshot image failed to decode, keeping surface: {}", e);
                self.sketch.restore_snapshot(None, log);
            }
        }
        self.strokes = strokes;
        log::debug!("Restored snapshot with {} strokes", self.strokes.len());
        self.events.push(SessionEvent::MementoChange);
    }

    // --- Serialization ---

    pub fn data(&self) -> SessionData {
        SessionData {
            options: self.options.clone(),
            strokes: self.strokes.clone(),
            actions: self.sketch.log().clone(),
        }
    }

    pub fn to_json(&self) -> SessionResult<String> {
        Ok(self.data().to_json()?)
    }

    /// Load a saved session: the surface is cleared, `actions` are drawn onto
    /// it, then `actions`, `strokes` and `options` are adopted as-is.
    pub fn load_json(&mut self, json: &str) -> SessionResult<()> {
        let data = SessionData::from_json(json)?;
        self.load(data);
        Ok(())
    }

    pub fn load(&mut self, data: SessionData) {
        self.animation_epoch += 1;
        self.capture.cancel_open_strokes();
        self.deferred.retain(|work| matches!(work, Deferred::Save(_)));
        self.active_restore = None;
        self.sketch.clear();
        self.sketch.load(data.actions);
        self.strokes = data.strokes;
        self.options = data.options;
        let had_history = self.memento.is_some();
        self.configure_memento();
        if had_history && self.memento.is_some() {
            self.request_save(None);
        }
    }

    // --- Animation ---

    /// Start animating the current strokes. Drive it with [`step_animation`](Self::step_animation).
    pub fn animate(&mut self) -> StrokeAnimation {
        let mut animation = StrokeAnimation::new(&self.strokes);
        animation.epoch = self.animation_epoch;
        let g = self.options.graphics;
        self.sketch.line_style(g.stroke_style, g.line_width);
        self.events.push(SessionEvent::AnimationStart);
        animation
    }

    /// Draw one animation frame. Returns `false` when the animation has ended
    /// or was cancelled by [`clear`](Self::clear) or a load.
    pub fn step_animation(&mut self, animation: &mut StrokeAnimation) -> bool {
        if animation.epoch != self.animation_epoch || animation.is_finished() {
            return false;
        }
        let drew = animation.advance(&mut self.sketch, &self.options.graphics);
        if animation.is_finished() {
            self.events.push(SessionEvent::AnimationEnd);
        }
        drew
    }
}

/// Establish the configured drawing defaults on a fresh sketch.
fn apply_graphics<S: RasterSurface>(sketch: &mut Sketch<S>, g: &GraphicsOptions) {
    sketch
        .set_property(StyleProperty::FillStyle(g.fill_style))
        .set_property(StyleProperty::StrokeStyle(g.stroke_style))
        .set_property(StyleProperty::LineWidth(g.line_width))
        .set_property(StyleProperty::LineCap(g.line_cap))
        .set_property(StyleProperty::LineJoin(g.line_join))
        .set_property(StyleProperty::MiterLimit(g.miter_limit));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitmap::BitmapError;
    use crate::color::StyleColor;
    use crate::command::{Command, Primitive};
    use crate::surface::{RecordingSurface, SurfaceCall};
    use futures::channel::oneshot;
    use futures::task::noop_waker;
    use std::cell::RefCell;

    type TestSession = Session<RecordingSurface>;

    fn session() -> TestSession {
        Session::new(RecordingSurface::new(64, 48), Options::default()).unwrap()
    }

    fn draw_stroke(s: &mut TestSession, pointer: i64, pts: &[(f64, f64)]) {
        let (x, y) = pts[0];
        s.handle_pointer_event(&PointerEvent::down(pointer, x, y, 0));
        for (i, &(x, y)) in pts.iter().enumerate().skip(1) {
            s.handle_pointer_event(&PointerEvent::moved(pointer, x, y, i as u64));
        }
        s.handle_pointer_event(&PointerEvent::up(pointer, x, y, 100));
    }

    fn settle(s: &mut TestSession) {
        pollster::block_on(s.settle());
    }

    #[derive(Default)]
    struct ManualDecoder {
        senders: RefCell<Vec<oneshot::Sender<BitmapResult<Bitmap>>>>,
    }

    impl ManualDecoder {
        fn release(&self, result: BitmapResult<Bitmap>) {
            let tx = self.senders.borrow_mut().remove(0);
            let _ = tx.send(result);
        }

        fn outstanding(&self) -> usize {
            self.senders.borrow().len()
        }
    }

    impl ImageDecoder for ManualDecoder {
        fn decode(&self, _src: &str) -> BoxFuture<'static, BitmapResult<Bitmap>> {
            let (tx, rx) = oneshot::channel();
            self.senders.borrow_mut().push(tx);
            Box::pin(async move {
                rx.await
                    .unwrap_or_else(|_| Err(BitmapError::Decode("cancelled".into())))
            })
        }
    }

    #[test]
    fn test_empty_surface_is_fatal() {
        let err = Session::new(RecordingSurface::new(0, 0), Options::default()).unwrap_err();
        assert!(matches!(err, SessionError::Sketch(SketchError::EmptySurface(0, 0))));
    }

    #[test]
    fn test_init_seeds_blank_history() {
        let mut s = session();
        let m = s.memento().unwrap();
        assert_eq!((m.len(), m.cursor()), (1, Some(0)));
        assert!(s.state().unwrap().strokes.is_empty());
        assert_eq!(s.drain_events(), vec![SessionEvent::MementoInit, SessionEvent::MementoSave { coalesced: false }]);
    }

    #[test]
    fn test_stroke_completion_saves() {
        let mut s = session();
        draw_stroke(&mut s, 0, &[(0.0, 0.0), (5.0, 5.0)]);
        assert_eq!(s.memento().unwrap().len(), 2);
        assert_eq!(s.state().unwrap().strokes, *s.strokes());
    }

    #[test]
    fn test_undo_redo_round_trip() {
        let mut s = session();
        s.save();
        let first = s.state().unwrap();

        draw_stroke(&mut s, 0, &[(0.0, 0.0), (5.0, 5.0), (9.0, 1.0)]);
        let second = s.state().unwrap();
        assert_ne!(first, second);

        assert!(s.undo().unwrap());
        settle(&mut s);
        assert_eq!(s.state().unwrap(), first);
        assert_eq!(*s.strokes(), first.strokes);
        assert_eq!(*s.log(), first.log);

        assert!(s.redo().unwrap());
        settle(&mut s);
        assert_eq!(s.state().unwrap(), second);
        assert_eq!(*s.strokes(), second.strokes);
        assert_eq!(*s.log(), second.log);
    }

    #[test]
    fn test_history_boundaries_are_noops() {
        let mut s = session();
        assert!(!s.undo().unwrap());
        assert!(!s.redo().unwrap());
        s.save();
        assert!(s.undo().unwrap());
        assert!(!s.undo().unwrap());
        assert_eq!(s.memento().unwrap().cursor(), Some(0));
    }

    #[test]
    fn test_save_cursor_scenario() {
        let mut s = Session::new(
            RecordingSurface::new(10, 10),
            Options { memento: false, ..Options::default() },
        )
        .unwrap();
        assert!(s.memento().is_none());
        // History disabled: every history call is a no-op.
        s.save();
        assert!(!s.undo().unwrap());

        let mut s = session();
        s.reset_history();
        let m = s.memento().unwrap();
        assert_eq!((m.len(), m.cursor()), (1, Some(0)));
        s.save();
        let m = s.memento().unwrap();
        assert_eq!((m.len(), m.cursor()), (2, Some(1)));
        s.undo().unwrap();
        assert_eq!(s.memento().unwrap().cursor(), Some(0));
        s.undo().unwrap();
        assert_eq!(s.memento().unwrap().cursor(), Some(0));
    }

    #[test]
    fn test_multi_pointer_lift_coalesces() {
        let mut s = session();
        s.handle_pointer_event(&PointerEvent::down(0, 0.0, 0.0, 0));
        s.handle_pointer_event(&PointerEvent::down(1, 10.0, 10.0, 1));
        s.handle_pointer_event(&PointerEvent::moved(0, 1.0, 1.0, 2));
        s.handle_pointer_event(&PointerEvent::moved(1, 11.0, 11.0, 3));
        s.handle_pointer_event(&PointerEvent::up(0, 1.0, 1.0, 4));
        s.handle_pointer_event(&PointerEvent::up(1, 11.0, 11.0, 5));

        let m = s.memento().unwrap();
        assert_eq!(m.len(), 2);
        assert_eq!(m.current().unwrap().strokes.len(), 2);

        // The next gesture gets its own entry.
        draw_stroke(&mut s, 0, &[(3.0, 3.0)]);
        assert_eq!(s.memento().unwrap().len(), 3);
    }

    #[test]
    fn test_alternating_pointers_get_separate_entries() {
        let mut s = session();
        s.handle_pointer_event(&PointerEvent::down(0, 0.0, 0.0, 0));
        s.handle_pointer_event(&PointerEvent::down(1, 10.0, 10.0, 1));
        s.handle_pointer_event(&PointerEvent::up(0, 0.0, 0.0, 2));
        assert_eq!(s.memento().unwrap().len(), 2);

        // Pointer 1 stays down the whole time.
        s.handle_pointer_event(&PointerEvent::down(0, 20.0, 20.0, 3));
        s.handle_pointer_event(&PointerEvent::up(1, 10.0, 10.0, 4));
        assert_eq!(s.memento().unwrap().len(), 2);
        s.handle_pointer_event(&PointerEvent::up(0, 20.0, 20.0, 5));

        let m = s.memento().unwrap();
        assert_eq!(m.len(), 3);
        assert_eq!(m.current().unwrap().strokes.len(), 3);
    }

    #[test]
    fn test_history_rejected_mid_stroke() {
        let mut s = session();
        s.save();
        s.handle_pointer_event(&PointerEvent::down(0, 0.0, 0.0, 0));
        assert!(matches!(s.undo(), Err(SessionError::StrokeInProgress)));
        assert!(matches!(s.redo(), Err(SessionError::StrokeInProgress)));
    }

    #[test]
    fn test_restore_applies_after_decode() {
        let decoder = Rc::new(ManualDecoder::default());
        let mut s = Session::with_decoder(
            RecordingSurface::new(8, 8),
            Options::default(),
            decoder.clone(),
        )
        .unwrap();
        draw_stroke(&mut s, 0, &[(0.0, 0.0), (1.0, 1.0)]);
        assert!(s.undo().unwrap());

        let waker = noop_waker();
        let mut cx = Context::from_waker(&waker);
        assert!(s.poll_pending(&mut cx).is_pending());
        // Nothing swapped yet.
        assert_eq!(s.strokes().len(), 1);

        decoder.release(Ok(Bitmap::new(8, 8)));
        assert!(s.poll_pending(&mut cx).is_ready());
        assert!(s.strokes().is_empty());
        assert!(s.drain_events().contains(&SessionEvent::MementoChange));
    }

    #[test]
    fn test_restores_apply_one_at_a_time_in_order() {
        let decoder = Rc::new(ManualDecoder::default());
        let mut s = Session::with_decoder(
            RecordingSurface::new(8, 8),
            Options::default(),
            decoder.clone(),
        )
        .unwrap();
        draw_stroke(&mut s, 0, &[(0.0, 0.0)]);
        draw_stroke(&mut s, 0, &[(2.0, 2.0)]);
        s.undo().unwrap();
        s.undo().unwrap();

        let waker = noop_waker();
        let mut cx = Context::from_waker(&waker);
        assert!(s.poll_pending(&mut cx).is_pending());
        // Only the first restore is decoding.
        assert_eq!(decoder.outstanding(), 1);

        decoder.release(Ok(Bitmap::new(8, 8)));
        assert!(s.poll_pending(&mut cx).is_pending());
        assert_eq!(s.strokes().len(), 1);
        assert_eq!(decoder.outstanding(), 1);

        decoder.release(Ok(Bitmap::new(8, 8)));
        assert!(s.poll_pending(&mut cx).is_ready());
        assert!(s.strokes().is_empty());
    }

    #[test]
    fn test_failed_restore_decode_still_swaps_data() {
        let decoder = Rc::new(ManualDecoder::default());
        let mut s = Session::with_decoder(
            RecordingSurface::new(8, 8),
            Options::default(),
            decoder.clone(),
        )
        .unwrap();
        draw_stroke(&mut s, 0, &[(0.0, 0.0), (1.0, 1.0)]);
        let calls_before = s.sketch().surface().calls().len();
        s.undo().unwrap();

        let waker = noop_waker();
        let mut cx = Context::from_waker(&waker);
        let _ = s.poll_pending(&mut cx);
        decoder.release(Err(BitmapError::Decode("broken".into())));
        assert!(s.poll_pending(&mut cx).is_ready());

        assert!(s.strokes().is_empty());
        assert_eq!(*s.log(), s.state().unwrap().log);
        assert!(!s.sketch().surface().calls()[calls_before..]
            .iter()
            .any(|c| matches!(c, SurfaceCall::DrawImage { .. } | SurfaceCall::ClearRect(_))));
    }

    #[test]
    fn test_restore_cancels_open_strokes() {
        let mut s = session();
        s.save();
        s.handle_pointer_event(&PointerEvent::down(0, 0.0, 0.0, 0));
        assert!(s.restore(None));
        settle(&mut s);
        assert!(!s.capture().is_drawing());
        assert_eq!(
            s.handle_pointer_event(&PointerEvent::up(0, 0.0, 0.0, 1)),
            CaptureOutcome::Ignored
        );
    }

    #[test]
    fn test_input_ignored_while_restore_pending() {
        let mut s = session();
        draw_stroke(&mut s, 0, &[(0.0, 0.0), (1.0, 1.0)]);
        draw_stroke(&mut s, 0, &[(2.0, 2.0), (3.0, 3.0)]);
        assert!(s.undo().unwrap());
        assert!(s.is_restoring());

        assert_eq!(
            s.handle_pointer_event(&PointerEvent::down(0, 5.0, 5.0, 0)),
            CaptureOutcome::Ignored
        );
        s.handle_pointer_event(&PointerEvent::moved(0, 6.0, 6.0, 1));
        s.handle_pointer_event(&PointerEvent::up(0, 6.0, 6.0, 2));
        settle(&mut s);

        let m = s.memento().unwrap();
        assert_eq!((m.len(), m.cursor()), (3, Some(1)));
        assert_eq!(*s.strokes(), s.state().unwrap().strokes);
        assert_eq!(*s.log(), s.state().unwrap().log);
        assert_eq!(s.strokes().len(), 1);

        // Input resumes once the restore has applied.
        assert!(!s.is_restoring());
        draw_stroke(&mut s, 0, &[(5.0, 5.0), (6.0, 6.0)]);
        assert_eq!(s.strokes().len(), 2);
    }

    #[test]
    fn test_save_after_undo_waits_for_restore() {
        let mut s = session();
        draw_stroke(&mut s, 0, &[(0.0, 0.0), (1.0, 1.0)]);
        draw_stroke(&mut s, 0, &[(2.0, 2.0), (3.0, 3.0)]);
        s.undo().unwrap();
        s.save();
        // Still queued behind the restore.
        assert_eq!(s.memento().unwrap().len(), 3);

        settle(&mut s);
        let m = s.memento().unwrap();
        assert_eq!((m.len(), m.cursor()), (3, Some(2)));
        assert_eq!(s.state().unwrap().strokes, *s.strokes());
        assert_eq!(s.strokes().len(), 1);
        assert!(!s.redo().unwrap());
    }

    #[test]
    fn test_save_deferred_while_image_pending() {
        let decoder = Rc::new(ManualDecoder::default());
        let mut s = Session::with_decoder(
            RecordingSurface::new(8, 8),
            Options::default(),
            decoder.clone(),
        )
        .unwrap();
        s.sketch_mut().draw_image("img", 0.0, 0.0);
        s.save();
        assert_eq!(s.memento().unwrap().len(), 1);

        let waker = noop_waker();
        let mut cx = Context::from_waker(&waker);
        assert!(s.poll_pending(&mut cx).is_pending());
        decoder.release(Ok(Bitmap::new(2, 2)));
        assert!(s.poll_pending(&mut cx).is_ready());

        let m = s.memento().unwrap();
        assert_eq!(m.len(), 2);
        assert_eq!(m.current().unwrap().log.pending_async(), 0);
    }

    #[test]
    fn test_log_replay_reproduces_surface_calls() {
        let mut s = session();
        draw_stroke(&mut s, 0, &[(0.0, 0.0), (4.0, 4.0), (8.0, 2.0)]);
        s.handle_pointer_event(&PointerEvent::down(1, 20.0, 20.0, 0));
        s.handle_pointer_event(&PointerEvent::down(0, 30.0, 5.0, 1));
        s.handle_pointer_event(&PointerEvent::moved(1, 22.0, 25.0, 2));
        s.handle_pointer_event(&PointerEvent::moved(0, 31.0, 9.0, 3));
        s.handle_pointer_event(&PointerEvent::up(1, 22.0, 25.0, 4));
        s.handle_pointer_event(&PointerEvent::up(0, 31.0, 9.0, 5));
        s.sketch_mut()
            .save()
            .line_width(7.0)
            .fill_style(StyleColor::rgb(0, 128, 255))
            .fill_rect(1.0, 1.0, 6.0, 4.0)
            .stroke_circle(10.0, 10.0, 2.0)
            .restore();
        draw_stroke(&mut s, 0, &[(40.0, 40.0), (44.0, 41.0)]);
        settle(&mut s);

        let recorded = s.sketch_mut().surface_mut().take_calls();
        assert!(s.sketch().surface().calls().is_empty());
        assert!(recorded.iter().any(|c| matches!(c, SurfaceCall::FillCircle(..))));
        assert!(recorded.contains(&SurfaceCall::SetProperty(StyleProperty::LineWidth(7.0))));

        let mut fresh = Sketch::new(RecordingSurface::new(64, 48)).unwrap();
        fresh.replay(s.log());
        assert_eq!(fresh.log(), s.log());
        assert_eq!(fresh.surface().calls(), recorded.as_slice());
        assert_eq!(fresh.graphics(), s.sketch().graphics());
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut s = session();
        draw_stroke(&mut s, 0, &[(0.0, 0.0), (3.0, 3.0)]);
        draw_stroke(&mut s, 0, &[(1.0, 0.0), (3.0, 4.0)]);
        s.drain_events();
        s.clear();

        assert!(s.strokes().is_empty());
        let m = s.memento().unwrap();
        assert_eq!((m.len(), m.cursor()), (1, Some(0)));
        let blank = s.state().unwrap();
        assert!(blank.strokes.is_empty());
        assert!(!blank.log.iter().any(|c| matches!(c, Command::Call(_))));
        assert_eq!(
            s.drain_events(),
            vec![
                SessionEvent::Cleared,
                SessionEvent::MementoReset,
                SessionEvent::MementoSave { coalesced: false }
            ]
        );
    }

    #[test]
    fn test_set_strokes_redraws() {
        let mut s = session();
        draw_stroke(&mut s, 0, &[(0.0, 0.0), (1.0, 1.0), (2.0, 2.0)]);
        let strokes = s.strokes().clone();
        let log = s.log().clone();

        let mut fresh = session();
        fresh.set_strokes(strokes.clone());
        assert_eq!(*fresh.strokes(), strokes);
        let segments = |l: &CommandLog| {
            l.iter()
                .filter(|c| matches!(c, Command::Call(Primitive::LineTo { .. })))
                .count()
        };
        assert_eq!(segments(fresh.log()), segments(&log));
    }

    #[test]
    fn test_redraw_skips_pen_up_strokes_unless_recording() {
        let mut s = session();
        let pen_up = vec![
            crate::point::Point::new(0.0, 0.0, 0, false, PointerId(0)),
            crate::point::Point::new(5.0, 0.0, 1, false, PointerId(0)),
        ];
        s.set_strokes(vec![pen_up.clone()]);
        assert!(!s.log().iter().any(|c| matches!(c, Command::Call(Primitive::LineTo { .. }))));

        let mut s = Session::new(
            RecordingSurface::new(10, 10),
            Options { record_pen_up_movements: true, ..Options::default() },
        )
        .unwrap();
        s.set_strokes(vec![pen_up]);
        assert!(s.log().iter().any(|c| *c
            == Command::SetProperty(StyleProperty::StrokeStyle(
                s.options().pen_up_style().stroke_style
            ))));
        assert!(s.log().iter().any(|c| matches!(c, Command::Call(Primitive::LineTo { .. }))));
    }

    #[test]
    fn test_json_round_trip_through_load() {
        let mut s = session();
        draw_stroke(&mut s, 0, &[(0.0, 0.0), (4.0, 4.0)]);
        let json = s.to_json().unwrap();

        let mut other = session();
        other.load_json(&json).unwrap();
        settle(&mut other);
        assert_eq!(other.strokes(), s.strokes());
        assert_eq!(other.log(), s.log());
        assert_eq!(other.to_json().unwrap(), json);
    }

    #[test]
    fn test_load_rejects_bad_json() {
        let mut s = session();
        assert!(matches!(s.load_json("not json"), Err(SessionError::Serialize(_))));
    }

    #[test]
    fn test_animation_events_and_cancel() {
        let mut s = session();
        draw_stroke(&mut s, 0, &[(0.0, 0.0), (1.0, 1.0), (2.0, 2.0)]);
        s.drain_events();

        let mut anim = s.animate();
        while s.step_animation(&mut anim) {}
        let events = s.drain_events();
        assert_eq!(events.first(), Some(&SessionEvent::AnimationStart));
        assert_eq!(events.last(), Some(&SessionEvent::AnimationEnd));

        let mut anim = s.animate();
        s.clear();
        assert!(!s.step_animation(&mut anim));
    }
}
