//! Raster adapter: every drawing call is applied to the surface and appended to the log.

use crate::bitmap::{Bitmap, BitmapResult, BoxFuture, DataUrlDecoder, ImageDecoder};
use crate::color::StyleColor;
use crate::command::{Command, CommandLog, Primitive};
use crate::style::{GraphicsState, LineCap, LineJoin, StyleProperty};
use crate::surface::RasterSurface;
use kurbo::Rect;
use std::future::Future;
use std::rc::Rc;
use std::task::{Context, Poll};
use thiserror::Error;

/// Sketch construction errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SketchError {
    #[error("Drawing surface has zero size ({0}x{1})")]
    EmptySurface(u32, u32),
}

/// Result type for sketch construction.
pub type SketchResult<T> = Result<T, SketchError>;

/// An image draw waiting for its decode.
struct PendingImage {
    src: String,
    x: f64,
    y: f64,
    size: Option<(f64, f64)>,
    /// Replays during a load draw without touching the log.
    logged: bool,
    decode: BoxFuture<'static, BitmapResult<Bitmap>>,
}

/// Drawing adapter over a [`RasterSurface`].
///
/// Owns the command log for its surface. Convenience calls (`line`,
/// `curve`, `background`, `line_style`) expand into logged primitives so the
/// log only ever contains [`Primitive`]s and whitelisted properties.
pub struct Sketch<S: RasterSurface> {
    surface: S,
    log: CommandLog,
    graphics: GraphicsState,
    fill_stack: Vec<StyleColor>,
    state_stack: Vec<GraphicsState>,
    decoder: Rc<dyn ImageDecoder>,
    pending: Vec<PendingImage>,
}

impl<S: RasterSurface> std::fmt::Debug for Sketch<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sketch")
            .field("size", &self.surface.size())
            .field("log_len", &self.log.len())
            .field("graphics", &self.graphics)
            .field("pending", &self.pending.len())
            .finish()
    }
}

impl<S: RasterSurface> Sketch<S> {
    /// Wrap a surface, decoding images from PNG data URLs.
    pub fn new(surface: S) -> SketchResult<Self> {
        Self::with_decoder(surface, Rc::new(DataUrlDecoder))
    }

    pub fn with_decoder(surface: S, decoder: Rc<dyn ImageDecoder>) -> SketchResult<Self> {
        let (w, h) = surface.size();
        if w == 0 || h == 0 {
            return Err(SketchError::EmptySurface(w, h));
        }
        Ok(Self {
            surface,
            log: CommandLog::new(),
            graphics: GraphicsState::default(),
            fill_stack: Vec::new(),
            state_stack: Vec::new(),
            decoder,
            pending: Vec::new(),
        })
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn into_surface(self) -> S {
        self.surface
    }

    pub fn size(&self) -> (u32, u32) {
        self.surface.size()
    }

    pub fn log(&self) -> &CommandLog {
        &self.log
    }

    pub fn graphics(&self) -> &GraphicsState {
        &self.graphics
    }

    pub fn decoder(&self) -> Rc<dyn ImageDecoder> {
        Rc::clone(&self.decoder)
    }

    // --- Style ---

    pub fn set_property(&mut self, property: StyleProperty) -> &mut Self {
        self.graphics.apply(&property);
        self.surface.set_property(&property);
        self.log.push(property);
        self
    }

    pub fn fill_style(&mut self, color: StyleColor) -> &mut Self {
        self.set_property(StyleProperty::FillStyle(color))
    }

    pub fn stroke_style(&mut self, color: StyleColor) -> &mut Self {
        self.set_property(StyleProperty::StrokeStyle(color))
    }

    pub fn line_width(&mut self, width: f64) -> &mut Self {
        self.set_property(StyleProperty::LineWidth(width))
    }

    pub fn line_cap(&mut self, cap: LineCap) -> &mut Self {
        self.set_property(StyleProperty::LineCap(cap))
    }

    pub fn line_join(&mut self, join: LineJoin) -> &mut Self {
        self.set_property(StyleProperty::LineJoin(join))
    }

    pub fn miter_limit(&mut self, limit: f64) -> &mut Self {
        self.set_property(StyleProperty::MiterLimit(limit))
    }

    /// Set stroke color and width together.
    pub fn line_style(&mut self, color: StyleColor, width: f64) -> &mut Self {
        self.stroke_style(color).line_width(width)
    }

    /// Push the fill color and switch to `color`.
    pub fn begin_fill(&mut self, color: StyleColor) -> &mut Self {
        self.fill_stack.push(self.graphics.fill_style);
        self.fill_style(color)
    }

    /// Return to the fill color saved by the matching [`begin_fill`](Self::begin_fill).
    pub fn end_fill(&mut self) -> &mut Self {
        match self.fill_stack.pop() {
            Some(previous) if previous != self.graphics.fill_style => self.fill_style(previous),
            Some(_) => self,
            None => {
                log::trace!("end_fill without begin_fill");
                self
            }
        }
    }

    /// Push every whitelisted property.
    pub fn save(&mut self) -> &mut Self {
        self.state_stack.push(self.graphics);
        self
    }

    /// Pop the properties pushed by [`save`](Self::save), logging each one that changed.
    pub fn restore(&mut self) -> &mut Self {
        if let Some(saved) = self.state_stack.pop() {
            for property in self.graphics.diff(&saved) {
                self.set_property(property);
            }
        }
        self
    }

    // --- Primitives ---

    /// Apply and log a primitive.
    pub fn call(&mut self, primitive: Primitive) -> &mut Self {
        if let Primitive::DrawImage { src, x, y, width, height } = primitive {
            return self.draw_image_sized(&src, x, y, Some((width, height)));
        }
        self.apply(&primitive);
        self.log.push(primitive);
        self
    }

    pub fn begin_path(&mut self) -> &mut Self {
        self.call(Primitive::BeginPath)
    }

    pub fn close_path(&mut self) -> &mut Self {
        self.call(Primitive::ClosePath)
    }

    pub fn move_to(&mut self, x: f64, y: f64) -> &mut Self {
        self.call(Primitive::MoveTo { x, y })
    }

    pub fn line_to(&mut self, x: f64, y: f64) -> &mut Self {
        self.call(Primitive::LineTo { x, y })
    }

    pub fn quadratic_curve_to(&mut self, cpx: f64, cpy: f64, x: f64, y: f64) -> &mut Self {
        self.call(Primitive::QuadraticCurveTo { cpx, cpy, x, y })
    }

    pub fn stroke(&mut self) -> &mut Self {
        self.call(Primitive::Stroke)
    }

    pub fn fill(&mut self) -> &mut Self {
        self.call(Primitive::Fill)
    }

    pub fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64) -> &mut Self {
        self.call(Primitive::FillRect { x, y, width, height })
    }

    pub fn stroke_rect(&mut self, x: f64, y: f64, width: f64, height: f64) -> &mut Self {
        self.call(Primitive::StrokeRect { x, y, width, height })
    }

    pub fn clear_rect(&mut self, x: f64, y: f64, width: f64, height: f64) -> &mut Self {
        self.call(Primitive::ClearRect { x, y, width, height })
    }

    pub fn fill_circle(&mut self, x: f64, y: f64, radius: f64) -> &mut Self {
        self.call(Primitive::FillCircle { x, y, radius })
    }

    pub fn stroke_circle(&mut self, x: f64, y: f64, radius: f64) -> &mut Self {
        self.call(Primitive::StrokeCircle { x, y, radius })
    }

    /// Path segment from `(x1, y1)` to `(x2, y2)`. The caller strokes it.
    pub fn line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64) -> &mut Self {
        self.move_to(x1, y1).line_to(x2, y2)
    }

    /// Quadratic segment from `(x1, y1)` to `(x2, y2)` through control point `(cpx, cpy)`.
    pub fn curve(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, cpx: f64, cpy: f64) -> &mut Self {
        self.move_to(x1, y1).quadratic_curve_to(cpx, cpy, x2, y2)
    }

    /// Fill the whole surface with `color`, keeping the current fill style.
    pub fn background(&mut self, color: StyleColor) -> &mut Self {
        let bounds = self.surface.bounds();
        self.begin_fill(color)
            .fill_rect(bounds.x0, bounds.y0, bounds.width(), bounds.height())
            .end_fill()
    }

    /// Queue an image draw at its natural size.
    ///
    /// `AsyncBegin` is logged now; `drawImage` and `AsyncEnd` follow once
    /// [`poll_images`](Self::poll_images) sees the decode finish.
    pub fn draw_image(&mut self, src: &str, x: f64, y: f64) -> &mut Self {
        self.draw_image_sized(src, x, y, None)
    }

    pub fn draw_image_sized(
        &mut self,
        src: &str,
        x: f64,
        y: f64,
        size: Option<(f64, f64)>,
    ) -> &mut Self {
        self.log.push(Command::AsyncBegin);
        self.queue_image(src, x, y, size, true);
        self
    }

    fn queue_image(&mut self, src: &str, x: f64, y: f64, size: Option<(f64, f64)>, logged: bool) {
        let decode = self.decoder.decode(src);
        self.pending.push(PendingImage {
            src: src.to_string(),
            x,
            y,
            size,
            logged,
            decode,
        });
    }

    /// Number of image decodes still in flight.
    pub fn pending_async(&self) -> usize {
        self.pending.len()
    }

    /// Drive pending decodes. Completed draws are applied and logged in
    /// completion order. Ready once nothing is in flight.
    pub fn poll_images(&mut self, cx: &mut Context<'_>) -> Poll<()> {
        let mut i = 0;
        while i < self.pending.len() {
            let result = match self.pending[i].decode.as_mut().poll(cx) {
                Poll::Ready(result) => result,
                Poll::Pending => {
                    i += 1;
                    continue;
                }
            };
            let image = self.pending.remove(i);
            self.finish_image(image, result);
        }
        if self.pending.is_empty() {
            Poll::Ready(())
        } else {
            Poll::Pending
        }
    }

    fn finish_image(&mut self, image: PendingImage, result: BitmapResult<Bitmap>) {
        match result {
            Ok(bitmap) => {
                let (width, height) = image
                    .size
                    .unwrap_or((f64::from(bitmap.width()), f64::from(bitmap.height())));
                let dest = Rect::new(image.x, image.y, image.x + width, image.y + height);
                self.surface.draw_image(&bitmap, dest);
                if image.logged {
                    self.log.push(Primitive::DrawImage {
                        src: image.src,
                        x: image.x,
                        y: image.y,
                        width,
                        height,
                    });
                }
            }
            Err(e) => log::warn!("Image decode failed, skipping draw: {}", e),
        }
        if image.logged {
            self.log.push(Command::AsyncEnd);
        }
    }

    // --- Replay and state replacement ---

    /// Re-execute `log` through this sketch, logging as it goes.
    ///
    /// Async markers are regenerated by the re-queued image draws.
    /// Entries this build does not understand are skipped.
    pub fn replay(&mut self, log: &CommandLog) {
        for command in log {
            match command {
                Command::SetProperty(property) => {
                    self.set_property(*property);
                }
                Command::Call(primitive) => {
                    self.call(primitive.clone());
                }
                Command::AsyncBegin | Command::AsyncEnd => {}
                Command::Unsupported(raw) => {
                    log::warn!("Skipping unsupported command during replay: {:?}", raw);
                }
            }
        }
    }

    /// Draw `log` onto the surface and then adopt it verbatim as this sketch's log.
    pub fn load(&mut self, log: CommandLog) {
        self.reset_state();
        for command in &log {
            match command {
                Command::SetProperty(property) => {
                    self.graphics.apply(property);
                    self.surface.set_property(property);
                }
                Command::Call(Primitive::DrawImage { src, x, y, width, height }) => {
                    self.queue_image(src, *x, *y, Some((*width, *height)), false);
                }
                Command::Call(primitive) => self.apply(primitive),
                Command::AsyncBegin | Command::AsyncEnd => {}
                Command::Unsupported(raw) => {
                    log::warn!("Skipping unsupported command during load: {:?}", raw);
                }
            }
        }
        self.log = log;
    }

    /// Clear the surface and log.
    ///
    /// In-flight decodes are dropped so their draws never land. The fresh log
    /// starts with whatever properties differ from the canvas defaults, so it
    /// replays to the same graphics state.
    pub fn clear(&mut self) -> &mut Self {
        self.reset_state();
        let bounds = self.surface.bounds();
        self.surface.clear_rect(bounds);
        self.log.clear();
        for property in GraphicsState::default().diff(&self.graphics) {
            self.log.push(property);
        }
        self
    }

    /// Replace surface contents and log with a snapshot's.
    ///
    /// With `image == None` the surface is left untouched.
    pub fn restore_snapshot(&mut self, image: Option<&Bitmap>, log: CommandLog) {
        self.reset_state();
        if let Some(image) = image {
            let bounds = self.surface.bounds();
            self.surface.clear_rect(bounds);
            self.surface.draw_image(image, bounds);
        }
        self.adopt_graphics(&log);
        self.log = log;
    }

    fn reset_state(&mut self) {
        if !self.pending.is_empty() {
            log::debug!("Dropping {} pending image decodes", self.pending.len());
        }
        self.pending.clear();
        self.fill_stack.clear();
        self.state_stack.clear();
    }

    /// Bring the live graphics state in line with the end state of `log`.
    fn adopt_graphics(&mut self, log: &CommandLog) {
        let mut target = GraphicsState::default();
        for command in log {
            if let Command::SetProperty(property) = command {
                target.apply(property);
            }
        }
        for property in self.graphics.diff(&target) {
            self.surface.set_property(&property);
        }
        self.graphics = target;
    }

    fn apply(&mut self, primitive: &Primitive) {
        let s = &mut self.surface;
        match *primitive {
            Primitive::MoveTo { x, y } => s.move_to(x, y),
            Primitive::LineTo { x, y } => s.line_to(x, y),
            Primitive::QuadraticCurveTo { cpx, cpy, x, y } => s.quadratic_curve_to(cpx, cpy, x, y),
            Primitive::BeginPath => s.begin_path(),
            Primitive::ClosePath => s.close_path(),
            Primitive::Stroke => s.stroke(),
            Primitive::Fill => s.fill(),
            Primitive::FillRect { x, y, width, height } => {
                s.fill_rect(Rect::new(x, y, x + width, y + height))
            }
            Primitive::StrokeRect { x, y, width, height } => {
                s.stroke_rect(Rect::new(x, y, x + width, y + height))
            }
            Primitive::ClearRect { x, y, width, height } => {
                s.clear_rect(Rect::new(x, y, x + width, y + height))
            }
            Primitive::FillCircle { x, y, radius } => s.fill_circle(x, y, radius),
            Primitive::StrokeCircle { x, y, radius } => s.stroke_circle(x, y, radius),
            // Image draws always go through the decode queue.
            Primitive::DrawImage { .. } => {}
        }
    }
}
