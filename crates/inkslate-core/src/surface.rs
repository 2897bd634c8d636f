//! The raster surface seam and a headless recording implementation.

use crate::bitmap::Bitmap;
use crate::style::StyleProperty;
use kurbo::Rect;

/// A live raster drawing surface with 2D-canvas-like primitives.
///
/// Coordinates are surface-local pixels. Implementations keep their own
/// current path and style state; callers never read it back.
pub trait RasterSurface {
    /// Logical size in pixels.
    fn size(&self) -> (u32, u32);

    fn set_property(&mut self, property: &StyleProperty);

    fn begin_path(&mut self);
    fn close_path(&mut self);
    fn move_to(&mut self, x: f64, y: f64);
    fn line_to(&mut self, x: f64, y: f64);
    fn quadratic_curve_to(&mut self, cpx: f64, cpy: f64, x: f64, y: f64);

    /// Stroke the current path with the current stroke style.
    fn stroke(&mut self);
    /// Fill the current path with the current fill style.
    fn fill(&mut self);

    fn fill_rect(&mut self, rect: Rect);
    fn stroke_rect(&mut self, rect: Rect);
    fn clear_rect(&mut self, rect: Rect);
    fn fill_circle(&mut self, x: f64, y: f64, radius: f64);
    fn stroke_circle(&mut self, x: f64, y: f64, radius: f64);

    /// Draw `image` scaled into `dest`.
    fn draw_image(&mut self, image: &Bitmap, dest: Rect);

    /// Read back the current pixels.
    fn snapshot(&mut self) -> Bitmap;

    /// Whole-surface rectangle.
    fn bounds(&self) -> Rect {
        let (w, h) = self.size();
        Rect::new(0.0, 0.0, f64::from(w), f64::from(h))
    }
}

/// A call received by a [`RecordingSurface`].
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceCall {
    SetProperty(StyleProperty),
    BeginPath,
    ClosePath,
    MoveTo(f64, f64),
    LineTo(f64, f64),
    QuadraticCurveTo(f64, f64, f64, f64),
    Stroke,
    Fill,
    FillRect(Rect),
    StrokeRect(Rect),
    ClearRect(Rect),
    FillCircle(f64, f64, f64),
    StrokeCircle(f64, f64, f64),
    DrawImage { width: u32, height: u32, dest: Rect },
}

/// Headless surface that records every call it receives.
///
/// Its snapshot is a blank bitmap of the surface size.
#[derive(Debug, Clone)]
pub struct RecordingSurface {
    width: u32,
    height: u32,
    calls: Vec<SurfaceCall>,
}

impl RecordingSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            calls: Vec::new(),
        }
    }

    pub fn calls(&self) -> &[SurfaceCall] {
        &self.calls
    }

    pub fn take_calls(&mut self) -> Vec<SurfaceCall> {
        std::mem::take(&mut self.calls)
    }
}

impl RasterSurface for RecordingSurface {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn set_property(&mut self, property: &StyleProperty) {
        self.calls.push(SurfaceCall::SetProperty(*property));
    }

    fn begin_path(&mut self) {
        self.calls.push(SurfaceCall::BeginPath);
    }

    fn close_path(&mut self) {
        self.calls.push(SurfaceCall::ClosePath);
    }

    fn move_to(&mut self, x: f64, y: f64) {
        self.calls.push(SurfaceCall::MoveTo(x, y));
    }

    fn line_to(&mut self, x: f64, y: f64) {
        self.calls.push(SurfaceCall::LineTo(x, y));
    }

    fn quadratic_curve_to(&mut self, cpx: f64, cpy: f64, x: f64, y: f64) {
        self.calls.push(SurfaceCall::QuadraticCurveTo(cpx, cpy, x, y));
    }

    fn stroke(&mut self) {
        self.calls.push(SurfaceCall::Stroke);
    }

    fn fill(&mut self) {
        self.calls.push(SurfaceCall::Fill);
    }

    fn fill_rect(&mut self, rect: Rect) {
        self.calls.push(SurfaceCall::FillRect(rect));
    }

    fn stroke_rect(&mut self, rect: Rect) {
        self.calls.push(SurfaceCall::StrokeRect(rect));
    }

    fn clear_rect(&mut self, rect: Rect) {
        self.calls.push(SurfaceCall::ClearRect(rect));
    }

    fn fill_circle(&mut self, x: f64, y: f64, radius: f64) {
        self.calls.push(SurfaceCall::FillCircle(x, y, radius));
    }

    fn stroke_circle(&mut self, x: f64, y: f64, radius: f64) {
        self.calls.push(SurfaceCall::StrokeCircle(x, y, radius));
    }

    fn draw_image(&mut self, image: &Bitmap, dest: Rect) {
        self.calls.push(SurfaceCall::DrawImage {
            width: image.width(),
            height: image.height(),
            dest,
        });
    }

    fn snapshot(&mut self) -> Bitmap {
        Bitmap::new(self.width, self.height)
    }
}
