//! CPU raster backend built on `vello_cpu`.

use crate::decoder::ImageCrateDecoder;
use crate::renderer::{LogRenderer, RenderResult, RendererError, covers, ensure_settled};
use inkslate_core::bitmap::{Bitmap, ImageDecoder};
use inkslate_core::command::CommandLog;
use inkslate_core::sketch::Sketch;
use inkslate_core::style::{GraphicsState, StyleProperty};
use inkslate_core::surface::RasterSurface;
use kurbo::{Affine, BezPath, Circle, Point, Rect, Shape};
use peniko::{Blob, Color, ImageAlphaType, ImageData, ImageFormat, ImageSampler};
use std::rc::Rc;
use std::sync::Arc;
use vello_cpu::{Image as CpuImage, ImageSource, Pixmap, RenderContext, RenderMode, RenderSettings};

const CIRCLE_TOLERANCE: f64 = 0.1;

/// A [`RasterSurface`] rendered in software by `vello_cpu`.
///
/// `vello_cpu` records draws and rasterizes on demand, so reading pixels back
/// renders everything so far, then restarts the context with those pixels as
/// its base layer.
pub struct VelloCpuSurface {
    ctx: RenderContext,
    width: u16,
    height: u16,
    graphics: GraphicsState,
    path: BezPath,
    /// Current point, `None` until the path has a subpath.
    current: Option<Point>,
    subpath_start: Option<Point>,
    /// Set after `close_path`: the next segment must open a new subpath.
    needs_move: bool,
    /// Pixels from the last read-back, drawn first after a context reset.
    base: Option<ImageData>,
}

impl std::fmt::Debug for VelloCpuSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VelloCpuSurface")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("graphics", &self.graphics)
            .field("has_base", &self.base.is_some())
            .finish()
    }
}

impl VelloCpuSurface {
    /// Create a transparent surface. Both sides must be in `1..=65535`.
    pub fn new(width: u32, height: u32) -> RenderResult<Self> {
        let invalid = RendererError::InvalidSize { width, height };
        let (Ok(w), Ok(h)) = (u16::try_from(width), u16::try_from(height)) else {
            return Err(invalid);
        };
        if w == 0 || h == 0 {
            return Err(invalid);
        }
        let settings = RenderSettings {
            render_mode: RenderMode::OptimizeSpeed,
            ..RenderSettings::default()
        };
        Ok(Self {
            ctx: RenderContext::new_with(w, h, settings),
            width: w,
            height: h,
            graphics: GraphicsState::default(),
            path: BezPath::new(),
            current: None,
            subpath_start: None,
            needs_move: false,
            base: None,
        })
    }

    pub fn graphics(&self) -> &GraphicsState {
        &self.graphics
    }

    /// Drop recorded draws and repaint the base layer, if any.
    fn reset_context(&mut self) {
        self.ctx.reset();
        if let Some(base) = self.base.clone() {
            let bounds = self.bounds();
            self.paint_image(&base, bounds);
        }
    }

    fn paint_image(&mut self, data: &ImageData, dest: Rect) {
        if data.width == 0 || data.height == 0 {
            return;
        }
        let source = ImageSource::from_peniko_image_data(data);
        self.ctx.set_paint(CpuImage {
            image: source,
            sampler: ImageSampler::default(),
        });
        let sx = dest.width() / f64::from(data.width);
        let sy = dest.height() / f64::from(data.height);
        self.ctx
            .set_transform(Affine::translate((dest.x0, dest.y0)) * Affine::scale_non_uniform(sx, sy));
        self.ctx.fill_rect(&Rect::new(
            0.0,
            0.0,
            f64::from(data.width),
            f64::from(data.height),
        ));
        self.ctx.set_transform(Affine::IDENTITY);
    }

    fn use_fill(&mut self) {
        self.ctx.set_paint(Color::from(self.graphics.fill_style));
    }

    fn use_stroke(&mut self) {
        self.ctx.set_paint(Color::from(self.graphics.stroke_style));
        self.ctx.set_stroke(self.graphics.kurbo_stroke());
    }

    /// Rasterize everything drawn so far into straight-alpha RGBA.
    fn read_pixels(&mut self) -> Vec<u8> {
        self.ctx.flush();
        let mut pixmap = Pixmap::new(self.width, self.height);
        self.ctx.render_to_pixmap(&mut pixmap);
        let pixels = pixmap.take_unpremultiplied();
        let mut data = Vec::with_capacity(pixels.len() * 4);
        for p in pixels {
            data.extend_from_slice(&[p.r, p.g, p.b, p.a]);
        }
        data
    }

    /// Replace the surface contents with `data` and restart the context on it.
    fn rebase(&mut self, data: Vec<u8>) {
        self.base = Some(image_data(u32::from(self.width), u32::from(self.height), data));
        self.reset_context();
    }

    fn ensure_subpath(&mut self, x: f64, y: f64) {
        match self.current {
            None => {
                self.path.move_to((x, y));
                self.current = Some(Point::new(x, y));
                self.subpath_start = self.current;
                self.needs_move = false;
            }
            Some(p) if self.needs_move => {
                self.path.move_to(p);
                self.needs_move = false;
            }
            Some(_) => {}
        }
    }
}

fn image_data(width: u32, height: u32, data: Vec<u8>) -> ImageData {
    ImageData {
        data: Blob::new(Arc::new(data)),
        format: ImageFormat::Rgba8,
        alpha_type: ImageAlphaType::Alpha,
        width,
        height,
    }
}

impl RasterSurface for VelloCpuSurface {
    fn size(&self) -> (u32, u32) {
        (u32::from(self.width), u32::from(self.height))
    }

    fn set_property(&mut self, property: &StyleProperty) {
        self.graphics.apply(property);
    }

    fn begin_path(&mut self) {
        self.path = BezPath::new();
        self.current = None;
        self.subpath_start = None;
        self.needs_move = false;
    }

    fn close_path(&mut self) {
        if self.current.is_none() || self.needs_move {
            return;
        }
        self.path.close_path();
        self.current = self.subpath_start;
        self.needs_move = true;
    }

    fn move_to(&mut self, x: f64, y: f64) {
        self.path.move_to((x, y));
        self.current = Some(Point::new(x, y));
        self.subpath_start = self.current;
        self.needs_move = false;
    }

    fn line_to(&mut self, x: f64, y: f64) {
        if self.current.is_none() {
            // No current point: acts as a move.
            self.move_to(x, y);
            return;
        }
        self.ensure_subpath(x, y);
        self.path.line_to((x, y));
        self.current = Some(Point::new(x, y));
    }

    fn quadratic_curve_to(&mut self, cpx: f64, cpy: f64, x: f64, y: f64) {
        self.ensure_subpath(cpx, cpy);
        self.path.quad_to((cpx, cpy), (x, y));
        self.current = Some(Point::new(x, y));
    }

    fn stroke(&mut self) {
        if self.path.elements().is_empty() {
            return;
        }
        self.use_stroke();
        self.ctx.stroke_path(&self.path);
    }

    fn fill(&mut self) {
        if self.path.elements().is_empty() {
            return;
        }
        self.use_fill();
        self.ctx.fill_path(&self.path);
    }

    fn fill_rect(&mut self, rect: Rect) {
        self.use_fill();
        self.ctx.fill_rect(&rect);
    }

    fn stroke_rect(&mut self, rect: Rect) {
        self.use_stroke();
        self.ctx.stroke_rect(&rect);
    }

    fn clear_rect(&mut self, rect: Rect) {
        let bounds = self.bounds();
        let rect = rect.abs();
        if covers(rect, bounds) {
            self.base = None;
            self.reset_context();
            return;
        }
        let clip = rect.intersect(bounds);
        if clip.width() <= 0.0 || clip.height() <= 0.0 {
            return;
        }
        let mut data = self.read_pixels();
        let stride = usize::from(self.width) * 4;
        let (x0, x1) = (clip.x0.floor() as usize, clip.x1.ceil() as usize);
        for y in clip.y0.floor() as usize..clip.y1.ceil() as usize {
            data[y * stride + x0 * 4..y * stride + x1 * 4].fill(0);
        }
        self.rebase(data);
    }

    fn fill_circle(&mut self, x: f64, y: f64, radius: f64) {
        self.use_fill();
        self.ctx
            .fill_path(&Circle::new((x, y), radius).to_path(CIRCLE_TOLERANCE));
    }

    fn stroke_circle(&mut self, x: f64, y: f64, radius: f64) {
        self.use_stroke();
        self.ctx
            .stroke_path(&Circle::new((x, y), radius).to_path(CIRCLE_TOLERANCE));
    }

    fn draw_image(&mut self, image: &Bitmap, dest: Rect) {
        let data = image_data(image.width(), image.height(), image.data().to_vec());
        self.paint_image(&data, dest);
    }

    fn snapshot(&mut self) -> Bitmap {
        let data = self.read_pixels();
        let (w, h) = self.size();
        let bitmap = match Bitmap::from_rgba8(w, h, data.clone()) {
            Ok(bitmap) => bitmap,
            Err(e) => {
                log::warn!("Read-back produced a malformed buffer: {}", e);
                Bitmap::new(w, h)
            }
        };
        self.rebase(data);
        bitmap
    }
}

/// Renders a finished command log to PNG.
pub struct PngRenderer {
    width: u32,
    height: u32,
    decoder: Rc<dyn ImageDecoder>,
}

impl PngRenderer {
    /// Images are decoded with [`ImageCrateDecoder`].
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_decoder(width, height, Rc::new(ImageCrateDecoder::new()))
    }

    pub fn with_decoder(width: u32, height: u32, decoder: Rc<dyn ImageDecoder>) -> Self {
        Self {
            width,
            height,
            decoder,
        }
    }

    /// Replay `log` onto a fresh surface and read the pixels back.
    pub fn render_bitmap(&self, log: &CommandLog) -> RenderResult<Bitmap> {
        ensure_settled(log)?;
        let surface = VelloCpuSurface::new(self.width, self.height)?;
        let mut sketch = Sketch::with_decoder(surface, Rc::clone(&self.decoder)).map_err(|_| {
            RendererError::InvalidSize {
                width: self.width,
                height: self.height,
            }
        })?;
        sketch.load(log.clone());
        pollster::block_on(std::future::poll_fn(|cx| sketch.poll_images(cx)));
        log::debug!("Rendered {} commands to {}x{}", log.len(), self.width, self.height);
        Ok(sketch.surface_mut().snapshot())
    }
}

impl LogRenderer for PngRenderer {
    type Output = Vec<u8>;

    fn render(&mut self, log: &CommandLog) -> RenderResult<Vec<u8>> {
        let bitmap = self.render_bitmap(log)?;
        Ok(bitmap.encode_png()?)
    }
}
