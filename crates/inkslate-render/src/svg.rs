//! SVG rendering of a command log.
//!
//! The log is read from the start against a shadow graphics state. Path
//! calls accumulate `d` segments until `closePath` flushes them as one
//! stroked `<path>`; rects, circles and images become elements directly.

use crate::renderer::{LogRenderer, RenderResult, covers, ensure_settled};
use inkslate_core::color::StyleColor;
use inkslate_core::command::{Command, CommandLog, Primitive};
use inkslate_core::session::Session;
use inkslate_core::style::GraphicsState;
use inkslate_core::surface::RasterSurface;
use kurbo::Rect;
use std::fmt::Write;

/// Renders logs as standalone SVG 1.1 documents.
#[derive(Debug, Clone)]
pub struct SvgRenderer {
    width: u32,
    height: u32,
    description: String,
}

impl SvgRenderer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            description: "Created with Inkslate".to_string(),
        }
    }

    /// Text for the `<desc>` element.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    fn bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, f64::from(self.width), f64::from(self.height))
    }

    fn elements(&self, log: &CommandLog) -> Vec<String> {
        let mut graphics = GraphicsState::default();
        let mut elements = Vec::new();
        let mut d = String::new();

        for command in log {
            let primitive = match command {
                Command::SetProperty(property) => {
                    graphics.apply(property);
                    continue;
                }
                Command::Call(primitive) => primitive,
                Command::AsyncBegin | Command::AsyncEnd => continue,
                Command::Unsupported(raw) => {
                    log::warn!("Skipping unsupported command in SVG output: {:?}", raw);
                    continue;
                }
            };

            match primitive {
                Primitive::BeginPath => d.clear(),
                Primitive::MoveTo { x, y } => push_segment(&mut d, 'M', &[*x, *y]),
                Primitive::LineTo { x, y } => push_segment(&mut d, 'L', &[*x, *y]),
                Primitive::QuadraticCurveTo { cpx, cpy, x, y } => {
                    push_segment(&mut d, 'Q', &[*cpx, *cpy, *x, *y])
                }
                Primitive::ClosePath => {
                    if !d.is_empty() {
                        elements.push(format!(
                            r#"<path fill="none"{} d="{}"/>"#,
                            stroke_attrs(&graphics),
                            d
                        ));
                        d.clear();
                    }
                }
                Primitive::Stroke | Primitive::Fill => {}
                Primitive::FillRect { x, y, width, height } => elements.push(format!(
                    r#"<rect stroke="none" x="{}" y="{}" width="{}" height="{}"{}/>"#,
                    x,
                    y,
                    width,
                    height,
                    paint_attrs("fill", graphics.fill_style)
                )),
                Primitive::StrokeRect { x, y, width, height } => elements.push(format!(
                    r#"<rect fill="none" x="{}" y="{}" width="{}" height="{}"{}/>"#,
                    x,
                    y,
                    width,
                    height,
                    stroke_attrs(&graphics)
                )),
                Primitive::ClearRect { x, y, width, height } => {
                    let rect = Rect::new(*x, *y, x + width, y + height).abs();
                    if covers(rect, self.bounds()) {
                        elements.clear();
                    } else {
                        log::warn!("Partial clearRect has no SVG equivalent, ignoring");
                    }
                }
                Primitive::FillCircle { x, y, radius } => elements.push(format!(
                    r#"<circle stroke="none" cx="{}" cy="{}" r="{}"{}/>"#,
                    x,
                    y,
                    radius,
                    paint_attrs("fill", graphics.fill_style)
                )),
                Primitive::StrokeCircle { x, y, radius } => elements.push(format!(
                    r#"<circle fill="none" cx="{}" cy="{}" r="{}"{}/>"#,
                    x,
                    y,
                    radius,
                    stroke_attrs(&graphics)
                )),
                Primitive::DrawImage { src, x, y, width, height } => elements.push(format!(
                    r#"<image preserveAspectRatio="none" width="{}" height="{}" transform="translate({}, {})" xlink:href="{}"/>"#,
                    width,
                    height,
                    x,
                    y,
                    escape(src)
                )),
            }
        }
        elements
    }
}

impl LogRenderer for SvgRenderer {
    type Output = String;

    fn render(&mut self, log: &CommandLog) -> RenderResult<String> {
        ensure_settled(log)?;
        let elements = self.elements(log);
        let (w, h) = (self.width, self.height);

        let mut out = String::new();
        out.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="no"?>"#);
        out.push('\n');
        out.push_str(r#"<!DOCTYPE svg PUBLIC "-//W3C//DTD SVG 1.1//EN" "http://www.w3.org/Graphics/SVG/1.1/DTD/svg11.dtd">"#);
        out.push('\n');
        let _ = writeln!(
            out,
            r#"<svg version="1.1" xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#
        );
        let _ = writeln!(out, "<desc>{}</desc>", escape(&self.description));
        out.push_str("<defs/>\n<g>\n");
        for element in elements {
            out.push_str(&element);
            out.push('\n');
        }
        out.push_str("</g>\n</svg>\n");
        Ok(out)
    }
}

fn push_segment(d: &mut String, op: char, coords: &[f64]) {
    if !d.is_empty() {
        d.push(' ');
    }
    d.push(op);
    for c in coords {
        let _ = write!(d, " {}", c);
    }
}

/// `name="#rrggbb"` plus `name-opacity` for translucent colors.
fn paint_attrs(name: &str, color: StyleColor) -> String {
    let mut attrs = format!(
        r##" {}="#{:02x}{:02x}{:02x}""##,
        name, color.r, color.g, color.b
    );
    if color.a < 255 {
        let _ = write!(attrs, r#" {}-opacity="{}""#, name, color.alpha_f64());
    }
    attrs
}

fn stroke_attrs(graphics: &GraphicsState) -> String {
    format!(
        r#"{} stroke-width="{}" stroke-linecap="{}" stroke-linejoin="{}" stroke-miterlimit="{}""#,
        paint_attrs("stroke", graphics.stroke_style),
        graphics.line_width,
        graphics.line_cap.as_str(),
        graphics.line_join.as_str(),
        graphics.miter_limit
    )
}

/// Escape text for use in XML attribute values and content.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// A one-shot export request.
///
/// Keep calling [`poll`](Self::poll) as the log changes; the document is
/// produced once, the first time the log has no pending image draws.
#[derive(Debug, Clone)]
pub struct SvgExport {
    renderer: SvgRenderer,
    done: bool,
}

impl SvgExport {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            renderer: SvgRenderer::new(width, height),
            done: false,
        }
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn poll(&mut self, log: &CommandLog) -> Option<String> {
        if self.done || log.pending_async() > 0 {
            return None;
        }
        let svg = self.renderer.render(log).ok()?;
        self.done = true;
        Some(svg)
    }
}

/// Wait for the session's image draws, deferred saves and restores, then
/// render its log sized to its surface.
pub async fn export_svg<S: RasterSurface>(session: &mut Session<S>) -> RenderResult<String> {
    session.settle().await;
    let (width, height) = session.sketch().size();
    SvgRenderer::new(width, height).render(session.log())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::RendererError;
    use inkslate_core::bitmap::Bitmap;
    use inkslate_core::input::PointerEvent;
    use inkslate_core::options::Options;
    use inkslate_core::sketch::Sketch;
    use inkslate_core::surface::RecordingSurface;

    fn sketch() -> Sketch<RecordingSurface> {
        Sketch::new(RecordingSurface::new(100, 50)).unwrap()
    }

    fn render(log: &CommandLog) -> String {
        SvgRenderer::new(100, 50).render(log).unwrap()
    }

    #[test]
    fn test_document_frame() {
        let svg = render(&CommandLog::new());
        assert!(svg.starts_with("<?xml version=\"1.0\""));
        assert!(svg.contains("<!DOCTYPE svg PUBLIC \"-//W3C//DTD SVG 1.1//EN\""));
        assert!(svg.contains(r#"width="100" height="50" viewBox="0 0 100 50""#));
        assert!(svg.contains("<desc>Created with Inkslate</desc>"));
        assert!(svg.contains("<defs/>\n<g>\n</g>"));
    }

    #[test]
    fn test_segment_becomes_path() {
        let mut sk = sketch();
        sk.line_style(StyleColor::rgb(255, 0, 255), 3.0)
            .begin_path()
            .line(1.0, 2.0, 3.5, 4.0)
            .stroke()
            .close_path();
        let svg = render(sk.log());
        assert!(svg.contains(
            r##"<path fill="none" stroke="#ff00ff" stroke-width="3" stroke-linecap="butt" stroke-linejoin="miter" stroke-miterlimit="10" d="M 1 2 L 3.5 4"/>"##
        ));
    }

    #[test]
    fn test_begin_path_discards_unflushed_segments() {
        let mut sk = sketch();
        sk.begin_path().move_to(0.0, 0.0).line_to(9.0, 9.0);
        sk.begin_path().move_to(5.0, 5.0).quadratic_curve_to(6.0, 7.0, 8.0, 9.0).close_path();
        let svg = render(sk.log());
        assert_eq!(svg.matches("<path").count(), 1);
        assert!(svg.contains(r#"d="M 5 5 Q 6 7 8 9""#));
    }

    #[test]
    fn test_shapes_use_shadow_style() {
        let mut sk = sketch();
        sk.fill_style(StyleColor::new(0, 0, 255, 128))
            .fill_rect(1.0, 2.0, 3.0, 4.0)
            .fill_circle(5.0, 6.0, 7.0)
            .stroke_rect(0.0, 0.0, 2.0, 2.0)
            .stroke_circle(1.0, 1.0, 1.0);
        let svg = render(sk.log());
        assert!(svg.contains(
            r##"<rect stroke="none" x="1" y="2" width="3" height="4" fill="#0000ff" fill-opacity="0.50"##
        ));
        assert!(svg.contains(r##"<circle stroke="none" cx="5" cy="6" r="7" fill="#0000ff""##));
        assert!(svg.contains(r##"<rect fill="none" x="0" y="0" width="2" height="2" stroke="#000000""##));
        assert!(svg.contains(r##"<circle fill="none" cx="1" cy="1" r="1" stroke="#000000""##));
    }

    #[test]
    fn test_full_clear_discards_elements() {
        let mut sk = sketch();
        sk.fill_rect(0.0, 0.0, 5.0, 5.0).clear_rect(0.0, 0.0, 100.0, 50.0);
        sk.fill_circle(1.0, 1.0, 1.0);
        let svg = render(sk.log());
        assert!(!svg.contains("<rect"));
        assert!(svg.contains("<circle"));

        let mut sk = sketch();
        sk.fill_rect(0.0, 0.0, 5.0, 5.0).clear_rect(0.0, 0.0, 10.0, 10.0);
        assert!(render(sk.log()).contains("<rect"));
    }

    #[test]
    fn test_image_element_escapes_source() {
        let mut log = CommandLog::new();
        log.push(Primitive::DrawImage {
            src: "a.png?x=1&y=\"2\"".into(),
            x: 3.0,
            y: 4.0,
            width: 10.0,
            height: 20.0,
        });
        let svg = render(&log);
        assert!(svg.contains(
            r#"<image preserveAspectRatio="none" width="10" height="20" transform="translate(3, 4)" xlink:href="a.png?x=1&amp;y=&quot;2&quot;"/>"#
        ));
    }

    #[test]
    fn test_unsupported_commands_skipped() {
        let log: CommandLog = serde_json::from_value(serde_json::json!([
            {"method": "arc", "args": [1, 2, 3]},
            {"method": "fillRect", "args": [0, 0, 1, 1]},
        ]))
        .unwrap();
        let svg = render(&log);
        assert_eq!(svg.matches("<rect").count(), 1);
    }

    #[test]
    fn test_pending_async_refused() {
        let mut log = CommandLog::new();
        log.push(Command::AsyncBegin);
        assert!(matches!(
            SvgRenderer::new(1, 1).render(&log),
            Err(RendererError::PendingAsync(1))
        ));

        let mut export = SvgExport::new(1, 1);
        assert!(export.poll(&log).is_none());
        log.push(Command::AsyncEnd);
        assert!(export.poll(&log).is_some());
        assert!(export.is_done());
        assert!(export.poll(&log).is_none());
    }

    #[test]
    fn test_export_waits_for_session_images() {
        let mut session = Session::new(RecordingSurface::new(40, 30), Options::default()).unwrap();
        session.handle_pointer_event(&PointerEvent::down(0, 1.0, 1.0, 0));
        session.handle_pointer_event(&PointerEvent::moved(0, 5.0, 5.0, 1));
        session.handle_pointer_event(&PointerEvent::up(0, 5.0, 5.0, 2));
        let url = Bitmap::new(2, 2).to_data_url().unwrap();
        session.sketch_mut().draw_image(&url, 0.0, 0.0);
        assert_eq!(session.pending_async(), 1);

        let svg = pollster::block_on(export_svg(&mut session)).unwrap();
        assert!(svg.contains(r#"viewBox="0 0 40 30""#));
        assert_eq!(svg.matches("<path").count(), 1);
        assert!(svg.contains("<image"));
    }

    #[test]
    fn test_animated_strokes_export_every_segment() {
        let mut session = Session::new(RecordingSurface::new(40, 30), Options::default()).unwrap();
        session.handle_pointer_event(&PointerEvent::down(0, 1.0, 1.0, 0));
        session.handle_pointer_event(&PointerEvent::moved(0, 5.0, 5.0, 1));
        session.handle_pointer_event(&PointerEvent::moved(0, 9.0, 2.0, 2));
        session.handle_pointer_event(&PointerEvent::up(0, 9.0, 2.0, 3));

        session.sketch_mut().clear();
        let mut animation = session.animate();
        while session.step_animation(&mut animation) {}

        let svg = pollster::block_on(export_svg(&mut session)).unwrap();
        assert_eq!(svg.matches("<path").count(), 2);
        assert!(svg.contains(r#"d="M 5 5 L 9 2""#));
    }
}
