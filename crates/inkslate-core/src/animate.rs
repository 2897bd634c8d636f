//! Frame-by-frame replay of recorded strokes.

use crate::options::GraphicsOptions;
use crate::point::Strokes;
use crate::sketch::Sketch;
use crate::surface::RasterSurface;

/// Draws recorded strokes one segment per [`advance`](Self::advance) call.
///
/// Strokes are flattened into a single point sequence; a first-point marker
/// is drawn whenever a new stroke begins. Dropping the animation stops it.
#[derive(Debug, Clone)]
pub struct StrokeAnimation {
    /// `(stroke index, x, y)`
    points: Vec<(usize, f64, f64)>,
    frame: usize,
    finished: bool,
    pub(crate) epoch: u64,
}

impl StrokeAnimation {
    pub fn new(strokes: &Strokes) -> Self {
        let points = strokes
            .iter()
            .enumerate()
            .flat_map(|(i, stroke)| stroke.iter().map(move |p| (i, p.x, p.y)))
            .collect();
        Self {
            points,
            frame: 0,
            finished: false,
            epoch: 0,
        }
    }

    /// Total number of frames.
    pub fn frame_count(&self) -> usize {
        self.points.len().saturating_sub(1)
    }

    /// Frames drawn so far.
    pub fn frame(&self) -> usize {
        self.frame
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Draw the next frame. Returns `false` once there is nothing left to draw.
    pub fn advance<S: RasterSurface>(
        &mut self,
        sketch: &mut Sketch<S>,
        graphics: &GraphicsOptions,
    ) -> bool {
        if self.finished || self.frame + 1 >= self.points.len() {
            self.finished = true;
            return false;
        }
        let t = self.frame;
        let (curr_id, cx, cy) = self.points[t];
        let (next_id, nx, ny) = self.points[t + 1];

        let stroke_start = t == 0 || curr_id != next_id;
        if stroke_start && graphics.first_point_size > 0.0 {
            let (mx, my) = if t > 0 { (nx, ny) } else { (cx, cy) };
            sketch
                .begin_fill(graphics.stroke_style)
                .fill_circle(mx, my, graphics.first_point_size)
                .end_fill();
        }
        // Each frame is a closed path of its own.
        sketch.begin_path();
        if curr_id == next_id {
            sketch.line(cx, cy, nx, ny).stroke();
        }
        sketch.close_path();

        self.frame += 1;
        if self.frame + 1 >= self.points.len() {
            self.finished = true;
        }
        true
    }
}
