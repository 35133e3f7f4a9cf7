use image::Rgba;

use crate::canvas::{Color, PixelBuffer};
use crate::ops::stroke::{draw_segment, CoverageMask};

/// Default stroke diameter in pixels.
pub const DEFAULT_LINE_WIDTH: f32 = 5.0;

/// What a pointer press does on the canvas.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Tool {
    #[default]
    Pencil,
    Eraser,
    Fill,
}

impl Tool {
    /// Composite mode of strokes drawn with this tool, `None` for tools that
    /// don't draw strokes.
    pub fn composite_mode(&self) -> Option<CompositeMode> {
        match self {
            Tool::Pencil => Some(CompositeMode::Paint),
            Tool::Eraser => Some(CompositeMode::Erase),
            Tool::Fill => None,
        }
    }
}

/// How a stroke combines with the pixels underneath it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum CompositeMode {
    /// Opaque source-over paint.
    #[default]
    Paint,
    /// Clear covered pixels to transparent.
    Erase,
}

/// Current tool settings of an editor session.
#[derive(Clone, Debug, PartialEq)]
pub struct ToolProperties {
    pub tool: Tool,
    pub color: Color,
    pub line_width: f32,
}

impl Default for ToolProperties {
    fn default() -> Self {
        Self {
            tool: Tool::Pencil,
            color: Rgba([0, 0, 0, 255]),
            line_width: DEFAULT_LINE_WIDTH,
        }
    }
}

// ============================================================================
// STROKE
// ============================================================================

/// A polyline drawn in one pointer gesture. Consumed into the buffer and not
/// kept afterwards.
#[derive(Clone, Debug, PartialEq)]
pub struct Stroke {
    pub points: Vec<(f32, f32)>,
    pub color: Color,
    pub width: f32,
    pub mode: CompositeMode,
}

impl Stroke {
    pub fn new(color: Color, width: f32, mode: CompositeMode) -> Self {
        Self {
            points: Vec::new(),
            color,
            width,
            mode,
        }
    }

    pub fn with_points(mut self, points: impl IntoIterator<Item = (f32, f32)>) -> Self {
        self.points.extend(points);
        self
    }

    /// Composite the whole stroke into `buffer`, each covered pixel once. A
    /// single point leaves a dot.
    pub fn apply(&self, buffer: &mut PixelBuffer) {
        let mut mask = CoverageMask::for_buffer(buffer);
        match self.points.as_slice() {
            [] => {}
            [p] => self.segment(buffer, &mut mask, *p, *p),
            pts => {
                for pair in pts.windows(2) {
                    self.segment(buffer, &mut mask, pair[0], pair[1]);
                }
            }
        }
    }

    fn segment(&self, buffer: &mut PixelBuffer, mask: &mut CoverageMask, from: (f32, f32), to: (f32, f32)) {
        draw_segment(buffer, mask, from, to, self.width, self.color, self.mode);
    }
}

// ============================================================================
// STROKE RECORDER – pointer press / move / release
// ============================================================================

/// Tracks the stroke under an active pointer and rasterizes each new segment
/// as it arrives, so the canvas is live while drawing.
#[derive(Default)]
pub struct StrokeRecorder {
    active: Option<(Stroke, CoverageMask)>,
}

impl StrokeRecorder {
    /// Start a stroke at `pos` and stamp its first dot.
    pub fn begin(&mut self, buffer: &mut PixelBuffer, mut stroke: Stroke, pos: (f32, f32)) {
        stroke.points.clear();
        stroke.points.push(pos);
        let mut mask = CoverageMask::for_buffer(buffer);
        stroke.segment(buffer, &mut mask, pos, pos);
        self.active = Some((stroke, mask));
    }

    /// Extend the active stroke. Ignored when no stroke is active.
    pub fn extend(&mut self, buffer: &mut PixelBuffer, pos: (f32, f32)) {
        let Some((stroke, mask)) = self.active.as_mut() else { return };
        if let Some(&last) = stroke.points.last() {
            stroke.segment(buffer, mask, last, pos);
        }
        stroke.points.push(pos);
    }

    /// End the gesture, returning the finished stroke if one was active.
    pub fn finish(&mut self) -> Option<Stroke> {
        self.active.take().map(|(stroke, _)| stroke)
    }
}
