use ab_glyph::FontArc;
use std::path::Path;
use uuid::Uuid;

use crate::canvas::{is_valid_size, Color, PixelBuffer};
use crate::components::colors::random_palette;
use crate::components::history::{HistoryManager, HistorySnapshot};
use crate::components::tools::{Stroke, StrokeRecorder, Tool, ToolProperties};
use crate::error::EditError;
use crate::io;
use crate::ops::fill::flood_fill;
use crate::ops::text;
use crate::settings::EditorSettings;

/// One drawing session: the pixel buffer, the active tool and the linear
/// undo/redo history.
///
/// UI event handlers call into this object; it never calls out. Every
/// completed edit (stroke release, fill, text stamp, clear, resize, import)
/// records exactly one snapshot, and a snapshot of the starting canvas is
/// taken on construction. Pointer motion never snapshots.
pub struct Editor {
    id: Uuid,
    buffer: PixelBuffer,
    history: HistoryManager,
    tool: ToolProperties,
    recorder: StrokeRecorder,
    palette: Vec<Color>,
    font: Option<FontArc>,
    font_size: f32,
    text_origin: (f32, f32),
}

impl Editor {
    /// Blank transparent canvas with default settings.
    pub fn new(width: u32, height: u32) -> Self {
        Self::from_buffer(PixelBuffer::new(width, height), &EditorSettings::default())
    }

    /// Blank canvas sized and configured from `settings`. A configured font
    /// that fails to load is logged and left unset.
    pub fn with_settings(settings: &EditorSettings) -> Self {
        let (width, height) = settings.canvas_size();
        Self::from_buffer(PixelBuffer::new(width, height), settings)
    }

    /// Start a session on existing pixels.
    pub fn from_buffer(buffer: PixelBuffer, settings: &EditorSettings) -> Self {
        let font = if settings.font_path.is_empty() {
            None
        } else {
            match text::load_font_file(Path::new(&settings.font_path)) {
                Ok(f) => Some(f),
                Err(e) => {
                    crate::log_warn!("Editor: font '{}' not loaded: {}", settings.font_path, e);
                    None
                }
            }
        };

        let mut editor = Self {
            id: Uuid::new_v4(),
            buffer,
            history: HistoryManager::new(settings.max_history),
            tool: ToolProperties {
                tool: Tool::Pencil,
                color: settings.color,
                line_width: settings.line_width,
            },
            recorder: StrokeRecorder::default(),
            palette: settings.palette.clone(),
            font,
            font_size: settings.font_size,
            text_origin: (settings.text_x, settings.text_y),
        };
        crate::log_info!(
            "Editor {}: session started on {}×{} canvas",
            editor.id,
            editor.buffer.width(),
            editor.buffer.height()
        );
        editor.save_snapshot("Start");
        editor
    }

    /// A 0×0 session with no snapshot taken yet (history cursor at -1).
    /// Every edit on it is a no-op.
    pub fn uninitialized() -> Self {
        Self {
            id: Uuid::nil(),
            buffer: PixelBuffer::new(0, 0),
            history: HistoryManager::new(0),
            tool: ToolProperties::default(),
            recorder: StrokeRecorder::default(),
            palette: Vec::new(),
            font: None,
            font_size: text::DEFAULT_FONT_SIZE,
            text_origin: (0.0, 0.0),
        }
    }

    // ---- accessors ----------------------------------------------------------

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn buffer(&self) -> &PixelBuffer {
        &self.buffer
    }

    pub fn width(&self) -> u32 {
        self.buffer.width()
    }

    pub fn height(&self) -> u32 {
        self.buffer.height()
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        self.buffer.get_pixel(x, y)
    }

    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    pub fn tool(&self) -> Tool {
        self.tool.tool
    }

    pub fn color(&self) -> Color {
        self.tool.color
    }

    pub fn line_width(&self) -> f32 {
        self.tool.line_width
    }

    pub fn palette(&self) -> &[Color] {
        &self.palette
    }

    // ---- tool selection -----------------------------------------------------

    /// Pick a paint color. Like tapping a swatch, this switches to the pencil.
    pub fn set_color(&mut self, color: Color) {
        self.tool.color = color;
        self.tool.tool = Tool::Pencil;
    }

    /// Set the stroke diameter. Non-positive or non-finite widths are ignored.
    pub fn set_line_width(&mut self, width: f32) {
        if width.is_finite() && width > 0.0 {
            self.tool.line_width = width;
        }
    }

    pub fn set_tool(&mut self, tool: Tool) {
        self.tool.tool = tool;
    }

    pub fn set_palette(&mut self, palette: Vec<Color>) {
        self.palette = palette;
    }

    /// Replace the palette with random colors. The drawing is untouched and
    /// no snapshot is taken.
    pub fn randomize_palette(&mut self) {
        self.palette = random_palette();
    }

    pub fn load_font_file(&mut self, path: &Path) -> Result<(), EditError> {
        self.font = Some(text::load_font_file(path)?);
        Ok(())
    }

    pub fn set_font_size(&mut self, size: f32) {
        if size.is_finite() && size > 0.0 {
            self.font_size = size;
        }
    }

    // ---- history ------------------------------------------------------------

    /// Record the current buffer as the newest history entry, discarding
    /// any redo targets.
    pub fn save_snapshot(&mut self, description: &str) {
        self.history
            .push(HistorySnapshot::capture(&self.buffer, description));
    }

    /// Step back one edit. `false` when there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        self.finish_pending_stroke();
        match self.history.step_back() {
            Ok(snapshot) => {
                snapshot.restore_into(&mut self.buffer);
                true
            }
            Err(EditError::EmptyHistory) => false,
            Err(e) => {
                crate::log_err!("Editor {}: undo failed: {}", self.id, e);
                false
            }
        }
    }

    /// Re-apply the next edit. `false` when there is nothing to redo.
    pub fn redo(&mut self) -> bool {
        self.finish_pending_stroke();
        match self.history.step_forward() {
            Ok(snapshot) => {
                snapshot.restore_into(&mut self.buffer);
                true
            }
            Err(EditError::EmptyHistory) => false,
            Err(e) => {
                crate::log_err!("Editor {}: redo failed: {}", self.id, e);
                false
            }
        }
    }

    /// Cap the number of retained snapshots (0 = unlimited). Lowering it
    /// never discards the snapshot matching the current canvas.
    pub fn set_history_limit(&mut self, max: usize) {
        self.finish_pending_stroke();
        self.history.set_max_history_size(max);
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    // ---- pointer input ------------------------------------------------------

    /// Pointer pressed at `(x, y)`. Pencil/eraser start a stroke; the fill
    /// tool fills at that pixel. Returns `true` if the canvas was touched.
    pub fn pointer_down(&mut self, x: f32, y: f32) -> bool {
        self.finish_pending_stroke();
        if self.buffer.is_empty() || !x.is_finite() || !y.is_finite() {
            return false;
        }
        match self.tool.tool.composite_mode() {
            Some(mode) => {
                let stroke = Stroke::new(self.tool.color, self.tool.line_width, mode);
                self.recorder.begin(&mut self.buffer, stroke, (x, y));
                true
            }
            None => {
                let color = self.tool.color;
                match self.fill(x.floor() as i64, y.floor() as i64, color) {
                    Ok(changed) => changed,
                    Err(e) => {
                        crate::log_warn!("Editor {}: fill rejected: {}", self.id, e);
                        false
                    }
                }
            }
        }
    }

    /// Pointer moved while pressed. Draws the new segment immediately.
    /// Non-finite positions are dropped.
    pub fn pointer_move(&mut self, x: f32, y: f32) {
        if !x.is_finite() || !y.is_finite() {
            return;
        }
        self.recorder.extend(&mut self.buffer, (x, y));
    }

    /// Pointer released. Ends the active stroke and records one snapshot.
    pub fn pointer_up(&mut self) -> bool {
        self.finish_pending_stroke()
    }

    fn finish_pending_stroke(&mut self) -> bool {
        match self.recorder.finish() {
            Some(stroke) => {
                self.save_snapshot(stroke_description(&stroke));
                true
            }
            None => false,
        }
    }

    // ---- edits --------------------------------------------------------------

    /// Apply a complete stroke and record one snapshot.
    pub fn draw_stroke(&mut self, stroke: &Stroke) -> bool {
        self.finish_pending_stroke();
        if self.buffer.is_empty() || stroke.points.is_empty() {
            return false;
        }
        stroke.apply(&mut self.buffer);
        self.save_snapshot(stroke_description(stroke));
        true
    }

    /// Flood fill from `(x, y)`. `Ok(true)` when pixels changed (one snapshot
    /// recorded), `Ok(false)` for a no-op, `Err(OutOfBounds)` without any
    /// state change.
    pub fn fill(&mut self, x: i64, y: i64, color: Color) -> Result<bool, EditError> {
        self.finish_pending_stroke();
        let filled = flood_fill(&mut self.buffer, x, y, color)?;
        if filled == 0 {
            return Ok(false);
        }
        crate::log_info!("Editor {}: filled {} px from ({}, {})", self.id, filled, x, y);
        self.save_snapshot("Fill");
        Ok(true)
    }

    /// Stamp `text` at the configured text origin in the current font size.
    /// The page stamps descriptions in black regardless of the pencil color.
    pub fn stamp_text(&mut self, text: &str) -> Result<bool, EditError> {
        let (x, y) = self.text_origin;
        self.stamp_text_at(text, x, y, image::Rgba([0, 0, 0, 255]))
    }

    /// Stamp `text` with its baseline starting at `(x, y)`.
    pub fn stamp_text_at(&mut self, text: &str, x: f32, y: f32, color: Color) -> Result<bool, EditError> {
        self.finish_pending_stroke();
        let font = self
            .font
            .as_ref()
            .ok_or_else(|| EditError::Font("no font loaded".to_string()))?;
        if self.buffer.is_empty() || text.is_empty() {
            return Ok(false);
        }
        text::stamp_text(&mut self.buffer, font, text, self.font_size, x, y, color);
        self.save_snapshot("Text");
        Ok(true)
    }

    /// Clear the whole canvas to transparent and record a snapshot.
    pub fn clear(&mut self) -> bool {
        self.finish_pending_stroke();
        if self.buffer.is_empty() {
            return false;
        }
        self.buffer.clear();
        self.save_snapshot("Clear");
        true
    }

    /// Resize the canvas, keeping existing content anchored top-left.
    /// Sizes outside `1..=MAX_CANVAS_SIDE` per side are refused.
    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        self.finish_pending_stroke();
        if width == self.buffer.width() && height == self.buffer.height() {
            return false;
        }
        if !is_valid_size(width, height) {
            crate::log_warn!("Editor {}: resize to {}×{} refused", self.id, width, height);
            return false;
        }
        self.buffer = self.buffer.resized(width, height);
        crate::log_info!("Editor {}: resized to {}×{}", self.id, width, height);
        self.save_snapshot("Resize");
        true
    }

    // ---- boundary -----------------------------------------------------------

    /// Current canvas as PNG bytes.
    pub fn export_pixels(&self) -> Result<Vec<u8>, EditError> {
        io::encode_png(&self.buffer)
    }

    /// Replace the canvas with decoded image bytes (any supported format),
    /// adopting their size. Recorded as one edit. On error nothing changes.
    pub fn import_pixels(&mut self, bytes: &[u8]) -> Result<(), EditError> {
        let decoded = io::decode(bytes)?;
        self.finish_pending_stroke();
        crate::log_info!(
            "Editor {}: imported {}×{} image",
            self.id,
            decoded.width(),
            decoded.height()
        );
        self.buffer = decoded;
        self.save_snapshot("Import");
        Ok(())
    }
}

fn stroke_description(stroke: &Stroke) -> &'static str {
    match stroke.mode {
        crate::components::tools::CompositeMode::Paint => "Stroke",
        crate::components::tools::CompositeMode::Erase => "Erase",
    }
}
