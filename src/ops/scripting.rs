// ============================================================================
// Drawing scripts: Rhai engine driving an editor session headlessly
// ============================================================================
//
// Every host function goes through the same `Editor` calls the UI uses, so a
// script produces exactly the history an interactive user would: one
// snapshot per stroke, fill, text stamp, clear or resize.

use image::Rgba;
use rhai::{Array, Dynamic, Engine, EvalAltResult, ImmutableString, Scope};
use std::sync::{Arc, Mutex};

use crate::canvas::{is_valid_size, MAX_CANVAS_SIDE};
use crate::components::colors::{format_hex, parse_color};
use crate::components::tools::{CompositeMode, Stroke, Tool};
use crate::editor::Editor;

// ============================================================================
// Error type
// ============================================================================

#[derive(Debug, Clone)]
pub struct ScriptError {
    pub message: String,
    pub line: Option<usize>,
    pub column: Option<usize>,
}

impl ScriptError {
    fn at(message: String, pos: rhai::Position) -> Self {
        Self {
            message,
            line: pos.line().filter(|&l| l > 0),
            column: pos.position().filter(|&c| c > 0),
        }
    }
}

impl std::fmt::Display for ScriptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.line, self.column) {
            (Some(line), Some(col)) => write!(f, "line {}, column {}: {}", line, col, self.message),
            (Some(line), None) => write!(f, "line {}: {}", line, self.message),
            _ => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for ScriptError {}

// ============================================================================
// Script context: shared state between engine and host functions
// ============================================================================

struct ScriptContext {
    editor: Editor,
    console_output: Vec<String>,
}

type SharedContext = Arc<Mutex<ScriptContext>>;

type HostResult<T> = Result<T, Box<EvalAltResult>>;

fn lock(ctx: &SharedContext) -> std::sync::MutexGuard<'_, ScriptContext> {
    ctx.lock().unwrap_or_else(|e| e.into_inner())
}

/// Accept both Rhai ints and floats as coordinates.
fn to_f32(value: &Dynamic) -> HostResult<f32> {
    if let Ok(f) = value.as_float() {
        return Ok(f as f32);
    }
    if let Ok(i) = value.as_int() {
        return Ok(i as f32);
    }
    Err(format!("expected a number, got {}", value.type_name()).into())
}

fn to_color(s: &str) -> HostResult<image::Rgba<u8>> {
    parse_color(s).ok_or_else(|| format!("unknown color '{}'", s).into())
}

// ============================================================================
// Engine construction with sandbox + API registration
// ============================================================================

fn create_engine(ctx: SharedContext) -> Engine {
    let mut engine = Engine::new();

    // ── Sandbox limits ──
    engine.set_max_operations(50_000_000);
    engine.set_max_call_levels(64);
    engine.set_max_expr_depths(64, 64);
    engine.set_max_string_size(10_000);
    engine.set_max_array_size(100_000);
    engine.set_max_map_size(1_000);

    let c = ctx.clone();
    engine.on_print(move |s| {
        crate::log_info!("[script] {}", s);
        lock(&c).console_output.push(s.to_string());
    });

    register_canvas_api(&mut engine, ctx.clone());
    register_tool_api(&mut engine, ctx.clone());
    register_edit_api(&mut engine, ctx.clone());
    register_history_api(&mut engine, ctx);

    engine
}

fn register_canvas_api(engine: &mut Engine, ctx: SharedContext) {
    let c = ctx.clone();
    engine.register_fn("width", move || -> i64 { lock(&c).editor.width() as i64 });

    let c = ctx.clone();
    engine.register_fn("height", move || -> i64 { lock(&c).editor.height() as i64 });

    // get_pixel(x, y) -> [r, g, b, a], zeros outside the canvas
    let c = ctx.clone();
    engine.register_fn("get_pixel", move |x: i64, y: i64| -> Array {
        let lock = lock(&c);
        let px = if x >= 0 && y >= 0 {
            lock.editor.pixel(x as u32, y as u32)
        } else {
            None
        };
        px.unwrap_or(Rgba([0, 0, 0, 0]))
            .0
            .iter()
            .map(|&v| Dynamic::from(v as i64))
            .collect()
    });

    let c = ctx.clone();
    engine.register_fn("resize", move |w: i64, h: i64| -> HostResult<bool> {
        let side = |v: i64| u32::try_from(v).ok().filter(|&v| is_valid_size(v, 1));
        match (side(w), side(h)) {
            (Some(w), Some(h)) => Ok(lock(&c).editor.resize(w, h)),
            _ => Err(format!("resize: {}×{} out of range (1-{})", w, h, MAX_CANVAS_SIDE).into()),
        }
    });

    let c = ctx.clone();
    engine.register_fn("palette", move || -> Array {
        lock(&c)
            .editor
            .palette()
            .iter()
            .map(|col| Dynamic::from(format_hex(*col)))
            .collect()
    });

    let c = ctx.clone();
    engine.register_fn("random_palette", move || {
        lock(&c).editor.randomize_palette();
    });

    // set_palette(["red", "#00ff00", ...])
    let c = ctx;
    engine.register_fn("set_palette", move |colors: Array| -> HostResult<()> {
        let mut palette = Vec::with_capacity(colors.len());
        for entry in colors {
            let name = entry
                .into_immutable_string()
                .map_err(|t| -> Box<EvalAltResult> { format!("set_palette: expected a color string, got {}", t).into() })?;
            palette.push(to_color(&name)?);
        }
        lock(&c).editor.set_palette(palette);
        Ok(())
    });
}

fn register_tool_api(engine: &mut Engine, ctx: SharedContext) {
    let c = ctx.clone();
    engine.register_fn("set_color", move |s: ImmutableString| -> HostResult<()> {
        let color = to_color(&s)?;
        lock(&c).editor.set_color(color);
        Ok(())
    });

    let c = ctx.clone();
    engine.register_fn("set_line_width", move |w: Dynamic| -> HostResult<()> {
        let w = to_f32(&w)?;
        lock(&c).editor.set_line_width(w);
        Ok(())
    });

    let c = ctx.clone();
    engine.register_fn("pencil", move || lock(&c).editor.set_tool(Tool::Pencil));

    let c = ctx;
    engine.register_fn("eraser", move || lock(&c).editor.set_tool(Tool::Eraser));
}

fn register_edit_api(engine: &mut Engine, ctx: SharedContext) {
    // line(x0, y0, x1, y1): one stroke with the current tool
    let c = ctx.clone();
    engine.register_fn(
        "line",
        move |x0: Dynamic, y0: Dynamic, x1: Dynamic, y1: Dynamic| -> HostResult<bool> {
            let points = [(to_f32(&x0)?, to_f32(&y0)?), (to_f32(&x1)?, to_f32(&y1)?)];
            let mut lock = lock(&c);
            let stroke = current_stroke(&lock.editor).with_points(points);
            Ok(lock.editor.draw_stroke(&stroke))
        },
    );

    // stroke([[x, y], [x, y], ...]): a polyline with the current tool
    let c = ctx.clone();
    engine.register_fn("stroke", move |points: Array| -> HostResult<bool> {
        let mut pts = Vec::with_capacity(points.len());
        for p in points {
            let pair = p
                .try_cast::<Array>()
                .filter(|a| a.len() == 2)
                .ok_or_else(|| -> Box<EvalAltResult> { "stroke: every point must be [x, y]".into() })?;
            pts.push((to_f32(&pair[0])?, to_f32(&pair[1])?));
        }
        let mut lock = lock(&c);
        let stroke = current_stroke(&lock.editor).with_points(pts);
        Ok(lock.editor.draw_stroke(&stroke))
    });

    // fill(x, y) with the current color, fill(x, y, color) with an explicit one.
    // Seeds outside the canvas return false.
    let c = ctx.clone();
    engine.register_fn("fill", move |x: i64, y: i64| -> bool {
        let mut lock = lock(&c);
        let color = lock.editor.color();
        fill_or_warn(&mut lock.editor, x, y, color)
    });

    let c = ctx.clone();
    engine.register_fn(
        "fill",
        move |x: i64, y: i64, color: ImmutableString| -> HostResult<bool> {
            let color = to_color(&color)?;
            Ok(fill_or_warn(&mut lock(&c).editor, x, y, color))
        },
    );

    // text(s) at the configured origin, text(x, y, s) anywhere
    let c = ctx.clone();
    engine.register_fn("text", move |s: ImmutableString| -> HostResult<bool> {
        lock(&c).editor.stamp_text(&s).map_err(|e| e.to_string().into())
    });

    let c = ctx.clone();
    engine.register_fn(
        "text",
        move |x: Dynamic, y: Dynamic, s: ImmutableString| -> HostResult<bool> {
            let (x, y) = (to_f32(&x)?, to_f32(&y)?);
            lock(&c)
                .editor
                .stamp_text_at(&s, x, y, Rgba([0, 0, 0, 255]))
                .map_err(|e| e.to_string().into())
        },
    );

    let c = ctx;
    engine.register_fn("clear", move || -> bool { lock(&c).editor.clear() });
}

fn register_history_api(engine: &mut Engine, ctx: SharedContext) {
    let c = ctx.clone();
    engine.register_fn("undo", move || -> bool { lock(&c).editor.undo() });

    let c = ctx.clone();
    engine.register_fn("redo", move || -> bool { lock(&c).editor.redo() });

    let c = ctx.clone();
    engine.register_fn("can_undo", move || -> bool { lock(&c).editor.can_undo() });

    let c = ctx.clone();
    engine.register_fn("can_redo", move || -> bool { lock(&c).editor.can_redo() });

    // set_history_limit(n): 0 = unlimited
    let c = ctx;
    engine.register_fn("set_history_limit", move |n: i64| -> HostResult<()> {
        let n = usize::try_from(n).map_err(|_| -> Box<EvalAltResult> { "set_history_limit: negative limit".into() })?;
        lock(&c).editor.set_history_limit(n);
        Ok(())
    });
}

fn current_stroke(editor: &Editor) -> Stroke {
    let mode = editor.tool().composite_mode().unwrap_or(CompositeMode::Paint);
    Stroke::new(editor.color(), editor.line_width(), mode)
}

fn fill_or_warn(editor: &mut Editor, x: i64, y: i64, color: image::Rgba<u8>) -> bool {
    match editor.fill(x, y, color) {
        Ok(changed) => changed,
        Err(e) => {
            crate::log_warn!("[script] fill skipped: {}", e);
            false
        }
    }
}

// ============================================================================
// Entry point
// ============================================================================

/// Run `source` against `editor`. Returns the captured `print` output.
///
/// The editor is handed to the engine for the duration of the run and put
/// back afterwards, errors included; edits made before a failing statement
/// stay applied and in history.
pub fn execute_script(source: &str, editor: &mut Editor) -> Result<Vec<String>, ScriptError> {
    let ctx = Arc::new(Mutex::new(ScriptContext {
        editor: std::mem::replace(editor, Editor::uninitialized()),
        console_output: Vec::new(),
    }));

    let result = {
        let engine = create_engine(ctx.clone());
        let mut scope = Scope::new();
        match engine.compile(source) {
            Ok(ast) => engine
                .run_ast_with_scope(&mut scope, &ast)
                .map_err(|e| ScriptError::at(e.to_string(), e.position())),
            Err(e) => Err(ScriptError::at(e.to_string(), e.position())),
        }
    };

    let mut lock = lock(&ctx);
    *editor = std::mem::replace(&mut lock.editor, Editor::uninitialized());
    let console = std::mem::take(&mut lock.console_output);
    drop(lock);

    if let Err(ref e) = result {
        crate::log_err!("[script] {}", e);
    }
    result.map(|()| console)
}
