// ============================================================================
// SketchWall CLI: headless drawing via command-line arguments
// ============================================================================
//
// Usage examples:
//   sketchwall --script fish.rhai --output fish.png          (blank canvas)
//   sketchwall --size 800x600 -s scene.rhai -o scene.jpg -q 85
//   sketchwall -i photo.png -s doodle.rhai -o doodled.png
//   sketchwall -i "shots/*.png" -s frame.rhai --output-dir framed/ -f tga
//
// Every canvas is driven through an `Editor`, so scripts see the same
// history semantics as interactive use.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;

use crate::canvas::{is_valid_size, PixelBuffer, MAX_CANVAS_SIDE};
use crate::editor::Editor;
use crate::io::{encode_and_write, load_image_sync, SaveFormat};
use crate::ops::scripting::execute_script;
use crate::settings::EditorSettings;

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// SketchWall headless drawing tool.
///
/// Run Rhai drawing scripts on blank canvases or existing images.
#[derive(Parser, Debug)]
#[command(
    name = "sketchwall",
    about = "SketchWall headless drawing tool",
    long_about = "Run Rhai drawing scripts on a blank canvas or on image files and save\n\
                  the result. Reads PNG, JPEG, WEBP, BMP and TGA; writes PNG, JPEG,\n\
                  BMP and TGA.\n\n\
                  Example:\n  \
                  sketchwall --script fish.rhai --output fish.png\n  \
                  sketchwall -i *.png --script frame.rhai --output-dir out/"
)]
pub struct CliArgs {
    /// Input file(s). Glob patterns accepted (e.g. "*.png", "shots/*.jpg").
    /// When omitted, a single blank canvas is used.
    #[arg(short, long, num_args = 1..)]
    pub input: Vec<String>,

    /// Size of the blank canvas, e.g. 800x600. Defaults to the configured size.
    #[arg(long, value_name = "WxH", value_parser = parse_size)]
    pub size: Option<(u32, u32)>,

    /// Rhai drawing script to run on each canvas.
    #[arg(short, long, value_name = "SCRIPT.rhai")]
    pub script: Option<PathBuf>,

    /// Output file path. Only valid for a single canvas.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output directory for batch processing.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Output format: png, jpeg, bmp, tga.
    /// When omitted, inferred from --output's extension, defaulting to png.
    #[arg(short, long, value_name = "FORMAT")]
    pub format: Option<String>,

    /// JPEG quality (1-100).
    #[arg(short, long, default_value_t = 90, value_name = "1-100")]
    pub quality: u8,

    /// TrueType/OpenType font for text stamps. Overrides the configured font.
    #[arg(long, value_name = "FILE")]
    pub font: Option<PathBuf>,

    /// Store the effective canvas size and font (after --size/--font) as the
    /// new defaults in the settings file.
    #[arg(long)]
    pub save_settings: bool,

    /// Print script console output and per-file timing information.
    #[arg(short, long)]
    pub verbose: bool,
}

/// Where a canvas comes from.
#[derive(Debug, Clone, PartialEq)]
enum Source {
    File(PathBuf),
    Blank(u32, u32),
}

impl Source {
    /// Turn `--input` arguments into file sources, in argument order.
    ///
    /// An argument naming an existing path is taken as is, so file names
    /// containing `[` or `*` still work. Anything else is a glob; its
    /// matches are sorted. A file named twice is processed once.
    fn from_patterns(patterns: &[String]) -> Vec<Source> {
        let mut seen: HashSet<PathBuf> = HashSet::new();
        let mut sources = Vec::new();

        for pattern in patterns {
            let matches = if Path::new(pattern).exists() {
                vec![PathBuf::from(pattern)]
            } else {
                expand_glob(pattern)
            };
            for path in matches {
                if seen.insert(path.clone()) {
                    sources.push(Source::File(path));
                }
            }
        }
        sources
    }

    fn describe(&self) -> String {
        match self {
            Source::File(p) => p.display().to_string(),
            Source::Blank(w, h) => format!("blank {}×{} canvas", w, h),
        }
    }
}

/// Sorted matches of one glob pattern. Bad patterns and empty matches are
/// reported and yield nothing.
fn expand_glob(pattern: &str) -> Vec<PathBuf> {
    let entries = match glob::glob(pattern) {
        Ok(entries) => entries,
        Err(e) => {
            crate::log_warn!("cli: invalid glob '{}': {}", pattern, e);
            eprintln!("warning: invalid glob '{}': {}", pattern, e);
            return Vec::new();
        }
    };
    let mut paths: Vec<PathBuf> = entries.filter_map(Result::ok).filter(|p| p.is_file()).collect();
    if paths.is_empty() {
        crate::log_warn!("cli: pattern '{}' matched no files", pattern);
        eprintln!("warning: pattern '{}' matched no files.", pattern);
    }
    paths.sort();
    paths
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run all CLI processing and return an OS exit code.
/// `0` = every canvas succeeded, `1` = one or more failed.
pub fn run(args: CliArgs) -> ExitCode {
    let mut settings = EditorSettings::load();
    if let Some(font) = &args.font {
        settings.font_path = font.to_string_lossy().into_owned();
    }
    if let Some((w, h)) = args.size {
        settings.canvas_width = w;
        settings.canvas_height = h;
    }
    if args.save_settings {
        match settings.save() {
            Ok(()) => crate::log_info!("cli: settings saved"),
            Err(e) => {
                crate::log_warn!("cli: could not save settings: {}", e);
                eprintln!("warning: could not save settings: {}", e);
            }
        }
    }

    let sources = if args.input.is_empty() {
        let (w, h) = settings.canvas_size();
        vec![Source::Blank(w, h)]
    } else {
        let sources = Source::from_patterns(&args.input);
        if sources.is_empty() {
            eprintln!("error: no input files matched the given pattern(s).");
            return ExitCode::FAILURE;
        }
        sources
    };

    if sources.len() > 1 && args.output.is_some() && args.output_dir.is_none() {
        eprintln!(
            "error: {} input files given but --output only accepts a single file path.\n\
             Use --output-dir to specify a destination directory for batch processing.",
            sources.len()
        );
        return ExitCode::FAILURE;
    }

    let save_format = match parse_format(args.format.as_deref(), args.output.as_deref()) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let script_source: Option<String> = match &args.script {
        Some(path) => match std::fs::read_to_string(path) {
            Ok(src) => Some(src),
            Err(e) => {
                eprintln!("error: could not read script '{}': {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => None,
    };

    if let Some(dir) = &args.output_dir
        && let Err(e) = std::fs::create_dir_all(dir)
    {
        eprintln!("error: could not create output directory '{}': {}", dir.display(), e);
        return ExitCode::FAILURE;
    }

    let total = sources.len();
    let multi = total > 1;
    let mut any_failure = false;

    for (idx, source) in sources.iter().enumerate() {
        if multi || args.verbose {
            println!("[{}/{}] {}", idx + 1, total, source.describe());
        }
        let file_start = Instant::now();

        let output_path = build_output_path(
            source,
            args.output.as_deref(),
            args.output_dir.as_deref(),
            save_format,
        );

        match run_one(
            source,
            &output_path,
            &settings,
            script_source.as_deref(),
            save_format,
            args.quality,
            args.verbose,
        ) {
            Ok(()) => {
                if args.verbose || multi {
                    println!(
                        "  → {} ({:.0}ms)",
                        output_path.display(),
                        file_start.elapsed().as_secs_f64() * 1000.0
                    );
                }
            }
            Err(e) => {
                crate::log_err!("cli: {}: {}", source.describe(), e);
                eprintln!("  error: {}", e);
                any_failure = true;
            }
        }
    }

    if !any_failure {
        return ExitCode::SUCCESS;
    }
    if let Some(log) = crate::logger::log_path() {
        eprintln!("details in {}", log.display());
    }
    ExitCode::FAILURE
}

// ============================================================================
// Per-canvas pipeline
// ============================================================================

fn run_one(
    source: &Source,
    output: &Path,
    settings: &EditorSettings,
    script: Option<&str>,
    format: SaveFormat,
    quality: u8,
    verbose: bool,
) -> Result<(), String> {
    // -- Step 1: Load ----------------------------------------------------
    let buffer = match source {
        Source::File(path) => load_image_sync(path).map_err(|e| format!("load failed: {}", e))?,
        Source::Blank(w, h) => PixelBuffer::new(*w, *h),
    };
    let mut editor = Editor::from_buffer(buffer, settings);

    // -- Step 2: Draw (optional) -----------------------------------------
    if let Some(src) = script {
        let console_output =
            execute_script(src, &mut editor).map_err(|e| format!("script error: {}", e))?;
        if verbose {
            for line in &console_output {
                println!("  [script] {}", line);
            }
            println!(
                "  {} edit(s) in history, {:.1} KiB",
                editor.history().len().saturating_sub(1),
                editor.history().memory_usage() as f64 / 1024.0
            );
        }
    }

    // -- Step 3: Save ----------------------------------------------------
    encode_and_write(editor.buffer(), output, format, quality)
        .map_err(|e| format!("save failed: {}", e))
}

// ============================================================================
// Helpers
// ============================================================================

/// Parse `WxH` (also accepts `X` and `×`).
fn parse_size(s: &str) -> Result<(u32, u32), String> {
    let s = s.trim();
    let (w, h) = s
        .split_once(['x', 'X', '×'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{}'", s))?;
    let w: u32 = w.trim().parse().map_err(|_| format!("bad width '{}'", w))?;
    let h: u32 = h.trim().parse().map_err(|_| format!("bad height '{}'", h))?;
    if !is_valid_size(w, h) {
        return Err(format!("canvas size {}×{} out of range (1-{})", w, h, MAX_CANVAS_SIDE));
    }
    Ok((w, h))
}

/// Choose the [`SaveFormat`] from `--format`, or infer it from the output
/// extension. Unknown extensions fall back to PNG; an unknown `--format` is
/// an error.
fn parse_format(format_arg: Option<&str>, output: Option<&Path>) -> Result<SaveFormat, String> {
    if let Some(f) = format_arg {
        return SaveFormat::from_name(f).ok_or_else(|| format!("unsupported output format '{}'", f));
    }
    Ok(output.and_then(SaveFormat::from_path).unwrap_or_default())
}

/// Compute the output path for one canvas.
///
/// Priority:
/// 1. `--output`
/// 2. `--output-dir`, named after the input stem
/// 3. next to the input, `_out` appended when it would overwrite the input
///
/// Blank canvases have no stem and get `drawing-<uuid>`.
fn build_output_path(
    source: &Source,
    output: Option<&Path>,
    output_dir: Option<&Path>,
    format: SaveFormat,
) -> PathBuf {
    if let Some(out) = output {
        return out.to_path_buf();
    }

    let ext = format.extension();
    let (parent, stem) = match source {
        Source::File(input) => (
            input.parent().unwrap_or(Path::new(".")).to_path_buf(),
            input.file_stem().map(|s| s.to_string_lossy().into_owned()),
        ),
        Source::Blank(..) => (PathBuf::from("."), None),
    };
    let stem = stem.unwrap_or_else(|| format!("drawing-{}", uuid::Uuid::new_v4()));

    if let Some(dir) = output_dir {
        return dir.join(format!("{}.{}", stem, ext));
    }

    let candidate = parent.join(format!("{}.{}", stem, ext));
    match source {
        Source::File(input) if candidate == *input => parent.join(format!("{}_out.{}", stem, ext)),
        _ => candidate,
    }
}
