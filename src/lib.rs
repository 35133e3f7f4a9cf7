//! SketchWall canvas engine: a single RGBA pixel buffer edited with pencil,
//! eraser, flood fill and text stamps, backed by a linear undo/redo history.
//!
//! [`editor::Editor`] is the entry point. UI event handlers, scripts and the
//! headless CLI all drive a session through it.

#![allow(clippy::too_many_arguments)]

// Declared first so the log macros are visible to every module below.
#[macro_use]
pub mod logger;

pub mod canvas;
pub mod cli;
pub mod components;
pub mod editor;
pub mod error;
pub mod io;
pub mod ops;
pub mod settings;

pub use canvas::{Color, PixelBuffer};
pub use editor::Editor;
pub use error::EditError;
