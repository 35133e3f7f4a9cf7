use std::fmt;

/// Everything the editing core can refuse to do.
///
/// Editing calls on [`crate::editor::Editor`] translate `EmptyHistory` into a
/// plain `false`; the remaining variants are returned to the host unchanged.
#[derive(Debug)]
pub enum EditError {
    /// A coordinate outside the buffer. Nothing was modified.
    OutOfBounds { x: i64, y: i64, width: u32, height: u32 },
    /// Undo/redo with no snapshot to step to.
    EmptyHistory,
    /// Encoded bytes could not be turned into pixels.
    Decode(String),
    /// Pixels could not be encoded.
    Encode(String),
    /// Text stamping without a usable font.
    Font(String),
    Io(std::io::Error),
}

impl fmt::Display for EditError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditError::OutOfBounds { x, y, width, height } => write!(
                f,
                "({}, {}) is outside the {}×{} canvas",
                x, y, width, height
            ),
            EditError::EmptyHistory => write!(f, "no history step available"),
            EditError::Decode(e) => write!(f, "Decode error: {}", e),
            EditError::Encode(e) => write!(f, "Encode error: {}", e),
            EditError::Font(e) => write!(f, "Font error: {}", e),
            EditError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for EditError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EditError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for EditError {
    fn from(e: std::io::Error) -> Self {
        EditError::Io(e)
    }
}

impl From<image::ImageError> for EditError {
    fn from(e: image::ImageError) -> Self {
        match e {
            image::ImageError::IoError(io) => EditError::Io(io),
            image::ImageError::Decoding(d) => EditError::Decode(d.to_string()),
            other => EditError::Encode(other.to_string()),
        }
    }
}

impl From<ab_glyph::InvalidFont> for EditError {
    fn from(e: ab_glyph::InvalidFont) -> Self {
        EditError::Font(e.to_string())
    }
}
