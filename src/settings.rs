use std::path::{Path, PathBuf};

use crate::canvas::{is_valid_size, Color};
use crate::components::colors::{default_palette, format_hex, parse_color, parse_palette};
use crate::components::tools::DEFAULT_LINE_WIDTH;
use crate::ops::text::DEFAULT_FONT_SIZE;

/// Editor settings that persist across sessions.
#[derive(Clone, Debug, PartialEq)]
pub struct EditorSettings {
    /// Stroke diameter in pixels
    pub line_width: f32,
    /// Initial pencil color
    pub color: Color,
    /// Swatches offered by the color picker
    pub palette: Vec<Color>,
    /// Maximum history snapshots kept (0 = unlimited)
    pub max_history: usize,
    /// Size of a blank canvas
    pub canvas_width: u32,
    pub canvas_height: u32,
    /// Font used for text stamps; empty = no font
    pub font_path: String,
    pub font_size: f32,
    /// Where text stamps land (baseline origin)
    pub text_x: f32,
    pub text_y: f32,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            line_width: DEFAULT_LINE_WIDTH,
            color: image::Rgba([0, 0, 0, 255]),
            palette: default_palette(),
            max_history: 100,
            canvas_width: 512,
            canvas_height: 512,
            font_path: String::new(),
            font_size: DEFAULT_FONT_SIZE,
            text_x: 50.0,
            text_y: 50.0,
        }
    }
}

impl EditorSettings {
    /// Path to the settings file.
    /// On Linux:   ~/.config/sketchwall/sketchwall_settings.cfg  (XDG_CONFIG_HOME respected)
    /// On Windows: %APPDATA%\SketchWall\sketchwall_settings.cfg
    /// On macOS:   ~/Library/Application Support/SketchWall/sketchwall_settings.cfg
    pub fn settings_path() -> Option<PathBuf> {
        #[cfg(target_os = "linux")]
        {
            let config_dir = std::env::var("XDG_CONFIG_HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|_| {
                    let home = std::env::var("HOME").unwrap_or_else(|_| "~".to_string());
                    PathBuf::from(home).join(".config")
                })
                .join("sketchwall");
            return Some(config_dir.join("sketchwall_settings.cfg"));
        }
        #[cfg(target_os = "windows")]
        {
            let appdata = std::env::var("APPDATA")
                .or_else(|_| std::env::var("USERPROFILE"))
                .ok()?;
            return Some(PathBuf::from(appdata).join("SketchWall").join("sketchwall_settings.cfg"));
        }
        #[cfg(target_os = "macos")]
        {
            let home = std::env::var("HOME").unwrap_or_else(|_| "~".to_string());
            return Some(
                PathBuf::from(home)
                    .join("Library")
                    .join("Application Support")
                    .join("SketchWall")
                    .join("sketchwall_settings.cfg"),
            );
        }
        #[cfg(not(any(target_os = "linux", target_os = "windows", target_os = "macos")))]
        {
            std::env::current_exe()
                .ok()
                .and_then(|p| p.parent().map(|d| d.join("sketchwall_settings.cfg")))
        }
    }

    /// Load settings from the platform path (defaults if missing or corrupt).
    pub fn load() -> Self {
        match Self::settings_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::parse(&content),
            Err(_) => Self::default(),
        }
    }

    /// Save settings to the platform path.
    pub fn save(&self) -> std::io::Result<()> {
        match Self::settings_path() {
            Some(path) => self.save_to(&path),
            None => Ok(()),
        }
    }

    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_config_string())
    }

    /// Parse `key=value` lines. Unknown keys and unparsable values keep their
    /// defaults.
    pub fn parse(content: &str) -> Self {
        let mut s = Self::default();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, val)) = line.split_once('=') else { continue };
            let val = val.trim();
            match key.trim() {
                "line_width" => {
                    if let Ok(v) = val.parse::<f32>()
                        && v.is_finite()
                        && v > 0.0
                    {
                        s.line_width = v;
                    }
                }
                "color" => {
                    if let Some(c) = parse_color(val) {
                        s.color = c;
                    }
                }
                "palette" => {
                    let palette = parse_palette(val);
                    if !palette.is_empty() {
                        s.palette = palette;
                    }
                }
                "max_history" => {
                    s.max_history = val.parse().unwrap_or(s.max_history);
                }
                "canvas_width" => {
                    s.canvas_width = parse_side(val).unwrap_or(s.canvas_width);
                }
                "canvas_height" => {
                    s.canvas_height = parse_side(val).unwrap_or(s.canvas_height);
                }
                "font_path" => {
                    s.font_path = val.to_string();
                }
                "font_size" => {
                    if let Ok(v) = val.parse::<f32>()
                        && v.is_finite()
                        && v > 0.0
                    {
                        s.font_size = v;
                    }
                }
                "text_x" => {
                    s.text_x = val.parse().unwrap_or(s.text_x);
                }
                "text_y" => {
                    s.text_y = val.parse().unwrap_or(s.text_y);
                }
                other => {
                    crate::log_warn!("settings: ignoring unknown key '{}'", other);
                }
            }
        }
        s
    }

    /// Canvas size to start a blank session with; out-of-range values (set
    /// in code rather than parsed) fall back to the default size.
    pub fn canvas_size(&self) -> (u32, u32) {
        if is_valid_size(self.canvas_width, self.canvas_height) {
            (self.canvas_width, self.canvas_height)
        } else {
            crate::log_warn!(
                "settings: canvas size {}×{} out of range, using default",
                self.canvas_width,
                self.canvas_height
            );
            let d = Self::default();
            (d.canvas_width, d.canvas_height)
        }
    }

    pub fn to_config_string(&self) -> String {
        let palette = self
            .palette
            .iter()
            .map(|c| format_hex(*c))
            .collect::<Vec<_>>()
            .join(",");
        format!(
            "line_width={}\n\
             color={}\n\
             palette={}\n\
             max_history={}\n\
             canvas_width={}\n\
             canvas_height={}\n\
             font_path={}\n\
             font_size={}\n\
             text_x={}\n\
             text_y={}\n",
            self.line_width,
            format_hex(self.color),
            palette,
            self.max_history,
            self.canvas_width,
            self.canvas_height,
            self.font_path,
            self.font_size,
            self.text_x,
            self.text_y,
        )
    }
}

/// One canvas side, `1..=MAX_CANVAS_SIDE`.
fn parse_side(val: &str) -> Option<u32> {
    val.parse::<u32>().ok().filter(|&v| is_valid_size(v, 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn defaults_match_drawing_page() {
        let s = EditorSettings::default();
        assert_eq!(s.line_width, 5.0);
        assert_eq!(s.color, Rgba([0, 0, 0, 255]));
        assert_eq!(s.palette.len(), 6);
        assert_eq!((s.text_x, s.text_y), (50.0, 50.0));
        assert_eq!(s.font_size, 20.0);
    }

    #[test]
    fn parse_reads_known_keys_and_skips_noise() {
        let s = EditorSettings::parse(
            "# comment\n\
             line_width = 12\n\
             color=#ff0000\n\
             palette=white,#00ff00\n\
             max_history=7\n\
             canvas_width=64\n\
             canvas_height=32\n\
             bogus=1\n\
             no equals sign here\n",
        );
        assert_eq!(s.line_width, 12.0);
        assert_eq!(s.color, Rgba([255, 0, 0, 255]));
        assert_eq!(s.palette, vec![Rgba([255, 255, 255, 255]), Rgba([0, 255, 0, 255])]);
        assert_eq!(s.max_history, 7);
        assert_eq!((s.canvas_width, s.canvas_height), (64, 32));
    }

    #[test]
    fn corrupt_values_fall_back_to_defaults() {
        let s = EditorSettings::parse("line_width=-3\ncolor=nope\nmax_history=lots\npalette=,,\n");
        assert_eq!(s, EditorSettings::default());
    }

    #[test]
    fn out_of_range_canvas_size_falls_back() {
        let s = EditorSettings::parse("canvas_width=4000000000\ncanvas_height=4000000000\n");
        assert_eq!((s.canvas_width, s.canvas_height), (512, 512));

        let s = EditorSettings::parse("canvas_width=0\ncanvas_height=16385\n");
        assert_eq!((s.canvas_width, s.canvas_height), (512, 512));

        let s = EditorSettings::parse("canvas_width=16384\ncanvas_height=1\n");
        assert_eq!((s.canvas_width, s.canvas_height), (16_384, 1));
    }

    #[test]
    fn canvas_size_guards_values_set_in_code() {
        let s = EditorSettings {
            canvas_width: u32::MAX,
            ..EditorSettings::default()
        };
        assert_eq!(s.canvas_size(), (512, 512));
    }

    #[test]
    fn save_then_load_restores_settings() {
        let dir = std::env::temp_dir().join(format!("sketchwall-settings-{}", uuid::Uuid::new_v4()));
        let path = dir.join("sketchwall_settings.cfg");

        let mut s = EditorSettings::default();
        s.line_width = 2.5;
        s.color = Rgba([1, 2, 3, 128]);
        s.font_path = "/tmp/font.ttf".to_string();
        s.save_to(&path).unwrap();

        assert_eq!(EditorSettings::load_from(&path), s);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_file_gives_defaults() {
        let s = EditorSettings::load_from(Path::new("/no/such/dir/settings.cfg"));
        assert_eq!(s, EditorSettings::default());
    }
}
