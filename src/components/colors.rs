use image::Rgba;
use rand::Rng;

use crate::canvas::Color;

/// Palette a fresh session starts with.
pub const DEFAULT_PALETTE: [&str; 6] = ["black", "red", "green", "orange", "blue", "purple"];

/// Number of swatches `random_palette` produces.
pub const PALETTE_SIZE: usize = 6;

/// CSS named colors accepted by [`parse_color`].
const NAMED_COLORS: &[(&str, [u8; 4])] = &[
    ("black", [0, 0, 0, 255]),
    ("white", [255, 255, 255, 255]),
    ("red", [255, 0, 0, 255]),
    ("green", [0, 128, 0, 255]),
    ("lime", [0, 255, 0, 255]),
    ("blue", [0, 0, 255, 255]),
    ("orange", [255, 165, 0, 255]),
    ("purple", [128, 0, 128, 255]),
    ("yellow", [255, 255, 0, 255]),
    ("cyan", [0, 255, 255, 255]),
    ("magenta", [255, 0, 255, 255]),
    ("pink", [255, 192, 203, 255]),
    ("brown", [165, 42, 42, 255]),
    ("gray", [128, 128, 128, 255]),
    ("grey", [128, 128, 128, 255]),
    ("transparent", [0, 0, 0, 0]),
];

/// Parse a CSS-style color: a named color, `#rgb`, `#rgba`, `#rrggbb` or
/// `#rrggbbaa`. Case-insensitive; surrounding whitespace is ignored.
pub fn parse_color(s: &str) -> Option<Color> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix('#') {
        return parse_hex(hex);
    }
    let lower = s.to_ascii_lowercase();
    NAMED_COLORS
        .iter()
        .find(|(name, _)| *name == lower)
        .map(|(_, rgba)| Rgba(*rgba))
}

fn parse_hex(hex: &str) -> Option<Color> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let nibble = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|v| v * 17);
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    match hex.len() {
        3 => Some(Rgba([nibble(0)?, nibble(1)?, nibble(2)?, 255])),
        4 => Some(Rgba([nibble(0)?, nibble(1)?, nibble(2)?, nibble(3)?])),
        6 => Some(Rgba([byte(0)?, byte(2)?, byte(4)?, 255])),
        8 => Some(Rgba([byte(0)?, byte(2)?, byte(4)?, byte(6)?])),
        _ => None,
    }
}

/// `#rrggbb` for opaque colors, `#rrggbbaa` otherwise.
pub fn format_hex(color: Color) -> String {
    let [r, g, b, a] = color.0;
    if a == 255 {
        format!("#{:02x}{:02x}{:02x}", r, g, b)
    } else {
        format!("#{:02x}{:02x}{:02x}{:02x}", r, g, b, a)
    }
}

/// Parse a comma-separated palette, skipping entries that do not parse.
pub fn parse_palette(s: &str) -> Vec<Color> {
    s.split(',').filter_map(parse_color).collect()
}

pub fn default_palette() -> Vec<Color> {
    DEFAULT_PALETTE.iter().filter_map(|c| parse_color(c)).collect()
}

/// Six random opaque colors.
pub fn random_palette() -> Vec<Color> {
    let mut rng = rand::thread_rng();
    (0..PALETTE_SIZE)
        .map(|_| Rgba([rng.r#gen(), rng.r#gen(), rng.r#gen(), 255]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_named_and_hex() {
        assert_eq!(parse_color("black"), Some(Rgba([0, 0, 0, 255])));
        assert_eq!(parse_color("  Orange "), Some(Rgba([255, 165, 0, 255])));
        assert_eq!(parse_color("#fff"), Some(Rgba([255, 255, 255, 255])));
        assert_eq!(parse_color("#0f08"), Some(Rgba([0, 255, 0, 136])));
        assert_eq!(parse_color("#1a2B3c"), Some(Rgba([0x1a, 0x2b, 0x3c, 255])));
        assert_eq!(parse_color("#00000080"), Some(Rgba([0, 0, 0, 0x80])));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_color("#12345"), None);
        assert_eq!(parse_color("#ggg"), None);
        assert_eq!(parse_color("#ééé"), None);
        assert_eq!(parse_color("chartreuse-ish"), None);
        assert_eq!(parse_color(""), None);
    }

    #[test]
    fn hex_formatting_matches_parsing() {
        assert_eq!(format_hex(Rgba([255, 0, 16, 255])), "#ff0010");
        assert_eq!(format_hex(Rgba([0, 0, 0, 0])), "#00000000");
    }

    #[test]
    fn default_palette_has_six_opaque_colors() {
        let palette = default_palette();
        assert_eq!(palette.len(), 6);
        assert_eq!(palette[0], Rgba([0, 0, 0, 255]));
        assert!(palette.iter().all(|c| c[3] == 255));
    }

    #[test]
    fn palette_list_skips_bad_entries() {
        let palette = parse_palette("red, nope ,#00f");
        assert_eq!(palette, vec![Rgba([255, 0, 0, 255]), Rgba([0, 0, 255, 255])]);
    }

    #[test]
    fn random_swatches_use_full_channel_range() {
        let palettes: Vec<Vec<Color>> = (0..64).map(|_| random_palette()).collect();
        for swatch in 0..PALETTE_SIZE {
            for channel in 0..3 {
                let values: Vec<u8> = palettes.iter().map(|p| p[swatch][channel]).collect();
                let (lo, hi) = (values.iter().min().unwrap(), values.iter().max().unwrap());
                assert!(hi - lo > 64, "swatch {} channel {} stuck in {}..={}", swatch, channel, lo, hi);
            }
        }
    }

    #[test]
    fn random_palette_is_opaque() {
        let palette = random_palette();
        assert_eq!(palette.len(), PALETTE_SIZE);
        assert!(palette.iter().all(|c| c[3] == 255));
    }
}
