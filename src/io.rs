use image::codecs::bmp::BmpEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::tga::TgaEncoder;
use image::{DynamicImage, ImageEncoder};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::canvas::PixelBuffer;
use crate::error::EditError;

/// Output formats the editor can encode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SaveFormat {
    #[default]
    Png,
    Jpeg,
    Bmp,
    Tga,
}

impl SaveFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            SaveFormat::Png => "png",
            SaveFormat::Jpeg => "jpg",
            SaveFormat::Bmp => "bmp",
            SaveFormat::Tga => "tga",
        }
    }

    /// Parse a format name or file extension, case-insensitive.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().trim_start_matches('.').to_lowercase().as_str() {
            "png" => Some(SaveFormat::Png),
            "jpg" | "jpeg" => Some(SaveFormat::Jpeg),
            "bmp" => Some(SaveFormat::Bmp),
            "tga" => Some(SaveFormat::Tga),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_name)
    }
}

// ============================================================================
// ENCODE / DECODE
// ============================================================================

/// Encode the buffer as PNG, the hand-off format for upload and enhancement.
pub fn encode_png(buffer: &PixelBuffer) -> Result<Vec<u8>, EditError> {
    encode(buffer, SaveFormat::Png, 90)
}

/// Encode the buffer in `format`. `quality` (1-100) only affects JPEG,
/// which also drops the alpha channel.
pub fn encode(buffer: &PixelBuffer, format: SaveFormat, quality: u8) -> Result<Vec<u8>, EditError> {
    if buffer.is_empty() {
        return Err(EditError::Encode("cannot encode an empty canvas".to_string()));
    }
    let mut out = Vec::new();
    write_encoded(buffer, format, quality, &mut out)?;
    Ok(out)
}

fn write_encoded<W: Write>(
    buffer: &PixelBuffer,
    format: SaveFormat,
    quality: u8,
    writer: &mut W,
) -> Result<(), EditError> {
    let image = buffer.as_image();
    match format {
        SaveFormat::Png => {
            PngEncoder::new(writer).write_image(
                image.as_raw(),
                image.width(),
                image.height(),
                image::ColorType::Rgba8,
            )?;
        }
        SaveFormat::Jpeg => {
            let rgb_image = DynamicImage::ImageRgba8(image.clone()).to_rgb8();
            let mut encoder = JpegEncoder::new_with_quality(writer, quality.clamp(1, 100));
            encoder.encode(
                rgb_image.as_raw(),
                rgb_image.width(),
                rgb_image.height(),
                image::ColorType::Rgb8,
            )?;
        }
        SaveFormat::Bmp => {
            let mut encoder = BmpEncoder::new(writer);
            encoder.encode(
                image.as_raw(),
                image.width(),
                image.height(),
                image::ColorType::Rgba8,
            )?;
        }
        SaveFormat::Tga => {
            let encoder = TgaEncoder::new(writer);
            encoder.encode(
                image.as_raw(),
                image.width(),
                image.height(),
                image::ColorType::Rgba8,
            )?;
        }
    }
    Ok(())
}

/// Decode any format the `image` crate recognises into an RGBA buffer.
pub fn decode(bytes: &[u8]) -> Result<PixelBuffer, EditError> {
    let img = image::load_from_memory(bytes).map_err(|e| EditError::Decode(e.to_string()))?;
    Ok(PixelBuffer::from_rgba_image(img.into_rgba8()))
}

// ============================================================================
// FILES
// ============================================================================

pub fn load_image_sync(path: &Path) -> Result<PixelBuffer, EditError> {
    let bytes = std::fs::read(path)?;
    decode(&bytes)
}

/// Encode and write the buffer to `path`.
pub fn encode_and_write(
    buffer: &PixelBuffer,
    path: &Path,
    format: SaveFormat,
    quality: u8,
) -> Result<(), EditError> {
    if buffer.is_empty() {
        return Err(EditError::Encode("cannot encode an empty canvas".to_string()));
    }
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    write_encoded(buffer, format, quality, &mut writer)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn sample() -> PixelBuffer {
        let mut buf = PixelBuffer::new(3, 2);
        buf.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        buf.put_pixel(2, 1, Rgba([0, 0, 255, 128]));
        buf
    }

    #[test]
    fn png_keeps_pixels_and_alpha() {
        let buf = sample();
        let bytes = encode_png(&buf).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
        assert_eq!(decode(&bytes).unwrap(), buf);
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(matches!(decode(b"not an image"), Err(EditError::Decode(_))));
    }

    #[test]
    fn empty_canvas_cannot_be_encoded() {
        assert!(matches!(encode_png(&PixelBuffer::new(0, 0)), Err(EditError::Encode(_))));
    }

    #[test]
    fn jpeg_output_is_opaque() {
        let bytes = encode(&sample(), SaveFormat::Jpeg, 90).unwrap();
        let back = decode(&bytes).unwrap();
        assert_eq!((back.width(), back.height()), (3, 2));
        assert!(back.as_raw().chunks_exact(4).all(|p| p[3] == 255));
    }

    #[test]
    fn format_names_and_paths() {
        assert_eq!(SaveFormat::from_name("JPEG"), Some(SaveFormat::Jpeg));
        assert_eq!(SaveFormat::from_name(".tga"), Some(SaveFormat::Tga));
        assert_eq!(SaveFormat::from_name("gif"), None);
        assert_eq!(SaveFormat::from_path(Path::new("out/a.BMP")), Some(SaveFormat::Bmp));
        assert_eq!(SaveFormat::from_path(Path::new("noext")), None);
        assert_eq!(SaveFormat::Jpeg.extension(), "jpg");
    }

    #[test]
    fn writes_file_that_loads_back() {
        let path = std::env::temp_dir().join(format!("sketchwall-io-{}.png", uuid::Uuid::new_v4()));
        encode_and_write(&sample(), &path, SaveFormat::Png, 90).unwrap();
        assert_eq!(load_image_sync(&path).unwrap(), sample());
        let _ = std::fs::remove_file(&path);
    }
}
