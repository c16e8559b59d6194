use png::{BitDepth, ColorType, Encoder, PixelDimensions, Unit};
use tiny_skia::Pixmap;

use crate::errors::SheetError;

/// Print resolution written into the PNG `pHYs` chunk.
pub const SHEET_DPI: u32 = 150;

const METERS_PER_INCH: f64 = 0.0254;

// Sheets are opaque, so the premultiplied pixmap bytes are plain RGB once alpha is dropped.
pub fn encode_png(pixmap: &Pixmap, dpi: u32) -> Result<Vec<u8>, SheetError> {
    let rgb: Vec<u8> = pixmap
        .data()
        .chunks_exact(4)
        .flat_map(|px| [px[0], px[1], px[2]])
        .collect();

    let pixels_per_meter = (dpi as f64 / METERS_PER_INCH).round() as u32;
    let mut buf = Vec::new();
    {
        let mut enc = Encoder::new(&mut buf, pixmap.width(), pixmap.height());
        enc.set_color(ColorType::Rgb);
        enc.set_depth(BitDepth::Eight);
        enc.set_pixel_dims(Some(PixelDimensions {
            xppu: pixels_per_meter,
            yppu: pixels_per_meter,
            unit: Unit::Meter,
        }));
        let mut writer = enc
            .write_header()
            .map_err(|e| SheetError::Render(format!("png header: {e}")))?;
        writer
            .write_image_data(&rgb)
            .map_err(|e| SheetError::Render(format!("png data: {e}")))?;
        writer
            .finish()
            .map_err(|e| SheetError::Render(format!("png trailer: {e}")))?;
    }
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoded_png_has_signature_and_dimensions() {
        let mut pixmap = Pixmap::new(4, 3).unwrap();
        pixmap.fill(tiny_skia::Color::WHITE);
        let bytes = encode_png(&pixmap, SHEET_DPI).unwrap();

        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
        let decoder = png::Decoder::new(bytes.as_slice());
        let reader = decoder.read_info().unwrap();
        let info = reader.info();
        assert_eq!((info.width, info.height), (4, 3));
        assert_eq!(info.color_type, ColorType::Rgb);
        let dims = info.pixel_dims.unwrap();
        assert_eq!(dims.xppu, 5906);
        assert_eq!(dims.unit, Unit::Meter);
    }
}
