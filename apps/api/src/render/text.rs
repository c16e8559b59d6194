//! Glyph rasterisation onto a `tiny_skia::Pixmap`.
//!
//! Outline glyphs are converted to paths through `ttf_parser::OutlineBuilder`;
//! bitmap glyphs are painted cell by cell. Both take the same pen origin
//! convention as `TextBox`: top-left of the line box.

use tiny_skia::{Color, FillRule, Paint, Path, PathBuilder, Pixmap, Rect, Transform};
use ttf_parser::OutlineBuilder;

use crate::layout::bitmap_font;
use crate::layout::text_metrics::{OutlineFont, ScaledFont};
use crate::layout::TextBox;

/// Draws `text` with its pen origin at (`x`, `y`).
pub fn draw_text(pixmap: &mut Pixmap, font: &ScaledFont, text: &str, x: f32, y: f32, color: Color) {
    let paint = solid(color);
    match font {
        ScaledFont::Outline(outline) => draw_outline_text(pixmap, outline, text, x, y, &paint),
        ScaledFont::Bitmap { cell } => draw_bitmap_text(pixmap, *cell, text, x, y, &paint),
    }
}

/// Draws `text` so that the top-left corner of its ink box lands on (`left`, `top`).
pub fn draw_text_at_box(
    pixmap: &mut Pixmap,
    font: &ScaledFont,
    text: &str,
    left: f32,
    top: f32,
    color: Color,
) -> TextBox {
    let bbox = font.measure(text);
    draw_text(pixmap, font, text, left - bbox.left, top - bbox.top, color);
    bbox
}

/// Draws `text` with its ink box centered on (`cx`, `cy`).
pub fn draw_text_centered(
    pixmap: &mut Pixmap,
    font: &ScaledFont,
    text: &str,
    cx: f32,
    cy: f32,
    color: Color,
) {
    let bbox = font.measure(text);
    let x = cx - (bbox.left + bbox.right) / 2.0;
    let y = cy - (bbox.top + bbox.bottom) / 2.0;
    draw_text(pixmap, font, text, x, y, color);
}

pub fn solid(color: Color) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color(color);
    paint.anti_alias = true;
    paint
}

fn draw_outline_text(
    pixmap: &mut Pixmap,
    font: &OutlineFont,
    text: &str,
    x: f32,
    y: f32,
    paint: &Paint<'_>,
) {
    let Some(face) = font.face() else {
        return;
    };
    let baseline_y = y + font.ascent;
    for placement in font.placements(&face, text) {
        let mut builder = GlyphPathBuilder::new(x + placement.pen_x, baseline_y, font.scale);
        if face.outline_glyph(placement.glyph, &mut builder).is_none() {
            continue;
        }
        let Some(path) = builder.finish() else {
            continue;
        };
        pixmap.fill_path(&path, paint, FillRule::Winding, Transform::identity(), None);
    }
}

fn draw_bitmap_text(pixmap: &mut Pixmap, cell: f32, text: &str, x: f32, y: f32, paint: &Paint<'_>) {
    for (index, ch) in text.chars().enumerate() {
        let pattern = bitmap_font::glyph(ch);
        let origin = (index as u32 * bitmap_font::ADVANCE_CELLS) as f32 * cell;
        for col in 0..bitmap_font::GLYPH_COLUMNS {
            for row in 0..bitmap_font::GLYPH_ROWS {
                if !bitmap_font::is_lit(pattern, col, row) {
                    continue;
                }
                let Some(rect) = Rect::from_xywh(
                    x + origin + col as f32 * cell,
                    y + row as f32 * cell,
                    cell,
                    cell,
                ) else {
                    continue;
                };
                pixmap.fill_rect(rect, paint, Transform::identity(), None);
            }
        }
    }
}

/// Maps font units (y up) to page pixels (y down) around a baseline origin.
struct GlyphPathBuilder {
    builder: PathBuilder,
    origin_x: f32,
    origin_y: f32,
    scale: f32,
}

impl GlyphPathBuilder {
    fn new(origin_x: f32, origin_y: f32, scale: f32) -> Self {
        Self {
            builder: PathBuilder::new(),
            origin_x,
            origin_y,
            scale,
        }
    }

    fn finish(self) -> Option<Path> {
        self.builder.finish()
    }

    fn px(&self, x: f32) -> f32 {
        self.origin_x + x * self.scale
    }

    fn py(&self, y: f32) -> f32 {
        self.origin_y - y * self.scale
    }
}

impl OutlineBuilder for GlyphPathBuilder {
    fn move_to(&mut self, x: f32, y: f32) {
        let (x, y) = (self.px(x), self.py(y));
        self.builder.move_to(x, y);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let (x, y) = (self.px(x), self.py(y));
        self.builder.line_to(x, y);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        let (x1, y1, x, y) = (self.px(x1), self.py(y1), self.px(x), self.py(y));
        self.builder.quad_to(x1, y1, x, y);
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        let (x1, y1) = (self.px(x1), self.py(y1));
        let (x2, y2) = (self.px(x2), self.py(y2));
        let (x, y) = (self.px(x), self.py(y));
        self.builder.cubic_to(x1, y1, x2, y2, x, y);
    }

    fn close(&mut self) {
        self.builder.close();
    }
}
