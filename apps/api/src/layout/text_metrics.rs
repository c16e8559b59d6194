//! Text measurement shared by the planner and the renderer.
//!
//! Two font sources exist: a TrueType face loaded from disk, and the built-in
//! bitmap font. Loaded faces live in a process-wide cache keyed by
//! `(path, size)`; entries are immutable once inserted and never evicted.
//!
//! Boxes are expressed relative to the pen origin, the top-left corner of the
//! line box, with y growing downward. Centering always goes through the box,
//! never through ascent/descent, so both font sources center identically.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock, RwLock};

use thiserror::Error;
use tracing::{info, warn};
use ttf_parser::{Face, GlyphId};

use crate::layout::bitmap_font;

// ────────────────────────────────────────────────────────────────────────────
// Text box
// ────────────────────────────────────────────────────────────────────────────

/// Ink bounding box of a string, relative to its pen origin.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TextBox {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl TextBox {
    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    fn union(self, other: TextBox) -> TextBox {
        TextBox {
            left: self.left.min(other.left),
            top: self.top.min(other.top),
            right: self.right.max(other.right),
            bottom: self.bottom.max(other.bottom),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Scaled fonts
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum FontLoadError {
    #[error("cannot read font file: {0}")]
    Io(#[from] std::io::Error),

    #[error("not a usable TrueType/OpenType face: {0}")]
    Parse(String),
}

/// A TrueType face prepared for one pixel size.
#[derive(Debug)]
pub struct OutlineFont {
    data: Arc<Vec<u8>>,
    pub size_px: f32,
    /// Pixels per font unit.
    pub scale: f32,
    /// Distance from the top of the line box to the baseline, in pixels.
    pub ascent: f32,
    pub line_height: f32,
}

/// One glyph of a laid-out string: which glyph, and its pen offset from the origin.
#[derive(Debug, Clone, Copy)]
pub struct GlyphPlacement {
    pub glyph: GlyphId,
    pub pen_x: f32,
}

impl OutlineFont {
    fn new(data: Arc<Vec<u8>>, size_px: f32) -> Result<Self, FontLoadError> {
        let face = Face::parse(&data, 0).map_err(|e| FontLoadError::Parse(e.to_string()))?;
        let units_per_em = face.units_per_em().max(1) as f32;
        let scale = size_px / units_per_em;
        let ascent = face.ascender() as f32 * scale;
        let line_height = (face.ascender() as f32 - face.descender() as f32) * scale;
        Ok(Self {
            data,
            size_px,
            scale,
            ascent,
            line_height,
        })
    }

    pub fn face(&self) -> Option<Face<'_>> {
        Face::parse(&self.data, 0).ok()
    }

    /// Unshaped left-to-right layout using horizontal advances.
    pub fn placements(&self, face: &Face<'_>, text: &str) -> Vec<GlyphPlacement> {
        let fallback = face.glyph_index('?');
        let mut out = Vec::with_capacity(text.len());
        let mut pen_x = 0.0f32;
        for ch in text.chars() {
            let glyph = face
                .glyph_index(ch)
                .or(fallback)
                .unwrap_or(GlyphId(0));
            out.push(GlyphPlacement { glyph, pen_x });
            let advance = face.glyph_hor_advance(glyph).unwrap_or(0) as f32 * self.scale;
            pen_x += if advance > 0.0 {
                advance
            } else {
                self.size_px * 0.5
            };
        }
        out
    }

    fn measure(&self, text: &str) -> TextBox {
        let Some(face) = self.face() else {
            return TextBox::default();
        };
        let mut bbox: Option<TextBox> = None;
        for placement in self.placements(&face, text) {
            let Some(rect) = face.glyph_bounding_box(placement.glyph) else {
                continue;
            };
            let glyph_box = TextBox {
                left: placement.pen_x + rect.x_min as f32 * self.scale,
                top: self.ascent - rect.y_max as f32 * self.scale,
                right: placement.pen_x + rect.x_max as f32 * self.scale,
                bottom: self.ascent - rect.y_min as f32 * self.scale,
            };
            bbox = Some(match bbox {
                Some(acc) => acc.union(glyph_box),
                None => glyph_box,
            });
        }
        bbox.unwrap_or_default()
    }
}

/// A font resolved for one pixel size.
#[derive(Debug)]
pub enum ScaledFont {
    Outline(OutlineFont),
    /// Built-in bitmap font; `cell` is the pixel size of one font cell.
    Bitmap { cell: f32 },
}

impl ScaledFont {
    pub fn measure(&self, text: &str) -> TextBox {
        match self {
            ScaledFont::Outline(font) => font.measure(text),
            ScaledFont::Bitmap { cell } => measure_bitmap(text, *cell),
        }
    }

    pub fn line_height(&self) -> f32 {
        match self {
            ScaledFont::Outline(font) => font.line_height,
            ScaledFont::Bitmap { cell } => bitmap_font::GLYPH_ROWS as f32 * cell,
        }
    }
}

fn measure_bitmap(text: &str, cell: f32) -> TextBox {
    let mut bbox: Option<TextBox> = None;
    for (index, ch) in text.chars().enumerate() {
        let pattern = bitmap_font::glyph(ch);
        let origin = index as u32 * bitmap_font::ADVANCE_CELLS;
        for col in 0..bitmap_font::GLYPH_COLUMNS {
            for row in 0..bitmap_font::GLYPH_ROWS {
                if !bitmap_font::is_lit(pattern, col, row) {
                    continue;
                }
                let x = (origin + col) as f32 * cell;
                let y = row as f32 * cell;
                let cell_box = TextBox {
                    left: x,
                    top: y,
                    right: x + cell,
                    bottom: y + cell,
                };
                bbox = Some(match bbox {
                    Some(acc) => acc.union(cell_box),
                    None => cell_box,
                });
            }
        }
    }
    bbox.unwrap_or_default()
}

// ────────────────────────────────────────────────────────────────────────────
// Process-wide cache
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
struct FontKey {
    path: PathBuf,
    size_milli: u32,
}

static FONT_DATA: OnceLock<RwLock<HashMap<PathBuf, Arc<Vec<u8>>>>> = OnceLock::new();
static SCALED_FONTS: OnceLock<RwLock<HashMap<FontKey, Arc<ScaledFont>>>> = OnceLock::new();

fn font_data(path: &Path) -> Result<Arc<Vec<u8>>, FontLoadError> {
    let cache = FONT_DATA.get_or_init(|| RwLock::new(HashMap::new()));
    if let Ok(guard) = cache.read() {
        if let Some(data) = guard.get(path) {
            return Ok(data.clone());
        }
    }

    let data = Arc::new(std::fs::read(path)?);
    if let Ok(mut guard) = cache.write() {
        // A concurrent loader may have won the race; keep the first entry.
        let entry = guard.entry(path.to_path_buf()).or_insert_with(|| data.clone());
        return Ok(entry.clone());
    }
    Ok(data)
}

fn cached_outline_font(path: &Path, size_px: f32) -> Result<Arc<ScaledFont>, FontLoadError> {
    let key = FontKey {
        path: path.to_path_buf(),
        size_milli: (size_px * 1000.0).round() as u32,
    };
    let cache = SCALED_FONTS.get_or_init(|| RwLock::new(HashMap::new()));
    if let Ok(guard) = cache.read() {
        if let Some(font) = guard.get(&key) {
            return Ok(font.clone());
        }
    }

    let font = Arc::new(ScaledFont::Outline(OutlineFont::new(
        font_data(path)?,
        size_px,
    )?));
    if let Ok(mut guard) = cache.write() {
        let entry = guard.entry(key).or_insert_with(|| font.clone());
        return Ok(entry.clone());
    }
    Ok(font)
}

// ────────────────────────────────────────────────────────────────────────────
// TextMetrics
// ────────────────────────────────────────────────────────────────────────────

/// Resolves fonts and measures strings for one font source.
///
/// Cheap to share: holds only the resolved path. All font data sits in the
/// process-wide cache.
#[derive(Debug, Clone)]
pub struct TextMetrics {
    font_path: Option<PathBuf>,
}

impl TextMetrics {
    /// Metrics backed by the built-in bitmap font only.
    pub fn builtin() -> Self {
        Self { font_path: None }
    }

    /// Uses the TrueType face at `path` when it can be read and parsed.
    ///
    /// Any failure is logged and falls back to the built-in font; it is never an error.
    pub fn load(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            info!("No TrueType font configured; using built-in bitmap font");
            return Self::builtin();
        };

        match font_data(path).and_then(|data| OutlineFont::new(data, 16.0).map(|_| ())) {
            Ok(()) => {
                info!(font = %path.display(), "Using TrueType font");
                Self {
                    font_path: Some(path.to_path_buf()),
                }
            }
            Err(e) => {
                warn!(
                    font = %path.display(),
                    error = %e,
                    "Font could not be loaded; falling back to built-in bitmap font"
                );
                Self::builtin()
            }
        }
    }

    pub fn is_builtin(&self) -> bool {
        self.font_path.is_none()
    }

    /// Returns the font prepared for `size_px`.
    pub fn font(&self, size_px: f32) -> Arc<ScaledFont> {
        if let Some(path) = &self.font_path {
            match cached_outline_font(path, size_px) {
                Ok(font) => return font,
                Err(e) => warn!(
                    font = %path.display(),
                    size_px,
                    error = %e,
                    "Font size could not be prepared; using built-in bitmap font"
                ),
            }
        }
        Arc::new(ScaledFont::Bitmap {
            cell: bitmap_font::cell_size(size_px),
        })
    }

    pub fn measure(&self, text: &str, size_px: f32) -> TextBox {
        self.font(size_px).measure(text)
    }

    pub fn line_height(&self, size_px: f32) -> f32 {
        self.font(size_px).line_height()
    }
}
