//! Page geometry constants and the validated choice set.
//!
//! All lengths are in page pixels at 150 DPI (A4 = 1240 × 1754 px).

use crate::errors::SheetError;

// ────────────────────────────────────────────────────────────────────────────
// Page geometry
// ────────────────────────────────────────────────────────────────────────────

/// Fixed drawing constants for one sheet.
///
/// The page size is a design constant; callers never choose it. The planner may
/// derive a shrunken copy (see [`PageGeometry::scaled`]) when a large exam does not
/// fit at full bubble size.
#[derive(Debug, Clone, PartialEq)]
pub struct PageGeometry {
    pub width: u32,
    pub height: u32,
    pub margin: f32,
    /// Vertical rhythm unit of the header band (title, fields, divider).
    pub header_spacing: f32,
    /// Space kept free above the bottom margin for the instruction line.
    pub footer_height: f32,
    pub bubble_diameter: f32,
    /// Gap between two neighbouring bubbles of the same row.
    pub bubble_padding_h: f32,
    /// Extra vertical space added to the bubble diameter to get one row's height.
    pub row_padding_y: f32,
    /// Gap between the reserved number box and the right edge of the number text.
    pub number_gap: f32,
    /// Gap between the number box and the first bubble.
    pub question_number_padding: f32,
    pub field_spacing: f32,
    pub field_label_gap: f32,
    /// Rule length of the "name" field, as a fraction of the usable width.
    pub name_rule_fraction: f32,
    /// Rule length of the short fields, as a fraction of the usable width.
    pub short_rule_fraction: f32,
    pub title_font_px: f32,
    pub label_font_px: f32,
    pub question_font_px: f32,
    pub choice_font_px: f32,
    pub footer_font_px: f32,
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self {
            width: 1240,
            height: 1754,
            margin: 60.0,
            header_spacing: 20.0,
            footer_height: 60.0,
            bubble_diameter: 28.0,
            bubble_padding_h: 12.0,
            row_padding_y: 22.0,
            number_gap: 10.0,
            question_number_padding: 18.0,
            field_spacing: 40.0,
            field_label_gap: 8.0,
            name_rule_fraction: 400.0 / 1120.0,
            short_rule_fraction: 150.0 / 1120.0,
            title_font_px: 36.0,
            label_font_px: 18.0,
            question_font_px: 20.0,
            choice_font_px: 14.0,
            footer_font_px: 14.0,
        }
    }
}

impl PageGeometry {
    pub fn usable_width(&self) -> f32 {
        self.width as f32 - 2.0 * self.margin
    }

    /// Height of one bubble row, padding included.
    pub fn row_height(&self) -> f32 {
        self.bubble_diameter + self.row_padding_y
    }

    /// Horizontal distance between the centers of two neighbouring bubbles.
    pub fn bubble_pitch(&self) -> f32 {
        self.bubble_diameter + self.bubble_padding_h
    }

    /// Returns a copy whose bubble-row dimensions are multiplied by `factor`.
    ///
    /// Only the body shrinks: page size, margins and header/footer text keep
    /// their sizes so the printed sheet stays recognisable.
    pub fn scaled(&self, factor: f32) -> Self {
        Self {
            bubble_diameter: self.bubble_diameter * factor,
            bubble_padding_h: self.bubble_padding_h * factor,
            row_padding_y: self.row_padding_y * factor,
            choice_font_px: self.choice_font_px * factor,
            ..self.clone()
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Choice set
// ────────────────────────────────────────────────────────────────────────────

/// Ordered, non-empty set of distinct single-character labels.
///
/// Order decides left-to-right bubble placement and is preserved in the
/// position map. A value of this type is always valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceSet {
    labels: Vec<char>,
}

impl Default for ChoiceSet {
    fn default() -> Self {
        Self {
            labels: vec!['A', 'B', 'C', 'D', 'E'],
        }
    }
}

impl ChoiceSet {
    pub fn new(labels: Vec<char>) -> Result<Self, SheetError> {
        if labels.is_empty() {
            return Err(SheetError::InvalidInput(
                "choice set must contain at least one label".to_string(),
            ));
        }
        for (i, label) in labels.iter().enumerate() {
            if label.is_whitespace() {
                return Err(SheetError::InvalidInput(
                    "choice labels must not be blank".to_string(),
                ));
            }
            if labels[..i].contains(label) {
                return Err(SheetError::InvalidInput(format!(
                    "duplicate choice label '{label}'"
                )));
            }
        }
        Ok(Self { labels })
    }

    /// Builds a choice set from request strings, each of which must hold exactly one character.
    pub fn from_strings<S: AsRef<str>>(raw: &[S]) -> Result<Self, SheetError> {
        let mut labels = Vec::with_capacity(raw.len());
        for value in raw {
            let value = value.as_ref().trim();
            let mut chars = value.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => labels.push(c),
                _ => {
                    return Err(SheetError::InvalidInput(format!(
                        "choice label '{value}' must be a single character"
                    )))
                }
            }
        }
        Self::new(labels)
    }

    pub fn labels(&self) -> &[char] {
        &self.labels
    }

    pub fn first(&self) -> char {
        self.labels[0]
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn contains(&self, label: char) -> bool {
        self.labels.contains(&label)
    }
}
