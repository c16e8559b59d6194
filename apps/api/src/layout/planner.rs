//! Layout planner: turns (question count, choice set, geometry) into a finished plan.
//!
//! The plan is the single source of coordinates for both the rendered image and
//! the position map. Nothing downstream recomputes geometry.
//!
//! # Algorithm
//! 1. Header band heights come from font line heights, so the body area depends
//!    only on geometry and fonts, never on the title text.
//! 2. `rows_per_column = max(1, floor(body_height / row_height))`.
//! 3. `columns = ceil(questions / rows_per_column)`, `column_width = usable_width / columns`.
//! 4. Questions fill columns in reading order; the last column may be partial.
//! 5. If a row (number box + bubbles) is wider than a column, the bubble rows are
//!    shrunk in 5% steps down to 50% and the plan is retried.

use crate::errors::SheetError;
use crate::layout::geometry::{ChoiceSet, PageGeometry};
use crate::layout::text_metrics::TextMetrics;

const SHRINK_STEP: f32 = 0.05;
const MAX_SHRINK_STEPS: u32 = 10;

// ────────────────────────────────────────────────────────────────────────────
// Plan types
// ────────────────────────────────────────────────────────────────────────────

/// One answer bubble, in page pixel space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bubble {
    pub label: char,
    pub x: f32,
    pub y: f32,
    pub radius: f32,
}

/// Placement of one question: its slot and its bubbles in choice-set order.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionSlot {
    pub ordinal: u32,
    pub column: usize,
    pub row: usize,
    /// Vertical center shared by the number label and every bubble of the row.
    pub center_y: f32,
    /// Right edge of the question-number text.
    pub number_right_x: f32,
    pub bubbles: Vec<Bubble>,
}

/// Vertical bands outside the bubble body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeaderBand {
    pub title_top: f32,
    pub fields_top: f32,
    pub divider_y: f32,
    /// First pixel row available to bubble rows.
    pub content_top: f32,
    /// Last pixel row available to bubble rows.
    pub content_bottom: f32,
    pub footer_top: f32,
}

/// Immutable result of one planning run.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutPlan {
    geometry: PageGeometry,
    choices: ChoiceSet,
    header: HeaderBand,
    scale: f32,
    rows_per_column: usize,
    column_count: usize,
    column_width: f32,
    questions: Vec<QuestionSlot>,
}

impl LayoutPlan {
    /// Effective geometry, with any bubble-row shrink already applied.
    pub fn geometry(&self) -> &PageGeometry {
        &self.geometry
    }

    pub fn choices(&self) -> &ChoiceSet {
        &self.choices
    }

    pub fn header(&self) -> &HeaderBand {
        &self.header
    }

    /// Shrink factor applied to bubble rows (1.0 = full size).
    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn rows_per_column(&self) -> usize {
        self.rows_per_column
    }

    pub fn column_count(&self) -> usize {
        self.column_count
    }

    pub fn column_width(&self) -> f32 {
        self.column_width
    }

    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    /// Questions in ordinal order.
    pub fn questions(&self) -> &[QuestionSlot] {
        &self.questions
    }

    pub fn bubble_radius(&self) -> f32 {
        self.geometry.bubble_diameter / 2.0
    }
}

/// Question-number text, zero-padded to two digits: `"07."`.
pub fn question_label(ordinal: u32) -> String {
    format!("{ordinal:02}.")
}

// ────────────────────────────────────────────────────────────────────────────
// Planning
// ────────────────────────────────────────────────────────────────────────────

/// Plans a sheet. Pure and deterministic: equal inputs give equal plans.
pub fn plan_layout(
    question_count: u32,
    choices: &ChoiceSet,
    geometry: &PageGeometry,
    metrics: &TextMetrics,
) -> Result<LayoutPlan, SheetError> {
    if question_count == 0 {
        return Err(SheetError::InvalidInput(
            "questionCount must be a positive integer".to_string(),
        ));
    }

    let header = plan_header(geometry, metrics);
    for step in 0..=MAX_SHRINK_STEPS {
        let scale = 1.0 - step as f32 * SHRINK_STEP;
        if let Some(plan) = try_plan(question_count, choices, geometry, metrics, header, scale) {
            return Ok(plan);
        }
    }

    Err(SheetError::InvalidInput(format!(
        "{question_count} questions with {} choices do not fit on one page",
        choices.len()
    )))
}

fn plan_header(geometry: &PageGeometry, metrics: &TextMetrics) -> HeaderBand {
    let spacing = geometry.header_spacing;
    let title_top = geometry.margin;
    let fields_top = title_top + metrics.line_height(geometry.title_font_px) + spacing * 1.5;
    let divider_y = fields_top + metrics.line_height(geometry.label_font_px) + spacing;
    let content_top = divider_y + spacing * 1.5;
    let content_bottom = geometry.height as f32 - geometry.margin - geometry.footer_height;
    let footer_top =
        geometry.height as f32 - geometry.margin - metrics.line_height(geometry.footer_font_px);

    HeaderBand {
        title_top,
        fields_top,
        divider_y,
        content_top,
        content_bottom,
        footer_top,
    }
}

fn try_plan(
    question_count: u32,
    choices: &ChoiceSet,
    base: &PageGeometry,
    metrics: &TextMetrics,
    header: HeaderBand,
    scale: f32,
) -> Option<LayoutPlan> {
    let geometry = base.scaled(scale);
    let row_height = geometry.row_height();
    let body_height = header.content_bottom - header.content_top;
    if body_height < row_height {
        return None;
    }

    let rows_per_column = ((body_height / row_height).floor() as usize).max(1);
    let column_count = (question_count as usize).div_ceil(rows_per_column);
    let column_width = geometry.usable_width() / column_count as f32;

    // Reserved number box: sized to the widest label so numbers right-align across rows.
    let number_width = metrics
        .measure(&question_label(question_count), geometry.question_font_px)
        .width();
    let choice_count = choices.len() as f32;
    let bubble_span =
        choice_count * geometry.bubble_diameter + (choice_count - 1.0) * geometry.bubble_padding_h;
    let row_extent =
        number_width + geometry.number_gap + geometry.question_number_padding + bubble_span;
    if row_extent > column_width {
        return None;
    }

    let radius = geometry.bubble_diameter / 2.0;
    let pitch = geometry.bubble_pitch();
    let mut questions = Vec::with_capacity(question_count as usize);
    for index in 0..question_count as usize {
        let column = index / rows_per_column;
        let row = index % rows_per_column;
        let column_x = geometry.margin + column as f32 * column_width;
        let number_right_x = column_x + number_width + geometry.number_gap;
        let bubbles_start_x = number_right_x + geometry.question_number_padding;
        let center_y = header.content_top + row as f32 * row_height + row_height / 2.0;

        let bubbles = choices
            .labels()
            .iter()
            .enumerate()
            .map(|(i, &label)| Bubble {
                label,
                x: bubbles_start_x + i as f32 * pitch + radius,
                y: center_y,
                radius,
            })
            .collect();

        questions.push(QuestionSlot {
            ordinal: index as u32 + 1,
            column,
            row,
            center_y,
            number_right_x,
            bubbles,
        });
    }

    Some(LayoutPlan {
        geometry,
        choices: choices.clone(),
        header,
        scale,
        rows_per_column,
        column_count,
        column_width,
        questions,
    })
}
