//! Template service: plans once, then renders and maps from that one plan.
//!
//! Validation happens before planning; an invalid request produces no work.
//! Rendering is synchronous and CPU-bound. Async callers run `generate` inside
//! `tokio::task::spawn_blocking`.

use tracing::{debug, info};

use crate::errors::SheetError;
use crate::layout::{plan_layout, ChoiceSet, LayoutPlan, PageGeometry, TextMetrics};
use crate::render::encode::{encode_png, SHEET_DPI};
use crate::render::{FillState, SheetRenderer, TitleAlign};
use crate::sheet::models::SheetRequest;
use crate::sheet::position_map::PositionMap;

/// Which of the two sheet variants was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetVariant {
    Blank,
    AnswerKey,
}

#[derive(Debug, Clone)]
pub struct GeneratedSheet {
    pub variant: SheetVariant,
    pub png: Vec<u8>,
    pub position_map: PositionMap,
}

/// Request fields after validation.
#[derive(Debug, Clone)]
struct ValidatedRequest {
    question_count: u32,
    choices: ChoiceSet,
}

#[derive(Debug, Clone)]
pub struct TemplateService {
    metrics: TextMetrics,
    geometry: PageGeometry,
    renderer: SheetRenderer,
    max_questions: u32,
}

impl TemplateService {
    pub fn new(metrics: TextMetrics, max_questions: u32) -> Self {
        Self {
            renderer: SheetRenderer::new(metrics.clone()),
            metrics,
            geometry: PageGeometry::default(),
            max_questions,
        }
    }

    pub fn uses_builtin_font(&self) -> bool {
        self.metrics.is_builtin()
    }

    /// Runs the planner for a request without rendering anything.
    pub fn plan(&self, request: &SheetRequest) -> Result<LayoutPlan, SheetError> {
        let validated = self.validate(request)?;
        plan_layout(
            validated.question_count,
            &validated.choices,
            &self.geometry,
            &self.metrics,
        )
    }

    pub fn generate(&self, request: &SheetRequest) -> Result<GeneratedSheet, SheetError> {
        let plan = self.plan(request)?;
        let question_count = plan.question_count() as u32;

        let (variant, fill) = match &request.answer_key {
            Some(key) => (
                SheetVariant::AnswerKey,
                FillState::from_answer_key(key, plan.choices(), question_count),
            ),
            None => (SheetVariant::Blank, FillState::blank()),
        };
        let align = match variant {
            SheetVariant::Blank => TitleAlign::Left,
            SheetVariant::AnswerKey => TitleAlign::Center,
        };

        let pixmap = self.renderer.render(&plan, &request.title, align, &fill)?;
        let png = encode_png(&pixmap, SHEET_DPI)?;
        let position_map = PositionMap::from_plan(&plan);

        debug!(
            blank = fill.is_blank(),
            columns = plan.column_count(),
            rows_per_column = plan.rows_per_column(),
            column_width = plan.column_width(),
            bubble_radius = plan.bubble_radius(),
            scale = plan.scale(),
            "Sheet planned"
        );
        info!(
            questions = question_count,
            choices = plan.choices().len(),
            bubbles = position_map.bubble_count(),
            variant = ?variant,
            png_bytes = png.len(),
            "Sheet rendered"
        );

        Ok(GeneratedSheet {
            variant,
            png,
            position_map,
        })
    }

    fn validate(&self, request: &SheetRequest) -> Result<ValidatedRequest, SheetError> {
        if request.question_count <= 0 {
            return Err(SheetError::InvalidInput(
                "questionCount must be a positive integer".to_string(),
            ));
        }
        if request.question_count > self.max_questions as i64 {
            return Err(SheetError::InvalidInput(format!(
                "questionCount must not exceed {}",
                self.max_questions
            )));
        }
        let choices = match &request.choices {
            Some(raw) => ChoiceSet::from_strings(raw)?,
            None => ChoiceSet::default(),
        };
        Ok(ValidatedRequest {
            question_count: request.question_count as u32,
            choices,
        })
    }
}
