//! Sheet renderer: paints a planned sheet onto a raster page.
//!
//! One renderer serves both variants: the blank sheet (empty fill state) and
//! the answer-key sheet (one selected bubble per keyed question). Every bubble
//! is drawn at the coordinates stored in the plan; nothing here computes
//! bubble geometry.

use tiny_skia::{Color, Paint, PathBuilder, Pixmap, Stroke, Transform};

use crate::errors::SheetError;
use crate::layout::{question_label, Bubble, LayoutPlan, TextMetrics};
use crate::render::fill::FillState;
use crate::render::text::{draw_text, draw_text_at_box, draw_text_centered, solid};

/// Horizontal placement of the title line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleAlign {
    Left,
    Center,
}

/// Fixed strings printed around the bubbles.
#[derive(Debug, Clone)]
pub struct SheetLabels {
    /// Student-identification fields, left to right. The first gets the long rule.
    pub fields: Vec<String>,
    pub footer: String,
}

impl Default for SheetLabels {
    fn default() -> Self {
        Self {
            fields: vec![
                "Nome:".to_string(),
                "Número:".to_string(),
                "Turma:".to_string(),
            ],
            footer: "Assinale apenas uma opção por questão.".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Palette {
    pub paper: Color,
    pub ink: Color,
    pub label: Color,
    pub rule: Color,
    pub footer: Color,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            paper: Color::WHITE,
            ink: Color::from_rgba8(30, 30, 30, 255),
            label: Color::from_rgba8(100, 100, 100, 255),
            rule: Color::from_rgba8(210, 210, 210, 255),
            footer: Color::from_rgba8(180, 180, 180, 255),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SheetRenderer {
    metrics: TextMetrics,
    labels: SheetLabels,
    palette: Palette,
}

impl SheetRenderer {
    pub fn new(metrics: TextMetrics) -> Self {
        Self {
            metrics,
            labels: SheetLabels::default(),
            palette: Palette::default(),
        }
    }

    pub fn render(
        &self,
        plan: &LayoutPlan,
        title: &str,
        align: TitleAlign,
        fill: &FillState,
    ) -> Result<Pixmap, SheetError> {
        let geometry = plan.geometry();
        let mut pixmap = Pixmap::new(geometry.width, geometry.height).ok_or_else(|| {
            SheetError::Render(format!(
                "invalid raster size {}x{}",
                geometry.width, geometry.height
            ))
        })?;
        pixmap.fill(self.palette.paper);

        self.draw_header(&mut pixmap, plan, title, align);
        self.draw_questions(&mut pixmap, plan, fill);
        self.draw_footer(&mut pixmap, plan);
        Ok(pixmap)
    }

    fn draw_header(&self, pixmap: &mut Pixmap, plan: &LayoutPlan, title: &str, align: TitleAlign) {
        let geometry = plan.geometry();
        let header = plan.header();
        let page_width = geometry.width as f32;

        let title = title.to_uppercase();
        let title_font = self.metrics.font(geometry.title_font_px);
        let title_box = title_font.measure(&title);
        let title_left = match align {
            TitleAlign::Left => geometry.margin,
            TitleAlign::Center => (page_width - title_box.width()) / 2.0,
        };
        draw_text_at_box(
            pixmap,
            &title_font,
            &title,
            title_left,
            header.title_top,
            self.palette.ink,
        );

        let label_font = self.metrics.font(geometry.label_font_px);
        let mut x = geometry.margin;
        for (index, label) in self.labels.fields.iter().enumerate() {
            let fraction = if index == 0 {
                geometry.name_rule_fraction
            } else {
                geometry.short_rule_fraction
            };
            let label_box = draw_text_at_box(
                pixmap,
                &label_font,
                label,
                x,
                header.fields_top,
                self.palette.label,
            );
            let rule_start = x + label_box.width() + geometry.field_label_gap;
            let rule_end = rule_start + fraction * geometry.usable_width();
            let rule_y = header.fields_top + label_box.height() * 0.7;
            stroke_line(pixmap, rule_start, rule_y, rule_end, rule_y, self.palette.rule);
            x = rule_end + geometry.field_spacing;
        }

        stroke_line(
            pixmap,
            geometry.margin,
            header.divider_y,
            page_width - geometry.margin,
            header.divider_y,
            self.palette.rule,
        );
    }

    fn draw_questions(&self, pixmap: &mut Pixmap, plan: &LayoutPlan, fill: &FillState) {
        let geometry = plan.geometry();
        let number_font = self.metrics.font(geometry.question_font_px);
        let choice_font = self.metrics.font(geometry.choice_font_px);

        for question in plan.questions() {
            let label = question_label(question.ordinal);
            let number_box = number_font.measure(&label);
            draw_text(
                pixmap,
                &number_font,
                &label,
                question.number_right_x - number_box.right,
                question.center_y - (number_box.top + number_box.bottom) / 2.0,
                self.palette.ink,
            );

            let selected = fill.selected(question.ordinal);
            for bubble in &question.bubbles {
                let filled = selected == Some(bubble.label);
                self.draw_bubble(pixmap, bubble, filled);
                let glyph_color = if filled {
                    self.palette.paper
                } else {
                    self.palette.ink
                };
                draw_text_centered(
                    pixmap,
                    &choice_font,
                    &bubble.label.to_string(),
                    bubble.x,
                    bubble.y,
                    glyph_color,
                );
            }
        }
    }

    fn draw_bubble(&self, pixmap: &mut Pixmap, bubble: &Bubble, filled: bool) {
        let Some(circle) = PathBuilder::from_circle(bubble.x, bubble.y, bubble.radius) else {
            return;
        };
        let outline = if filled {
            pixmap.fill_path(
                &circle,
                &solid(self.palette.ink),
                tiny_skia::FillRule::Winding,
                Transform::identity(),
                None,
            );
            self.palette.ink
        } else {
            self.palette.rule
        };
        pixmap.stroke_path(&circle, &solid(outline), &hairline(), Transform::identity(), None);
    }

    fn draw_footer(&self, pixmap: &mut Pixmap, plan: &LayoutPlan) {
        let geometry = plan.geometry();
        let footer_font = self.metrics.font(geometry.footer_font_px);
        let footer_box = footer_font.measure(&self.labels.footer);
        draw_text_at_box(
            pixmap,
            &footer_font,
            &self.labels.footer,
            (geometry.width as f32 - footer_box.width()) / 2.0,
            plan.header().footer_top,
            self.palette.footer,
        );
    }
}

fn hairline() -> Stroke {
    Stroke {
        width: 1.0,
        ..Stroke::default()
    }
}

fn stroke_line(pixmap: &mut Pixmap, x0: f32, y0: f32, x1: f32, y1: f32, color: Color) {
    // Half-pixel offset keeps 1px horizontal rules on a single pixel row.
    let (y0, y1) = (y0.floor() + 0.5, y1.floor() + 0.5);
    let mut builder = PathBuilder::new();
    builder.move_to(x0, y0);
    builder.line_to(x1, y1);
    let Some(path) = builder.finish() else {
        return;
    };
    let paint: Paint<'_> = solid(color);
    pixmap.stroke_path(&path, &paint, &hairline(), Transform::identity(), None);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{plan_layout, ChoiceSet, PageGeometry};

    fn plan(n: u32) -> LayoutPlan {
        plan_layout(
            n,
            &ChoiceSet::default(),
            &PageGeometry::default(),
            &TextMetrics::builtin(),
        )
        .unwrap()
    }

    fn renderer() -> SheetRenderer {
        SheetRenderer::new(TextMetrics::builtin())
    }

    /// Samples inside the circle, below the letter glyph.
    fn is_filled(pixmap: &Pixmap, bubble: &Bubble) -> bool {
        let px = pixmap
            .pixel(bubble.x as u32, (bubble.y + bubble.radius * 0.7) as u32)
            .unwrap();
        px.red() < 100
    }

    fn has_ink_in(pixmap: &Pixmap, x0: u32, y0: u32, x1: u32, y1: u32) -> bool {
        (y0..y1).any(|y| (x0..x1).any(|x| pixmap.pixel(x, y).unwrap().red() < 250))
    }

    #[test]
    fn test_page_has_fixed_size() {
        let pixmap = renderer()
            .render(&plan(5), "Prova", TitleAlign::Left, &FillState::blank())
            .unwrap();
        assert_eq!((pixmap.width(), pixmap.height()), (1240, 1754));
    }

    #[test]
    fn test_blank_sheet_has_no_filled_bubbles() {
        let p = plan(20);
        let pixmap = renderer()
            .render(&p, "Prova", TitleAlign::Left, &FillState::blank())
            .unwrap();
        for q in p.questions() {
            for b in &q.bubbles {
                assert!(!is_filled(&pixmap, b), "question {} {}", q.ordinal, b.label);
            }
        }
    }

    #[test]
    fn test_answer_key_fills_exactly_the_keyed_bubble() {
        let key = ["B", "A", "C", "D", "E", "A", "B", "C", "D", "E"];
        let p = plan(10);
        let fill = FillState::from_answer_key(&key, p.choices(), 10);
        let pixmap = renderer()
            .render(&p, "Gabarito", TitleAlign::Center, &fill)
            .unwrap();

        for (q, expected) in p.questions().iter().zip(key) {
            let filled: Vec<char> = q
                .bubbles
                .iter()
                .filter(|b| is_filled(&pixmap, b))
                .map(|b| b.label)
                .collect();
            assert_eq!(filled, vec![expected.chars().next().unwrap()], "question {}", q.ordinal);
        }
    }

    #[test]
    fn test_invalid_key_entry_fills_first_choice() {
        let key = ["B", "C", "Z", "D"];
        let p = plan(4);
        let fill = FillState::from_answer_key(&key, p.choices(), 4);
        let pixmap = renderer()
            .render(&p, "Gabarito", TitleAlign::Center, &fill)
            .unwrap();
        let third = &p.questions()[2];
        assert!(is_filled(&pixmap, &third.bubbles[0]));
        assert!(third.bubbles[1..].iter().all(|b| !is_filled(&pixmap, b)));
    }

    #[test]
    fn test_unfilled_bubble_letter_is_drawn_inside_circle() {
        let p = plan(1);
        let pixmap = renderer()
            .render(&p, "Prova", TitleAlign::Left, &FillState::blank())
            .unwrap();
        let b = &p.questions()[0].bubbles[0];
        let (x, y, r) = (b.x as u32, b.y as u32, b.radius as u32);
        assert!(has_ink_in(&pixmap, x - r / 2, y - r / 2, x + r / 2, y + r / 2));
    }

    #[test]
    fn test_title_alignment_variants() {
        let p = plan(5);
        let left = renderer()
            .render(&p, "gabarito", TitleAlign::Left, &FillState::blank())
            .unwrap();
        let centered = renderer()
            .render(&p, "gabarito", TitleAlign::Center, &FillState::blank())
            .unwrap();
        let title_rows = (60, 95);
        assert!(has_ink_in(&left, 60, title_rows.0, 70, title_rows.1));
        assert!(!has_ink_in(&centered, 60, title_rows.0, 70, title_rows.1));
        assert!(has_ink_in(&centered, 600, title_rows.0, 640, title_rows.1));
    }

    #[test]
    fn test_footer_is_centered() {
        let p = plan(5);
        let pixmap = renderer()
            .render(&p, "Prova", TitleAlign::Left, &FillState::blank())
            .unwrap();
        let top = p.header().footer_top as u32;
        let bottom = 1754 - 60;
        assert!(has_ink_in(&pixmap, 600, top, 640, bottom));
        assert!(!has_ink_in(&pixmap, 60, top, 200, bottom));
        assert!(!has_ink_in(&pixmap, 1040, top, 1180, bottom));
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let p = plan(30);
        let a = renderer()
            .render(&p, "Prova", TitleAlign::Left, &FillState::blank())
            .unwrap();
        let b = renderer()
            .render(&p, "Prova", TitleAlign::Left, &FillState::blank())
            .unwrap();
        assert_eq!(a.data(), b.data());
    }
}
