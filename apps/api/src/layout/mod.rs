// Sheet layout: geometry constants, text measurement and the planner.
// The planner is pure; rendering and position-map building both consume its plan.

pub mod bitmap_font;
pub mod geometry;
pub mod planner;
pub mod text_metrics;

pub use geometry::{ChoiceSet, PageGeometry};
pub use planner::{plan_layout, question_label, Bubble, LayoutPlan};
pub use text_metrics::{TextBox, TextMetrics};
