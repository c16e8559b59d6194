//! Position map: the persisted projection of a layout plan.
//!
//! Format (JSON):
//! ```text
//! {
//!   "page_width": 1240,
//!   "page_height": 1754,
//!   "choices": ["A", "B", "C", "D", "E"],
//!   "questions": {
//!     "1": { "A": {"x": 147.0, "y": 214.0, "radius": 14.0}, "B": {...}, ... },
//!     ...
//!   }
//! }
//! ```
//! Labels inside a question keep choice-set order. Values are copied from the
//! plan, never recomputed.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::layout::LayoutPlan;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BubbleGeometry {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
}

/// Bubbles of one question, in choice-set order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QuestionBubbles(Vec<(String, BubbleGeometry)>);

impl QuestionBubbles {
    fn len(&self) -> usize {
        self.0.len()
    }
}

#[cfg(test)]
impl QuestionBubbles {
    pub fn get(&self, label: &str) -> Option<&BubbleGeometry> {
        self.0.iter().find(|(l, _)| l == label).map(|(_, g)| g)
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(l, _)| l.as_str())
    }
}

impl Serialize for QuestionBubbles {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (label, geometry) in &self.0 {
            map.serialize_entry(label, geometry)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for QuestionBubbles {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OrderedBubbles;

        impl<'de> Visitor<'de> for OrderedBubbles {
            type Value = QuestionBubbles;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map from choice label to bubble geometry")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(5));
                while let Some((label, geometry)) = access.next_entry::<String, BubbleGeometry>()? {
                    entries.push((label, geometry));
                }
                Ok(QuestionBubbles(entries))
            }
        }

        deserializer.deserialize_map(OrderedBubbles)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionMap {
    pub page_width: u32,
    pub page_height: u32,
    pub choices: Vec<String>,
    /// Keyed by 1-based question ordinal.
    pub questions: BTreeMap<u32, QuestionBubbles>,
}

impl PositionMap {
    /// Projects `plan` into the persisted format.
    pub fn from_plan(plan: &LayoutPlan) -> Self {
        let geometry = plan.geometry();
        let questions = plan
            .questions()
            .iter()
            .map(|slot| {
                let bubbles = slot
                    .bubbles
                    .iter()
                    .map(|b| {
                        (
                            b.label.to_string(),
                            BubbleGeometry {
                                x: b.x,
                                y: b.y,
                                radius: b.radius,
                            },
                        )
                    })
                    .collect();
                (slot.ordinal, QuestionBubbles(bubbles))
            })
            .collect();

        Self {
            page_width: geometry.width,
            page_height: geometry.height,
            choices: plan
                .choices()
                .labels()
                .iter()
                .map(char::to_string)
                .collect(),
            questions,
        }
    }

    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    pub fn bubble_count(&self) -> usize {
        self.questions.values().map(QuestionBubbles::len).sum()
    }

    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec_pretty(self)
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}
