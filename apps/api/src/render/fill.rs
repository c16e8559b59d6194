//! Fill state: which bubble, if any, is drawn as selected for each question.
//!
//! Answer keys are sanitized, never rejected: a label outside the choice set
//! becomes the choice set's first label so the sheet is always produced.

use std::collections::BTreeMap;

use tracing::warn;

use crate::layout::ChoiceSet;

/// Normalizes one answer-key entry against `choices`.
///
/// Surrounding whitespace is ignored; anything that is not exactly one member
/// label maps to `choices.first()`.
pub fn sanitize_label(raw: &str, choices: &ChoiceSet) -> char {
    let trimmed = raw.trim();
    let mut chars = trimmed.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if choices.contains(c) => c,
        _ => choices.first(),
    }
}

/// Selected label per question ordinal. Every stored label is a member of the
/// choice set it was built against.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FillState {
    selected: BTreeMap<u32, char>,
}

impl FillState {
    /// No bubble selected: the blank-sheet variant.
    pub fn blank() -> Self {
        Self::default()
    }

    /// Builds the fill state of an answer-key sheet.
    ///
    /// Entry `i` belongs to question `i + 1`. Entries beyond `question_count` are
    /// ignored and questions without an entry stay unfilled.
    pub fn from_answer_key<S: AsRef<str>>(
        answer_key: &[S],
        choices: &ChoiceSet,
        question_count: u32,
    ) -> Self {
        if answer_key.len() != question_count as usize {
            warn!(
                entries = answer_key.len(),
                questions = question_count,
                "Answer key length differs from question count"
            );
        }

        let mut selected = BTreeMap::new();
        for (index, raw) in answer_key
            .iter()
            .take(question_count as usize)
            .enumerate()
        {
            let ordinal = index as u32 + 1;
            let label = sanitize_label(raw.as_ref(), choices);
            if raw.as_ref().trim() != label.to_string() {
                warn!(
                    question = ordinal,
                    rejected = raw.as_ref(),
                    substituted = %label,
                    "Answer key entry is not a valid choice; substituting first label"
                );
            }
            selected.insert(ordinal, label);
        }
        Self { selected }
    }

    pub fn selected(&self, ordinal: u32) -> Option<char> {
        self.selected.get(&ordinal).copied()
    }

    pub fn is_blank(&self) -> bool {
        self.selected.is_empty()
    }
}
