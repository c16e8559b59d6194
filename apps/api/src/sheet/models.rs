use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

fn default_title() -> String {
    "GABARITO".to_string()
}

/// Render request as received at the boundary.
///
/// Accepts both the current camelCase names and the legacy Portuguese ones
/// (`tituloProva`, `numQuestoes`) sent by existing clients.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetRequest {
    #[serde(alias = "tituloProva", default = "default_title")]
    pub title: String,
    #[serde(alias = "numQuestoes")]
    pub question_count: i64,
    #[serde(default)]
    pub choices: Option<Vec<String>>,
    /// One label per question. Present = answer-key sheet, absent = blank sheet.
    #[serde(default)]
    pub answer_key: Option<Vec<String>>,
}

#[cfg(test)]
impl SheetRequest {
    pub fn blank(title: &str, question_count: i64) -> Self {
        Self {
            title: title.to_string(),
            question_count,
            choices: None,
            answer_key: None,
        }
    }

    pub fn with_answer_key<S: Into<String>>(mut self, key: impl IntoIterator<Item = S>) -> Self {
        self.answer_key = Some(key.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_choices<S: Into<String>>(mut self, choices: impl IntoIterator<Item = S>) -> Self {
        self.choices = Some(choices.into_iter().map(Into::into).collect());
        self
    }
}

/// Where a persisted artifact pair landed.
#[derive(Debug, Clone, Serialize)]
pub struct StoredSheet {
    pub id: Uuid,
    pub image_path: PathBuf,
    pub position_map_path: PathBuf,
}
