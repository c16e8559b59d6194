//! Grading collaborator interface.
//!
//! Grading (finding filled bubbles in a photographed sheet) happens outside
//! this service. The boundary hands a grader the uploaded image, the stored
//! position map and the expected answers, and passes the verdicts through.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sheet::position_map::PositionMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionVerdict {
    pub question: u32,
    /// `None` when no bubble (or more than one) was detected as marked.
    pub detected: Option<String>,
    pub expected: String,
    pub correct: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GradeReport {
    pub results: Vec<QuestionVerdict>,
}

#[derive(Debug, Error)]
#[error("Grading failed: {0}")]
pub struct GradeFailure(pub String);

#[async_trait]
pub trait Grader: Send + Sync {
    async fn grade(
        &self,
        image: &[u8],
        map: &PositionMap,
        expected: &[String],
    ) -> Result<GradeReport, GradeFailure>;
}

/// Parses the `answers` form field: a JSON array with one label per question.
pub fn parse_expected_answers(raw: &str, map: &PositionMap) -> Result<Vec<String>, String> {
    let answers: Vec<String> = serde_json::from_str(raw)
        .map_err(|e| format!("answers must be a JSON array of strings: {e}"))?;
    if answers.len() != map.question_count() {
        return Err(format!(
            "answers has {} entries but the sheet has {} questions",
            answers.len(),
            map.question_count()
        ));
    }
    Ok(answers)
}
