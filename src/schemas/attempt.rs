use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::db::types::{AttemptStatus, DifficultyLevel, QuestionResult};

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct AttemptStart {
    #[serde(alias = "userId")]
    #[validate(length(min = 1, message = "user_id must not be empty"))]
    pub(crate) user_id: String,
    #[serde(alias = "examId")]
    #[validate(length(min = 1, message = "exam_id must not be empty"))]
    pub(crate) exam_id: String,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct SubmittedAnswerPayload {
    #[serde(alias = "questionId")]
    #[validate(length(min = 1, message = "question_id must not be empty"))]
    pub(crate) question_id: String,
    #[serde(alias = "selectedOption")]
    #[validate(length(min = 1, message = "selected_option must not be empty"))]
    pub(crate) selected_option: String,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct AttemptSubmit {
    #[serde(default)]
    #[validate(nested)]
    pub(crate) answers: Vec<SubmittedAnswerPayload>,
    #[serde(default, alias = "timeSpentSeconds")]
    #[validate(range(min = 0, message = "time_spent_seconds must be non-negative"))]
    pub(crate) time_spent_seconds: Option<i32>,
}

/// Administrative field update. Setting status here never triggers grading.
#[derive(Debug, Deserialize, Validate)]
pub(crate) struct AttemptUpdate {
    #[serde(default)]
    pub(crate) status: Option<AttemptStatus>,
    #[serde(default)]
    #[validate(range(min = 0.0, max = 100.0, message = "score must be between 0 and 100"))]
    pub(crate) score: Option<f64>,
    #[serde(default, alias = "correctAnswers")]
    #[validate(range(min = 0, message = "correct_answers must be non-negative"))]
    pub(crate) correct_answers: Option<i32>,
    #[serde(default, alias = "timeSpentSeconds")]
    #[validate(range(min = 0, message = "time_spent_seconds must be non-negative"))]
    pub(crate) time_spent_seconds: Option<i32>,
    #[serde(default, alias = "detailedResult")]
    pub(crate) detailed_result: Option<Vec<QuestionResult>>,
    /// RFC 3339; auto-stamped when status moves to completed without it.
    #[serde(default, alias = "completedAt")]
    pub(crate) completed_at: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AttemptListQuery {
    #[serde(default, alias = "userId")]
    pub(crate) user_id: Option<String>,
    #[serde(default, alias = "examId")]
    pub(crate) exam_id: Option<String>,
    #[serde(default)]
    pub(crate) status: Option<AttemptStatus>,
    #[serde(default)]
    pub(crate) skip: i64,
    #[serde(default = "crate::api::pagination::default_limit")]
    pub(crate) limit: i64,
}

#[derive(Debug, Serialize)]
pub(crate) struct UserSummary {
    pub(crate) id: String,
    pub(crate) email: String,
    pub(crate) full_name: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct ExamSummary {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) duration_minutes: i32,
    pub(crate) difficulty: DifficultyLevel,
}

#[derive(Debug, Serialize)]
pub(crate) struct AttemptResponse {
    pub(crate) id: String,
    pub(crate) user_id: String,
    pub(crate) exam_id: String,
    pub(crate) status: AttemptStatus,
    pub(crate) started_at: String,
    pub(crate) completed_at: Option<String>,
    pub(crate) total_questions: i32,
    pub(crate) correct_answers: i32,
    pub(crate) score: Option<f64>,
    pub(crate) time_spent_seconds: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) detailed_result: Option<Vec<QuestionResult>>,
    pub(crate) user: UserSummary,
    pub(crate) exam: ExamSummary,
}

#[derive(Debug, Serialize)]
pub(crate) struct UserExamStatsResponse {
    pub(crate) total: i64,
    pub(crate) completed: i64,
    pub(crate) in_progress: i64,
    pub(crate) cancelled: i64,
    pub(crate) average_score: f64,
}
