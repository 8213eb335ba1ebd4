use serde::Serialize;

use crate::db::types::{DifficultyLevel, QuestionType};

#[derive(Debug, Serialize)]
pub(crate) struct ExamListItem {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) duration_minutes: i32,
    pub(crate) difficulty: DifficultyLevel,
    pub(crate) question_count: i64,
}

/// Option as shown to a learner; the correctness flag stays server-side.
#[derive(Debug, Serialize)]
pub(crate) struct AnswerOptionView {
    pub(crate) id: String,
    pub(crate) option_label: String,
    pub(crate) content: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct QuestionView {
    pub(crate) id: String,
    pub(crate) content: String,
    pub(crate) question_type: QuestionType,
    pub(crate) order_index: i32,
    pub(crate) points: f64,
    pub(crate) options: Vec<AnswerOptionView>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ExamDetailResponse {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) duration_minutes: i32,
    pub(crate) difficulty: DifficultyLevel,
    pub(crate) is_active: bool,
    pub(crate) created_at: String,
    pub(crate) questions: Vec<QuestionView>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ExamStatsResponse {
    pub(crate) total_questions: i64,
    pub(crate) total_attempts: i64,
    pub(crate) completed_attempts: i64,
    pub(crate) average_score: f64,
    pub(crate) highest_score: f64,
    pub(crate) lowest_score: f64,
}
