use std::collections::HashMap;

use axum::extract::{Path, State};
use axum::Json;

use crate::api::errors::ApiError;
use crate::core::state::AppState;
use crate::core::time::format_primitive;
use crate::repositories;
use crate::schemas::exam::{
    AnswerOptionView, ExamDetailResponse, ExamListItem, ExamStatsResponse, QuestionView,
};

pub(crate) async fn list_exams(
    State(state): State<AppState>,
) -> Result<Json<Vec<ExamListItem>>, ApiError> {
    let exams = repositories::exams::list_active(state.db())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list exams"))?;

    let items = exams
        .into_iter()
        .map(|exam| ExamListItem {
            id: exam.id,
            title: exam.title,
            description: exam.description,
            duration_minutes: exam.duration_minutes,
            difficulty: exam.difficulty,
            question_count: exam.question_count,
        })
        .collect();

    Ok(Json(items))
}

pub(crate) async fn get_exam(
    State(state): State<AppState>,
    Path(exam_id): Path<String>,
) -> Result<Json<ExamDetailResponse>, ApiError> {
    let exam = repositories::exams::find_by_id(state.db(), &exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load exam"))?
        .ok_or_else(|| exam_not_found(&exam_id))?;

    let questions = repositories::questions::list_by_exam(state.db(), &exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load exam questions"))?;
    let options = repositories::questions::list_options_by_exam(state.db(), &exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load answer options"))?;

    let mut options_by_question: HashMap<String, Vec<AnswerOptionView>> = HashMap::new();
    for option in options {
        options_by_question.entry(option.question_id).or_default().push(AnswerOptionView {
            id: option.id,
            option_label: option.option_label,
            content: option.content,
        });
    }

    let questions = questions
        .into_iter()
        .map(|question| QuestionView {
            options: options_by_question.remove(&question.id).unwrap_or_default(),
            id: question.id,
            content: question.content,
            question_type: question.question_type,
            order_index: question.order_index,
            points: question.points,
        })
        .collect();

    Ok(Json(ExamDetailResponse {
        id: exam.id,
        title: exam.title,
        description: exam.description,
        duration_minutes: exam.duration_minutes,
        difficulty: exam.difficulty,
        is_active: exam.is_active,
        created_at: format_primitive(exam.created_at),
        questions,
    }))
}

pub(crate) async fn exam_stats(
    State(state): State<AppState>,
    Path(exam_id): Path<String>,
) -> Result<Json<ExamStatsResponse>, ApiError> {
    repositories::exams::find_by_id(state.db(), &exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load exam"))?
        .ok_or_else(|| exam_not_found(&exam_id))?;

    let total_questions = repositories::exams::count_questions(state.db(), &exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count exam questions"))?;
    let stats = repositories::attempts::exam_stats(state.db(), &exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load exam stats"))?;

    Ok(Json(ExamStatsResponse {
        total_questions,
        total_attempts: stats.total_attempts,
        completed_attempts: stats.completed_attempts,
        average_score: stats.average_score,
        highest_score: stats.highest_score,
        lowest_score: stats.lowest_score,
    }))
}

fn exam_not_found(exam_id: &str) -> ApiError {
    ApiError::NotFound(format!("Exam with ID {exam_id} not found"))
}
