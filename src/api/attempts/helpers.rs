use std::collections::HashMap;

use sqlx::PgPool;

use crate::api::errors::ApiError;
use crate::core::time::format_primitive;
use crate::db::models::{Exam, ExamAttempt, User};
use crate::repositories;
use crate::schemas::attempt::{AttemptResponse, ExamSummary, UserSummary};
use crate::services::grading::AnswerKeyQuestion;

pub(crate) fn build_response(
    attempt: ExamAttempt,
    user: &User,
    exam: &Exam,
    include_details: bool,
) -> AttemptResponse {
    AttemptResponse {
        id: attempt.id,
        user_id: attempt.user_id,
        exam_id: attempt.exam_id,
        status: attempt.status,
        started_at: format_primitive(attempt.started_at),
        completed_at: attempt.completed_at.map(format_primitive),
        total_questions: attempt.total_questions,
        correct_answers: attempt.correct_answers,
        score: attempt.score,
        time_spent_seconds: attempt.time_spent_seconds,
        detailed_result: if include_details {
            attempt.detailed_result.map(|details| details.0)
        } else {
            None
        },
        user: UserSummary {
            id: user.id.clone(),
            email: user.email.clone(),
            full_name: user.full_name.clone(),
        },
        exam: ExamSummary {
            id: exam.id.clone(),
            title: exam.title.clone(),
            duration_minutes: exam.duration_minutes,
            difficulty: exam.difficulty,
        },
    }
}

/// Loads the attempt's user and exam rows and builds the full response.
pub(crate) async fn load_response(
    pool: &PgPool,
    attempt: ExamAttempt,
    include_details: bool,
) -> Result<AttemptResponse, ApiError> {
    let user = repositories::users::find_by_id(pool, &attempt.user_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load attempt user"))?
        .ok_or_else(|| {
            ApiError::internal(
                format!("user {} missing for attempt {}", attempt.user_id, attempt.id),
                "Attempt references a missing user",
            )
        })?;

    let exam = repositories::exams::find_by_id(pool, &attempt.exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load attempt exam"))?
        .ok_or_else(|| {
            ApiError::internal(
                format!("exam {} missing for attempt {}", attempt.exam_id, attempt.id),
                "Attempt references a missing exam",
            )
        })?;

    Ok(build_response(attempt, &user, &exam, include_details))
}

/// Builds the grading answer key for an exam: every question in exam order
/// with the full set of labels flagged correct.
pub(crate) async fn load_answer_key(
    pool: &PgPool,
    exam_id: &str,
) -> Result<Vec<AnswerKeyQuestion>, ApiError> {
    let questions = repositories::questions::list_by_exam(pool, exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load exam questions"))?;
    let options = repositories::questions::list_options_by_exam(pool, exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load answer options"))?;

    let mut correct_by_question: HashMap<String, Vec<String>> = HashMap::new();
    for option in options {
        if option.is_correct {
            correct_by_question.entry(option.question_id).or_default().push(option.option_label);
        }
    }

    Ok(questions
        .into_iter()
        .map(|question| AnswerKeyQuestion {
            correct_options: correct_by_question.remove(&question.id).unwrap_or_default(),
            id: question.id,
            points: question.points,
        })
        .collect())
}
