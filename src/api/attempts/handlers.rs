use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use uuid::Uuid;
use validator::Validate;

use crate::api::attempts::helpers;
use crate::api::errors::ApiError;
use crate::api::pagination::PaginatedResponse;
use crate::core::state::AppState;
use crate::core::time::{format_primitive, primitive_now_utc, to_primitive_utc};
use crate::db::types::AttemptStatus;
use crate::repositories;
use crate::repositories::attempts::{
    AttemptFilter, AttemptListRow, CompleteAttempt, CreateAttempt, UpdateAttempt,
};
use crate::schemas::attempt::{
    AttemptListQuery, AttemptResponse, AttemptStart, AttemptSubmit, AttemptUpdate, ExamSummary,
    UserExamStatsResponse, UserSummary,
};
use crate::services::grading::{self, SubmittedAnswer};

pub(crate) async fn start_attempt(
    State(state): State<AppState>,
    Json(payload): Json<AttemptStart>,
) -> Result<(StatusCode, Json<AttemptResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    // Inactive users and exams are reported as missing, same as the catalog.
    let user = repositories::users::find_by_id(state.db(), &payload.user_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load user"))?
        .filter(|user| user.is_active)
        .ok_or_else(|| {
            ApiError::NotFound(format!("User with ID {} not found", payload.user_id))
        })?;

    let exam = repositories::exams::find_by_id(state.db(), &payload.exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load exam"))?
        .filter(|exam| exam.is_active)
        .ok_or_else(|| {
            ApiError::NotFound(format!("Exam with ID {} not found", payload.exam_id))
        })?;

    let total_questions = repositories::exams::count_questions(state.db(), &exam.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count exam questions"))?;

    let now = primitive_now_utc();
    let attempt_id = Uuid::new_v4().to_string();
    let created = repositories::attempts::create(
        state.db(),
        CreateAttempt {
            id: &attempt_id,
            user_id: &user.id,
            exam_id: &exam.id,
            started_at: now,
            total_questions: total_questions as i32,
            created_at: now,
            updated_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create exam attempt"))?;

    if !created {
        return Err(ApiError::Conflict(format!(
            "User {} already has an attempt in progress for exam {}",
            user.id, exam.id
        )));
    }

    let attempt = repositories::attempts::fetch_one_by_id(state.db(), &attempt_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load created attempt"))?;

    Ok((StatusCode::CREATED, Json(helpers::build_response(attempt, &user, &exam, false))))
}

pub(crate) async fn list_attempts(
    State(state): State<AppState>,
    Query(params): Query<AttemptListQuery>,
) -> Result<Json<PaginatedResponse<AttemptResponse>>, ApiError> {
    let (skip, limit) = crate::api::pagination::clamp_window(params.skip, params.limit);

    let filter = AttemptFilter {
        user_id: params.user_id,
        exam_id: params.exam_id,
        status: params.status,
    };

    let rows = repositories::attempts::list(state.db(), &filter, skip, limit)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list exam attempts"))?;
    let total_count = repositories::attempts::count(state.db(), &filter)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count exam attempts"))?;

    let items = rows.into_iter().map(list_row_to_response).collect();

    Ok(Json(PaginatedResponse { items, total_count, skip, limit }))
}

pub(crate) async fn get_attempt(
    State(state): State<AppState>,
    Path(attempt_id): Path<String>,
) -> Result<Json<AttemptResponse>, ApiError> {
    let attempt = repositories::attempts::find_by_id(state.db(), &attempt_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load exam attempt"))?
        .ok_or_else(|| attempt_not_found(&attempt_id))?;

    let response = helpers::load_response(state.db(), attempt, true).await?;
    Ok(Json(response))
}

pub(crate) async fn submit_attempt(
    State(state): State<AppState>,
    Path(attempt_id): Path<String>,
    Json(payload): Json<AttemptSubmit>,
) -> Result<Json<AttemptResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let attempt = repositories::attempts::find_by_id(state.db(), &attempt_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load exam attempt"))?
        .ok_or_else(|| attempt_not_found(&attempt_id))?;

    if attempt.status != AttemptStatus::InProgress {
        return Err(ApiError::Conflict("Exam attempt is not in progress".to_string()));
    }

    let answer_key = helpers::load_answer_key(state.db(), &attempt.exam_id).await?;
    let answers: Vec<SubmittedAnswer> = payload
        .answers
        .into_iter()
        .map(|answer| SubmittedAnswer {
            question_id: answer.question_id,
            selected_option: answer.selected_option,
        })
        .collect();

    let outcome = grading::grade(&answer_key, &answers);

    let now = primitive_now_utc();
    let completed = repositories::attempts::complete(
        state.db(),
        CompleteAttempt {
            id: &attempt.id,
            completed_at: now,
            correct_answers: outcome.correct_answers,
            score: outcome.score,
            detailed_result: &outcome.detailed_result,
            time_spent_seconds: payload.time_spent_seconds,
            updated_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to complete exam attempt"))?;

    if !completed {
        // Lost the race against another submit or a status change.
        return Err(ApiError::Conflict("Exam attempt is not in progress".to_string()));
    }

    let attempt = repositories::attempts::fetch_one_by_id(state.db(), &attempt_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load graded attempt"))?;

    let response = helpers::load_response(state.db(), attempt, true).await?;
    Ok(Json(response))
}

pub(crate) async fn update_attempt(
    State(state): State<AppState>,
    Path(attempt_id): Path<String>,
    Json(payload): Json<AttemptUpdate>,
) -> Result<Json<AttemptResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let existing = repositories::attempts::find_by_id(state.db(), &attempt_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load exam attempt"))?
        .ok_or_else(|| attempt_not_found(&attempt_id))?;

    let mut completed_at = match &payload.completed_at {
        Some(raw) => {
            let parsed = OffsetDateTime::parse(raw, &Rfc3339).map_err(|_| {
                ApiError::BadRequest("completed_at must be an RFC 3339 timestamp".to_string())
            })?;
            Some(to_primitive_utc(parsed))
        }
        None => None,
    };

    let now = primitive_now_utc();
    // Marking an attempt completed stamps the completion time once; grading
    // never happens on this path.
    if payload.status == Some(AttemptStatus::Completed)
        && completed_at.is_none()
        && existing.completed_at.is_none()
    {
        completed_at = Some(now);
    }

    let updated = repositories::attempts::update(
        state.db(),
        &attempt_id,
        UpdateAttempt {
            status: payload.status,
            score: payload.score,
            correct_answers: payload.correct_answers,
            time_spent_seconds: payload.time_spent_seconds,
            detailed_result: payload.detailed_result,
            completed_at,
        },
        now,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update exam attempt"))?;

    if !updated {
        return Err(attempt_not_found(&attempt_id));
    }

    let attempt = repositories::attempts::fetch_one_by_id(state.db(), &attempt_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load updated attempt"))?;

    let response = helpers::load_response(state.db(), attempt, true).await?;
    Ok(Json(response))
}

pub(crate) async fn delete_attempt(
    State(state): State<AppState>,
    Path(attempt_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let deleted = repositories::attempts::delete_by_id(state.db(), &attempt_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete exam attempt"))?;

    if !deleted {
        return Err(attempt_not_found(&attempt_id));
    }

    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn user_exam_stats(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<UserExamStatsResponse>, ApiError> {
    repositories::users::find_by_id(state.db(), &user_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load user"))?
        .ok_or_else(|| ApiError::NotFound(format!("User with ID {user_id} not found")))?;

    let stats = repositories::attempts::user_stats(state.db(), &user_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load user exam stats"))?;

    Ok(Json(UserExamStatsResponse {
        total: stats.total,
        completed: stats.completed,
        in_progress: stats.in_progress,
        cancelled: stats.cancelled,
        average_score: stats.average_score,
    }))
}

fn attempt_not_found(attempt_id: &str) -> ApiError {
    ApiError::NotFound(format!("Exam attempt with ID {attempt_id} not found"))
}

fn list_row_to_response(row: AttemptListRow) -> AttemptResponse {
    AttemptResponse {
        id: row.id,
        user_id: row.user_id.clone(),
        exam_id: row.exam_id.clone(),
        status: row.status,
        started_at: format_primitive(row.started_at),
        completed_at: row.completed_at.map(format_primitive),
        total_questions: row.total_questions,
        correct_answers: row.correct_answers,
        score: row.score,
        time_spent_seconds: row.time_spent_seconds,
        detailed_result: None,
        user: UserSummary {
            id: row.user_id,
            email: row.user_email,
            full_name: row.user_full_name,
        },
        exam: ExamSummary {
            id: row.exam_id,
            title: row.exam_title,
            duration_minutes: row.exam_duration_minutes,
            difficulty: row.exam_difficulty,
        },
    }
}
