use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use time::PrimitiveDateTime;

use crate::db::models::ExamAttempt;
use crate::db::types::{AttemptStatus, DifficultyLevel, QuestionResult};

pub(crate) const COLUMNS: &str = "\
    id, user_id, exam_id, status, started_at, completed_at, total_questions, \
    correct_answers, score, time_spent_seconds, detailed_result, created_at, updated_at";

/// Attempt joined with the user/exam summary columns shown in listings.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct AttemptListRow {
    pub(crate) id: String,
    pub(crate) user_id: String,
    pub(crate) exam_id: String,
    pub(crate) status: AttemptStatus,
    pub(crate) started_at: PrimitiveDateTime,
    pub(crate) completed_at: Option<PrimitiveDateTime>,
    pub(crate) total_questions: i32,
    pub(crate) correct_answers: i32,
    pub(crate) score: Option<f64>,
    pub(crate) time_spent_seconds: Option<i32>,
    pub(crate) user_email: String,
    pub(crate) user_full_name: String,
    pub(crate) exam_title: String,
    pub(crate) exam_duration_minutes: i32,
    pub(crate) exam_difficulty: DifficultyLevel,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct UserStatsRow {
    pub(crate) total: i64,
    pub(crate) completed: i64,
    pub(crate) in_progress: i64,
    pub(crate) cancelled: i64,
    pub(crate) average_score: f64,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ExamStatsRow {
    pub(crate) total_attempts: i64,
    pub(crate) completed_attempts: i64,
    pub(crate) average_score: f64,
    pub(crate) highest_score: f64,
    pub(crate) lowest_score: f64,
}

#[derive(Debug, Default)]
pub(crate) struct AttemptFilter {
    pub(crate) user_id: Option<String>,
    pub(crate) exam_id: Option<String>,
    pub(crate) status: Option<AttemptStatus>,
}

pub(crate) struct CreateAttempt<'a> {
    pub(crate) id: &'a str,
    pub(crate) user_id: &'a str,
    pub(crate) exam_id: &'a str,
    pub(crate) started_at: PrimitiveDateTime,
    pub(crate) total_questions: i32,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

/// Atomic conditional insert. The partial unique index on
/// (user_id, exam_id) WHERE status = 'in_progress' is the arbiter, so two
/// racing start calls cannot both succeed. Returns false when an open
/// attempt already exists.
pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    attempt: CreateAttempt<'_>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO exam_attempts (
            id, user_id, exam_id, status, started_at, total_questions,
            correct_answers, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,0,$7,$8)
        ON CONFLICT (user_id, exam_id) WHERE status = 'in_progress' DO NOTHING",
    )
    .bind(attempt.id)
    .bind(attempt.user_id)
    .bind(attempt.exam_id)
    .bind(AttemptStatus::InProgress)
    .bind(attempt.started_at)
    .bind(attempt.total_questions)
    .bind(attempt.created_at)
    .bind(attempt.updated_at)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub(crate) async fn find_by_id(
    pool: &PgPool,
    id: &str,
) -> Result<Option<ExamAttempt>, sqlx::Error> {
    sqlx::query_as::<_, ExamAttempt>(&format!("SELECT {COLUMNS} FROM exam_attempts WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn fetch_one_by_id(pool: &PgPool, id: &str) -> Result<ExamAttempt, sqlx::Error> {
    sqlx::query_as::<_, ExamAttempt>(&format!("SELECT {COLUMNS} FROM exam_attempts WHERE id = $1"))
        .bind(id)
        .fetch_one(pool)
        .await
}

pub(crate) struct CompleteAttempt<'a> {
    pub(crate) id: &'a str,
    pub(crate) completed_at: PrimitiveDateTime,
    pub(crate) correct_answers: i32,
    pub(crate) score: f64,
    pub(crate) detailed_result: &'a [QuestionResult],
    pub(crate) time_spent_seconds: Option<i32>,
    pub(crate) updated_at: PrimitiveDateTime,
}

/// Conditional in_progress -> completed transition. Returns false when the
/// attempt was not in progress anymore, so a concurrent second submit loses
/// without double-grading.
pub(crate) async fn complete(
    pool: &PgPool,
    params: CompleteAttempt<'_>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE exam_attempts SET
            status = $1,
            completed_at = $2,
            correct_answers = $3,
            score = $4,
            detailed_result = $5,
            time_spent_seconds = COALESCE($6, time_spent_seconds),
            updated_at = $7
         WHERE id = $8 AND status = $9",
    )
    .bind(AttemptStatus::Completed)
    .bind(params.completed_at)
    .bind(params.correct_answers)
    .bind(params.score)
    .bind(Json(params.detailed_result))
    .bind(params.time_spent_seconds)
    .bind(params.updated_at)
    .bind(params.id)
    .bind(AttemptStatus::InProgress)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

#[derive(Debug, Default)]
pub(crate) struct UpdateAttempt {
    pub(crate) status: Option<AttemptStatus>,
    pub(crate) score: Option<f64>,
    pub(crate) correct_answers: Option<i32>,
    pub(crate) time_spent_seconds: Option<i32>,
    pub(crate) detailed_result: Option<Vec<QuestionResult>>,
    pub(crate) completed_at: Option<PrimitiveDateTime>,
}

/// Administrative partial update. Does not grade and does not guard the
/// current status; the submit path never goes through here.
pub(crate) async fn update(
    pool: &PgPool,
    id: &str,
    params: UpdateAttempt,
    now: PrimitiveDateTime,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE exam_attempts SET
            status = COALESCE($1, status),
            score = COALESCE($2, score),
            correct_answers = COALESCE($3, correct_answers),
            time_spent_seconds = COALESCE($4, time_spent_seconds),
            detailed_result = COALESCE($5, detailed_result),
            completed_at = COALESCE($6, completed_at),
            updated_at = $7
         WHERE id = $8",
    )
    .bind(params.status)
    .bind(params.score)
    .bind(params.correct_answers)
    .bind(params.time_spent_seconds)
    .bind(params.detailed_result.map(Json))
    .bind(params.completed_at)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub(crate) async fn delete_by_id(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
    let result =
        sqlx::query("DELETE FROM exam_attempts WHERE id = $1").bind(id).execute(pool).await?;
    Ok(result.rows_affected() > 0)
}

pub(crate) async fn list(
    pool: &PgPool,
    filter: &AttemptFilter,
    skip: i64,
    limit: i64,
) -> Result<Vec<AttemptListRow>, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(
        "SELECT a.id, a.user_id, a.exam_id, a.status, a.started_at, a.completed_at,
                a.total_questions, a.correct_answers, a.score, a.time_spent_seconds,
                u.email AS user_email, u.full_name AS user_full_name,
                e.title AS exam_title, e.duration_minutes AS exam_duration_minutes,
                e.difficulty AS exam_difficulty
         FROM exam_attempts a
         JOIN users u ON u.id = a.user_id
         JOIN exams e ON e.id = a.exam_id
         WHERE TRUE",
    );
    push_filters(&mut builder, filter);

    builder.push(" ORDER BY a.started_at DESC OFFSET ");
    builder.push_bind(skip.max(0));
    builder.push(" LIMIT ");
    builder.push_bind(limit.clamp(1, 1000));

    builder.build_query_as::<AttemptListRow>().fetch_all(pool).await
}

pub(crate) async fn count(pool: &PgPool, filter: &AttemptFilter) -> Result<i64, sqlx::Error> {
    let mut builder =
        QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM exam_attempts a WHERE TRUE");
    push_filters(&mut builder, filter);

    builder.build_query_scalar::<i64>().fetch_one(pool).await
}

fn push_filters<'a>(builder: &mut QueryBuilder<'a, Postgres>, filter: &'a AttemptFilter) {
    if let Some(user_id) = &filter.user_id {
        builder.push(" AND a.user_id = ");
        builder.push_bind(user_id);
    }
    if let Some(exam_id) = &filter.exam_id {
        builder.push(" AND a.exam_id = ");
        builder.push_bind(exam_id);
    }
    if let Some(status) = filter.status {
        builder.push(" AND a.status = ");
        builder.push_bind(status);
    }
}

pub(crate) async fn user_stats(pool: &PgPool, user_id: &str) -> Result<UserStatsRow, sqlx::Error> {
    sqlx::query_as::<_, UserStatsRow>(
        "SELECT COUNT(*) AS total,
                COUNT(*) FILTER (WHERE status = $2) AS completed,
                COUNT(*) FILTER (WHERE status = $3) AS in_progress,
                COUNT(*) FILTER (WHERE status = $4) AS cancelled,
                COALESCE(AVG(score) FILTER (WHERE status = $2 AND score IS NOT NULL), 0)
                    AS average_score
         FROM exam_attempts
         WHERE user_id = $1",
    )
    .bind(user_id)
    .bind(AttemptStatus::Completed)
    .bind(AttemptStatus::InProgress)
    .bind(AttemptStatus::Cancelled)
    .fetch_one(pool)
    .await
}

pub(crate) async fn exam_stats(pool: &PgPool, exam_id: &str) -> Result<ExamStatsRow, sqlx::Error> {
    sqlx::query_as::<_, ExamStatsRow>(
        "SELECT COUNT(*) AS total_attempts,
                COUNT(*) FILTER (WHERE status = $2) AS completed_attempts,
                COALESCE(AVG(score) FILTER (WHERE status = $2 AND score IS NOT NULL), 0)
                    AS average_score,
                COALESCE(MAX(score) FILTER (WHERE status = $2), 0) AS highest_score,
                COALESCE(MIN(score) FILTER (WHERE status = $2), 0) AS lowest_score
         FROM exam_attempts
         WHERE exam_id = $1",
    )
    .bind(exam_id)
    .bind(AttemptStatus::Completed)
    .fetch_one(pool)
    .await
}
