use sqlx::PgPool;

use crate::db::models::Exam;
use crate::db::types::DifficultyLevel;

pub(crate) const COLUMNS: &str = "\
    id, title, description, duration_minutes, difficulty, is_active, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ExamCatalogRow {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) duration_minutes: i32,
    pub(crate) difficulty: DifficultyLevel,
    pub(crate) question_count: i64,
}

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Exam>, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!("SELECT {COLUMNS} FROM exams WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn list_active(pool: &PgPool) -> Result<Vec<ExamCatalogRow>, sqlx::Error> {
    sqlx::query_as::<_, ExamCatalogRow>(
        "SELECT e.id, e.title, e.description, e.duration_minutes, e.difficulty,
                COUNT(q.id) AS question_count
         FROM exams e
         LEFT JOIN questions q ON q.exam_id = e.id
         WHERE e.is_active
         GROUP BY e.id
         ORDER BY e.created_at DESC",
    )
    .fetch_all(pool)
    .await
}

pub(crate) async fn count_questions(pool: &PgPool, exam_id: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM questions WHERE exam_id = $1")
        .bind(exam_id)
        .fetch_one(pool)
        .await
}

pub(crate) struct CreateExam<'a> {
    pub(crate) id: &'a str,
    pub(crate) title: &'a str,
    pub(crate) description: Option<&'a str>,
    pub(crate) duration_minutes: i32,
    pub(crate) difficulty: DifficultyLevel,
    pub(crate) is_active: bool,
    pub(crate) created_at: time::PrimitiveDateTime,
    pub(crate) updated_at: time::PrimitiveDateTime,
}

pub(crate) async fn create(pool: &PgPool, params: CreateExam<'_>) -> Result<Exam, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!(
        "INSERT INTO exams (
            id, title, description, duration_minutes, difficulty, is_active,
            created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8)
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.title)
    .bind(params.description)
    .bind(params.duration_minutes)
    .bind(params.difficulty)
    .bind(params.is_active)
    .bind(params.created_at)
    .bind(params.updated_at)
    .fetch_one(pool)
    .await
}
