use sqlx::PgPool;

use crate::db::models::{AnswerOption, Question};
use crate::db::types::QuestionType;

pub(crate) const COLUMNS: &str = "\
    id, exam_id, content, question_type, order_index, points, created_at, updated_at";

const OPTION_COLUMNS: &str = "id, question_id, option_label, content, is_correct";

pub(crate) async fn list_by_exam(
    pool: &PgPool,
    exam_id: &str,
) -> Result<Vec<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!(
        "SELECT {COLUMNS} FROM questions WHERE exam_id = $1 ORDER BY order_index"
    ))
    .bind(exam_id)
    .fetch_all(pool)
    .await
}

/// Options for every question of an exam, ordered by question position then label.
pub(crate) async fn list_options_by_exam(
    pool: &PgPool,
    exam_id: &str,
) -> Result<Vec<AnswerOption>, sqlx::Error> {
    sqlx::query_as::<_, AnswerOption>(
        "SELECT o.id, o.question_id, o.option_label, o.content, o.is_correct
         FROM answer_options o
         JOIN questions q ON q.id = o.question_id
         WHERE q.exam_id = $1
         ORDER BY q.order_index, o.option_label",
    )
    .bind(exam_id)
    .fetch_all(pool)
    .await
}

pub(crate) struct CreateQuestion<'a> {
    pub(crate) id: &'a str,
    pub(crate) exam_id: &'a str,
    pub(crate) content: &'a str,
    pub(crate) question_type: QuestionType,
    pub(crate) order_index: i32,
    pub(crate) points: f64,
    pub(crate) created_at: time::PrimitiveDateTime,
    pub(crate) updated_at: time::PrimitiveDateTime,
}

pub(crate) async fn create(
    pool: &PgPool,
    params: CreateQuestion<'_>,
) -> Result<Question, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!(
        "INSERT INTO questions (
            id, exam_id, content, question_type, order_index, points, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8)
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.exam_id)
    .bind(params.content)
    .bind(params.question_type)
    .bind(params.order_index)
    .bind(params.points)
    .bind(params.created_at)
    .bind(params.updated_at)
    .fetch_one(pool)
    .await
}

pub(crate) struct CreateAnswerOption<'a> {
    pub(crate) id: &'a str,
    pub(crate) question_id: &'a str,
    pub(crate) option_label: &'a str,
    pub(crate) content: &'a str,
    pub(crate) is_correct: bool,
}

pub(crate) async fn create_option(
    pool: &PgPool,
    params: CreateAnswerOption<'_>,
) -> Result<AnswerOption, sqlx::Error> {
    sqlx::query_as::<_, AnswerOption>(&format!(
        "INSERT INTO answer_options (id, question_id, option_label, content, is_correct)
         VALUES ($1,$2,$3,$4,$5)
         RETURNING {OPTION_COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.question_id)
    .bind(params.option_label)
    .bind(params.content)
    .bind(params.is_correct)
    .fetch_one(pool)
    .await
}
