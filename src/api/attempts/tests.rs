use axum::http::{Method, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use crate::db::models::Question;
use crate::test_support;

async fn start_attempt(
    ctx: &test_support::TestContext,
    user_id: &str,
    exam_id: &str,
) -> (StatusCode, serde_json::Value) {
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/exam-attempts",
            Some(json!({"user_id": user_id, "exam_id": exam_id})),
        ))
        .await
        .expect("start attempt");

    let status = response.status();
    let body = test_support::read_json(response).await;
    (status, body)
}

async fn submit_attempt(
    ctx: &test_support::TestContext,
    attempt_id: &str,
    payload: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/exam-attempts/{attempt_id}/submit"),
            Some(payload),
        ))
        .await
        .expect("submit attempt");

    let status = response.status();
    let body = test_support::read_json(response).await;
    (status, body)
}

fn all_correct_answers(questions: &[Question]) -> serde_json::Value {
    json!({
        "answers": [
            {"question_id": questions[0].id, "selected_option": "A"},
            {"question_id": questions[1].id, "selected_option": "B"},
            {"question_id": questions[2].id, "selected_option": "A"},
        ],
        "time_spent_seconds": 120
    })
}

#[tokio::test]
async fn start_submit_and_restart_flow() {
    let ctx = test_support::setup_test_context().await;

    let user = test_support::insert_user(ctx.state.db(), "lea@example.com", "Lea Martin").await;
    let (exam, questions) = test_support::insert_exam_with_questions(
        ctx.state.db(),
        "French basics",
        test_support::default_seed_questions(),
    )
    .await;

    let (status, created) = start_attempt(&ctx, &user.id, &exam.id).await;
    assert_eq!(status, StatusCode::CREATED, "response: {created}");
    assert_eq!(created["status"], "in_progress");
    assert_eq!(created["total_questions"], 3);
    assert!(created["completed_at"].is_null());
    assert_eq!(created["user"]["email"], "lea@example.com");
    assert_eq!(created["exam"]["title"], "French basics");
    let attempt_id = created["id"].as_str().expect("attempt id").to_string();

    // A second start while the first is open must be rejected.
    let (status, conflict) = start_attempt(&ctx, &user.id, &exam.id).await;
    assert_eq!(status, StatusCode::CONFLICT, "response: {conflict}");

    let (status, graded) = submit_attempt(&ctx, &attempt_id, all_correct_answers(&questions)).await;
    assert_eq!(status, StatusCode::OK, "response: {graded}");
    assert_eq!(graded["status"], "completed");
    assert_eq!(graded["correct_answers"], 3);
    assert_eq!(graded["score"].as_f64().unwrap(), 100.0);
    assert_eq!(graded["time_spent_seconds"], 120);
    assert!(graded["completed_at"].is_string());
    let details = graded["detailed_result"].as_array().expect("details");
    assert_eq!(details.len(), 3);
    assert!(details.iter().all(|entry| entry["is_correct"] == true));

    // Once the open attempt is completed the user can start a fresh one.
    let (status, restarted) = start_attempt(&ctx, &user.id, &exam.id).await;
    assert_eq!(status, StatusCode::CREATED, "response: {restarted}");
    assert_ne!(restarted["id"], attempt_id.as_str());
}

#[tokio::test]
async fn submit_scores_partial_answers_by_points() {
    let ctx = test_support::setup_test_context().await;

    let user = test_support::insert_user(ctx.state.db(), "tom@example.com", "Tom Diaz").await;
    let (exam, questions) = test_support::insert_exam_with_questions(
        ctx.state.db(),
        "French basics",
        test_support::default_seed_questions(),
    )
    .await;

    let (_, created) = start_attempt(&ctx, &user.id, &exam.id).await;
    let attempt_id = created["id"].as_str().unwrap().to_string();

    // Q1 right (1pt), Q2 wrong, Q3 right (3pt): 4 of 5 points.
    let (status, graded) = submit_attempt(
        &ctx,
        &attempt_id,
        json!({
            "answers": [
                {"question_id": questions[0].id, "selected_option": "A"},
                {"question_id": questions[1].id, "selected_option": "A"},
                {"question_id": questions[2].id, "selected_option": "B"},
            ]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "response: {graded}");
    assert_eq!(graded["correct_answers"], 2);
    assert_eq!(graded["score"].as_f64().unwrap(), 80.0);
    assert!(graded["time_spent_seconds"].is_null());

    let details = graded["detailed_result"].as_array().unwrap();
    assert_eq!(details[1]["is_correct"], false);
    assert_eq!(details[1]["points_awarded"].as_f64().unwrap(), 0.0);
    assert_eq!(details[2]["points_awarded"].as_f64().unwrap(), 3.0);
}

#[tokio::test]
async fn submit_twice_conflicts_and_keeps_first_grade() {
    let ctx = test_support::setup_test_context().await;

    let user = test_support::insert_user(ctx.state.db(), "amy@example.com", "Amy Chen").await;
    let (exam, questions) = test_support::insert_exam_with_questions(
        ctx.state.db(),
        "French basics",
        test_support::default_seed_questions(),
    )
    .await;

    let (_, created) = start_attempt(&ctx, &user.id, &exam.id).await;
    let attempt_id = created["id"].as_str().unwrap().to_string();

    let (status, graded) = submit_attempt(&ctx, &attempt_id, all_correct_answers(&questions)).await;
    assert_eq!(status, StatusCode::OK, "response: {graded}");

    let (status, second) = submit_attempt(
        &ctx,
        &attempt_id,
        json!({"answers": [{"question_id": questions[0].id, "selected_option": "B"}]}),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT, "response: {second}");

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/v1/exam-attempts/{attempt_id}"),
            None,
        ))
        .await
        .expect("get attempt");
    let body = test_support::read_json(response).await;
    assert_eq!(body["score"].as_f64().unwrap(), 100.0);
    assert_eq!(body["correct_answers"], 3);
}

#[tokio::test]
async fn submit_with_no_answers_scores_zero_and_lists_unanswered() {
    let ctx = test_support::setup_test_context().await;

    let user = test_support::insert_user(ctx.state.db(), "joe@example.com", "Joe Park").await;
    let (exam, _) = test_support::insert_exam_with_questions(
        ctx.state.db(),
        "French basics",
        test_support::default_seed_questions(),
    )
    .await;

    let (_, created) = start_attempt(&ctx, &user.id, &exam.id).await;
    let attempt_id = created["id"].as_str().unwrap().to_string();

    let (status, graded) = submit_attempt(&ctx, &attempt_id, json!({"answers": []})).await;
    assert_eq!(status, StatusCode::OK, "response: {graded}");
    assert_eq!(graded["correct_answers"], 0);
    assert_eq!(graded["score"].as_f64().unwrap(), 0.0);

    let details = graded["detailed_result"].as_array().unwrap();
    assert_eq!(details.len(), 3);
    assert!(details.iter().all(|entry| entry["selected_option"].is_null()));
}

#[tokio::test]
async fn submit_ignores_answers_for_foreign_questions() {
    let ctx = test_support::setup_test_context().await;

    let user = test_support::insert_user(ctx.state.db(), "zoe@example.com", "Zoe Lam").await;
    let (exam, questions) = test_support::insert_exam_with_questions(
        ctx.state.db(),
        "French basics",
        test_support::default_seed_questions(),
    )
    .await;

    let (_, created) = start_attempt(&ctx, &user.id, &exam.id).await;
    let attempt_id = created["id"].as_str().unwrap().to_string();

    let (status, graded) = submit_attempt(
        &ctx,
        &attempt_id,
        json!({
            "answers": [
                {"question_id": questions[0].id, "selected_option": "A"},
                {"question_id": "not-a-question", "selected_option": "A"},
            ]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "response: {graded}");
    assert_eq!(graded["correct_answers"], 1);
    assert_eq!(graded["score"].as_f64().unwrap(), 20.0);
    assert_eq!(graded["detailed_result"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn start_validates_user_and_exam() {
    let ctx = test_support::setup_test_context().await;

    let user = test_support::insert_user(ctx.state.db(), "ana@example.com", "Ana Silva").await;
    let inactive_user =
        test_support::insert_user_with_active(ctx.state.db(), "old@example.com", "Old User", false)
            .await;
    let exam = test_support::insert_exam(ctx.state.db(), "Spanish basics", true).await;
    let inactive_exam = test_support::insert_exam(ctx.state.db(), "Retired exam", false).await;

    let (status, body) = start_attempt(&ctx, "missing-user", &exam.id).await;
    assert_eq!(status, StatusCode::NOT_FOUND, "response: {body}");

    let (status, body) = start_attempt(&ctx, &user.id, "missing-exam").await;
    assert_eq!(status, StatusCode::NOT_FOUND, "response: {body}");

    // Deactivated rows are indistinguishable from missing ones.
    let (status, body) = start_attempt(&ctx, &inactive_user.id, &exam.id).await;
    assert_eq!(status, StatusCode::NOT_FOUND, "response: {body}");

    let (status, body) = start_attempt(&ctx, &user.id, &inactive_exam.id).await;
    assert_eq!(status, StatusCode::NOT_FOUND, "response: {body}");
}

#[tokio::test]
async fn list_filters_by_user_exam_and_status() {
    let ctx = test_support::setup_test_context().await;

    let lea = test_support::insert_user(ctx.state.db(), "lea@example.com", "Lea Martin").await;
    let tom = test_support::insert_user(ctx.state.db(), "tom@example.com", "Tom Diaz").await;
    let (exam, questions) = test_support::insert_exam_with_questions(
        ctx.state.db(),
        "French basics",
        test_support::default_seed_questions(),
    )
    .await;

    let (_, lea_attempt) = start_attempt(&ctx, &lea.id, &exam.id).await;
    let lea_attempt_id = lea_attempt["id"].as_str().unwrap().to_string();
    submit_attempt(&ctx, &lea_attempt_id, all_correct_answers(&questions)).await;
    start_attempt(&ctx, &lea.id, &exam.id).await;
    start_attempt(&ctx, &tom.id, &exam.id).await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/v1/exam-attempts?user_id={}", lea.id),
            None,
        ))
        .await
        .expect("list by user");
    let body = test_support::read_json(response).await;
    assert_eq!(body["total_count"], 2);
    assert_eq!(body["items"].as_array().unwrap().len(), 2);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/v1/exam-attempts?status=completed",
            None,
        ))
        .await
        .expect("list by status");
    let body = test_support::read_json(response).await;
    assert_eq!(body["total_count"], 1);
    assert_eq!(body["items"][0]["id"], lea_attempt_id.as_str());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/v1/exam-attempts?exam_id={}&skip=1&limit=1", exam.id),
            None,
        ))
        .await
        .expect("list paginated");
    let body = test_support::read_json(response).await;
    assert_eq!(body["total_count"], 3);
    assert_eq!(body["items"].as_array().unwrap().len(), 1);
    assert_eq!(body["skip"], 1);
    assert_eq!(body["limit"], 1);
}

#[tokio::test]
async fn get_returns_details_or_404() {
    let ctx = test_support::setup_test_context().await;

    let user = test_support::insert_user(ctx.state.db(), "lea@example.com", "Lea Martin").await;
    let (exam, questions) = test_support::insert_exam_with_questions(
        ctx.state.db(),
        "French basics",
        test_support::default_seed_questions(),
    )
    .await;

    let (_, created) = start_attempt(&ctx, &user.id, &exam.id).await;
    let attempt_id = created["id"].as_str().unwrap().to_string();
    submit_attempt(&ctx, &attempt_id, all_correct_answers(&questions)).await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/v1/exam-attempts/{attempt_id}"),
            None,
        ))
        .await
        .expect("get attempt");
    assert_eq!(response.status(), StatusCode::OK);
    let body = test_support::read_json(response).await;
    assert_eq!(body["detailed_result"].as_array().unwrap().len(), 3);
    assert_eq!(body["user"]["full_name"], "Lea Martin");

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(Method::GET, "/api/v1/exam-attempts/missing", None))
        .await
        .expect("get missing attempt");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn patch_stamps_completion_time_without_grading() {
    let ctx = test_support::setup_test_context().await;

    let user = test_support::insert_user(ctx.state.db(), "lea@example.com", "Lea Martin").await;
    let (exam, _) = test_support::insert_exam_with_questions(
        ctx.state.db(),
        "French basics",
        test_support::default_seed_questions(),
    )
    .await;

    let (_, created) = start_attempt(&ctx, &user.id, &exam.id).await;
    let attempt_id = created["id"].as_str().unwrap().to_string();

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::PATCH,
            &format!("/api/v1/exam-attempts/{attempt_id}"),
            Some(json!({"status": "completed"})),
        ))
        .await
        .expect("patch attempt");
    assert_eq!(response.status(), StatusCode::OK);
    let body = test_support::read_json(response).await;
    assert_eq!(body["status"], "completed");
    assert!(body["completed_at"].is_string());
    // No grading on this path: the score stays untouched.
    assert!(body["score"].is_null());
    assert_eq!(body["correct_answers"], 0);
}

#[tokio::test]
async fn cancelling_frees_the_open_slot() {
    let ctx = test_support::setup_test_context().await;

    let user = test_support::insert_user(ctx.state.db(), "lea@example.com", "Lea Martin").await;
    let exam = test_support::insert_exam(ctx.state.db(), "French basics", true).await;

    let (status, created) = start_attempt(&ctx, &user.id, &exam.id).await;
    assert_eq!(status, StatusCode::CREATED, "response: {created}");
    let attempt_id = created["id"].as_str().unwrap().to_string();

    let (status, blocked) = start_attempt(&ctx, &user.id, &exam.id).await;
    assert_eq!(status, StatusCode::CONFLICT, "response: {blocked}");

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::PATCH,
            &format!("/api/v1/exam-attempts/{attempt_id}"),
            Some(json!({"status": "cancelled"})),
        ))
        .await
        .expect("cancel attempt");
    assert_eq!(response.status(), StatusCode::OK);
    let body = test_support::read_json(response).await;
    assert_eq!(body["status"], "cancelled");
    // Cancellation is not completion: no timestamp, no score.
    assert!(body["completed_at"].is_null());
    assert!(body["score"].is_null());

    // The cancelled row no longer occupies the per-user open slot.
    let (status, restarted) = start_attempt(&ctx, &user.id, &exam.id).await;
    assert_eq!(status, StatusCode::CREATED, "response: {restarted}");
    assert_ne!(restarted["id"], attempt_id.as_str());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/v1/exam-attempts/user/{}/stats", user.id),
            None,
        ))
        .await
        .expect("user stats");
    let body = test_support::read_json(response).await;
    assert_eq!(body["total"], 2);
    assert_eq!(body["cancelled"], 1);
    assert_eq!(body["in_progress"], 1);
    assert_eq!(body["completed"], 0);
}

#[tokio::test]
async fn patch_rejects_malformed_completed_at() {
    let ctx = test_support::setup_test_context().await;

    let user = test_support::insert_user(ctx.state.db(), "lea@example.com", "Lea Martin").await;
    let exam = test_support::insert_exam(ctx.state.db(), "French basics", true).await;

    let (_, created) = start_attempt(&ctx, &user.id, &exam.id).await;
    let attempt_id = created["id"].as_str().unwrap().to_string();

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::PATCH,
            &format!("/api/v1/exam-attempts/{attempt_id}"),
            Some(json!({"completed_at": "yesterday"})),
        ))
        .await
        .expect("patch attempt");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn delete_removes_attempt() {
    let ctx = test_support::setup_test_context().await;

    let user = test_support::insert_user(ctx.state.db(), "lea@example.com", "Lea Martin").await;
    let exam = test_support::insert_exam(ctx.state.db(), "French basics", true).await;

    let (_, created) = start_attempt(&ctx, &user.id, &exam.id).await;
    let attempt_id = created["id"].as_str().unwrap().to_string();

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::DELETE,
            &format!("/api/v1/exam-attempts/{attempt_id}"),
            None,
        ))
        .await
        .expect("delete attempt");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::DELETE,
            &format!("/api/v1/exam-attempts/{attempt_id}"),
            None,
        ))
        .await
        .expect("delete missing attempt");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn user_stats_roll_up_attempts() {
    let ctx = test_support::setup_test_context().await;

    let user = test_support::insert_user(ctx.state.db(), "lea@example.com", "Lea Martin").await;
    let (exam, questions) = test_support::insert_exam_with_questions(
        ctx.state.db(),
        "French basics",
        test_support::default_seed_questions(),
    )
    .await;

    // No attempts yet: every counter is zero.
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/v1/exam-attempts/user/{}/stats", user.id),
            None,
        ))
        .await
        .expect("empty stats");
    let body = test_support::read_json(response).await;
    assert_eq!(body["total"], 0);
    assert_eq!(body["average_score"].as_f64().unwrap(), 0.0);

    let (_, first) = start_attempt(&ctx, &user.id, &exam.id).await;
    let first_id = first["id"].as_str().unwrap().to_string();
    submit_attempt(&ctx, &first_id, all_correct_answers(&questions)).await;

    let (_, second) = start_attempt(&ctx, &user.id, &exam.id).await;
    let second_id = second["id"].as_str().unwrap().to_string();
    submit_attempt(
        &ctx,
        &second_id,
        json!({
            "answers": [
                {"question_id": questions[0].id, "selected_option": "A"},
                {"question_id": questions[1].id, "selected_option": "A"},
                {"question_id": questions[2].id, "selected_option": "B"},
            ]
        }),
    )
    .await;

    start_attempt(&ctx, &user.id, &exam.id).await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/v1/exam-attempts/user/{}/stats", user.id),
            None,
        ))
        .await
        .expect("user stats");
    let body = test_support::read_json(response).await;
    assert_eq!(body["total"], 3);
    assert_eq!(body["completed"], 2);
    assert_eq!(body["in_progress"], 1);
    assert_eq!(body["cancelled"], 0);
    assert_eq!(body["average_score"].as_f64().unwrap(), 90.0);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/v1/exam-attempts/user/missing/stats",
            None,
        ))
        .await
        .expect("missing user stats");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
