mod handlers;
mod helpers;

use axum::{routing::get, routing::post, Router};

use crate::core::state::AppState;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::start_attempt).get(handlers::list_attempts))
        .route("/user/:user_id/stats", get(handlers::user_exam_stats))
        .route(
            "/:attempt_id",
            get(handlers::get_attempt)
                .patch(handlers::update_attempt)
                .delete(handlers::delete_attempt),
        )
        .route("/:attempt_id/submit", post(handlers::submit_attempt))
}

#[cfg(test)]
mod tests;
