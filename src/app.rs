use crate::handlers;
use crate::state::AppState;
use axum::{
    routing::{get, post, put},
    Router,
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/api/habits",
            get(handlers::list_habits).post(handlers::create_habit),
        )
        .route(
            "/api/habits/:id",
            get(handlers::get_habit)
                .patch(handlers::update_habit)
                .delete(handlers::delete_habit),
        )
        .route("/api/habits/:id/completions", get(handlers::list_completions))
        .route(
            "/api/habits/:id/completions/:date",
            put(handlers::mark_completion).delete(handlers::unmark_completion),
        )
        .route("/api/habits/:id/toggle", post(handlers::toggle_completion))
        .route("/api/habits/:id/chain", get(handlers::get_chain))
        .route("/api/stats", get(handlers::get_stats))
        .route("/api/streaks", post(handlers::compute_streaks))
        .with_state(state)
}
