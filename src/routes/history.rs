use crate::handlers::history::{get_history_artifact, get_history_record, list_history};
use crate::state::AppState;
use axum::{routing::get, Router};

pub fn history_routes(state: AppState) -> Router {
    Router::new()
        .route("/history", get(list_history))
        .route("/history/:id", get(get_history_record))
        .route("/history/:id/artifacts/:kind", get(get_history_artifact))
        .with_state(state)
}
