//! Generation routes: POST /generate and POST /generate/bundle.

use crate::handlers::generate::{generate_bundle, generate_project};
use crate::state::AppState;
use axum::{routing::post, Router};

pub fn generate_routes(state: AppState) -> Router {
    Router::new()
        .route("/generate", post(generate_project))
        .route("/generate/bundle", post(generate_bundle))
        .with_state(state)
}
