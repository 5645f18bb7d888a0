pub mod common;
pub mod generate;
pub mod history;

pub use common::common_routes_with_ready;
pub use generate::generate_routes;
pub use history::history_routes;

use crate::state::AppState;
use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;

/// Largest accepted request body.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Full router: common routes at the root, generation and history under `/api/v1`.
pub fn app(state: AppState) -> Router {
    let api = generate_routes(state.clone()).merge(history_routes(state.clone()));
    Router::new()
        .merge(common_routes_with_ready(state))
        .nest("/api/v1", api)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
}
