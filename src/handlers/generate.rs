//! Generation handlers: JSON outcome or zip bundle. Both record a history entry when the store allows.

use crate::bundle::{build_bundle, bundle_file_name};
use crate::config::ProjectDescription;
use crate::error::{AppError, ConfigError};
use crate::extractors::Requester;
use crate::generator::{generate_and_record, GenerationOutcome};
use crate::state::AppState;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::Value;

fn parse_body(body: Value) -> Result<ProjectDescription, AppError> {
    serde_json::from_value(body).map_err(|e| AppError::Config(ConfigError::Parse(e.to_string())))
}

pub async fn generate_project(
    State(state): State<AppState>,
    Requester(requester): Requester,
    Json(body): Json<Value>,
) -> Result<Json<GenerationOutcome>, AppError> {
    let project = parse_body(body)?;
    let outcome = generate_and_record(&state.recorder, &project, &requester).await?;
    Ok(Json(outcome))
}

pub async fn generate_bundle(
    State(state): State<AppState>,
    Requester(requester): Requester,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let project = parse_body(body)?;
    let outcome = generate_and_record(&state.recorder, &project, &requester).await?;
    let bytes = build_bundle(&outcome.artifacts)?;
    let disposition = format!(
        "attachment; filename=\"{}\"",
        bundle_file_name(&outcome.artifacts)
    );
    Ok((
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    ))
}
