//! History handlers: list, fetch one record, download one artifact of a record as raw text.

use crate::error::AppError;
use crate::generator::ArtifactKind;
use crate::history::HistoryTotals;
use crate::response::{success_many, success_one_ok};
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::IntoResponse;
use uuid::Uuid;

pub async fn list_history(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let summaries = state.recorder.list_history().await?;
    let totals = HistoryTotals::from_summaries(&summaries);
    Ok(success_many(summaries, totals))
}

pub async fn get_history_record(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let record = state.recorder.fetch(id).await?;
    Ok(success_one_ok(record))
}

pub async fn get_history_artifact(
    State(state): State<AppState>,
    Path((id, kind)): Path<(Uuid, String)>,
) -> Result<impl IntoResponse, AppError> {
    let kind: ArtifactKind = kind.parse()?;
    let record = state.recorder.fetch(id).await?;
    let (name, text) = record.artifacts.artifact(kind);
    let disposition = format!("inline; filename=\"{}\"", name);
    Ok((
        [
            (header::CONTENT_TYPE, kind.content_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        text.to_string(),
    ))
}
