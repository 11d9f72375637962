//! Extraction API endpoint.
//!
//! Runs the transcript-to-task pipeline without persisting anything; the
//! review UI posts the accepted tasks back through /api/tasks/batch.

use axum::{extract::State, Json};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;

use super::{current_revision, error, success, ApiResult};
use crate::errors::AppError;
use crate::extract::ExtractionMode;
use crate::models::ExtractionResult;
use crate::AppState;

/// Request body for POST /api/extract.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractRequest {
    pub transcript: String,
    #[serde(default)]
    pub mode: Option<ExtractionMode>,
    /// Anchor date for relative phrases, `YYYY-MM-DD`; defaults to the
    /// server's current date.
    #[serde(default)]
    pub today: Option<String>,
}

/// POST /api/extract - Extract candidate tasks from a transcript.
pub async fn extract_tasks(
    State(state): State<AppState>,
    Json(request): Json<ExtractRequest>,
) -> ApiResult<ExtractionResult> {
    let revision_id = current_revision(&state).await;

    if request.transcript.trim().is_empty() {
        return error(
            AppError::Validation("Transcript is required".to_string()),
            revision_id,
        );
    }

    let today = match &request.today {
        Some(value) => match NaiveDate::parse_from_str(value, "%Y-%m-%d") {
            Ok(date) => date,
            Err(_) => {
                return error(
                    AppError::Validation(format!("Invalid today date: {}", value)),
                    revision_id,
                )
            }
        },
        None => Utc::now().date_naive(),
    };

    let mode = request.mode.unwrap_or_default();

    let roster = match state.repo.list_members().await {
        Ok(members) => members,
        Err(e) => return error(e, revision_id),
    };

    match state
        .extraction
        .extract(&request.transcript, &roster, mode, today)
        .await
    {
        Ok(result) => success(result, revision_id),
        Err(e) => error(e, revision_id),
    }
}
