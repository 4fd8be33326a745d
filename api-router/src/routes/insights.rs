use analytics::{consultation_titles, recent_comments, CorpusMetrics, RECENT_COMMENTS_LIMIT};
use axum::{extract::State, response::IntoResponse, Json};
use common::storage::types::consultation_comment::ConsultationComment;
use serde::Serialize;

use super::load_comments;
use crate::{api_state::ApiState, error::ApiError};

#[derive(Serialize)]
struct DashboardData<'a> {
    metrics: CorpusMetrics,
    recent_comments: &'a [ConsultationComment],
}

/// Headline counts plus the most recently stored comments.
pub async fn get_metrics(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    let comments = load_comments(&state).await?;

    Ok(Json(DashboardData {
        metrics: CorpusMetrics::from_comments(&comments),
        recent_comments: recent_comments(&comments, RECENT_COMMENTS_LIMIT),
    })
    .into_response())
}

#[derive(Serialize)]
struct ConsultationOptions {
    consultations: Vec<String>,
}

pub async fn get_consultations(
    State(state): State<ApiState>,
) -> Result<impl IntoResponse, ApiError> {
    let comments = load_comments(&state).await?;

    Ok(Json(ConsultationOptions {
        consultations: consultation_titles(&comments),
    }))
}
