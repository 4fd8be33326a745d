use analytics::{
    aggregate_keywords, export_keywords_csv, FilterCriteria, KeywordAggregate, KeywordScale,
    ScaledKeyword, DEFAULT_MIN_FREQUENCY, EXPORT_FILE_NAME,
};
use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::load_comments;
use crate::{api_state::ApiState, error::ApiError};

#[derive(Debug, Default, Deserialize)]
pub struct FrequencyParams {
    pub min_frequency: Option<usize>,
}

async fn keyword_aggregates(
    state: &ApiState,
    criteria: &FilterCriteria,
    params: &FrequencyParams,
) -> Result<Vec<KeywordAggregate>, ApiError> {
    let comments = load_comments(state).await?;
    let min_frequency = params.min_frequency.unwrap_or(DEFAULT_MIN_FREQUENCY);
    let aggregates = aggregate_keywords(&comments, criteria, min_frequency);

    debug!(
        comments = comments.len(),
        keywords = aggregates.len(),
        min_frequency,
        "keywords aggregated"
    );

    Ok(aggregates)
}

#[derive(Serialize)]
struct KeywordCloud {
    keywords: Vec<ScaledKeyword>,
}

pub async fn get_keywords(
    State(state): State<ApiState>,
    Query(criteria): Query<FilterCriteria>,
    Query(params): Query<FrequencyParams>,
) -> Result<impl IntoResponse, ApiError> {
    let aggregates = keyword_aggregates(&state, &criteria, &params).await?;
    let scale = KeywordScale::from_aggregates(&aggregates);

    Ok(Json(KeywordCloud {
        keywords: scale.apply(aggregates),
    }))
}

pub async fn export_keywords(
    State(state): State<ApiState>,
    Query(criteria): Query<FilterCriteria>,
    Query(params): Query<FrequencyParams>,
) -> Result<impl IntoResponse, ApiError> {
    let aggregates = keyword_aggregates(&state, &criteria, &params).await?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{EXPORT_FILE_NAME}\""),
            ),
        ],
        export_keywords_csv(&aggregates),
    ))
}
