use analytics::{filter_comments, paginate_items, FilterCriteria, Pagination, DEFAULT_PER_PAGE};
use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use common::storage::types::consultation_comment::ConsultationComment;
use serde::{Deserialize, Serialize};

use super::load_comments;
use crate::{api_state::ApiState, error::ApiError};

#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<usize>,
    pub per_page: Option<usize>,
}

#[derive(Serialize)]
struct CommentPage<'a> {
    comments: Vec<&'a ConsultationComment>,
    pagination: Pagination,
}

pub async fn list_comments(
    State(state): State<ApiState>,
    Query(criteria): Query<FilterCriteria>,
    Query(params): Query<PageParams>,
) -> Result<impl IntoResponse, ApiError> {
    let comments = load_comments(&state).await?;
    let filtered = filter_comments(&comments, &criteria);
    let (page, pagination) = paginate_items(
        &filtered,
        params.page,
        params.per_page.unwrap_or(DEFAULT_PER_PAGE),
    );

    Ok(Json(CommentPage {
        comments: page,
        pagination,
    })
    .into_response())
}
