pub mod batches;
pub mod comments;
pub mod health;
pub mod insights;
pub mod keywords;

use common::{
    error::AppError,
    storage::types::consultation_comment::{ConsultationComment, SortKey},
};

use crate::api_state::ApiState;

/// Current snapshot of the corpus, newest first.
pub(crate) async fn load_comments(state: &ApiState) -> Result<Vec<ConsultationComment>, AppError> {
    ConsultationComment::list(&SortKey::newest_first(), &state.db).await
}
