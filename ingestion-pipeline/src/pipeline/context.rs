use chrono::{NaiveDate, Utc};
use common::{error::AppError, storage::types::consultation_comment::ConsultationComment};
use tracing::{error, warn};

use super::{
    config::IngestionConfig, enrichment::EnrichmentOutcome, progress::ProgressReporter,
    services::{PipelineServices, UploadedFile},
};
use crate::utils::file_type::FileKind;

/// An accepted upload together with the extraction strategy it maps to.
#[derive(Debug, Clone)]
pub struct ClassifiedFile {
    pub file: UploadedFile,
    pub kind: FileKind,
}

/// Working state owned by a single batch run.
pub struct PipelineContext<'a> {
    pub batch_id: String,
    pub pipeline_config: &'a IngestionConfig,
    pub services: &'a dyn PipelineServices,
    pub progress: &'a ProgressReporter,
    /// Date stamped on comments segmented out of free-text documents.
    pub today: NaiveDate,
    pub consultation_title: String,
    pub files: Vec<ClassifiedFile>,
    pub comments: Vec<ConsultationComment>,
    pub outcomes: Vec<EnrichmentOutcome>,
    pub processed: usize,
    pub persisted: usize,
}

impl<'a> PipelineContext<'a> {
    pub fn new(
        batch_id: String,
        pipeline_config: &'a IngestionConfig,
        services: &'a dyn PipelineServices,
        progress: &'a ProgressReporter,
    ) -> Self {
        Self {
            batch_id,
            pipeline_config,
            services,
            progress,
            today: Utc::now().date_naive(),
            consultation_title: String::new(),
            files: Vec::new(),
            comments: Vec::new(),
            outcomes: Vec::new(),
            processed: 0,
            persisted: 0,
        }
    }

    pub fn abort(&mut self, err: AppError) -> AppError {
        if matches!(err, AppError::Validation(_)) {
            warn!(batch_id = %self.batch_id, error = %err, "batch rejected");
        } else {
            error!(
                batch_id = %self.batch_id,
                consultation_title = %self.consultation_title,
                error = %err,
                "batch pipeline aborted"
            );
        }

        self.comments.clear();
        self.outcomes.clear();
        err
    }
}
