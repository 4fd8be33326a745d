mod config;
mod context;
mod enrichment;
mod extraction;
mod progress;
mod services;
mod stages;
mod state;

pub use config::{IngestionConfig, IngestionTuning};
pub use enrichment::{enrich_comment, EnrichmentOutcome};
pub use extraction::{extract_structured, extract_unstructured, RawComment};
pub use progress::{BatchPhase, BatchProgress, ProgressReporter};
#[allow(clippy::module_name_repetitions)]
pub use services::{
    DefaultPipelineServices, ExtractionOutput, ExtractionStatus, PipelineServices, UploadedFile,
};
pub use stages::{MISSING_INPUT_MESSAGE, NO_COMMENTS_MESSAGE};

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use async_openai::Client;
use common::{
    error::AppError,
    storage::{db::SurrealDbClient, store::StorageManager},
    utils::config::AppConfig,
};
use tracing::info;
use uuid::Uuid;

use self::{
    context::PipelineContext,
    stages::{enrich, extract, intake, persist},
    state::idle,
};

/// Reason reported for failures whose details must stay server side.
pub const GENERIC_FAILURE_MESSAGE: &str = "Error processing files. Please try again.";

/// One upload: a consultation title shared by one or more files.
#[derive(Debug, Clone)]
pub struct BatchSubmission {
    pub consultation_title: String,
    pub files: Vec<UploadedFile>,
}

/// Terminal state of a batch run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    /// `processed` counts successfully enriched comments, `persisted` every
    /// stored comment.
    Done { processed: usize, persisted: usize },
    Failed { reason: String },
}

#[allow(clippy::module_name_repetitions)]
pub struct IngestionPipeline {
    pipeline_config: IngestionConfig,
    services: Arc<dyn PipelineServices>,
}

impl IngestionPipeline {
    pub fn new(
        db: Arc<SurrealDbClient>,
        openai_client: Arc<Client<async_openai::config::OpenAIConfig>>,
        config: AppConfig,
        storage: StorageManager,
    ) -> Self {
        let pipeline_config = IngestionConfig::from_app_config(&config);
        let services = DefaultPipelineServices::new(db, openai_client, config, storage);

        Self::with_services(pipeline_config, Arc::new(services))
    }

    pub fn with_services(
        pipeline_config: IngestionConfig,
        services: Arc<dyn PipelineServices>,
    ) -> Self {
        Self {
            pipeline_config,
            services,
        }
    }

    /// Runs a batch to completion. Progress goes to `progress`; the returned
    /// outcome is the terminal state.
    #[tracing::instrument(
        skip_all,
        fields(
            consultation_title = %submission.consultation_title,
            files = submission.files.len()
        )
    )]
    pub async fn submit_batch(
        &self,
        submission: BatchSubmission,
        progress: ProgressReporter,
    ) -> BatchOutcome {
        let batch_id = Uuid::new_v4().to_string();
        let mut ctx = PipelineContext::new(
            batch_id,
            &self.pipeline_config,
            self.services.as_ref(),
            &progress,
        );

        match Self::drive_pipeline(&mut ctx, submission).await {
            Ok(()) => {
                progress
                    .report(
                        BatchPhase::Done,
                        100.0,
                        format!(
                            "Successfully processed {} comments with AI analysis!",
                            ctx.processed
                        ),
                    )
                    .await;
                BatchOutcome::Done {
                    processed: ctx.processed,
                    persisted: ctx.persisted,
                }
            }
            Err(err) => {
                let reason = failure_reason(&err);
                progress.report(BatchPhase::Failed, 0.0, reason.clone()).await;
                BatchOutcome::Failed { reason }
            }
        }
    }

    fn duration_millis(duration: Duration) -> u64 {
        u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
    }

    async fn drive_pipeline(
        ctx: &mut PipelineContext<'_>,
        submission: BatchSubmission,
    ) -> Result<(), AppError> {
        let pipeline_started = Instant::now();
        let machine = idle();

        let machine = intake(machine, ctx, submission)
            .await
            .map_err(|err| ctx.abort(err))?;

        let stage_start = Instant::now();
        let machine = extract(machine, ctx)
            .await
            .map_err(|err| ctx.abort(err))?;
        let extract_duration = stage_start.elapsed();

        let stage_start = Instant::now();
        let machine = enrich(machine, ctx)
            .await
            .map_err(|err| ctx.abort(err))?;
        let enrich_duration = stage_start.elapsed();

        let stage_start = Instant::now();
        let _machine = persist(machine, ctx)
            .await
            .map_err(|err| ctx.abort(err))?;
        let persist_duration = stage_start.elapsed();

        info!(
            batch_id = %ctx.batch_id,
            processed = ctx.processed,
            persisted = ctx.persisted,
            total_ms = Self::duration_millis(pipeline_started.elapsed()),
            extract_ms = Self::duration_millis(extract_duration),
            enrich_ms = Self::duration_millis(enrich_duration),
            persist_ms = Self::duration_millis(persist_duration),
            "batch pipeline finished"
        );

        Ok(())
    }
}

/// Rejections and extraction failures carry a user facing message; anything
/// else is reported generically.
fn failure_reason(err: &AppError) -> String {
    match err {
        AppError::Validation(message) | AppError::Processing(message) => message.clone(),
        _ => GENERIC_FAILURE_MESSAGE.to_string(),
    }
}

#[cfg(test)]
mod tests;
