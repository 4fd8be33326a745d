use common::error::AppError;
use state_machines::core::GuardError;
use tracing::{debug, info, instrument, warn};

use super::{
    context::{ClassifiedFile, PipelineContext},
    enrichment::{enrich_comment, EnrichmentOutcome},
    extraction::{extract_structured, extract_unstructured},
    progress::{BatchPhase, PROCESSING_WITH_AI_LABEL, SAVING_LABEL},
    state::{BatchMachine, Done, Enriching, Extracting, Idle, Persisting},
    BatchSubmission,
};
use crate::utils::file_type::{FileKind, UNSUPPORTED_FILE_MESSAGE};

pub const MISSING_INPUT_MESSAGE: &str =
    "Please provide a consultation title and select files to upload.";
pub const NO_COMMENTS_MESSAGE: &str = "No comments could be extracted from the uploaded files.";

/// Validates the submission and classifies every file. Nothing is uploaded
/// or extracted unless the whole submission is acceptable.
#[instrument(level = "trace", skip_all, fields(batch_id = %ctx.batch_id))]
pub async fn intake(
    machine: BatchMachine<(), Idle>,
    ctx: &mut PipelineContext<'_>,
    submission: BatchSubmission,
) -> Result<BatchMachine<(), Extracting>, AppError> {
    let BatchSubmission {
        consultation_title,
        files,
    } = submission;

    let title = consultation_title.trim();
    if files.is_empty() || title.is_empty() {
        return Err(AppError::Validation(MISSING_INPUT_MESSAGE.into()));
    }

    let mut classified = Vec::with_capacity(files.len());
    for file in files {
        let kind = FileKind::classify(&file.file_name, file.content_type.as_deref());
        if kind == FileKind::Unknown {
            warn!(
                batch_id = %ctx.batch_id,
                file_name = %file.file_name,
                content_type = file.content_type.as_deref().unwrap_or("none"),
                "unsupported file in submission"
            );
            return Err(AppError::Validation(UNSUPPORTED_FILE_MESSAGE.into()));
        }
        classified.push(ClassifiedFile { file, kind });
    }

    info!(
        batch_id = %ctx.batch_id,
        consultation_title = %title,
        files = classified.len(),
        "batch accepted"
    );

    ctx.consultation_title = title.to_string();
    ctx.files = classified;

    machine
        .start_extraction()
        .map_err(|(_, guard)| map_guard_error("start_extraction", &guard))
}

/// Uploads and extracts every file in submission order. A file that yields
/// nothing is logged and skipped; a batch that yields nothing fails.
#[instrument(level = "trace", skip_all, fields(batch_id = %ctx.batch_id))]
pub async fn extract(
    machine: BatchMachine<(), Extracting>,
    ctx: &mut PipelineContext<'_>,
) -> Result<BatchMachine<(), Enriching>, AppError> {
    let timeout = ctx.pipeline_config.tuning.collaborator_timeout;
    let files = std::mem::take(&mut ctx.files);

    for ClassifiedFile { file, kind } in files {
        ctx.progress
            .report(
                BatchPhase::Extracting,
                0.0,
                format!("Processing: {}", file.file_name),
            )
            .await;

        let file_url = match ctx.services.upload(&ctx.batch_id, &file).await {
            Ok(location) => location,
            Err(err) => {
                warn!(
                    batch_id = %ctx.batch_id,
                    file_name = %file.file_name,
                    error = %err,
                    "upload failed; skipping file"
                );
                continue;
            }
        };

        let raw = if kind.is_structured() {
            extract_structured(ctx.services, &file_url, timeout).await
        } else {
            extract_unstructured(ctx.services, &file_url, timeout, ctx.today).await
        };

        if raw.is_empty() {
            warn!(
                batch_id = %ctx.batch_id,
                file_name = %file.file_name,
                kind = %kind,
                "no comments extracted from file"
            );
        } else {
            debug!(
                batch_id = %ctx.batch_id,
                file_name = %file.file_name,
                kind = %kind,
                comments = raw.len(),
                "comments extracted from file"
            );
        }

        ctx.comments.extend(
            raw.into_iter()
                .map(|comment| comment.into_comment(&ctx.consultation_title)),
        );
    }

    if ctx.comments.is_empty() {
        return Err(AppError::Processing(NO_COMMENTS_MESSAGE.into()));
    }

    info!(
        batch_id = %ctx.batch_id,
        comments = ctx.comments.len(),
        "extraction finished"
    );

    machine
        .start_enrichment()
        .map_err(|(_, guard)| map_guard_error("start_enrichment", &guard))
}

/// Enriches comments one at a time, reporting progress after each one.
/// Individual failures are kept as unprocessed comments.
#[instrument(level = "trace", skip_all, fields(batch_id = %ctx.batch_id))]
pub async fn enrich(
    machine: BatchMachine<(), Enriching>,
    ctx: &mut PipelineContext<'_>,
) -> Result<BatchMachine<(), Persisting>, AppError> {
    let tuning = &ctx.pipeline_config.tuning;
    let comments = std::mem::take(&mut ctx.comments);
    let total = comments.len();

    ctx.progress
        .report(BatchPhase::Enriching, 0.0, PROCESSING_WITH_AI_LABEL)
        .await;

    let mut outcomes = Vec::with_capacity(total);
    for (index, comment) in comments.into_iter().enumerate() {
        let outcome = enrich_comment(ctx.services, comment, tuning.collaborator_timeout).await;
        if !outcome.is_enriched() {
            debug!(
                batch_id = %ctx.batch_id,
                comment_index = index,
                total,
                "comment left unprocessed"
            );
        }
        outcomes.push(outcome);

        ctx.progress
            .report(
                BatchPhase::Enriching,
                tuning.enrichment_progress(index, total),
                PROCESSING_WITH_AI_LABEL,
            )
            .await;
    }

    let processed = outcomes.iter().filter(|o| o.is_enriched()).count();
    info!(
        batch_id = %ctx.batch_id,
        total,
        processed,
        failed = total.saturating_sub(processed),
        "enrichment finished"
    );

    ctx.processed = processed;
    ctx.outcomes = outcomes;

    machine
        .start_persistence()
        .map_err(|(_, guard)| map_guard_error("start_persistence", &guard))
}

/// Writes every comment, enriched or not, in one bulk insert. Not retried.
#[instrument(level = "trace", skip_all, fields(batch_id = %ctx.batch_id))]
pub async fn persist(
    machine: BatchMachine<(), Persisting>,
    ctx: &mut PipelineContext<'_>,
) -> Result<BatchMachine<(), Done>, AppError> {
    ctx.progress
        .report(
            BatchPhase::Persisting,
            ctx.pipeline_config.tuning.persistence_progress,
            SAVING_LABEL,
        )
        .await;

    let comments: Vec<_> = std::mem::take(&mut ctx.outcomes)
        .into_iter()
        .map(EnrichmentOutcome::into_comment)
        .collect();
    let expected = comments.len();

    let stored = ctx.services.bulk_create(comments).await?;
    ctx.persisted = stored.len();

    if ctx.persisted != expected {
        warn!(
            batch_id = %ctx.batch_id,
            expected,
            persisted = ctx.persisted,
            "bulk insert stored a different number of comments than submitted"
        );
    }

    debug!(
        batch_id = %ctx.batch_id,
        persisted = ctx.persisted,
        "batch flushed to database"
    );

    machine
        .finish()
        .map_err(|(_, guard)| map_guard_error("finish", &guard))
}

fn map_guard_error(event: &str, guard: &GuardError) -> AppError {
    AppError::InternalError(format!(
        "invalid batch pipeline transition during {event}: {guard:?}"
    ))
}
