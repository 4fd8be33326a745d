use std::{pin::Pin, time::Duration};

use axum::{
    extract::State,
    response::{
        sse::{Event, KeepAlive},
        Sse,
    },
};
use axum_typed_multipart::{FieldData, TryFromMultipart, TypedMultipart};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use ingestion_pipeline::{
    pipeline::GENERIC_FAILURE_MESSAGE, BatchOutcome, BatchSubmission, ProgressReporter,
    UploadedFile,
};
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::api_state::ApiState;

/// Progress updates buffered between the pipeline task and the response.
const PROGRESS_BUFFER: usize = 64;

type EventStream = Pin<Box<dyn Stream<Item = Result<Event, axum::Error>> + Send>>;

#[derive(Debug, TryFromMultipart)]
pub struct BatchParams {
    #[form_data(default)]
    pub consultation_title: String,
    #[form_data(limit = "unlimited")]
    #[form_data(default)]
    pub files: Vec<FieldData<Bytes>>,
}

fn uploaded_file(field: FieldData<Bytes>) -> UploadedFile {
    let file_name = field
        .metadata
        .file_name
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| "upload".to_string());
    let content_type = field.metadata.content_type.or_else(|| {
        mime_guess::from_path(&file_name)
            .first()
            .map(|mime| mime.essence_str().to_string())
    });

    UploadedFile {
        file_name,
        content_type,
        bytes: field.contents,
    }
}

/// Runs one batch and streams its progress. The stream ends with a single
/// `done` or `failed` event.
pub async fn submit_batch(
    State(state): State<ApiState>,
    TypedMultipart(input): TypedMultipart<BatchParams>,
) -> Sse<EventStream> {
    let files: Vec<UploadedFile> = input.files.into_iter().map(uploaded_file).collect();
    let total_bytes: usize = files.iter().map(|f| f.bytes.len()).sum();

    info!(
        consultation_title = %input.consultation_title,
        file_count = files.len(),
        total_bytes,
        "Received batch submission"
    );

    let submission = BatchSubmission {
        consultation_title: input.consultation_title,
        files,
    };

    let (sender, mut receiver) = mpsc::channel(PROGRESS_BUFFER);
    let pipeline = state.pipeline.clone();
    let run = tokio::spawn(async move {
        pipeline
            .submit_batch(submission, ProgressReporter::new(sender))
            .await
    });

    let sse_stream = async_stream::stream! {
        while let Some(update) = receiver.recv().await {
            yield Event::default().event("progress").json_data(&update);
        }

        match run.await {
            Ok(BatchOutcome::Done { processed, persisted }) => {
                yield Event::default()
                    .event("done")
                    .json_data(json!({ "processed": processed, "persisted": persisted }));
            }
            Ok(BatchOutcome::Failed { reason }) => {
                yield Event::default()
                    .event("failed")
                    .json_data(json!({ "reason": reason }));
            }
            Err(join_err) => {
                error!("Batch task ended abnormally: {:?}", join_err);
                yield Event::default()
                    .event("failed")
                    .json_data(json!({ "reason": GENERIC_FAILURE_MESSAGE }));
            }
        }
    };

    Sse::new(sse_stream.boxed()).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive-ping"),
    )
}
