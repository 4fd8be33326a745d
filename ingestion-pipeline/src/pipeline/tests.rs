use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{NaiveDate, Utc};
use common::{
    error::AppError,
    storage::{
        db::SurrealDbClient,
        types::consultation_comment::{
            ConsultationComment, Sentiment, SortKey, StakeholderType, DEFAULT_STAKEHOLDER_NAME,
        },
    },
};
use serde_json::{json, Value};
use tokio::sync::{mpsc, Mutex};
use uuid::Uuid;

use super::{
    config::{IngestionConfig, IngestionTuning},
    extraction::{extract_structured, extract_unstructured},
    progress::{BatchPhase, BatchProgress, ProgressReporter},
    services::{ExtractionOutput, PipelineServices, UploadedFile},
    BatchOutcome, BatchSubmission, IngestionPipeline, GENERIC_FAILURE_MESSAGE,
    MISSING_INPUT_MESSAGE, NO_COMMENTS_MESSAGE,
};
use crate::utils::file_type::UNSUPPORTED_FILE_MESSAGE;

/// Scripted collaborators. Extraction answers are looked up by file name,
/// analysis answers are derived from the comment text.
#[derive(Default)]
struct MockServices {
    extractions: Vec<(String, ExtractionOutput)>,
    segmentation: Option<Value>,
    failing_comments: Vec<String>,
    slow_inference: bool,
    failing_uploads: Vec<String>,
    fail_persistence: bool,
    db: Option<SurrealDbClient>,
    calls: Mutex<Vec<String>>,
    stored: Mutex<Vec<ConsultationComment>>,
}

impl MockServices {
    fn with_extraction(mut self, file_name: &str, output: ExtractionOutput) -> Self {
        self.extractions.push((file_name.to_string(), output));
        self
    }

    async fn record(&self, call: impl Into<String>) {
        self.calls.lock().await.push(call.into());
    }

    async fn calls(&self) -> Vec<String> {
        self.calls.lock().await.clone()
    }

    async fn called(&self, prefix: &str) -> bool {
        self.calls.lock().await.iter().any(|c| c.starts_with(prefix))
    }
}

#[async_trait]
impl PipelineServices for MockServices {
    async fn upload(&self, batch_id: &str, file: &UploadedFile) -> Result<String, AppError> {
        self.record(format!("upload:{}", file.file_name)).await;
        if self.failing_uploads.contains(&file.file_name) {
            return Err(AppError::Processing("mock upload failure".into()));
        }
        Ok(format!("batches/{batch_id}/{}", file.file_name))
    }

    async fn extract(&self, file_url: &str, schema: Value) -> Result<ExtractionOutput, AppError> {
        self.record(format!("extract:{file_url}")).await;
        let wants_full_text = schema["properties"].get("full_text").is_some();

        let output = self
            .extractions
            .iter()
            .find(|(name, _)| file_url.ends_with(name.as_str()))
            .map(|(_, output)| output.clone())
            .ok_or_else(|| AppError::NotFound(file_url.to_string()))?;

        if output.is_success() && wants_full_text != output.output.get("full_text").is_some() {
            return Err(AppError::Validation("schema mismatch in mock".into()));
        }
        Ok(output)
    }

    async fn infer(&self, prompt: String, schema: Value) -> Result<Value, AppError> {
        if schema["properties"].get("sentiment").is_some() {
            self.record("infer:analysis").await;
            if self.slow_inference {
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
            if self
                .failing_comments
                .iter()
                .any(|text| prompt.contains(text.as_str()))
            {
                return Err(AppError::Processing("mock inference failure".into()));
            }
            return Ok(json!({
                "sentiment": "positive",
                "confidence": 0.9,
                "keywords": ["Transport", "buses"]
            }));
        }

        self.record("infer:segmentation").await;
        self.segmentation
            .clone()
            .ok_or_else(|| AppError::LLMParsing("no segmentation scripted".into()))
    }

    async fn bulk_create(
        &self,
        comments: Vec<ConsultationComment>,
    ) -> Result<Vec<ConsultationComment>, AppError> {
        self.record("bulk_create").await;
        if self.fail_persistence {
            return Err(AppError::Processing("mock persistence failure".into()));
        }

        let stored = match &self.db {
            Some(db) => ConsultationComment::bulk_create(comments, db).await?,
            None => comments
                .into_iter()
                .map(|mut comment| {
                    comment.id = Uuid::new_v4().to_string();
                    comment
                })
                .collect(),
        };
        self.stored.lock().await.extend(stored.iter().cloned());
        Ok(stored)
    }
}

fn csv_rows(texts: &[&str]) -> ExtractionOutput {
    let comments: Vec<Value> = texts
        .iter()
        .map(|text| {
            json!({
                "comment_text": text,
                "stakeholder_name": "Jo Citizen",
                "stakeholder_type": "individual",
                "submission_date": "2024-02-01"
            })
        })
        .collect();
    ExtractionOutput::success(json!({ "comments": comments }))
}

fn file(name: &str) -> UploadedFile {
    UploadedFile {
        file_name: name.to_string(),
        content_type: None,
        bytes: Bytes::from_static(b"ignored by mock"),
    }
}

fn submission(title: &str, files: &[&str]) -> BatchSubmission {
    BatchSubmission {
        consultation_title: title.to_string(),
        files: files.iter().map(|name| file(name)).collect(),
    }
}

fn pipeline(services: Arc<MockServices>, tuning: IngestionTuning) -> IngestionPipeline {
    IngestionPipeline::with_services(IngestionConfig { tuning }, services)
}

/// Runs a batch and collects every progress update it emitted.
async fn run(
    services: Arc<MockServices>,
    submission: BatchSubmission,
) -> (BatchOutcome, Vec<BatchProgress>) {
    run_with_tuning(services, submission, IngestionTuning::default()).await
}

async fn run_with_tuning(
    services: Arc<MockServices>,
    submission: BatchSubmission,
    tuning: IngestionTuning,
) -> (BatchOutcome, Vec<BatchProgress>) {
    let (tx, mut rx) = mpsc::channel(256);
    let outcome = pipeline(services, tuning)
        .submit_batch(submission, ProgressReporter::new(tx))
        .await;

    let mut updates = Vec::new();
    while let Some(update) = rx.recv().await {
        updates.push(update);
    }
    (outcome, updates)
}

#[tokio::test]
async fn enrichment_failure_is_isolated_to_one_comment() {
    let services = Arc::new(MockServices {
        failing_comments: vec!["Second comment".into()],
        ..MockServices::default()
    }
    .with_extraction(
        "feedback.csv",
        csv_rows(&["First comment", "Second comment", "Third comment"]),
    ));

    let (outcome, _) = run(
        Arc::clone(&services),
        submission("Transport Bill", &["feedback.csv"]),
    )
    .await;

    assert_eq!(
        outcome,
        BatchOutcome::Done {
            processed: 2,
            persisted: 3
        }
    );

    let stored = services.stored.lock().await.clone();
    assert_eq!(stored.len(), 3);
    let processed: Vec<bool> = stored.iter().map(|c| c.processed).collect();
    assert_eq!(processed, vec![true, false, true]);

    let failed = &stored[1];
    assert_eq!(failed.comment_text, "Second comment");
    assert!(failed.sentiment.is_none());
    assert!(failed.sentiment_confidence.is_none());
    assert!(failed.keywords.is_none());

    let enriched = &stored[0];
    assert_eq!(enriched.sentiment, Some(Sentiment::Positive));
    assert_eq!(enriched.keyword_list(), ["Transport", "buses"]);
    assert!(stored.iter().all(|c| c.consultation_title == "Transport Bill"));
}

#[tokio::test]
async fn empty_structured_extraction_fails_before_enriching() {
    let services = Arc::new(
        MockServices::default().with_extraction("feedback.csv", csv_rows(&[])),
    );

    let (outcome, updates) = run(
        Arc::clone(&services),
        submission("Transport Bill", &["feedback.csv"]),
    )
    .await;

    assert_eq!(
        outcome,
        BatchOutcome::Failed {
            reason: NO_COMMENTS_MESSAGE.into()
        }
    );
    assert!(!services.called("infer").await);
    assert!(!services.called("bulk_create").await);
    assert!(updates.iter().all(|u| u.state != BatchPhase::Enriching));
    assert_eq!(updates.last().map(|u| u.state), Some(BatchPhase::Failed));
}

#[tokio::test]
async fn failed_extraction_counts_as_zero_comments() {
    let services = Arc::new(
        MockServices::default()
            .with_extraction("scan.pdf", ExtractionOutput::failure("no text layer")),
    );

    let (outcome, _) = run(Arc::clone(&services), submission("Budget", &["scan.pdf"])).await;

    assert_eq!(
        outcome,
        BatchOutcome::Failed {
            reason: NO_COMMENTS_MESSAGE.into()
        }
    );
    assert!(!services.called("infer").await);
}

#[tokio::test]
async fn one_empty_file_does_not_fail_the_batch() {
    let services = Arc::new(
        MockServices::default()
            .with_extraction("empty.csv", csv_rows(&[]))
            .with_extraction("full.csv", csv_rows(&["Only comment"])),
    );

    let (outcome, _) = run(
        Arc::clone(&services),
        submission("Budget", &["empty.csv", "full.csv"]),
    )
    .await;

    assert_eq!(
        outcome,
        BatchOutcome::Done {
            processed: 1,
            persisted: 1
        }
    );
}

#[tokio::test]
async fn progress_follows_the_weighted_schedule() {
    let services = Arc::new(MockServices::default().with_extraction(
        "feedback.csv",
        csv_rows(&["one", "two", "three", "four"]),
    ));

    let (outcome, updates) = run(services, submission("Budget", &["feedback.csv"])).await;
    assert!(matches!(outcome, BatchOutcome::Done { processed: 4, .. }));

    let first = updates.first().expect("extracting update");
    assert_eq!(first.state, BatchPhase::Extracting);
    assert_eq!(first.current_label, "Processing: feedback.csv");

    let enriching: Vec<f64> = updates
        .iter()
        .filter(|u| u.state == BatchPhase::Enriching)
        .map(|u| u.percent)
        .collect();
    assert_eq!(enriching, vec![0.0, 22.5, 45.0, 67.5, 90.0]);

    let tail: Vec<(BatchPhase, f64)> = updates
        .iter()
        .rev()
        .take(2)
        .map(|u| (u.state, u.percent))
        .collect();
    assert_eq!(
        tail,
        vec![(BatchPhase::Done, 100.0), (BatchPhase::Persisting, 95.0)]
    );
}

#[tokio::test]
async fn missing_title_or_files_is_rejected_before_extraction() {
    let services = Arc::new(
        MockServices::default().with_extraction("feedback.csv", csv_rows(&["text"])),
    );

    let (outcome, updates) = run(
        Arc::clone(&services),
        submission("   ", &["feedback.csv"]),
    )
    .await;
    assert_eq!(
        outcome,
        BatchOutcome::Failed {
            reason: MISSING_INPUT_MESSAGE.into()
        }
    );
    assert_eq!(updates.len(), 1);

    let (outcome, _) = run(Arc::clone(&services), submission("Budget", &[])).await;
    assert_eq!(
        outcome,
        BatchOutcome::Failed {
            reason: MISSING_INPUT_MESSAGE.into()
        }
    );

    assert!(services.calls().await.is_empty());
}

#[tokio::test]
async fn unsupported_file_rejects_the_whole_submission() {
    let services = Arc::new(
        MockServices::default().with_extraction("feedback.csv", csv_rows(&["text"])),
    );

    let (outcome, _) = run(
        Arc::clone(&services),
        submission("Budget", &["feedback.csv", "photo.png"]),
    )
    .await;

    assert_eq!(
        outcome,
        BatchOutcome::Failed {
            reason: UNSUPPORTED_FILE_MESSAGE.into()
        }
    );
    assert!(services.calls().await.is_empty());
}

#[tokio::test]
async fn unstructured_documents_are_segmented_and_dated_today() {
    let services = Arc::new(MockServices {
        segmentation: Some(json!({
            "comments": [
                { "comment_text": "Keep the night bus", "stakeholder_name": "", "stakeholder_type": "" },
                { "comment_text": "Fund cycle lanes", "stakeholder_name": "Cycle Alliance", "stakeholder_type": "ngo" }
            ]
        })),
        ..MockServices::default()
    }
    .with_extraction(
        "letter.txt",
        ExtractionOutput::success(json!({ "full_text": "Keep the night bus. Fund cycle lanes." })),
    ));

    let (outcome, _) = run(
        Arc::clone(&services),
        submission("Transport Bill", &["letter.txt"]),
    )
    .await;
    assert_eq!(
        outcome,
        BatchOutcome::Done {
            processed: 2,
            persisted: 2
        }
    );

    let stored = services.stored.lock().await.clone();
    let today = Utc::now().date_naive();
    assert!(stored.iter().all(|c| c.submission_date == Some(today)));
    assert_eq!(stored[0].stakeholder_name, DEFAULT_STAKEHOLDER_NAME);
    assert_eq!(stored[0].stakeholder_type, StakeholderType::Individual);
    assert_eq!(stored[1].stakeholder_type, StakeholderType::Ngo);
}

#[tokio::test]
async fn persistence_failure_fails_the_batch_without_retry() {
    let services = Arc::new(MockServices {
        fail_persistence: true,
        ..MockServices::default()
    }
    .with_extraction("feedback.csv", csv_rows(&["text"])));

    let (outcome, updates) = run(
        Arc::clone(&services),
        submission("Budget", &["feedback.csv"]),
    )
    .await;

    assert_eq!(
        outcome,
        BatchOutcome::Failed {
            reason: "mock persistence failure".into()
        }
    );
    let persist_calls = services
        .calls()
        .await
        .iter()
        .filter(|c| c.as_str() == "bulk_create")
        .count();
    assert_eq!(persist_calls, 1);
    assert!(updates.iter().any(|u| u.state == BatchPhase::Persisting));
    assert_eq!(updates.last().map(|u| u.state), Some(BatchPhase::Failed));
}

#[tokio::test]
async fn timed_out_inference_leaves_comment_unprocessed() {
    let services = Arc::new(MockServices {
        slow_inference: true,
        ..MockServices::default()
    }
    .with_extraction("feedback.csv", csv_rows(&["slow one"])));

    let tuning = IngestionTuning {
        collaborator_timeout: Duration::from_millis(20),
        ..IngestionTuning::default()
    };
    let (outcome, _) = run_with_tuning(
        Arc::clone(&services),
        submission("Budget", &["feedback.csv"]),
        tuning,
    )
    .await;

    assert_eq!(
        outcome,
        BatchOutcome::Done {
            processed: 0,
            persisted: 1
        }
    );
    assert!(!services.stored.lock().await[0].processed);
}

#[tokio::test]
async fn failed_upload_skips_only_that_file() {
    let services = Arc::new(MockServices {
        failing_uploads: vec!["broken.csv".into()],
        ..MockServices::default()
    }
    .with_extraction("broken.csv", csv_rows(&["never read"]))
    .with_extraction("good.csv", csv_rows(&["read me"])));

    let (outcome, _) = run(
        Arc::clone(&services),
        submission("Budget", &["broken.csv", "good.csv"]),
    )
    .await;

    assert_eq!(
        outcome,
        BatchOutcome::Done {
            processed: 1,
            persisted: 1
        }
    );
    let calls = services.calls().await;
    assert!(calls.contains(&"upload:broken.csv".to_string()));
    assert!(!calls
        .iter()
        .any(|c| c.starts_with("extract:") && c.ends_with("broken.csv")));
}

#[tokio::test]
async fn unstructured_adapter_skips_inference_for_blank_text() {
    let services = MockServices::default().with_extraction(
        "blank.txt",
        ExtractionOutput::success(json!({ "full_text": "   " })),
    );

    let today = NaiveDate::from_ymd_opt(2024, 6, 1).expect("valid date");
    let comments = extract_unstructured(
        &services,
        "batches/b/blank.txt",
        Duration::from_secs(1),
        today,
    )
    .await;

    assert!(comments.is_empty());
    assert!(!services.called("infer").await);
}

#[tokio::test]
async fn structured_adapter_swallows_collaborator_errors() {
    let services = MockServices::default();
    let comments =
        extract_structured(&services, "batches/b/unknown.csv", Duration::from_secs(1)).await;
    assert!(comments.is_empty());
}

#[tokio::test]
async fn batch_is_persisted_to_surrealdb() {
    let db = SurrealDbClient::memory("test_ns", &Uuid::new_v4().to_string())
        .await
        .expect("in-memory surrealdb");
    db.ensure_initialized().await.expect("schema");

    let services = Arc::new(MockServices {
        db: Some(db.clone()),
        failing_comments: vec!["Unclear".into()],
        ..MockServices::default()
    }
    .with_extraction("feedback.csv", csv_rows(&["Great idea", "Unclear"])));

    let (outcome, _) = run(services, submission("Budget", &["feedback.csv"])).await;
    assert_eq!(
        outcome,
        BatchOutcome::Done {
            processed: 1,
            persisted: 2
        }
    );

    let listed = ConsultationComment::list(&SortKey::newest_first(), &db)
        .await
        .expect("list comments");
    assert_eq!(listed.len(), 2);
    assert!(listed.iter().all(|c| !c.id.is_empty()));
    assert_eq!(listed.iter().filter(|c| c.processed).count(), 1);
    assert!(listed
        .iter()
        .all(|c| c.submission_date == NaiveDate::from_ymd_opt(2024, 2, 1)));
}

#[test]
fn generic_reason_hides_internal_errors() {
    let reason = super::failure_reason(&AppError::InternalError("secret detail".into()));
    assert_eq!(reason, GENERIC_FAILURE_MESSAGE);
}
