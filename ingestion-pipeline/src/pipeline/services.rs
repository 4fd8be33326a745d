use std::{future::Future, sync::Arc, time::Duration};

use async_openai::types::{
    ChatCompletionRequestSystemMessage, ChatCompletionRequestUserMessage,
    CreateChatCompletionRequest, CreateChatCompletionRequestArgs, ResponseFormat,
    ResponseFormatJsonSchema,
};
use async_trait::async_trait;
use bytes::Bytes;
use common::{
    error::AppError,
    storage::{
        db::SurrealDbClient, store::StorageManager,
        types::consultation_comment::ConsultationComment,
    },
    utils::config::AppConfig,
};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::utils::{
    file_type::{stored_file_name, FileKind},
    llm_instructions::{
        requests_only_full_text, schema_extraction_prompt, CONSULTATION_SYSTEM_MESSAGE,
    },
    text_extraction::extract_text,
};

/// A file as received from the submitter.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionStatus {
    Success,
    Failure,
}

/// Result of an extraction request. `output` is shaped by the requested
/// schema when the status is `Success`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractionOutput {
    pub status: ExtractionStatus,
    pub output: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ExtractionOutput {
    pub fn success(output: Value) -> Self {
        Self {
            status: ExtractionStatus::Success,
            output,
            details: None,
        }
    }

    pub fn failure(details: impl Into<String>) -> Self {
        Self {
            status: ExtractionStatus::Failure,
            output: Value::Null,
            details: Some(details.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ExtractionStatus::Success
    }
}

/// External collaborators of a batch run.
#[async_trait]
pub trait PipelineServices: Send + Sync {
    /// Stores the raw bytes and returns the location handed to `extract`.
    async fn upload(&self, batch_id: &str, file: &UploadedFile) -> Result<String, AppError>;

    async fn extract(&self, file_url: &str, schema: Value) -> Result<ExtractionOutput, AppError>;

    async fn infer(&self, prompt: String, schema: Value) -> Result<Value, AppError>;

    async fn bulk_create(
        &self,
        comments: Vec<ConsultationComment>,
    ) -> Result<Vec<ConsultationComment>, AppError>;
}

/// Runs a collaborator call, turning an elapsed deadline into an error.
pub async fn call_with_timeout<T, F>(
    limit: Duration,
    operation: &'static str,
    call: F,
) -> Result<T, AppError>
where
    F: Future<Output = Result<T, AppError>>,
{
    tokio::time::timeout(limit, call).await.map_err(|_| {
        AppError::Processing(format!(
            "{operation} timed out after {}s",
            limit.as_secs()
        ))
    })?
}

pub struct DefaultPipelineServices {
    db: Arc<SurrealDbClient>,
    openai_client: Arc<async_openai::Client<async_openai::config::OpenAIConfig>>,
    config: AppConfig,
    storage: StorageManager,
}

impl DefaultPipelineServices {
    pub fn new(
        db: Arc<SurrealDbClient>,
        openai_client: Arc<async_openai::Client<async_openai::config::OpenAIConfig>>,
        config: AppConfig,
        storage: StorageManager,
    ) -> Self {
        Self {
            db,
            openai_client,
            config,
            storage,
        }
    }

    fn prepare_llm_request(
        &self,
        prompt: String,
        schema: Value,
    ) -> Result<CreateChatCompletionRequest, AppError> {
        let response_format = ResponseFormat::JsonSchema {
            json_schema: ResponseFormatJsonSchema {
                description: Some("Structured answer about consultation feedback".into()),
                name: "consultation_response".into(),
                schema: Some(schema),
                strict: Some(true),
            },
        };

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.config.processing_model)
            .messages([
                ChatCompletionRequestSystemMessage::from(CONSULTATION_SYSTEM_MESSAGE).into(),
                ChatCompletionRequestUserMessage::from(prompt).into(),
            ])
            .response_format(response_format)
            .build()?;

        Ok(request)
    }

    async fn document_text(&self, file_url: &str) -> Result<String, AppError> {
        let kind = FileKind::from_file_name(file_url);
        let bytes = self.storage.get(file_url).await?;
        extract_text(kind, bytes).await
    }
}

#[async_trait]
impl PipelineServices for DefaultPipelineServices {
    async fn upload(&self, batch_id: &str, file: &UploadedFile) -> Result<String, AppError> {
        let kind = FileKind::classify(&file.file_name, file.content_type.as_deref());
        let location = format!(
            "batches/{batch_id}/{}/{}",
            Uuid::new_v4(),
            stored_file_name(&file.file_name, kind)
        );
        self.storage.put(&location, file.bytes.clone()).await?;

        debug!(%location, size = file.bytes.len(), "stored uploaded file");
        Ok(location)
    }

    async fn extract(&self, file_url: &str, schema: Value) -> Result<ExtractionOutput, AppError> {
        let text = match self.document_text(file_url).await {
            Ok(text) => text,
            Err(err) => {
                warn!(%file_url, error = %err, "text extraction failed");
                return Ok(ExtractionOutput::failure(err.to_string()));
            }
        };

        if requests_only_full_text(&schema) {
            return Ok(ExtractionOutput::success(json!({ "full_text": text })));
        }

        if text.trim().is_empty() {
            return Ok(ExtractionOutput::failure("document contains no text"));
        }

        match self.infer(schema_extraction_prompt(&text), schema).await {
            Ok(output) => Ok(ExtractionOutput::success(output)),
            Err(err) => {
                warn!(%file_url, error = %err, "schema extraction failed");
                Ok(ExtractionOutput::failure(err.to_string()))
            }
        }
    }

    async fn infer(&self, prompt: String, schema: Value) -> Result<Value, AppError> {
        let request = self.prepare_llm_request(prompt, schema)?;
        let response = self.openai_client.chat().create(request).await?;

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.as_ref())
            .ok_or(AppError::LLMParsing(
                "No content found in LLM response".into(),
            ))?;

        serde_json::from_str::<Value>(content).map_err(|e| {
            AppError::LLMParsing(format!("Failed to parse LLM response as JSON: {e}"))
        })
    }

    async fn bulk_create(
        &self,
        comments: Vec<ConsultationComment>,
    ) -> Result<Vec<ConsultationComment>, AppError> {
        ConsultationComment::bulk_create(comments, &self.db).await
    }
}
