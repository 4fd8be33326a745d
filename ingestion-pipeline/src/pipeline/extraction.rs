use std::time::Duration;

use chrono::NaiveDate;
use common::storage::types::consultation_comment::{
    ConsultationComment, StakeholderType, DEFAULT_STAKEHOLDER_NAME,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::services::{call_with_timeout, PipelineServices};
use crate::utils::llm_instructions::{
    full_text_schema, segmentation_prompt, segmented_comments_schema, structured_comments_schema,
};

/// A comment pulled out of a document, before enrichment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawComment {
    pub comment_text: String,
    pub stakeholder_name: String,
    pub stakeholder_type: StakeholderType,
    pub submission_date: Option<NaiveDate>,
}

impl RawComment {
    /// Tags the comment with the batch's consultation title.
    pub fn into_comment(self, consultation_title: &str) -> ConsultationComment {
        ConsultationComment::new(
            consultation_title.to_string(),
            self.comment_text,
            self.stakeholder_name,
            self.stakeholder_type,
            self.submission_date,
        )
    }
}

/// Loose shape of a comment as returned by extraction or inference.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ExtractedComment {
    comment_text: Option<String>,
    stakeholder_name: Option<String>,
    stakeholder_type: Option<String>,
    submission_date: Option<String>,
}

impl ExtractedComment {
    fn into_raw(self) -> Option<RawComment> {
        let comment_text = self.comment_text?.trim().to_string();
        if comment_text.is_empty() {
            return None;
        }

        let stakeholder_name = self
            .stakeholder_name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| DEFAULT_STAKEHOLDER_NAME.to_string());

        Some(RawComment {
            comment_text,
            stakeholder_name,
            stakeholder_type: StakeholderType::from_label(self.stakeholder_type.as_deref()),
            submission_date: self.submission_date.as_deref().and_then(parse_date),
        })
    }
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    ["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d"]
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
        .or_else(|| raw.get(..10).and_then(|day| day.parse().ok()))
}

/// Reads the `comments` array of an extraction or inference answer,
/// skipping entries that are not usable comments.
fn comments_from_output(output: &Value) -> Vec<RawComment> {
    output
        .get("comments")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| serde_json::from_value::<ExtractedComment>(item.clone()).ok())
                .filter_map(ExtractedComment::into_raw)
                .collect()
        })
        .unwrap_or_default()
}

/// Tabular files: the extraction collaborator returns comment rows directly.
/// Any failure yields no comments.
pub async fn extract_structured(
    services: &dyn PipelineServices,
    file_url: &str,
    timeout: Duration,
) -> Vec<RawComment> {
    let result = call_with_timeout(
        timeout,
        "structured extraction",
        services.extract(file_url, structured_comments_schema()),
    )
    .await;

    match result {
        Ok(extraction) if extraction.is_success() => comments_from_output(&extraction.output),
        Ok(extraction) => {
            warn!(
                %file_url,
                details = extraction.details.as_deref().unwrap_or("none"),
                "structured extraction reported failure"
            );
            Vec::new()
        }
        Err(err) => {
            warn!(%file_url, error = %err, "structured extraction failed");
            Vec::new()
        }
    }
}

/// Free-text documents: pull the full text, then have the inference
/// collaborator split it into comments. Every comment is dated `today`.
/// Any failure yields no comments.
pub async fn extract_unstructured(
    services: &dyn PipelineServices,
    file_url: &str,
    timeout: Duration,
    today: NaiveDate,
) -> Vec<RawComment> {
    let extraction = match call_with_timeout(
        timeout,
        "text extraction",
        services.extract(file_url, full_text_schema()),
    )
    .await
    {
        Ok(extraction) if extraction.is_success() => extraction,
        Ok(extraction) => {
            warn!(
                %file_url,
                details = extraction.details.as_deref().unwrap_or("none"),
                "text extraction reported failure"
            );
            return Vec::new();
        }
        Err(err) => {
            warn!(%file_url, error = %err, "text extraction failed");
            return Vec::new();
        }
    };

    let full_text = extraction
        .output
        .get("full_text")
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or_default();
    if full_text.is_empty() {
        debug!(%file_url, "document yielded no text");
        return Vec::new();
    }

    let segmented = call_with_timeout(
        timeout,
        "comment segmentation",
        services.infer(segmentation_prompt(full_text), segmented_comments_schema()),
    )
    .await;

    match segmented {
        Ok(output) => comments_from_output(&output)
            .into_iter()
            .map(|comment| RawComment {
                submission_date: Some(today),
                ..comment
            })
            .collect(),
        Err(err) => {
            warn!(%file_url, error = %err, "comment segmentation failed");
            Vec::new()
        }
    }
}
