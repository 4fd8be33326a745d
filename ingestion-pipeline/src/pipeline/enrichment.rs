use std::time::Duration;

use common::{
    error::AppError,
    storage::types::consultation_comment::{ConsultationComment, Sentiment},
};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::services::{call_with_timeout, PipelineServices};
use crate::utils::llm_instructions::{comment_analysis_prompt, comment_analysis_schema};

/// Analysis of one comment as answered by the inference collaborator.
#[derive(Debug, Clone, Deserialize)]
pub struct CommentAnalysis {
    pub sentiment: String,
    pub confidence: f32,
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl CommentAnalysis {
    fn from_value(value: Value) -> Result<(Sentiment, f32, Vec<String>), AppError> {
        let analysis: Self = serde_json::from_value(value).map_err(|e| {
            AppError::LLMParsing(format!("Failed to parse LLM response into analysis: {e}"))
        })?;
        let sentiment = analysis.sentiment.parse::<Sentiment>()?;
        if !analysis.confidence.is_finite() {
            return Err(AppError::LLMParsing("confidence is not a number".into()));
        }

        Ok((sentiment, analysis.confidence, analysis.keywords))
    }
}

/// Per-comment result of the enrichment stage. A failed comment is carried
/// along unchanged so it can still be persisted.
#[derive(Debug, Clone, PartialEq)]
pub enum EnrichmentOutcome {
    Enriched(ConsultationComment),
    Failed(ConsultationComment),
}

impl EnrichmentOutcome {
    pub fn is_enriched(&self) -> bool {
        matches!(self, Self::Enriched(_))
    }

    pub fn into_comment(self) -> ConsultationComment {
        match self {
            Self::Enriched(comment) | Self::Failed(comment) => comment,
        }
    }
}

/// Runs the sentiment and keyword analysis for a single comment. Never
/// fails: collaborator errors, malformed answers and timeouts all produce
/// [`EnrichmentOutcome::Failed`].
pub async fn enrich_comment(
    services: &dyn PipelineServices,
    comment: ConsultationComment,
    timeout: Duration,
) -> EnrichmentOutcome {
    let analysis = call_with_timeout(
        timeout,
        "comment analysis",
        services.infer(
            comment_analysis_prompt(&comment.comment_text),
            comment_analysis_schema(),
        ),
    )
    .await
    .and_then(CommentAnalysis::from_value);

    match analysis {
        Ok((sentiment, confidence, keywords)) => {
            debug!(
                sentiment = %sentiment,
                keyword_count = keywords.len(),
                "comment enriched"
            );
            EnrichmentOutcome::Enriched(comment.with_analysis(sentiment, confidence, keywords))
        }
        Err(err) => {
            warn!(error = %err, "comment enrichment failed; keeping comment unprocessed");
            EnrichmentOutcome::Failed(comment)
        }
    }
}
