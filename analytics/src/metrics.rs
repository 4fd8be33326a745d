use std::collections::HashSet;

use common::storage::types::consultation_comment::{ConsultationComment, Sentiment};
use serde::Serialize;

/// Number of comments shown in the "recent activity" listing.
pub const RECENT_COMMENTS_LIMIT: usize = 5;

/// Headline counts for the whole corpus.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CorpusMetrics {
    pub total: usize,
    pub processed: usize,
    pub pending: usize,
    /// Percentage of processed comments, rounded to the nearest integer.
    pub processing_rate: usize,
    pub positive: usize,
    pub negative: usize,
    pub neutral: usize,
}

impl CorpusMetrics {
    pub fn from_comments(comments: &[ConsultationComment]) -> Self {
        let mut metrics = comments.iter().fold(Self::default(), |mut acc, comment| {
            acc.total = acc.total.saturating_add(1);
            if comment.processed {
                acc.processed = acc.processed.saturating_add(1);
            }
            match comment.sentiment {
                Some(Sentiment::Positive) => acc.positive = acc.positive.saturating_add(1),
                Some(Sentiment::Negative) => acc.negative = acc.negative.saturating_add(1),
                Some(Sentiment::Neutral) => acc.neutral = acc.neutral.saturating_add(1),
                None => {}
            }
            acc
        });

        metrics.pending = metrics.total.saturating_sub(metrics.processed);
        metrics.processing_rate = rounded_percentage(metrics.processed, metrics.total);
        metrics
    }
}

/// Half-up rounding, integer only.
fn rounded_percentage(part: usize, whole: usize) -> usize {
    if whole == 0 {
        return 0;
    }
    part.saturating_mul(200)
        .saturating_add(whole)
        .checked_div(whole.saturating_mul(2))
        .unwrap_or(0)
}

/// Distinct, non-blank consultation titles in first-seen order.
pub fn consultation_titles(comments: &[ConsultationComment]) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut titles = Vec::new();
    for comment in comments {
        if comment.consultation_title.trim().is_empty() {
            continue;
        }
        if seen.insert(comment.consultation_title.as_str()) {
            titles.push(comment.consultation_title.clone());
        }
    }
    titles
}

/// The first `limit` comments of an already newest-first snapshot.
pub fn recent_comments(comments: &[ConsultationComment], limit: usize) -> &[ConsultationComment] {
    comments.get(..limit).unwrap_or(comments)
}
