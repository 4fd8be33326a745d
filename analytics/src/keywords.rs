use std::collections::HashMap;

use common::storage::types::consultation_comment::{ConsultationComment, Sentiment};
use serde::Serialize;

use crate::filter::{matches, FilterCriteria};

/// Default `min_frequency` used by the keyword views.
pub const DEFAULT_MIN_FREQUENCY: usize = 2;

pub const MIN_FONT_SIZE: f64 = 14.0;
pub const MAX_FONT_SIZE: f64 = 48.0;

/// Lowercases and trims a raw keyword. Keywords of two characters or fewer
/// are discarded.
pub fn normalize_keyword(raw: &str) -> Option<String> {
    let normalized = raw.trim().to_lowercase();
    (normalized.chars().count() > 2).then_some(normalized)
}

/// Occurrence counts of a keyword split by the sentiment of the comment it
/// appeared in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SentimentBreakdown {
    pub positive: usize,
    pub neutral: usize,
    pub negative: usize,
}

impl SentimentBreakdown {
    /// Comments without a sentiment are not counted.
    pub fn record(&mut self, sentiment: Option<Sentiment>) {
        match sentiment {
            Some(Sentiment::Positive) => self.positive = self.positive.saturating_add(1),
            Some(Sentiment::Neutral) => self.neutral = self.neutral.saturating_add(1),
            Some(Sentiment::Negative) => self.negative = self.negative.saturating_add(1),
            None => {}
        }
    }

    pub const fn total(&self) -> usize {
        self.positive
            .saturating_add(self.neutral)
            .saturating_add(self.negative)
    }
}

/// Highest bucket wins; ties prefer positive, then negative, then neutral.
/// An empty breakdown is neutral.
pub fn dominant_sentiment(breakdown: &SentimentBreakdown) -> Sentiment {
    if breakdown.total() == 0 {
        return Sentiment::Neutral;
    }

    let max = breakdown
        .positive
        .max(breakdown.negative)
        .max(breakdown.neutral);
    if breakdown.positive == max {
        Sentiment::Positive
    } else if breakdown.negative == max {
        Sentiment::Negative
    } else {
        Sentiment::Neutral
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeywordAggregate {
    pub text: String,
    pub value: usize,
    pub sentiments: SentimentBreakdown,
    pub dominant_sentiment: Sentiment,
}

impl KeywordAggregate {
    fn empty(text: String) -> Self {
        Self {
            text,
            value: 0,
            sentiments: SentimentBreakdown::default(),
            dominant_sentiment: Sentiment::Neutral,
        }
    }
}

/// Counts normalized keyword occurrences across the comments that pass
/// `criteria`.
///
/// A keyword repeated within one comment counts once per occurrence. The
/// result holds keywords with `value >= min_frequency`, ordered by descending
/// count with ties kept in first-seen order.
pub fn aggregate_keywords(
    comments: &[ConsultationComment],
    criteria: &FilterCriteria,
    min_frequency: usize,
) -> Vec<KeywordAggregate> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut tallies: Vec<KeywordAggregate> = Vec::new();

    let relevant = comments
        .iter()
        .filter(|c| !c.keyword_list().is_empty() && matches(c, criteria));

    for comment in relevant {
        for keyword in comment.keyword_list().iter().filter_map(|k| normalize_keyword(k)) {
            let slot = *index.entry(keyword).or_insert_with_key(|key| {
                let slot = tallies.len();
                tallies.push(KeywordAggregate::empty(key.clone()));
                slot
            });
            if let Some(tally) = tallies.get_mut(slot) {
                tally.value = tally.value.saturating_add(1);
                tally.sentiments.record(comment.sentiment);
            }
        }
    }

    let mut aggregates: Vec<KeywordAggregate> = tallies
        .into_iter()
        .filter(|tally| tally.value >= min_frequency)
        .map(|mut tally| {
            tally.dominant_sentiment = dominant_sentiment(&tally.sentiments);
            tally
        })
        .collect();

    // sort_by is stable, so equal counts keep first-seen order
    aggregates.sort_by(|a, b| b.value.cmp(&a.value));
    aggregates
}

/// Count range of an aggregate list, used to scale presentation values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeywordScale {
    pub min: usize,
    pub max: usize,
}

impl KeywordScale {
    pub fn from_aggregates(aggregates: &[KeywordAggregate]) -> Self {
        let min = aggregates.iter().map(|a| a.value).min().unwrap_or(0);
        let max = aggregates.iter().map(|a| a.value).max().unwrap_or(0);
        Self { min, max }
    }

    /// Linear font size between [`MIN_FONT_SIZE`] and [`MAX_FONT_SIZE`].
    /// A flat range renders everything at the minimum size.
    pub fn font_size(&self, value: usize) -> f64 {
        if self.max == self.min {
            return MIN_FONT_SIZE;
        }

        let span = (self.max - self.min) as f64;
        let offset = value.saturating_sub(self.min) as f64;
        (MIN_FONT_SIZE + (MAX_FONT_SIZE - MIN_FONT_SIZE) * offset / span)
            .clamp(MIN_FONT_SIZE, MAX_FONT_SIZE)
    }

    /// Percentage of the largest count, with the divisor floored at one.
    pub fn relative_frequency(&self, value: usize) -> f64 {
        value as f64 / self.max.max(1) as f64 * 100.0
    }

    pub fn apply(&self, aggregates: Vec<KeywordAggregate>) -> Vec<ScaledKeyword> {
        aggregates
            .into_iter()
            .map(|aggregate| ScaledKeyword {
                font_size: self.font_size(aggregate.value),
                relative_frequency: self.relative_frequency(aggregate.value),
                aggregate,
            })
            .collect()
    }
}

/// An aggregate annotated with its presentation values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScaledKeyword {
    #[serde(flatten)]
    pub aggregate: KeywordAggregate,
    pub font_size: f64,
    pub relative_frequency: f64,
}
