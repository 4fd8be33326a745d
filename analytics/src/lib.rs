//! Read-side analytics over a snapshot of consultation comments.
//!
//! Every function here is a pure function of `(corpus snapshot, criteria)`;
//! callers load the comments once and pass them in.

pub mod export;
pub mod filter;
pub mod keywords;
pub mod metrics;
pub mod pagination;

pub use export::{export_keywords_csv, EXPORT_FILE_NAME};
pub use filter::{filter_comments, matches, FilterCriteria, Selection};
pub use keywords::{
    aggregate_keywords, dominant_sentiment, normalize_keyword, KeywordAggregate, KeywordScale,
    ScaledKeyword, SentimentBreakdown, DEFAULT_MIN_FREQUENCY,
};
pub use metrics::{consultation_titles, recent_comments, CorpusMetrics, RECENT_COMMENTS_LIMIT};
pub use pagination::{paginate_items, Pagination, DEFAULT_PER_PAGE};
