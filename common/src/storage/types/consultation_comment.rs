use std::str::FromStr;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::{error::AppError, storage::db::SurrealDbClient, stored_object};

/// Stakeholder name recorded when a submission does not identify its author.
pub const DEFAULT_STAKEHOLDER_NAME: &str = "Anonymous";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl Sentiment {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
            Self::Neutral => "neutral",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sentiment {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "positive" => Ok(Self::Positive),
            "negative" => Ok(Self::Negative),
            "neutral" => Ok(Self::Neutral),
            other => Err(AppError::Validation(format!("unknown sentiment '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StakeholderType {
    #[default]
    Individual,
    Organization,
    Business,
    Ngo,
    Other,
}

impl StakeholderType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Individual => "individual",
            Self::Organization => "organization",
            Self::Business => "business",
            Self::Ngo => "ngo",
            Self::Other => "other",
        }
    }

    /// Maps free-form stakeholder labels coming out of extraction.
    ///
    /// Missing or blank labels become `Individual`; labels that are present but
    /// unrecognised become `Other`.
    pub fn from_label(label: Option<&str>) -> Self {
        match label.map(str::trim) {
            None | Some("") => Self::Individual,
            Some(value) => value.parse().unwrap_or(Self::Other),
        }
    }
}

impl fmt::Display for StakeholderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StakeholderType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "individual" => Ok(Self::Individual),
            "organization" | "organisation" => Ok(Self::Organization),
            "business" => Ok(Self::Business),
            "ngo" => Ok(Self::Ngo),
            "other" => Ok(Self::Other),
            other => Err(AppError::Validation(format!(
                "unknown stakeholder type '{other}'"
            ))),
        }
    }
}

stored_object!(ConsultationComment, "consultation_comment", {
    consultation_title: String,
    comment_text: String,
    stakeholder_name: String,
    stakeholder_type: StakeholderType,
    #[serde(default)]
    submission_date: Option<NaiveDate>,
    #[serde(default)]
    sentiment: Option<Sentiment>,
    #[serde(default)]
    sentiment_confidence: Option<f32>,
    #[serde(default)]
    keywords: Option<Vec<String>>,
    processed: bool
});

impl ConsultationComment {
    /// Builds an unprocessed comment. Id and timestamps are assigned by
    /// [`ConsultationComment::bulk_create`].
    pub fn new(
        consultation_title: String,
        comment_text: String,
        stakeholder_name: String,
        stakeholder_type: StakeholderType,
        submission_date: Option<NaiveDate>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: String::new(),
            created_at: now,
            updated_at: now,
            consultation_title,
            comment_text,
            stakeholder_name,
            stakeholder_type,
            submission_date,
            sentiment: None,
            sentiment_confidence: None,
            keywords: None,
            processed: false,
        }
    }

    /// Attaches a successful analysis and marks the comment processed.
    #[must_use]
    pub fn with_analysis(
        mut self,
        sentiment: Sentiment,
        confidence: f32,
        keywords: Vec<String>,
    ) -> Self {
        self.sentiment = Some(sentiment);
        self.sentiment_confidence = Some(confidence.clamp(0.0, 1.0));
        self.keywords = Some(keywords);
        self.processed = true;
        self
    }

    pub fn keyword_list(&self) -> &[String] {
        self.keywords.as_deref().unwrap_or_default()
    }

    /// Inserts the whole batch in a single statement, assigning ids and
    /// creation timestamps.
    pub async fn bulk_create(
        comments: Vec<Self>,
        db: &SurrealDbClient,
    ) -> Result<Vec<Self>, AppError> {
        if comments.is_empty() {
            return Ok(Vec::new());
        }

        let now = Utc::now();
        let stamped: Vec<Self> = comments
            .into_iter()
            .map(|mut comment| {
                comment.id = Uuid::new_v4().to_string();
                comment.created_at = now;
                comment.updated_at = now;
                comment
            })
            .collect();

        let created: Vec<Self> = db.client.insert(Self::table_name()).content(stamped).await?;

        Ok(created)
    }

    pub async fn list(sort_key: &SortKey, db: &SurrealDbClient) -> Result<Vec<Self>, AppError> {
        let sql = format!(
            "SELECT * FROM type::table($table) ORDER BY {} {}",
            sort_key.field(),
            if sort_key.descending { "DESC" } else { "ASC" }
        );

        let comments: Vec<Self> = db
            .client
            .query(sql)
            .bind(("table", Self::table_name()))
            .await?
            .take(0)?;

        Ok(comments)
    }
}

/// Field names a listing may be ordered by.
const SORTABLE_FIELDS: &[&str] = &[
    "created_at",
    "submission_date",
    "consultation_title",
    "stakeholder_name",
    "stakeholder_type",
    "sentiment",
    "sentiment_confidence",
    "processed",
];

/// Sort key in the `field` / `-field` notation used by listing callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    field: &'static str,
    pub descending: bool,
}

impl SortKey {
    pub fn newest_first() -> Self {
        Self {
            field: "created_at",
            descending: true,
        }
    }

    pub const fn field(&self) -> &'static str {
        self.field
    }
}

impl Default for SortKey {
    fn default() -> Self {
        Self::newest_first()
    }
}

impl FromStr for SortKey {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        let (descending, name) = match raw.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, raw),
        };
        let name = if name == "created_date" {
            "created_at"
        } else {
            name
        };

        SORTABLE_FIELDS
            .iter()
            .find(|field| **field == name)
            .map(|field| Self { field, descending })
            .ok_or_else(|| AppError::Validation(format!("unsupported sort key '{raw}'")))
    }
}
