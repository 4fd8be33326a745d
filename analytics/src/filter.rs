use std::{fmt, str::FromStr};

use common::storage::types::consultation_comment::{
    ConsultationComment, Sentiment, StakeholderType,
};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// A filter dimension: either unconstrained (`"all"`) or pinned to one value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection<T> {
    All,
    Only(T),
}

impl<T> Default for Selection<T> {
    fn default() -> Self {
        Self::All
    }
}

impl<T: PartialEq> Selection<T> {
    /// An absent value only passes the unconstrained selection.
    pub fn accepts(&self, value: Option<&T>) -> bool {
        match self {
            Self::All => true,
            Self::Only(expected) => value == Some(expected),
        }
    }
}

impl<T: FromStr> FromStr for Selection<T> {
    type Err = T::Err;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
            Ok(Self::All)
        } else {
            trimmed.parse().map(Self::Only)
        }
    }
}

impl<T: fmt::Display> fmt::Display for Selection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Only(value) => value.fmt(f),
        }
    }
}

impl<T: fmt::Display> Serialize for Selection<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de, T> Deserialize<'de> for Selection<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            None => Ok(Self::All),
            Some(raw) => raw.parse().map_err(de::Error::custom),
        }
    }
}

impl Selection<String> {
    /// Free-text values are kept verbatim; only the literal `"all"` or an
    /// empty value leaves the dimension unconstrained.
    pub fn from_raw(raw: String) -> Self {
        if raw.is_empty() || raw == "all" {
            Self::All
        } else {
            Self::Only(raw)
        }
    }
}

fn deserialize_raw_selection<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Selection<String>, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.map_or(Selection::All, Selection::from_raw))
}

/// Composable view filter. The default value is the identity filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterCriteria {
    pub sentiment: Selection<Sentiment>,
    pub stakeholder_type: Selection<StakeholderType>,
    #[serde(alias = "search")]
    pub search_term: String,
    #[serde(deserialize_with = "deserialize_raw_selection")]
    pub consultation: Selection<String>,
}

/// Logical AND of every active criterion.
pub fn matches(comment: &ConsultationComment, criteria: &FilterCriteria) -> bool {
    criteria.sentiment.accepts(comment.sentiment.as_ref())
        && criteria
            .stakeholder_type
            .accepts(Some(&comment.stakeholder_type))
        && matches_search(comment, &criteria.search_term)
        && criteria
            .consultation
            .accepts(Some(&comment.consultation_title))
}

fn matches_search(comment: &ConsultationComment, term: &str) -> bool {
    if term.is_empty() {
        return true;
    }

    let needle = term.to_lowercase();
    comment.comment_text.to_lowercase().contains(&needle)
        || comment.stakeholder_name.to_lowercase().contains(&needle)
}

/// Borrowing filter over a snapshot, preserving the snapshot's order.
pub fn filter_comments<'a>(
    comments: &'a [ConsultationComment],
    criteria: &FilterCriteria,
) -> Vec<&'a ConsultationComment> {
    comments.iter().filter(|c| matches(c, criteria)).collect()
}
