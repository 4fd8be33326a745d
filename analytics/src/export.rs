use std::fmt::Write;

use crate::keywords::KeywordAggregate;

pub const EXPORT_FILE_NAME: &str = "keyword-analysis.csv";
pub const EXPORT_HEADER: &str = "keyword,frequency,positive,neutral,negative,dominant_sentiment";

/// Renders keyword aggregates as CSV, one row per aggregate in the given
/// order. Rows are `\n` terminated.
pub fn export_keywords_csv(aggregates: &[KeywordAggregate]) -> String {
    let mut out = String::with_capacity(EXPORT_HEADER.len() + 1 + aggregates.len() * 32);
    out.push_str(EXPORT_HEADER);
    out.push('\n');

    for aggregate in aggregates {
        // Writing into a String cannot fail
        let _ = writeln!(
            out,
            "{},{},{},{},{},{}",
            escape_field(&aggregate.text),
            aggregate.value,
            aggregate.sentiments.positive,
            aggregate.sentiments.neutral,
            aggregate.sentiments.negative,
            aggregate.dominant_sentiment
        );
    }

    out
}

/// Quotes a field when it contains a delimiter, quote or line break.
fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_owned()
    }
}
